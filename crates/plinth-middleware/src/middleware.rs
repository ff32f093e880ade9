//! The middleware trait and closure-based implementations.
//!
//! A [`Middleware<H>`] turns a handler of flavor `H` into another handler of
//! the same flavor. Plinth uses two flavors:
//!
//! - `H = BoxHandler` for transport middleware (always produces a response)
//! - `H = BoxTryHandler` for route middleware (may pass errors through)
//!
//! # Example
//!
//! ```
//! use plinth_core::{boxed_try, BoxTryHandler, HttpError, Request, TryHandler};
//! use plinth_middleware::{FnMiddleware, Middleware};
//!
//! // Reject requests without an API key before they reach the route.
//! let require_key = FnMiddleware::new("require_key", |next: BoxTryHandler| {
//!     boxed_try(move |req: Request| {
//!         let next = next.clone();
//!         async move {
//!             if req.headers().contains_key("x-api-key") {
//!                 next.call(req).await
//!             } else {
//!                 Err(HttpError::unauthorized("missing api key").into())
//!             }
//!         }
//!     })
//! });
//!
//! assert_eq!(Middleware::<BoxTryHandler>::name(&require_key), "require_key");
//! ```

use std::future::Future;
use std::sync::Arc;

use plinth_core::{
    boxed, boxed_try, BoxHandler, BoxTryHandler, HandlerResult, Request, Response,
};

/// A type-erased middleware for handler flavor `H`.
pub type BoxedMiddleware<H> = Arc<dyn Middleware<H>>;

/// Wraps a handler of flavor `H` in another handler of the same flavor.
///
/// # Invariants
///
/// - The returned handler SHOULD call `next` at most once per request
///   (never calling it short-circuits the chain).
/// - Route middleware SHOULD let errors from `next` propagate rather than
///   rendering them; rendering is the last-resort handler's job.
pub trait Middleware<H>: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs and introspection.
    fn name(&self) -> &'static str;

    /// Wraps `next`, returning the handler that runs this middleware first.
    fn wrap(&self, next: H) -> H;
}

/// A middleware built from a plain `Fn(H) -> H`.
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F> {
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<H, F> Middleware<H> for FnMiddleware<F>
where
    F: Fn(H) -> H + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn wrap(&self, next: H) -> H {
        (self.func)(next)
    }
}

/// Transport middleware written as `async fn(Request, next) -> Response`.
///
/// Created by [`around`].
pub struct Around<F> {
    name: &'static str,
    func: Arc<F>,
}

/// Builds a transport middleware from an async function that receives the
/// request and the next handler.
///
/// ```
/// use plinth_core::{BoxHandler, Handler, Request};
/// use plinth_middleware::around;
///
/// let no_cache = around("no_cache", |req: Request, next: BoxHandler| async move {
///     let mut response = next.call(req).await;
///     response
///         .headers_mut()
///         .insert("cache-control", "no-store".parse().unwrap());
///     response
/// });
/// # let _ = no_cache;
/// ```
pub fn around<F, Fut>(name: &'static str, func: F) -> Around<F>
where
    F: Fn(Request, BoxHandler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Around {
        name,
        func: Arc::new(func),
    }
}

impl<F, Fut> Middleware<BoxHandler> for Around<F>
where
    F: Fn(Request, BoxHandler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let func = Arc::clone(&self.func);
        boxed(move |request: Request| (*func)(request, Arc::clone(&next)))
    }
}

/// Route middleware written as `async fn(Request, next) -> HandlerResult`.
///
/// Created by [`try_around`].
pub struct TryAround<F> {
    name: &'static str,
    func: Arc<F>,
}

/// Builds a route middleware from an async function that receives the request
/// and the next error-returning handler.
pub fn try_around<F, Fut>(name: &'static str, func: F) -> TryAround<F>
where
    F: Fn(Request, BoxTryHandler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    TryAround {
        name,
        func: Arc::new(func),
    }
}

impl<F, Fut> Middleware<BoxTryHandler> for TryAround<F>
where
    F: Fn(Request, BoxTryHandler) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn wrap(&self, next: BoxTryHandler) -> BoxTryHandler {
        let func = Arc::clone(&self.func);
        boxed_try(move |request: Request| (*func)(request, Arc::clone(&next)))
    }
}
