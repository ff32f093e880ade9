//! The two handler flavors.
//!
//! - [`Handler`] is the low-level transport flavor: it always produces a
//!   [`Response`]. The server drives these, and transport middleware wraps
//!   them.
//! - [`TryHandler`] is the router flavor: it returns an error instead of
//!   writing one, and the router funnels every error to a single
//!   [`ErrorResponder`](crate::ErrorResponder).
//!
//! Both are implemented for plain async functions and closures, and both
//! have an `Arc`-erased form so they can be stored in tables and wrapped by
//! middleware chains.

use std::future::Future;
use std::sync::Arc;

use crate::error::BoxError;
use crate::types::{BoxFuture, Request, Response};

/// Result returned by error-returning handlers.
pub type HandlerResult = Result<Response, BoxError>;

/// A type-erased transport handler.
pub type BoxHandler = Arc<dyn Handler>;

/// A type-erased error-returning handler.
pub type BoxTryHandler = Arc<dyn TryHandler>;

/// Transport-level request handler. Never fails.
pub trait Handler: Send + Sync + 'static {
    /// Handles a request and produces the response.
    fn call(&self, request: Request) -> BoxFuture<'static, Response>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        Box::pin(self(request))
    }
}

/// Request handler that may fail.
///
/// An `Err` is not written by the handler itself; it travels up through any
/// middleware and is turned into a response by the router's last-resort
/// error handler.
pub trait TryHandler: Send + Sync + 'static {
    /// Handles a request.
    fn call(&self, request: Request) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut, E> TryHandler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    fn call(&self, request: Request) -> BoxFuture<'static, HandlerResult> {
        let fut = self(request);
        Box::pin(async move { fut.await.map_err(Into::into) })
    }
}

/// Erases a transport handler.
pub fn boxed<H: Handler>(handler: H) -> BoxHandler {
    Arc::new(handler)
}

/// Erases an error-returning handler.
pub fn boxed_try<H: TryHandler>(handler: H) -> BoxTryHandler {
    Arc::new(handler)
}
