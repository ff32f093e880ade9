//! The router wrapper.
//!
//! [`Router`] collects routes whose handlers return
//! `Result<Response, BoxError>`. [`Router::into_service`] freezes the table
//! into a [`RouterService`], a transport [`Handler`] that renders every
//! unhandled error through one configured [`ErrorResponder`].

use std::fmt;
use std::sync::Arc;

use http::header::ALLOW;
use http::{HeaderValue, Method};
use plinth_core::responder::error_chain;
use plinth_core::{
    boxed, boxed_try, BoxError, BoxFuture, BoxHandler, BoxTryHandler, DefaultErrorResponder,
    ErrorResponder, Handler, HandledError, HttpError, Request, RequestHead, Response, TryHandler,
};
use plinth_middleware::{Middleware, RouteChain};

use crate::error::RouteError;
use crate::table::{Lookup, RouteTable};

/// Builder for [`Router`].
pub struct RouterBuilder {
    error_handler: Arc<dyn ErrorResponder>,
    middleware: RouteChain,
}

impl RouterBuilder {
    /// Sets the last-resort error handler. Defaults to
    /// [`DefaultErrorResponder`].
    #[must_use]
    pub fn error_handler<R: ErrorResponder>(mut self, responder: R) -> Self {
        self.error_handler = Arc::new(responder);
        self
    }

    /// Appends a global route middleware.
    #[must_use]
    pub fn middleware<M: Middleware<BoxTryHandler>>(mut self, middleware: M) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Appends every middleware of `chain` to the global chain.
    #[must_use]
    pub fn middlewares(mut self, chain: &RouteChain) -> Self {
        self.middleware.extend(chain);
        self
    }

    /// Builds an empty router.
    #[must_use]
    pub fn build(self) -> Router {
        Router {
            table: RouteTable::new(),
            middleware: self.middleware,
            error_handler: self.error_handler,
        }
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self {
            error_handler: Arc::new(DefaultErrorResponder),
            middleware: RouteChain::new(),
        }
    }
}

/// A route table of error-returning handlers.
///
/// # Example
///
/// ```rust
/// use http::StatusCode;
/// use plinth_core::{HttpError, Request, Response, ResponseExt};
/// use plinth_router::{RequestParamsExt, Router};
///
/// async fn get_user(req: Request) -> Result<Response, HttpError> {
///     let id = req.param("id").unwrap_or_default();
///     if id == "0" {
///         return Err(HttpError::not_found("no such user"));
///     }
///     Ok(Response::text(StatusCode::OK, format!("user {id}")))
/// }
///
/// let mut router = Router::new();
/// router.get("/users/{id}", get_user)?;
/// let service = router.into_service();
/// # let _ = service;
/// # Ok::<(), plinth_router::RouteError>(())
/// ```
pub struct Router {
    table: RouteTable<BoxTryHandler>,
    middleware: RouteChain,
    error_handler: Arc<dyn ErrorResponder>,
}

impl Router {
    /// Creates a router with the default error handler and no middleware.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts building a router.
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Registers `handler` for `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] for a malformed or duplicate pattern.
    pub fn route<H: TryHandler>(
        &mut self,
        method: Method,
        pattern: &str,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        let handler = self.middleware.then(boxed_try(handler));
        self.table.insert(method, pattern, handler)?;
        Ok(self)
    }

    /// Registers `handler` wrapped in a route-specific chain.
    ///
    /// The global chain stays outermost: the stored handler is
    /// `global(route(handler))`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] for a malformed or duplicate pattern.
    pub fn route_with<H: TryHandler>(
        &mut self,
        method: Method,
        pattern: &str,
        chain: &RouteChain,
        handler: H,
    ) -> Result<&mut Self, RouteError> {
        let handler = self.middleware.then(chain.then(boxed_try(handler)));
        self.table.insert(method, pattern, handler)?;
        Ok(self)
    }

    /// Registers a `GET` route.
    ///
    /// # Errors
    ///
    /// See [`Router::route`].
    pub fn get<H: TryHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::GET, pattern, handler)
    }

    /// Registers a `POST` route.
    ///
    /// # Errors
    ///
    /// See [`Router::route`].
    pub fn post<H: TryHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::POST, pattern, handler)
    }

    /// Registers a `PUT` route.
    ///
    /// # Errors
    ///
    /// See [`Router::route`].
    pub fn put<H: TryHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::PUT, pattern, handler)
    }

    /// Registers a `PATCH` route.
    ///
    /// # Errors
    ///
    /// See [`Router::route`].
    pub fn patch<H: TryHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Registers a `DELETE` route.
    ///
    /// # Errors
    ///
    /// See [`Router::route`].
    pub fn delete<H: TryHandler>(&mut self, pattern: &str, handler: H) -> Result<&mut Self, RouteError> {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Returns `(method, pattern)` for every route, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.table.routes()
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Freezes the route table into a servable handler.
    #[must_use]
    pub fn into_service(self) -> RouterService {
        tracing::debug!(routes = self.table.len(), "Router frozen");
        RouterService {
            inner: Arc::new(Inner {
                table: self.table,
                error_handler: self.error_handler,
            }),
        }
    }

    /// Freezes the router into a boxed transport handler.
    #[must_use]
    pub fn into_handler(self) -> BoxHandler {
        boxed(self.into_service())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.table.routes().collect::<Vec<_>>())
            .field("middleware", &self.middleware)
            .finish_non_exhaustive()
    }
}

struct Inner {
    table: RouteTable<BoxTryHandler>,
    error_handler: Arc<dyn ErrorResponder>,
}

impl Inner {
    async fn dispatch(&self, mut request: Request) -> Response {
        let head = RequestHead::from_request(&request);

        match self.table.lookup(request.method(), request.uri().path()) {
            Lookup::Found(handler, params) => {
                let handler = Arc::clone(handler);
                request.extensions_mut().insert(params);
                match handler.call(request).await {
                    Ok(response) => response,
                    Err(error) => self.fail(&head, error),
                }
            }
            Lookup::MethodNotAllowed(allowed) => {
                let error = HttpError::method_not_allowed(format!(
                    "method {} not allowed for {}",
                    head.method,
                    head.path()
                ));
                let mut response = self.fail(&head, error.into());
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(ALLOW, value);
                }
                response
            }
            Lookup::NotFound => {
                let error = HttpError::not_found(format!("no route for {}", head.path()));
                self.fail(&head, error.into())
            }
        }
    }

    /// Hands `error` to the last-resort handler and marks the response.
    fn fail(&self, head: &RequestHead, error: BoxError) -> Response {
        let rendered = error_chain(error.as_ref());
        let mut response = self.error_handler.respond(head, error);
        response.extensions_mut().insert(HandledError(rendered));
        response
    }
}

/// A frozen router, servable as a transport [`Handler`].
///
/// Clones share the same route table.
#[derive(Clone)]
pub struct RouterService {
    inner: Arc<Inner>,
}

impl RouterService {
    /// Returns `(method, pattern)` for every route, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.inner.table.routes()
    }
}

impl Handler for RouterService {
    fn call(&self, request: Request) -> BoxFuture<'static, Response> {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.dispatch(request).await })
    }
}

impl fmt::Debug for RouterService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterService")
            .field("routes", &self.routes().collect::<Vec<_>>())
            .finish()
    }
}
