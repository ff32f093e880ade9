//! Ordered middleware chains.
//!
//! A [`Chain`] reduces its middleware onto a handler from right to left, so
//! the first middleware added is the outermost: it sees the request first and
//! the response last.

use std::fmt;
use std::sync::Arc;

use plinth_core::{BoxHandler, BoxTryHandler};

use crate::middleware::{BoxedMiddleware, Middleware};

/// Chain of transport middleware.
pub type TransportChain = Chain<BoxHandler>;

/// Chain of route (error-returning) middleware.
pub type RouteChain = Chain<BoxTryHandler>;

/// An ordered list of middleware for handler flavor `H`.
///
/// # Example
///
/// ```
/// use plinth_core::BoxHandler;
/// use plinth_middleware::{Chain, FnMiddleware};
///
/// let chain: Chain<BoxHandler> = Chain::new()
///     .with(FnMiddleware::new("outer", |next: BoxHandler| next))
///     .with(FnMiddleware::new("inner", |next: BoxHandler| next));
///
/// assert_eq!(chain.len(), 2);
/// assert_eq!(chain.names(), vec!["outer", "inner"]);
/// ```
pub struct Chain<H> {
    stages: Vec<BoxedMiddleware<H>>,
}

impl<H: 'static> Chain<H> {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a middleware, builder style.
    #[must_use]
    pub fn with<M: Middleware<H>>(mut self, middleware: M) -> Self {
        self.push(middleware);
        self
    }

    /// Appends a middleware.
    pub fn push<M: Middleware<H>>(&mut self, middleware: M) {
        self.stages.push(Arc::new(middleware));
    }

    /// Appends an already shared middleware.
    pub fn push_shared(&mut self, middleware: BoxedMiddleware<H>) {
        self.stages.push(middleware);
    }

    /// Appends every middleware of `other`, after the ones already present.
    pub fn extend(&mut self, other: &Self) {
        self.stages.extend(other.stages.iter().cloned());
    }

    /// Wraps `handler` with every middleware in the chain.
    ///
    /// For a chain `[a, b, c]` this returns `a(b(c(handler)))`. An empty chain
    /// returns `handler` unchanged.
    pub fn then(&self, handler: H) -> H {
        compose(&self.stages, handler)
    }

    /// Returns the middleware names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Returns the number of middleware in the chain.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if the chain has no middleware.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Reduces `middlewares` onto `handler`, right to left.
pub fn compose<H: 'static>(middlewares: &[BoxedMiddleware<H>], handler: H) -> H {
    middlewares
        .iter()
        .rev()
        .fold(handler, |next, middleware| middleware.wrap(next))
}

impl<H: 'static> Default for Chain<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> Clone for Chain<H> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<H: 'static> fmt::Debug for Chain<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|stage| stage.name()))
            .finish()
    }
}
