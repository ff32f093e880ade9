//! # Plinth Middleware
//!
//! Middleware composition for both Plinth handler flavors.
//!
//! A middleware takes the handler it wraps and returns a new handler. A
//! [`Chain`] is an ordered list of middleware reduced right-to-left onto a
//! final handler, so the first middleware in the list is the outermost one:
//!
//! ```text
//! Chain [a, b, c] + handler h  =>  a(b(c(h)))
//!
//! request  → a → b → c → h
//! response ← a ← b ← c ← h
//! ```
//!
//! The same [`Chain`] type works for transport handlers
//! ([`BoxHandler`](plinth_core::BoxHandler)) and for the router's
//! error-returning handlers ([`BoxTryHandler`](plinth_core::BoxTryHandler)).
//!
//! ## Example
//!
//! ```
//! use plinth_core::{boxed, BoxHandler, Handler, Request, Response, ResponseExt};
//! use plinth_middleware::{around, Chain, RequestLogger};
//! use http::StatusCode;
//!
//! let chain = Chain::new()
//!     .with(RequestLogger::new())
//!     .with(around("server-header", |req: Request, next: BoxHandler| async move {
//!         let mut response = next.call(req).await;
//!         response.headers_mut().insert("server", "plinth".parse().unwrap());
//!         response
//!     }));
//!
//! assert_eq!(chain.names(), vec!["request_logger", "server-header"]);
//!
//! let handler = chain.then(boxed(|_req: Request| async {
//!     Response::text(StatusCode::OK, "hi")
//! }));
//! # let _ = handler;
//! ```

#![doc(html_root_url = "https://docs.rs/plinth-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chain;
pub mod middleware;
pub mod stages;

pub use chain::{compose, Chain, RouteChain, TransportChain};
pub use middleware::{around, try_around, Around, BoxedMiddleware, FnMiddleware, Middleware, TryAround};
pub use stages::logging::{RequestLogger, ResponseLog};
