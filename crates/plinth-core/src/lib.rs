//! # Plinth Core
//!
//! Core types and traits shared by every Plinth crate.
//!
//! - [`Request`] / [`Response`] - the buffered request and response types
//! - [`Handler`] - infallible transport-level handler
//! - [`TryHandler`] - handler that returns an error instead of writing it
//! - [`HttpError`] - error carrying an HTTP status
//! - [`ErrorResponder`] - the single last-resort error handler
//!
//! ## Handler flavors
//!
//! ```rust
//! use plinth_core::{HttpError, Request, Response, ResponseExt};
//! use http::StatusCode;
//!
//! // Transport flavor: always produces a response.
//! async fn ping(_req: Request) -> Response {
//!     Response::text(StatusCode::OK, "pong")
//! }
//!
//! // Error-returning flavor: failures bubble up to the last-resort handler.
//! async fn lookup(req: Request) -> Result<Response, HttpError> {
//!     if req.uri().path() == "/missing" {
//!         return Err(HttpError::not_found("no such thing"));
//!     }
//!     Ok(Response::text(StatusCode::OK, "found"))
//! }
//! # let _ = plinth_core::boxed(ping);
//! # let _ = plinth_core::boxed_try(lookup);
//! ```

#![doc(html_root_url = "https://docs.rs/plinth-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod handler;
mod head;
pub mod responder;
mod types;

pub use error::{BoxError, HttpError};
pub use handler::{boxed, boxed_try, BoxHandler, BoxTryHandler, Handler, HandlerResult, TryHandler};
pub use head::RequestHead;
pub use responder::{DefaultErrorResponder, ErrorResponder, HandledError};
pub use types::{Body, BoxFuture, Request, Response, ResponseExt};
