//! # Plinth Extract
//!
//! JSON helpers for Plinth handlers.
//!
//! - [`read_json`] / [`decode_json`] - decode a buffered request body
//! - [`Json`] - typed wrapper for request and response bodies
//! - [`JsonResponse`] / [`write_json`] - encode a value as a response
//!
//! Decode failures convert into [`HttpError`](plinth_core::HttpError) with a
//! 400 or 413 status, so `?` inside an error-returning handler produces the
//! right client error through the router's last-resort handler.
//!
//! ## Example
//!
//! ```rust
//! use http::StatusCode;
//! use plinth_core::{HttpError, Request, Response};
//! use plinth_extract::{read_json, write_json};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize)]
//! struct NewTodo {
//!     title: String,
//! }
//!
//! #[derive(Serialize)]
//! struct Todo {
//!     id: u64,
//!     title: String,
//! }
//!
//! async fn create_todo(req: Request) -> Result<Response, HttpError> {
//!     let input: NewTodo = read_json(&req)?;
//!     write_json(StatusCode::CREATED, &Todo { id: 1, title: input.title })
//! }
//! # let _ = plinth_core::boxed_try(create_todo);
//! ```

#![doc(html_root_url = "https://docs.rs/plinth-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod json;
mod response;

pub use error::JsonError;
pub use json::{decode_json, read_json, read_json_with_limit, write_json, Json, DEFAULT_JSON_LIMIT};
pub use response::JsonResponse;
