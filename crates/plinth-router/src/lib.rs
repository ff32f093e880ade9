//! # Plinth Router
//!
//! A router whose handlers return errors instead of writing them.
//!
//! - **Patterns**: literals, named parameters (`/users/{id}`) and a trailing
//!   catch-all (`/files/{*path}`)
//! - **Specificity**: the most specific matching route wins, regardless of
//!   registration order
//! - **404 vs 405**: unknown paths and unsupported methods are told apart;
//!   405 responses carry an `Allow` header
//! - **One error path**: every `Err` a handler or route middleware returns is
//!   rendered by the single configured [`ErrorResponder`](plinth_core::ErrorResponder)
//!
//! # Example
//!
//! ```rust
//! use http::StatusCode;
//! use plinth_core::{BoxError, Handler, Request, Response, ResponseExt};
//! use plinth_router::{RequestParamsExt, Router};
//!
//! async fn show(req: Request) -> Result<Response, BoxError> {
//!     let path = req.param("path").unwrap_or_default();
//!     Ok(Response::text(StatusCode::OK, path.to_string()))
//! }
//!
//! # tokio_test::block_on(async {
//! let mut router = Router::new();
//! router.get("/files/{*path}", show)?;
//!
//! let service = router.into_service();
//! let request = http::Request::builder()
//!     .uri("/files/docs/readme.md")
//!     .body(bytes::Bytes::new())
//!     .unwrap();
//!
//! let response = service.call(request).await;
//! assert_eq!(response.status(), StatusCode::OK);
//! # Ok::<(), plinth_router::RouteError>(())
//! # }).unwrap();
//! ```

#![doc(html_root_url = "https://docs.rs/plinth-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod params;
mod router;
pub mod table;

pub use error::RouteError;
pub use params::{Params, RequestParamsExt};
pub use router::{Router, RouterBuilder, RouterService};
pub use table::{Lookup, Pattern, RouteTable, SegmentKind};
