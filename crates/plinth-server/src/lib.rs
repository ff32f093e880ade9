//! # Plinth Server
//!
//! HTTP/1.1 server with signal-driven graceful shutdown.
//!
//! - [`Server`] - accept loop, per-connection tasks, bounded drain
//! - [`ServerConfig`] - bind address, shutdown window, signal set, limits
//! - [`ShutdownSignal`] / [`ConnectionTracker`] - shutdown coordination
//! - [`Event`] - lifecycle notifications for a single listener callback
//!
//! ## Shutdown sequence
//!
//! ```text
//! signal / trigger / accept failure
//!   → stop accepting
//!   → graceful_shutdown() on every connection
//!   → wait up to shutdown_timeout
//!   → Graceful, or force-close the rest → Forced { remaining }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use http::StatusCode;
//! use plinth_core::{Request, Response, ResponseExt};
//! use plinth_server::{Server, ShutdownOutcome, ShutdownReason, ShutdownSignal};
//! use tokio::net::TcpListener;
//!
//! # tokio_test::block_on(async {
//! let server = Server::builder()
//!     .handler(|_req: Request| async { Response::text(StatusCode::OK, "ok") })
//!     .build()?;
//!
//! let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
//! let shutdown = ShutdownSignal::new();
//! shutdown.trigger(ShutdownReason::Requested);
//!
//! let outcome = server.serve(listener, shutdown).await?;
//! assert_eq!(outcome, ShutdownOutcome::Graceful);
//! # Ok::<(), plinth_server::ServerError>(())
//! # }).unwrap();
//! ```

#![doc(html_root_url = "https://docs.rs/plinth-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod event;
mod server;
mod shutdown;
mod signal;

pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_HEADER_READ_TIMEOUT_SECS, DEFAULT_HTTP_ADDR,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
};
pub use error::ServerError;
pub use event::{tracing_listener, Event, EventListener};
pub use server::{Server, ServerBuilder, ShutdownOutcome};
pub use shutdown::{ConnectionGuard, ConnectionTracker, ShutdownReason, ShutdownSignal};
pub use signal::{ParseSignalError, Signal, SignalListener};
