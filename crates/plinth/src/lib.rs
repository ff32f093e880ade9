//! # Plinth
//!
//! A small HTTP kit built on `hyper` and `tokio`:
//!
//! - **One error path**: route handlers return errors, and a single
//!   last-resort [`ErrorResponder`](plinth_core::ErrorResponder) renders them
//! - **Ordered middleware**: the first middleware declared is the outermost,
//!   for both transport and route handlers
//! - **Routing**: literal, parameter and catch-all segments with 404/405
//!   distinction
//! - **Graceful shutdown**: signal-driven drain with a bounded wait, then
//!   forced close
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plinth::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Deserialize, Serialize)]
//! struct Greeting {
//!     name: String,
//! }
//!
//! async fn greet(req: Request) -> Result<Response, BoxError> {
//!     let greeting: Greeting = read_json(&req)?;
//!     Ok(JsonResponse::new(greeting).into_response()?)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new()
//!         .with_optional_file("plinth.toml")?
//!         .with_env_prefix("PLINTH")
//!         .load()?;
//!     init_logging(&config.logging)?;
//!
//!     let mut router = Router::new();
//!     router.post("/greet", greet)?;
//!
//!     let outcome = Server::builder()
//!         .config(config.server.to_server_config())
//!         .middleware(RequestLogger::new().skip_path("/health"))
//!         .handler(router.into_service())
//!         .build()?
//!         .run()
//!         .await?;
//!
//!     tracing::info!(?outcome, "Server stopped");
//!     Ok(())
//! }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! connection → transport chain → router → route chain → handler
//!                                   ↓ Err
//!                          last-resort error handler
//! ```

#![doc(html_root_url = "https://docs.rs/plinth/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use plinth_config as config;
pub use plinth_core as core;
pub use plinth_extract as extract;
pub use plinth_middleware as middleware;
pub use plinth_router as router;
pub use plinth_server as server;
pub use plinth_telemetry as telemetry;

/// Prelude module for convenient imports.
///
/// ```rust
/// use plinth::prelude::*;
/// ```
pub mod prelude {
    pub use plinth_core::{
        boxed, boxed_try, BoxError, BoxHandler, BoxTryHandler, DefaultErrorResponder,
        ErrorResponder, Handler, HandlerResult, HttpError, Request, RequestHead, Response,
        ResponseExt, TryHandler,
    };

    pub use plinth_middleware::{
        around, try_around, Chain, Middleware, RequestLogger, ResponseLog, RouteChain,
        TransportChain,
    };

    pub use plinth_router::{Params, RequestParamsExt, RouteError, Router};

    pub use plinth_extract::{read_json, write_json, Json, JsonError, JsonResponse};

    pub use plinth_server::{
        Event, Server, ServerConfig, ServerError, ShutdownOutcome, ShutdownReason, ShutdownSignal,
        Signal,
    };

    pub use plinth_telemetry::{init_logging, LogConfig, LogFormat};

    pub use plinth_config::{ConfigLoader, PlinthConfig};
}
