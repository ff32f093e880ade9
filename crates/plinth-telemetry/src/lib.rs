//! # Plinth Telemetry
//!
//! Logging setup for Plinth services. Every Plinth crate emits `tracing`
//! events; this crate installs the subscriber that writes them out.
//!
//! ```rust,no_run
//! use plinth_telemetry::{init_logging, LogConfig, LogFormat};
//!
//! let config = LogConfig {
//!     format: LogFormat::Compact,
//!     ..LogConfig::production()
//! };
//! init_logging(&config)?;
//! # Ok::<(), plinth_telemetry::TelemetryError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/plinth-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogConfig, LogFormat};
