//! # Plinth Config
//!
//! Declarative configuration for Plinth services, layered from defaults,
//! TOML or JSON files, and environment variables. Unknown keys are an error
//! at every layer.
//!
//! # Example
//!
//! ```no_run
//! use plinth_config::ConfigLoader;
//!
//! # fn main() -> Result<(), plinth_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("plinth.toml")?
//!     .with_env_prefix("PLINTH")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! signals = ["SIGINT", "SIGTERM"]
//! max_body_bytes = 4194304
//! keep_alive = true
//! header_read_timeout_secs = 30
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variables
//!
//! `PREFIX__SECTION__KEY`, e.g. `PLINTH__SERVER__SHUTDOWN_TIMEOUT_SECS=10`.
//! `SERVER__SIGNALS` takes a comma-separated list.

#![doc(html_root_url = "https://docs.rs/plinth-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;

pub use config::{PlinthConfig, ServerSection};
pub use error::ConfigError;
pub use loader::ConfigLoader;
