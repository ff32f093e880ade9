//! Stock middleware stages.
//!
//! Plinth deliberately ships a single stage: request logging.

pub mod logging;
