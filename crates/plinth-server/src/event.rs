//! Lifecycle events.
//!
//! The server reports what it is doing through a single listener callback.
//! The default listener writes each event to `tracing`.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use crate::shutdown::ShutdownReason;
use crate::signal::Signal;

/// Something that happened during the server's life.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The listener is bound and accepting.
    Listening {
        /// Local address of the listener.
        addr: SocketAddr,
    },
    /// A registered OS signal arrived.
    SignalReceived(Signal),
    /// The server stopped accepting and is draining connections.
    ShutdownStarted {
        /// Why the server is stopping.
        reason: ShutdownReason,
        /// Bounded wait window for in-flight connections.
        timeout: Duration,
        /// Connections open when draining began.
        active: usize,
    },
    /// Every connection finished within the timeout.
    ShutdownCompleted,
    /// The timeout expired and remaining connections were closed.
    ForcedClose {
        /// Connections that were still open.
        remaining: usize,
    },
    /// The accept loop failed.
    ServerFailed(String),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listening { addr } => write!(f, "listening on {addr}"),
            Self::SignalReceived(signal) => write!(f, "received {signal}"),
            Self::ShutdownStarted {
                reason,
                timeout,
                active,
            } => write!(
                f,
                "shutting down ({reason}), waiting up to {timeout:?} for {active} connections"
            ),
            Self::ShutdownCompleted => f.write_str("shutdown completed"),
            Self::ForcedClose { remaining } => {
                write!(f, "forced close of {remaining} connections")
            }
            Self::ServerFailed(error) => write!(f, "server failed: {error}"),
        }
    }
}

/// Callback receiving every [`Event`].
pub type EventListener = Arc<dyn Fn(&Event) + Send + Sync>;

/// Returns the listener that logs events through `tracing`.
#[must_use]
pub fn tracing_listener() -> EventListener {
    Arc::new(log_event)
}

fn log_event(event: &Event) {
    match event {
        Event::Listening { addr } => tracing::info!(%addr, "Server listening"),
        Event::SignalReceived(signal) => {
            tracing::info!(%signal, "Signal received, initiating graceful shutdown");
        }
        Event::ShutdownStarted {
            reason,
            timeout,
            active,
        } => tracing::info!(
            %reason,
            timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            active,
            "Draining connections"
        ),
        Event::ShutdownCompleted => tracing::info!("All connections closed"),
        Event::ForcedClose { remaining } => {
            tracing::warn!(remaining, "Shutdown timeout reached, closing connections");
        }
        Event::ServerFailed(error) => tracing::error!(error = %error, "Server failed"),
    }
}
