//! Server error types.

use std::io;
use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;

/// Errors that stop the server from starting or running.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The configured bind address could not be parsed.
    #[error("invalid bind address {addr:?}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Parse failure.
        #[source]
        source: AddrParseError,
    },

    /// Binding the listener failed.
    #[error("failed to bind {addr}")]
    Bind {
        /// The address that could not be bound.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// Installing a signal handler failed.
    #[error("failed to register signal handlers")]
    Signal(#[source] io::Error),

    /// The accept loop hit a non-recoverable error.
    #[error("failed to accept connections")]
    Accept(#[source] io::Error),

    /// `Server::builder().build()` was called without a handler.
    #[error("no handler configured")]
    MissingHandler,
}
