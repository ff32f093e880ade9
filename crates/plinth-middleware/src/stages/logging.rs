//! Request logging middleware.
//!
//! [`RequestLogger`] times each request, emits one structured `tracing` event
//! when the response is ready, and attaches a [`ResponseLog`] to the response
//! extensions.
//!
//! # Log Fields
//!
//! - `http.method` - request method
//! - `http.path` - request path
//! - `http.status_code` - response status
//! - `duration_ms` - time spent in the wrapped handler
//! - `error` - rendered error, when the response came from the last-resort
//!   error handler
//!
//! 5xx responses log at `error`, 4xx at `warn`, everything else at `info`.
//!
//! # Example
//!
//! ```rust
//! use plinth_middleware::{Chain, RequestLogger};
//!
//! let chain = Chain::new().with(RequestLogger::new().skip_path("/health"));
//! # let _: plinth_middleware::TransportChain = chain;
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use http::{Method, StatusCode};
use plinth_core::{boxed, BoxHandler, HandledError, Request, Response};

use crate::middleware::Middleware;

/// Per-response log entry.
///
/// Inserted into the response extensions by [`RequestLogger`]. A response
/// carries at most one entry: when loggers are nested, the innermost one
/// records and the outer ones leave it alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLog {
    /// Response status.
    pub status: StatusCode,
    /// When the request entered the logger.
    pub started_at: SystemTime,
    /// When the wrapped handler produced the response.
    pub finished_at: SystemTime,
    /// Monotonic time spent in the wrapped handler.
    pub duration: Duration,
    /// Error rendered by the last-resort handler, if any.
    pub error: Option<String>,
}

impl ResponseLog {
    /// Returns the log entry attached to `response`, if any.
    pub fn of(response: &Response) -> Option<&Self> {
        response.extensions().get::<Self>()
    }

    /// Duration in fractional milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

/// Transport middleware that logs every request.
#[derive(Debug, Clone, Default)]
pub struct RequestLogger {
    skip_paths: Arc<Vec<String>>,
}

impl RequestLogger {
    /// Creates a logger that logs every request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppresses the log line for an exact path. The [`ResponseLog`] entry
    /// is still attached.
    #[must_use]
    pub fn skip_path(mut self, path: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.skip_paths).push(path.into());
        self
    }

    fn is_skipped(skip_paths: &[String], path: &str) -> bool {
        skip_paths.iter().any(|skipped| skipped == path)
    }
}

impl Middleware<BoxHandler> for RequestLogger {
    fn name(&self) -> &'static str {
        "request_logger"
    }

    fn wrap(&self, next: BoxHandler) -> BoxHandler {
        let skip_paths = Arc::clone(&self.skip_paths);
        boxed(move |request: Request| {
            let next = Arc::clone(&next);
            let skip_paths = Arc::clone(&skip_paths);
            async move {
                let method = request.method().clone();
                let path = request.uri().path().to_string();
                let started_at = SystemTime::now();
                let start = Instant::now();

                let mut response = next.call(request).await;

                if response.extensions().get::<ResponseLog>().is_some() {
                    return response;
                }

                let log = ResponseLog {
                    status: response.status(),
                    started_at,
                    finished_at: SystemTime::now(),
                    duration: start.elapsed(),
                    error: response
                        .extensions()
                        .get::<HandledError>()
                        .map(|handled| handled.0.clone()),
                };

                if !RequestLogger::is_skipped(&skip_paths, &path) {
                    emit(&method, &path, &log);
                }

                response.extensions_mut().insert(log);
                response
            }
        })
    }
}

fn emit(method: &Method, path: &str, log: &ResponseLog) {
    let status = log.status.as_u16();
    let duration_ms = log.duration_ms();
    let error = log.error.as_deref().unwrap_or("");

    if log.status.is_server_error() {
        tracing::error!(
            http.method = %method,
            http.path = %path,
            http.status_code = status,
            duration_ms,
            error,
            "Request completed"
        );
    } else if log.status.is_client_error() {
        tracing::warn!(
            http.method = %method,
            http.path = %path,
            http.status_code = status,
            duration_ms,
            error,
            "Request completed"
        );
    } else {
        tracing::info!(
            http.method = %method,
            http.path = %path,
            http.status_code = status,
            duration_ms,
            "Request completed"
        );
    }
}
