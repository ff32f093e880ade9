//! Error types for Plinth handlers.
//!
//! Error-returning handlers may fail with any error that converts into
//! [`BoxError`]. When the failure should map to a specific HTTP status, return
//! (or wrap) an [`HttpError`]; the last-resort handler looks for one anywhere in
//! the error's `source()` chain.

use std::error::Error as StdError;

use http::StatusCode;
use thiserror::Error;

/// Type-erased error returned by handlers.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// An error that knows which HTTP status it should produce.
///
/// # Example
///
/// ```
/// use plinth_core::HttpError;
/// use http::StatusCode;
///
/// let err = HttpError::not_found("user 42 does not exist");
/// assert_eq!(err.status(), StatusCode::NOT_FOUND);
/// assert_eq!(err.code(), "NOT_FOUND");
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HttpError {
    status: StatusCode,
    code: String,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HttpError {
    /// Creates an error with the given status and message.
    ///
    /// The machine-readable code defaults to the upper-cased canonical reason
    /// of the status (`404` → `NOT_FOUND`).
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code: default_code(status),
            message: message.into(),
            source: None,
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 401 Unauthorized.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// 403 Forbidden.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// 404 Not Found.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// 405 Method Not Allowed.
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, message)
    }

    /// 409 Conflict.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// 413 Payload Too Large.
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    /// 422 Unprocessable Entity.
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Overrides the machine-readable error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the machine-readable error code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Finds the first `HttpError` in an error's source chain.
    ///
    /// ```
    /// use plinth_core::{BoxError, HttpError};
    ///
    /// #[derive(Debug, thiserror::Error)]
    /// #[error("lookup failed")]
    /// struct LookupFailed(#[source] HttpError);
    ///
    /// let err: BoxError = Box::new(LookupFailed(HttpError::conflict("stale")));
    /// let found = HttpError::find(err.as_ref()).unwrap();
    /// assert_eq!(found.code(), "CONFLICT");
    /// ```
    pub fn find<'a>(error: &'a (dyn StdError + 'static)) -> Option<&'a Self> {
        let mut current = Some(error);
        while let Some(err) = current {
            if let Some(http) = err.downcast_ref::<Self>() {
                return Some(http);
            }
            current = err.source();
        }
        None
    }
}

fn default_code(status: StatusCode) -> String {
    status.canonical_reason().map_or_else(
        || format!("HTTP_{}", status.as_u16()),
        |reason| reason.to_uppercase().replace(' ', "_"),
    )
}
