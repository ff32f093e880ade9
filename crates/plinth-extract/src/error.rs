//! JSON error types.

use http::StatusCode;
use plinth_core::responder::error_chain;
use plinth_core::HttpError;
use serde_json::error::Category;
use thiserror::Error;

/// Error raised while decoding or encoding JSON.
///
/// Converts into an [`HttpError`] so handlers can use `?` directly.
///
/// # Example
///
/// ```rust
/// use plinth_extract::{decode_json, JsonError};
/// use http::StatusCode;
///
/// let err = decode_json::<serde_json::Value>(b"{").unwrap_err();
/// assert!(matches!(err, JsonError::Eof(_)));
/// assert_eq!(err.status(), StatusCode::BAD_REQUEST);
/// ```
#[derive(Error, Debug)]
pub enum JsonError {
    /// The body was empty.
    #[error("request body is empty")]
    EmptyBody,

    /// The body exceeded the configured limit.
    #[error("request body of {actual} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// Maximum accepted size in bytes.
        limit: usize,
        /// Actual size in bytes.
        actual: usize,
    },

    /// The body is not syntactically valid JSON.
    #[error("malformed JSON body")]
    Syntax(#[source] serde_json::Error),

    /// The JSON is valid but does not fit the target type.
    #[error("JSON body does not match the expected shape")]
    Data(#[source] serde_json::Error),

    /// The body ended in the middle of a JSON value.
    #[error("JSON body ended unexpectedly")]
    Eof(#[source] serde_json::Error),

    /// A value could not be serialized.
    #[error("failed to encode JSON response")]
    Encode(#[source] serde_json::Error),
}

impl JsonError {
    /// Classifies a decode failure by its serde category.
    pub(crate) fn decode(err: serde_json::Error) -> Self {
        match err.classify() {
            Category::Eof => Self::Eof(err),
            Category::Data => Self::Data(err),
            Category::Syntax | Category::Io => Self::Syntax(err),
        }
    }

    /// Returns the HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::EmptyBody | Self::Syntax(_) | Self::Data(_) | Self::Eof(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Returns the stable error code used in error envelopes.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyBody => "EMPTY_BODY",
            Self::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            Self::Syntax(_) | Self::Data(_) | Self::Eof(_) => "INVALID_JSON",
            Self::Encode(_) => "ENCODE_FAILED",
        }
    }
}

impl From<JsonError> for HttpError {
    fn from(err: JsonError) -> Self {
        Self::new(err.status(), error_chain(&err)).with_code(err.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(JsonError::EmptyBody.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            JsonError::PayloadTooLarge { limit: 1, actual: 2 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );

        let encode = serde_json::from_str::<u8>("x").unwrap_err();
        assert_eq!(
            JsonError::Encode(encode).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_http_error_keeps_detail() {
        let err = JsonError::decode(serde_json::from_str::<u8>("\"text\"").unwrap_err());
        assert!(matches!(err, JsonError::Data(_)));

        let http: HttpError = err.into();
        assert_eq!(http.status(), StatusCode::BAD_REQUEST);
        assert_eq!(http.code(), "INVALID_JSON");
        assert!(http
            .message()
            .starts_with("JSON body does not match the expected shape: invalid type"));
    }

    #[test]
    fn test_too_large_message() {
        let http: HttpError = JsonError::PayloadTooLarge {
            limit: 10,
            actual: 20,
        }
        .into();
        assert_eq!(http.code(), "PAYLOAD_TOO_LARGE");
        assert_eq!(
            http.message(),
            "request body of 20 bytes exceeds the limit of 10 bytes"
        );
    }
}
