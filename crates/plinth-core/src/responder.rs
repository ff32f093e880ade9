//! The last-resort error handler.
//!
//! A router holds exactly one [`ErrorResponder`]. Any error that an
//! error-returning handler (or the middleware around it) lets escape ends up
//! here, and the responder turns it into a response. Its signature returns a
//! plain [`Response`]: there is nowhere further for a failure to go.
//!
//! # Example
//!
//! ```rust
//! use plinth_core::{BoxError, RequestHead, Response, ResponseExt};
//! use plinth_core::responder::ErrorResponder;
//! use http::StatusCode;
//!
//! let teapot = |_head: &RequestHead, _err: BoxError| {
//!     Response::text(StatusCode::IM_A_TEAPOT, "short and stout")
//! };
//!
//! fn takes_responder(_r: impl ErrorResponder) {}
//! takes_responder(teapot);
//! ```

use std::error::Error as StdError;

use http::StatusCode;

use crate::error::{BoxError, HttpError};
use crate::head::RequestHead;
use crate::types::{Response, ResponseExt};

/// Generic message used for server-side failures, so internals do not leak.
pub const INTERNAL_MESSAGE: &str = "internal server error";

/// Turns an unhandled handler error into a response.
pub trait ErrorResponder: Send + Sync + 'static {
    /// Produces the response for `error`, raised while serving `head`.
    fn respond(&self, head: &RequestHead, error: BoxError) -> Response;
}

impl<F> ErrorResponder for F
where
    F: Fn(&RequestHead, BoxError) -> Response + Send + Sync + 'static,
{
    fn respond(&self, head: &RequestHead, error: BoxError) -> Response {
        self(head, error)
    }
}

/// Marker placed in the extensions of a response produced by the last-resort
/// handler. Carries the rendered error so later layers (request logging) can
/// report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandledError(pub String);

/// The responder used when none is configured.
///
/// Logs the error and answers with a JSON error envelope. The status comes
/// from the first [`HttpError`] in the error chain, or 500 when there is none.
/// Messages of 4xx errors are passed through; 5xx responses carry a generic
/// message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorResponder;

impl ErrorResponder for DefaultErrorResponder {
    fn respond(&self, head: &RequestHead, error: BoxError) -> Response {
        let (status, code, message) = match HttpError::find(error.as_ref()) {
            Some(http) if http.status().is_server_error() => {
                (http.status(), http.code().to_string(), INTERNAL_MESSAGE.to_string())
            }
            Some(http) => (
                http.status(),
                http.code().to_string(),
                http.message().to_string(),
            ),
            None => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR".to_string(),
                INTERNAL_MESSAGE.to_string(),
            ),
        };

        let chain = error_chain(error.as_ref());
        if status.is_server_error() {
            tracing::error!(
                http.method = %head.method,
                http.path = %head.path(),
                http.status_code = status.as_u16(),
                error = %chain,
                "Unhandled handler error"
            );
        } else {
            tracing::debug!(
                http.method = %head.method,
                http.path = %head.path(),
                http.status_code = status.as_u16(),
                error = %chain,
                "Handler returned client error"
            );
        }

        Response::json_error(status, &code, &message)
    }
}

/// Renders an error and its sources as `outer: inner: root`.
pub fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut current = error.source();
    while let Some(err) = current {
        rendered.push_str(": ");
        rendered.push_str(&err.to_string());
        current = err.source();
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::Method;
    use http_body_util::BodyExt;

    fn head() -> RequestHead {
        let request = http::Request::builder()
            .method(Method::GET)
            .uri("/widgets/7")
            .body(Bytes::new())
            .unwrap();
        RequestHead::from_request(&request)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_default_uses_http_error_status() {
        let err: BoxError = Box::new(HttpError::not_found("widget 7 not found"));
        let response = DefaultErrorResponder.respond(&head(), err);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "widget 7 not found");
    }

    #[tokio::test]
    async fn test_default_hides_internal_details() {
        let err: BoxError = "connection pool exhausted".into();
        let response = DefaultErrorResponder.respond(&head(), err);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_default_hides_5xx_http_error_message() {
        let err: BoxError = Box::new(
            HttpError::new(StatusCode::BAD_GATEWAY, "upstream db-3 refused"),
        );
        let response = DefaultErrorResponder.respond(&head(), err);

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "BAD_GATEWAY");
        assert_eq!(body["error"]["message"], INTERNAL_MESSAGE);
    }

    #[test]
    fn test_closure_responder() {
        let responder = |head: &RequestHead, err: BoxError| {
            Response::text(StatusCode::SERVICE_UNAVAILABLE, format!("{} {}", head.path(), err))
        };
        let response = responder.respond(&head(), "down".into());
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_error_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = HttpError::internal("save failed").with_source(io);
        assert_eq!(error_chain(&err), "save failed: socket closed");
    }
}
