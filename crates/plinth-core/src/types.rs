//! Common request and response types.
//!
//! Requests reach handlers with their body already buffered, so a handler can
//! read `request.body()` without awaiting. Responses carry a `Full<Bytes>`
//! body that hyper can write directly.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;

/// Response body type.
pub type Body = Full<Bytes>;

/// The HTTP request type seen by handlers and middleware.
pub type Request = http::Request<Bytes>;

/// The HTTP response type produced by handlers and middleware.
pub type Response = http::Response<Body>;

/// A boxed, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Infallible response constructors.
pub trait ResponseExt {
    /// Creates a plain-text response.
    fn text(status: StatusCode, body: impl Into<String>) -> Response;

    /// Creates a JSON error envelope: `{"error":{"code":..,"message":..}}`.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;

    /// Creates a response with no body.
    fn empty(status: StatusCode) -> Response;
}

impl ResponseExt for Response {
    fn text(status: StatusCode, body: impl Into<String>) -> Response {
        let mut response = Response::new(Full::new(Bytes::from(body.into())));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });

        let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    fn empty(status: StatusCode) -> Response {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    }
}
