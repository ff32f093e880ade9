//! JSON request bodies.
//!
//! The functions here work on the already buffered request body, so they are
//! synchronous and can be called at any point in a handler.

use std::ops::Deref;

use http::StatusCode;
use plinth_core::{HttpError, Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::JsonError;
use crate::response::JsonResponse;

/// Default maximum body size for JSON decoding (1 MiB).
pub const DEFAULT_JSON_LIMIT: usize = 1024 * 1024;

/// Decodes `bytes` as JSON into `T`.
///
/// # Errors
///
/// Returns [`JsonError::EmptyBody`] for an empty slice and a classified
/// [`JsonError`] when deserialization fails.
pub fn decode_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, JsonError> {
    if bytes.is_empty() {
        return Err(JsonError::EmptyBody);
    }
    serde_json::from_slice(bytes).map_err(JsonError::decode)
}

/// Decodes the request body, refusing bodies over 1 MiB.
///
/// # Errors
///
/// Returns an [`HttpError`] with status 400 or 413, ready to be propagated
/// with `?` from an error-returning handler.
///
/// # Example
///
/// ```rust
/// use plinth_core::{HttpError, Request, Response, ResponseExt};
/// use plinth_extract::read_json;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct CreateUser {
///     name: String,
/// }
///
/// async fn create(req: Request) -> Result<Response, HttpError> {
///     let user: CreateUser = read_json(&req)?;
///     Ok(Response::text(http::StatusCode::CREATED, user.name))
/// }
/// # let _ = plinth_core::boxed_try(create);
/// ```
pub fn read_json<T: DeserializeOwned>(request: &Request) -> Result<T, HttpError> {
    read_json_with_limit(request, DEFAULT_JSON_LIMIT)
}

/// Decodes the request body with a custom size limit.
///
/// # Errors
///
/// See [`read_json`].
pub fn read_json_with_limit<T: DeserializeOwned>(
    request: &Request,
    limit: usize,
) -> Result<T, HttpError> {
    let body = request.body();
    if body.len() > limit {
        return Err(JsonError::PayloadTooLarge {
            limit,
            actual: body.len(),
        }
        .into());
    }
    Ok(decode_json(body)?)
}

/// A JSON value travelling in a request or a response.
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use plinth_extract::Json;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let request = http::Request::builder()
///     .method("POST")
///     .uri("/points")
///     .body(Bytes::from_static(br#"{"x": 1, "y": 2}"#))
///     .unwrap();
///
/// let Json(point) = Json::<Point>::from_request(&request).unwrap();
/// assert_eq!((point.x, point.y), (1, 2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Consumes the wrapper and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: DeserializeOwned> Json<T> {
    /// Decodes the request body. Same limits as [`read_json`].
    ///
    /// # Errors
    ///
    /// See [`read_json`].
    pub fn from_request(request: &Request) -> Result<Self, HttpError> {
        read_json(request).map(Json)
    }
}

impl<T: Serialize> Json<T> {
    /// Encodes the value as a `200 OK` JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`JsonError::Encode`] if serialization fails.
    pub fn into_response(self) -> Result<Response, JsonError> {
        JsonResponse::new(self.0).into_response()
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> From<T> for Json<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

/// Encodes `value` as a JSON response with `status`.
///
/// # Errors
///
/// Returns a 500 [`HttpError`] if serialization fails.
pub fn write_json<T: Serialize>(status: StatusCode, value: &T) -> Result<Response, HttpError> {
    Ok(JsonResponse::new(value).with_status(status).into_response()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: u32,
    }

    fn request(body: &'static [u8]) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/users")
            .body(Bytes::from_static(body))
            .unwrap()
    }

    #[test]
    fn test_decode_valid() {
        let user: User = decode_json(br#"{"name":"Alice","age":30}"#).unwrap();
        assert_eq!(
            user,
            User {
                name: "Alice".to_string(),
                age: 30
            }
        );
    }

    #[test]
    fn test_decode_classifies_failures() {
        assert!(matches!(decode_json::<User>(b""), Err(JsonError::EmptyBody)));
        assert!(matches!(
            decode_json::<User>(b"{not json}"),
            Err(JsonError::Syntax(_))
        ));
        assert!(matches!(
            decode_json::<User>(br#"{"name":"Alice""#),
            Err(JsonError::Eof(_))
        ));
        assert!(matches!(
            decode_json::<User>(br#"{"name":"Alice","age":"old"}"#),
            Err(JsonError::Data(_))
        ));
    }

    #[test]
    fn test_read_json_maps_to_http_error() {
        let err = read_json::<User>(&request(b"[1,2")).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_JSON");

        let err = read_json::<User>(&request(b"")).unwrap_err();
        assert_eq!(err.code(), "EMPTY_BODY");
    }

    #[test]
    fn test_read_json_with_limit() {
        let body = br#"{"name":"Alice","age":30}"#;
        let err = read_json_with_limit::<User>(&request(body), 8).unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let user = read_json_with_limit::<User>(&request(body), body.len()).unwrap();
        assert_eq!(user.age, 30);
    }

    #[test]
    fn test_json_extractor() {
        let Json(user) = Json::<User>::from_request(&request(br#"{"name":"Bob","age":5}"#)).unwrap();
        assert_eq!(user.name, "Bob");
    }

    #[test]
    fn test_write_json() {
        let response = write_json(StatusCode::ACCEPTED, &serde_json::json!({"ok": true})).unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
