//! JSON response builder.

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use plinth_core::{Body, Response};
use serde::Serialize;

use crate::error::JsonError;

/// JSON response builder.
///
/// Creates a response with `Content-Type: application/json` and the value
/// serialized as the body.
///
/// # Example
///
/// ```rust
/// use plinth_extract::JsonResponse;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Created {
///     id: u64,
/// }
///
/// let response = JsonResponse::created(Created { id: 7 })
///     .with_header(http::header::LOCATION, http::HeaderValue::from_static("/things/7"))
///     .into_response()
///     .unwrap();
///
/// assert_eq!(response.status(), http::StatusCode::CREATED);
/// assert_eq!(response.headers()["location"], "/things/7");
/// ```
#[derive(Debug)]
pub struct JsonResponse<T> {
    data: T,
    status: StatusCode,
    headers: HeaderMap,
}

impl<T: Serialize> JsonResponse<T> {
    /// Creates a JSON response with status 200 OK.
    #[must_use]
    pub fn new(data: T) -> Self {
        Self {
            data,
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        }
    }

    /// Creates a JSON response with status 201 Created.
    #[must_use]
    pub fn created(data: T) -> Self {
        Self::new(data).with_status(StatusCode::CREATED)
    }

    /// Sets a custom status code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a response header. `Content-Type` is always `application/json`.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns a reference to the data.
    #[must_use]
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Builds the HTTP response.
    ///
    /// # Errors
    ///
    /// Returns [`JsonError::Encode`] if serialization fails.
    pub fn into_response(self) -> Result<Response, JsonError> {
        let body = serde_json::to_vec(&self.data).map_err(JsonError::Encode)?;

        let mut response = Response::new(Body::new(Bytes::from(body)));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(response)
    }
}
