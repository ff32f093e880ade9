use http::{HeaderMap, Method, Uri, Version};

use crate::types::Request;

/// Snapshot of a request's head, taken before the request is handed to a
/// handler.
///
/// Handlers consume their request, so the last-resort error handler works
/// from this copy when it has to describe what failed.
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// Request method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// HTTP version.
    pub version: Version,
    /// Request headers.
    pub headers: HeaderMap,
}

impl RequestHead {
    /// Copies the head of `request`.
    pub fn from_request(request: &Request) -> Self {
        Self {
            method: request.method().clone(),
            uri: request.uri().clone(),
            version: request.version(),
            headers: request.headers().clone(),
        }
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }
}
