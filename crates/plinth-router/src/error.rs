//! Route registration errors.

use http::Method;
use thiserror::Error;

/// Errors raised while registering a route.
///
/// All of these are programming errors in the route table, so they surface
/// at registration time rather than when a request arrives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// Pattern does not start with `/`.
    #[error("route pattern must start with '/': {pattern}")]
    MissingLeadingSlash {
        /// The rejected pattern.
        pattern: String,
    },

    /// A segment has unbalanced braces or an empty name.
    #[error("invalid segment {segment:?} in route pattern {pattern}")]
    InvalidSegment {
        /// The rejected pattern.
        pattern: String,
        /// The offending segment.
        segment: String,
    },

    /// Two parameters share a name.
    #[error("duplicate parameter {name:?} in route pattern {pattern}")]
    DuplicateParam {
        /// The rejected pattern.
        pattern: String,
        /// The repeated name.
        name: String,
    },

    /// A catch-all segment is followed by more segments.
    #[error("catch-all must be the last segment in route pattern {pattern}")]
    CatchAllNotLast {
        /// The rejected pattern.
        pattern: String,
    },

    /// The same method and pattern shape is already registered.
    #[error("route {method} {pattern} is already registered")]
    Duplicate {
        /// Method of the conflicting route.
        method: Method,
        /// The rejected pattern.
        pattern: String,
    },
}
