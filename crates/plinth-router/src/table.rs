//! Route table: pattern parsing, validation and matching.
//!
//! Routes are kept in registration order. A lookup collects every route whose
//! pattern matches the path and picks the most specific one, comparing
//! segment by segment: a literal beats a parameter, a parameter beats a
//! catch-all, and a shorter pattern beats a longer one that only adds a
//! catch-all. Ties keep registration order.

use std::borrow::Cow;
use std::cmp::Ordering;

use http::Method;

use crate::error::RouteError;
use crate::params::Params;

/// Kind of a pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Literal text (e.g. `users`).
    Static(String),
    /// Named parameter (e.g. `{id}`), matches exactly one segment.
    Param(String),
    /// Catch-all (e.g. `{*rest}`), matches the remaining segments.
    CatchAll(String),
}

impl SegmentKind {
    const fn rank(&self) -> u8 {
        match self {
            Self::Static(_) => 0,
            Self::Param(_) => 1,
            Self::CatchAll(_) => 2,
        }
    }

    /// Two segments with the same shape match exactly the same paths.
    fn same_shape(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Static(a), Self::Static(b)) => a == b,
            (Self::Param(_), Self::Param(_)) | (Self::CatchAll(_), Self::CatchAll(_)) => true,
            _ => false,
        }
    }
}

/// A parsed and validated route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: String,
    segments: Vec<SegmentKind>,
}

impl Pattern {
    /// Parses `raw`, rejecting malformed patterns.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] describing the first problem found.
    pub fn parse(raw: &str) -> Result<Self, RouteError> {
        if !raw.starts_with('/') {
            return Err(RouteError::MissingLeadingSlash {
                pattern: raw.to_string(),
            });
        }

        let mut segments: Vec<SegmentKind> = Vec::new();
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            if matches!(segments.last(), Some(SegmentKind::CatchAll(_))) {
                return Err(RouteError::CatchAllNotLast {
                    pattern: raw.to_string(),
                });
            }

            let kind = parse_segment(raw, segment)?;
            if let Some(name) = kind_name(&kind) {
                if segments.iter().any(|seen| kind_name(seen) == Some(name)) {
                    return Err(RouteError::DuplicateParam {
                        pattern: raw.to_string(),
                        name: name.to_string(),
                    });
                }
            }
            segments.push(kind);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[SegmentKind] {
        &self.segments
    }

    /// Matches already split, non-empty path segments.
    ///
    /// Literals compare against the raw segment text. Captured values are
    /// percent-decoded; a value that does not decode to UTF-8 is kept raw. A
    /// catch-all captures the remaining segments joined with `/`, possibly
    /// empty.
    #[must_use]
    pub fn matches(&self, path: &[&str]) -> Option<Params> {
        let mut params = Params::new();
        for (index, kind) in self.segments.iter().enumerate() {
            match kind {
                SegmentKind::CatchAll(name) => {
                    let rest = path.get(index..).unwrap_or_default().join("/");
                    params.push(name.as_str(), decode(&rest));
                    return Some(params);
                }
                SegmentKind::Static(text) => {
                    if path.get(index) != Some(&text.as_str()) {
                        return None;
                    }
                }
                SegmentKind::Param(name) => {
                    params.push(name.as_str(), decode(path.get(index)?));
                }
            }
        }
        (path.len() == self.segments.len()).then_some(params)
    }

    /// Orders patterns most specific first.
    fn specificity(&self, other: &Self) -> Ordering {
        let ours = self.segments.iter().map(SegmentKind::rank);
        let theirs = other.segments.iter().map(SegmentKind::rank);
        ours.cmp(theirs)
    }

    fn same_shape(&self, other: &Self) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|(a, b)| a.same_shape(b))
    }
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), Cow::into_owned)
}

fn parse_segment(pattern: &str, segment: &str) -> Result<SegmentKind, RouteError> {
    let invalid = || RouteError::InvalidSegment {
        pattern: pattern.to_string(),
        segment: segment.to_string(),
    };

    if !segment.contains(['{', '}']) {
        return Ok(SegmentKind::Static(segment.to_string()));
    }

    let inner = segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(invalid)?;

    let (name, catch_all) = match inner.strip_prefix('*') {
        Some(name) => (name, true),
        None => (inner, false),
    };

    if name.is_empty() || name.contains(['{', '}', '*']) {
        return Err(invalid());
    }

    Ok(if catch_all {
        SegmentKind::CatchAll(name.to_string())
    } else {
        SegmentKind::Param(name.to_string())
    })
}

fn kind_name(kind: &SegmentKind) -> Option<&str> {
    match kind {
        SegmentKind::Static(_) => None,
        SegmentKind::Param(name) | SegmentKind::CatchAll(name) => Some(name),
    }
}

/// Result of a table lookup.
#[derive(Debug)]
pub enum Lookup<'a, T> {
    /// A route matched both path and method.
    Found(&'a T, Params),
    /// The path matched, but not for this method.
    MethodNotAllowed(Vec<Method>),
    /// No pattern matched the path.
    NotFound,
}

#[derive(Debug)]
struct Route<T> {
    method: Method,
    pattern: Pattern,
    value: T,
}

/// Method + pattern → value table.
#[derive(Debug)]
pub struct RouteTable<T> {
    routes: Vec<Route<T>>,
}

impl<T> Default for RouteTable<T> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<T> RouteTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` for `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// Fails when the pattern is malformed or a route with the same method
    /// and pattern shape exists. `/users/{id}` and `/users/{uid}` have the
    /// same shape.
    pub fn insert(&mut self, method: Method, pattern: &str, value: T) -> Result<(), RouteError> {
        let pattern = Pattern::parse(pattern)?;

        if self
            .routes
            .iter()
            .any(|route| route.method == method && route.pattern.same_shape(&pattern))
        {
            return Err(RouteError::Duplicate {
                method,
                pattern: pattern.raw,
            });
        }

        self.routes.push(Route {
            method,
            pattern,
            value,
        });
        Ok(())
    }

    /// Finds the entry for `method` and `path`.
    ///
    /// `HEAD` falls back to a `GET` route when no `HEAD` route matches.
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<'_, T> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let matched: Vec<(&Route<T>, Params)> = self
            .routes
            .iter()
            .filter_map(|route| route.pattern.matches(&segments).map(|params| (route, params)))
            .collect();

        if matched.is_empty() {
            return Lookup::NotFound;
        }

        let best = best_for(&matched, method).or_else(|| {
            (*method == Method::HEAD)
                .then(|| best_for(&matched, &Method::GET))
                .flatten()
        });

        if let Some(index) = best {
            let mut matched = matched;
            let (route, params) = matched.swap_remove(index);
            return Lookup::Found(&route.value, params);
        }

        let mut allowed: Vec<Method> = Vec::new();
        for (route, _) in &matched {
            if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }
        }
        if allowed.contains(&Method::GET) && !allowed.contains(&Method::HEAD) {
            allowed.push(Method::HEAD);
        }
        Lookup::MethodNotAllowed(allowed)
    }

    /// Returns `(method, pattern)` for every route, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes
            .iter()
            .map(|route| (&route.method, route.pattern.as_str()))
    }

    /// Returns the number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no route is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Index of the most specific match for `method`; the earliest wins a tie.
fn best_for<T>(matched: &[(&Route<T>, Params)], method: &Method) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, (route, _)) in matched.iter().enumerate() {
        if route.method != *method {
            continue;
        }
        best = match best {
            Some(current)
                if matched[current].0.pattern.specificity(&route.pattern) != Ordering::Greater =>
            {
                Some(current)
            }
            _ => Some(index),
        };
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(routes: &[(Method, &str)]) -> RouteTable<usize> {
        let mut table = RouteTable::new();
        for (index, (method, pattern)) in routes.iter().enumerate() {
            table.insert(method.clone(), pattern, index).unwrap();
        }
        table
    }

    fn found(table: &RouteTable<usize>, method: Method, path: &str) -> (usize, Params) {
        match table.lookup(&method, path) {
            Lookup::Found(value, params) => (*value, params),
            other => panic!("expected a match for {method} {path}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_segments() {
        let pattern = Pattern::parse("/files/{id}/raw/{*rest}").unwrap();
        assert_eq!(
            pattern.segments(),
            &[
                SegmentKind::Static("files".to_string()),
                SegmentKind::Param("id".to_string()),
                SegmentKind::Static("raw".to_string()),
                SegmentKind::CatchAll("rest".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            Pattern::parse("users"),
            Err(RouteError::MissingLeadingSlash { .. })
        ));
        assert!(matches!(
            Pattern::parse("/users/{id"),
            Err(RouteError::InvalidSegment { .. })
        ));
        assert!(matches!(
            Pattern::parse("/users/{}"),
            Err(RouteError::InvalidSegment { .. })
        ));
        assert!(matches!(
            Pattern::parse("/users/{*}"),
            Err(RouteError::InvalidSegment { .. })
        ));
        assert!(matches!(
            Pattern::parse("/a/{id}/b/{id}"),
            Err(RouteError::DuplicateParam { .. })
        ));
        assert!(matches!(
            Pattern::parse("/a/{*rest}/b"),
            Err(RouteError::CatchAllNotLast { .. })
        ));
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let mut table = build(&[(Method::GET, "/users/{id}")]);
        let err = table.insert(Method::GET, "/users/{uid}", 9).unwrap_err();
        assert!(matches!(err, RouteError::Duplicate { .. }));

        table.insert(Method::POST, "/users/{id}", 1).unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_static_and_params() {
        let table = build(&[(Method::GET, "/users"), (Method::GET, "/users/{id}")]);

        assert_eq!(found(&table, Method::GET, "/users").0, 0);

        let (value, params) = found(&table, Method::GET, "/users/42");
        assert_eq!(value, 1);
        assert_eq!(params.get("id"), Some("42"));
    }

    #[test]
    fn test_empty_segments_ignored() {
        let table = build(&[(Method::GET, "/a/b")]);
        assert_eq!(found(&table, Method::GET, "/a//b/").0, 0);
    }

    #[test]
    fn test_literal_beats_param_regardless_of_order() {
        let table = build(&[(Method::GET, "/users/{id}"), (Method::GET, "/users/me")]);

        assert_eq!(found(&table, Method::GET, "/users/me").0, 1);
        assert_eq!(found(&table, Method::GET, "/users/you").0, 0);
    }

    #[test]
    fn test_param_beats_catch_all() {
        let table = build(&[
            (Method::GET, "/files/{*path}"),
            (Method::GET, "/files/{name}"),
            (Method::GET, "/files"),
        ]);

        assert_eq!(found(&table, Method::GET, "/files/a.txt").0, 1);
        assert_eq!(found(&table, Method::GET, "/files").0, 2);

        let (value, params) = found(&table, Method::GET, "/files/a/b/c.txt");
        assert_eq!(value, 0);
        assert_eq!(params.get("path"), Some("a/b/c.txt"));
    }

    #[test]
    fn test_earlier_segment_decides() {
        let table = build(&[(Method::GET, "/{kind}/new"), (Method::GET, "/users/{id}")]);
        // Literal in the first segment outranks literal in the second.
        assert_eq!(found(&table, Method::GET, "/users/new").0, 1);
    }

    #[test]
    fn test_later_literal_breaks_param_tie() {
        let table = build(&[(Method::GET, "/{a}/{b}"), (Method::GET, "/{a}/x")]);
        assert_eq!(found(&table, Method::GET, "/q/x").0, 1);
        assert_eq!(found(&table, Method::GET, "/q/y").0, 0);
    }

    #[test]
    fn test_method_not_allowed_lists_methods() {
        let table = build(&[
            (Method::GET, "/users/{id}"),
            (Method::DELETE, "/users/{id}"),
        ]);

        match table.lookup(&Method::PUT, "/users/1") {
            Lookup::MethodNotAllowed(allowed) => {
                assert_eq!(allowed, vec![Method::GET, Method::DELETE, Method::HEAD]);
            }
            other => panic!("expected 405, got {other:?}"),
        }
    }

    #[test]
    fn test_not_found() {
        let table = build(&[(Method::GET, "/users")]);
        assert!(matches!(
            table.lookup(&Method::GET, "/orders"),
            Lookup::NotFound
        ));
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let table = build(&[(Method::GET, "/health")]);
        assert_eq!(found(&table, Method::HEAD, "/health").0, 0);

        let table = build(&[(Method::GET, "/health"), (Method::HEAD, "/health")]);
        assert_eq!(found(&table, Method::HEAD, "/health").0, 1);
    }

    #[test]
    fn test_routes_in_registration_order() {
        let table = build(&[(Method::POST, "/b"), (Method::GET, "/a")]);
        let listed: Vec<_> = table.routes().collect();
        assert_eq!(listed, vec![(&Method::POST, "/b"), (&Method::GET, "/a")]);
    }

    #[test]
    fn test_captured_values_are_percent_decoded() {
        let table = build(&[(Method::GET, "/users/{name}"), (Method::GET, "/files/{*path}")]);

        let (_, params) = found(&table, Method::GET, "/users/a%20b");
        assert_eq!(params.get("name"), Some("a b"));

        let (_, params) = found(&table, Method::GET, "/files/docs/caf%C3%A9.md");
        assert_eq!(params.get("path"), Some("docs/café.md"));

        // Not valid UTF-8 once decoded.
        let (_, params) = found(&table, Method::GET, "/users/%FF");
        assert_eq!(params.get("name"), Some("%FF"));
    }

    #[test]
    fn test_literals_match_raw_text() {
        let table = build(&[(Method::GET, "/a b")]);
        assert!(matches!(table.lookup(&Method::GET, "/a%20b"), Lookup::NotFound));
    }
}
