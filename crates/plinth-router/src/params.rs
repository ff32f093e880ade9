//! Path parameter storage.
//!
//! Parameters live in a small vector so the common case of a handful of
//! parameters never allocates for the list itself.

use plinth_core::Request;
use smallvec::SmallVec;

/// Maximum number of parameters stored inline.
const INLINE_PARAMS: usize = 4;

/// Path parameters captured by a route match, in pattern order.
///
/// The router inserts a `Params` into the request extensions before the
/// handler runs, even when the pattern has no parameters.
///
/// # Example
///
/// ```rust
/// use plinth_router::Params;
///
/// let mut params = Params::new();
/// params.push("user_id", "123");
/// params.push("action", "view");
///
/// assert_eq!(params.get("user_id"), Some("123"));
/// assert_eq!(params.get("action"), Some("view"));
/// assert_eq!(params.get("unknown"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Params {
    inner: SmallVec<[(String, String); INLINE_PARAMS]>,
}

impl Params {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value for a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns an iterator over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, String)>,
        fn(&'a (String, String)) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

/// Access to the path parameters the router stored on a request.
pub trait RequestParamsExt {
    /// Returns every captured parameter, if the request went through a router.
    fn params(&self) -> Option<&Params>;

    /// Returns a single parameter value.
    fn param(&self, name: &str) -> Option<&str> {
        self.params().and_then(|params| params.get(name))
    }
}

impl RequestParamsExt for Request {
    fn params(&self) -> Option<&Params> {
        self.extensions().get::<Params>()
    }
}
