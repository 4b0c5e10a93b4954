//! Case-insensitive HTTP header map.
//!
//! Header names compare case-insensitively while insertion order is
//! preserved, so a cached response replays its headers exactly as the
//! upstream sent them.

use std::fmt;

/// An order-preserving, case-insensitive, multi-value header map.
///
/// Cached [`ResponseRecord`](crate::store::ResponseRecord)s snapshot headers
/// through [`Headers::to_pairs`] and rebuild them with [`Headers::from_pairs`],
/// so the map is deliberately a plain list of owned pairs.
///
/// # Examples
///
/// ```
/// use offcache::http::Headers;
///
/// let mut headers = Headers::new();
/// headers.append("Content-Type", "application/json");
/// headers.append("X-Trace", "a");
/// headers.append("X-Trace", "b");
///
/// assert_eq!(headers.first("content-type"), Some("application/json"));
/// assert_eq!(headers.all("x-trace").collect::<Vec<_>>(), vec!["a", "b"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    pairs: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a header map from snapshotted `(name, value)` pairs.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// Appends a header entry; repeated names accumulate.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((name.into(), value.into()));
    }

    /// Returns the first value for `name` (case-insensitive), or `None`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns all values for `name` (case-insensitive) in insertion order.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Removes every entry named `name` (case-insensitive).
    ///
    /// Returns `true` if anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.pairs.len();
        self.pairs.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.pairs.len() < before
    }

    /// Returns `true` if at least one entry named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Total number of entries (not unique names).
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates over all `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Clones the entries into owned pairs for storage in a cache record.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.pairs.clone()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.pairs {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut h = Headers::new();
        h.append("ETag", "\"abc\"");
        assert_eq!(h.first("etag"), Some("\"abc\""));
        assert_eq!(h.first("ETAG"), Some("\"abc\""));
    }

    #[test]
    fn repeated_names_accumulate_in_order() {
        let mut h = Headers::new();
        h.append("Set-Cookie", "a=1");
        h.append("Set-Cookie", "b=2");
        assert_eq!(h.all("set-cookie").collect::<Vec<_>>(), vec!["a=1", "b=2"]);
    }

    #[test]
    fn pairs_round_trip() {
        let h: Headers = [("Content-Type", "text/html"), ("X-Gen", "asset-v1")]
            .into_iter()
            .collect();
        let rebuilt = Headers::from_pairs(h.to_pairs());
        assert_eq!(rebuilt, h);
    }

    #[test]
    fn remove_drops_every_occurrence() {
        let mut h = Headers::new();
        h.append("X-Foo", "1");
        h.append("x-foo", "2");
        assert!(h.remove("X-FOO"));
        assert!(h.is_empty());
        assert!(!h.remove("x-foo"));
    }
}
