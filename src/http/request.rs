//! Intercepted request representation.
//!
//! Hosts usually hand the proxy a [`Request`] they built themselves, but
//! hosts that sit directly on a wire can parse raw HTTP/1.x bytes with
//! [`Request::parse`] (backed by the [`httparse`] crate).

use std::fmt;

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method};

/// Errors that can occur while parsing an intercepted HTTP/1.x request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete — more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
}

/// A request intercepted on its way to the network.
///
/// The `target` is the origin-relative request target (path plus optional
/// query); the proxy never needs a scheme or authority because it sits on
/// the client side of the connection.
///
/// # Examples
///
/// ```
/// use offcache::http::{Method, Request};
///
/// let request = Request::get("/api/cases?page=2");
/// assert_eq!(request.method(), &Method::Get);
/// assert_eq!(request.path(), "/api/cases");
/// assert_eq!(request.query_string(), Some("page=2"));
/// ```
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    target: String,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Maximum number of headers accepted when parsing from raw bytes.
    const MAX_HEADERS: usize = 64;

    /// Creates a request with the given method and origin-relative target.
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// Shorthand for a GET request, the common case for interception.
    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::Get, target)
    }

    /// Appends a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Parse a raw HTTP/1.x request head from a byte slice.
    ///
    /// Returns the parsed `Request` and the byte offset at which the body
    /// begins (immediately after the `\r\n\r\n` terminator); everything past
    /// the offset is captured as the body.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`] — the head is not fully buffered yet.
    /// - [`RequestError::Parse`] — the data is malformed.
    /// - [`RequestError::MissingField`] — method or target is absent.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw = httparse::Request::new(&mut headers);

        let body_offset = match raw.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method: Method = raw
            .method
            .ok_or(RequestError::MissingField { field: "method" })?
            .parse()
            .unwrap(); // Infallible

        let target = raw
            .path
            .ok_or(RequestError::MissingField { field: "target" })?
            .to_owned();

        let mut header_map = Headers::new();
        for header in raw.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.append(header.name, value);
            }
        }

        Ok((
            Self {
                method,
                target,
                headers: header_map,
                body: Bytes::copy_from_slice(&buf[body_offset..]),
            },
            body_offset,
        ))
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the raw request target (path plus optional query and fragment).
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the path component of the target (no query, no fragment).
    pub fn path(&self) -> &str {
        let end = self
            .target
            .find(['?', '#'])
            .unwrap_or(self.target.len());
        &self.target[..end]
    }

    /// Returns the query string (without the leading `?`), if any.
    pub fn query_string(&self) -> Option<&str> {
        let start = self.target.find('?')? + 1;
        let rest = &self.target[start..];
        let end = rest.find('#').unwrap_or(rest.len());
        Some(&rest[..end])
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the request body bytes.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Returns the normalized target used for cache identity.
    ///
    /// The fragment is dropped (it never reaches the network) and a trailing
    /// slash on the path is folded, so `/about/` and `/about` share one cache
    /// entry. The query string is preserved verbatim; `/api/cases?page=2` is
    /// a different resource from `/api/cases`.
    pub fn normalized_target(&self) -> String {
        let path = self.path();
        let path = if path != "/" && path.ends_with('/') {
            &path[..path.len() - 1]
        } else {
            path
        };
        match self.query_string() {
            Some(q) if !q.is_empty() => format!("{path}?{q}"),
            _ => path.to_owned(),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_method_and_target() {
        let r = Request::new(Method::Post, "/api/denuncias").header("Accept", "application/json");
        assert_eq!(r.method(), &Method::Post);
        assert_eq!(r.path(), "/api/denuncias");
        assert_eq!(r.headers().first("accept"), Some("application/json"));
    }

    #[test]
    fn parse_simple_get() {
        let raw = b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, offset) = Request::parse(raw).unwrap();
        assert_eq!(req.method().as_str(), "GET");
        assert_eq!(req.path(), "/index.html");
        assert_eq!(req.headers().first("host"), Some("localhost"));
        assert_eq!(offset, raw.len()); // no body
    }

    #[test]
    fn parse_incomplete_head() {
        let raw = b"GET / HTTP/1.1\r\nHost:";
        assert!(matches!(Request::parse(raw), Err(RequestError::Incomplete)));
    }

    #[test]
    fn query_and_fragment_split() {
        let r = Request::get("/search?q=amparo#top");
        assert_eq!(r.path(), "/search");
        assert_eq!(r.query_string(), Some("q=amparo"));
    }

    #[test]
    fn normalization_folds_trailing_slash_and_fragment() {
        assert_eq!(Request::get("/about/").normalized_target(), "/about");
        assert_eq!(Request::get("/about#team").normalized_target(), "/about");
        assert_eq!(Request::get("/").normalized_target(), "/");
    }

    #[test]
    fn normalization_preserves_query() {
        assert_eq!(
            Request::get("/api/cases?page=2").normalized_target(),
            "/api/cases?page=2"
        );
    }
}
