//! Response representation, fresh from the network or replayed from cache.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Headers, StatusCode};

/// How the response reached the proxy.
///
/// Mirrors the distinction browsers make between readable responses, opaque
/// cross-origin responses, and synthesized network-error responses. Only
/// [`ResponseKind::Basic`] responses are eligible for caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseKind {
    /// A readable response from the origin.
    #[default]
    Basic,
    /// An opaque response whose status and body cannot be inspected.
    Opaque,
    /// A response synthesized to represent a network-level error.
    Error,
}

/// A response flowing back to the host, either fresh or replayed from cache.
///
/// Cloning is cheap: the body is a [`Bytes`] handle, so clones share the
/// underlying buffer. The caching strategies rely on this to store a clone
/// while handing the original back to the caller.
///
/// # Examples
///
/// ```
/// use offcache::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::OK)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// assert!(response.status().is_success());
/// assert_eq!(response.body_bytes().as_ref(), br#"{"status":"ok"}"#);
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
    kind: ResponseKind,
}

impl Response {
    /// Creates a response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
            kind: ResponseKind::Basic,
        }
    }

    /// Creates a synthesized network-error response (status 0 semantics).
    ///
    /// Strategies never cache these and pass them through unchanged.
    pub fn network_error() -> Self {
        Self {
            status: StatusCode::from(0),
            headers: Headers::new(),
            body: Bytes::new(),
            kind: ResponseKind::Error,
        }
    }

    /// Appends a response header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the full header map, used when replaying a cached record.
    #[must_use]
    pub fn headers_from(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the response body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Marks the response as opaque or error-kinded.
    #[must_use]
    pub fn kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the body bytes.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Returns how this response reached the proxy.
    pub fn response_kind(&self) -> ResponseKind {
        self.kind
    }

    /// Serializes the response into HTTP/1.1 wire format for byte-level hosts.
    ///
    /// Headers are replayed verbatim; `Content-Length` is always written last
    /// before the blank line. Unknown status codes are written with an empty
    /// reason phrase.
    pub fn into_bytes(self) -> BytesMut {
        let content_length = self.body.len();
        let estimated = 64 + self.headers.len() * 48 + content_length;
        let mut buf = BytesMut::with_capacity(estimated);

        let reason = self.status.canonical_reason().unwrap_or("");
        buf.put(format!("HTTP/1.1 {} {}\r\n", self.status.as_u16(), reason).as_bytes());

        for (name, value) in self.headers.iter() {
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            buf.put(format!("{name}: {value}\r\n").as_bytes());
        }
        buf.put(format!("Content-Length: {content_length}\r\n\r\n").as_bytes());

        if !self.body.is_empty() {
            buf.put(self.body);
        }

        buf
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}
