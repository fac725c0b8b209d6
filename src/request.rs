//! Incoming HTTP request type.

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

/// The request body as captured at the server edge.
///
/// Bodies are buffered in full before dispatch so middleware can read them
/// without consuming what handlers receive. If the stream dies mid-body it
/// cannot be replayed; `Unreadable` records that outcome instead of aborting
/// the request.
#[derive(Clone, Debug)]
pub(crate) enum Body {
    Buffered(Bytes),
    Unreadable,
}

/// An incoming HTTP request.
///
/// The body is fully buffered: [`Request::body`] returns the same bytes no
/// matter how many times it is called, and the slice every middleware sees is
/// byte-identical to the one the handler sees.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Body,
    pub(crate) remote_addr: SocketAddr,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Body,
        remote_addr: SocketAddr,
    ) -> Self {
        Self { method, uri, headers, body, remote_addr, params: HashMap::new() }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }

    /// The raw query component, without the leading `?`.
    pub fn query(&self) -> Option<&str> { self.uri.query() }

    pub fn headers(&self) -> &HeaderMap { &self.headers }

    /// Case-insensitive header lookup. Returns `None` for absent headers and
    /// for values that are not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The buffered request body. Empty if the client sent no body or the
    /// stream failed while buffering (see [`Request::body_unreadable`]).
    pub fn body(&self) -> &[u8] {
        match &self.body {
            Body::Buffered(bytes) => bytes,
            Body::Unreadable => &[],
        }
    }

    /// True when the body stream failed while being buffered at the server
    /// edge. Handlers still run; they observe an empty body.
    pub fn body_unreadable(&self) -> bool {
        matches!(self.body, Body::Unreadable)
    }

    /// The peer socket address of the connection this request arrived on.
    pub fn remote_addr(&self) -> SocketAddr { self.remote_addr }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}
