use bytes::Bytes;

/// A call as delivered by the hosting runtime.
///
/// The runtime buffers the body before invoking the function, so the
/// request is always complete. Header names keep whatever case the
/// runtime used; [`Scope`](crate::Scope) lowercases them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRequest {
    method: String,
    path: String,
    headers: Vec<(String, Bytes)>,
    query_string: Bytes,
    body: Bytes,
}

impl InboundRequest {
    /// Create a request with no headers, no query string and an empty body.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            query_string: Bytes::new(),
            body: Bytes::new(),
        }
    }

    /// Builder method: append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Builder method: set the raw query string (without the leading `?`).
    pub fn with_query_string(self, query_string: impl Into<Bytes>) -> Self {
        Self {
            query_string: query_string.into(),
            ..self
        }
    }

    /// Builder method: set the body.
    pub fn with_body(self, body: impl Into<Bytes>) -> Self {
        Self {
            body: body.into(),
            ..self
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(String, Bytes)] {
        &self.headers
    }

    pub fn query_string(&self) -> &Bytes {
        &self.query_string
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }
}
