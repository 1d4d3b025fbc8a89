use bytes::Bytes;

use crate::request::InboundRequest;

/// Protocol kind carried by a [`Scope`].
///
/// Function calls are always plain HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Http,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Http => "http",
        }
    }
}

/// The per-call connection description handed to the application.
///
/// Built once from the [`InboundRequest`] and never mutated afterwards.
/// Header names are lowercased; values are passed through untouched so
/// the application can inspect `origin` and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    kind: ScopeKind,
    method: String,
    path: String,
    headers: Vec<(Bytes, Bytes)>,
    query_string: Bytes,
}

impl Scope {
    pub fn from_request(request: &InboundRequest) -> Self {
        let headers = request
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    Bytes::from(name.to_ascii_lowercase().into_bytes()),
                    value.clone(),
                )
            })
            .collect();

        Self {
            kind: ScopeKind::Http,
            method: request.method().to_string(),
            path: request.path().to_string(),
            headers,
            query_string: request.query_string().clone(),
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &[(Bytes, Bytes)] {
        &self.headers
    }

    pub fn query_string(&self) -> &Bytes {
        &self.query_string
    }

    /// Get the first header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&Bytes> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name.as_bytes()))
            .map(|(_, v)| v)
    }

    /// Path plus query string, as it would appear in a request line.
    ///
    /// Query bytes that may not appear raw in a URI (controls, space,
    /// `#`, non-ASCII) are percent-encoded; everything else, including
    /// existing `%XX` escapes, is kept as is.
    pub fn path_and_query(&self) -> String {
        if self.query_string.is_empty() {
            return self.path.clone();
        }

        let mut target = String::with_capacity(self.path.len() + 1 + self.query_string.len());
        target.push_str(&self.path);
        target.push('?');
        for &byte in self.query_string.iter() {
            if byte.is_ascii_graphic() && byte != b'#' {
                target.push(byte as char);
            } else {
                target.push_str(&format!("%{byte:02X}"));
            }
        }
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_is_http() {
        let scope = Scope::from_request(&InboundRequest::new("GET", "/"));
        assert_eq!(scope.kind(), ScopeKind::Http);
        assert_eq!(scope.kind().as_str(), "http");
    }

    #[test]
    fn header_names_are_lowercased_values_untouched() {
        let req = InboundRequest::new("GET", "/api/health")
            .with_header("Origin", "http://localhost:5173")
            .with_header("X-Request-ID", "AbC");
        let scope = Scope::from_request(&req);

        assert_eq!(scope.headers()[0].0.as_ref(), b"origin");
        assert_eq!(scope.headers()[0].1.as_ref(), b"http://localhost:5173");
        assert_eq!(scope.headers()[1].0.as_ref(), b"x-request-id");
        assert_eq!(scope.headers()[1].1.as_ref(), b"AbC");
    }

    #[test]
    fn header_order_and_duplicates_preserved() {
        let req = InboundRequest::new("GET", "/")
            .with_header("Cookie", "a=1")
            .with_header("Accept", "*/*")
            .with_header("Cookie", "b=2");
        let scope = Scope::from_request(&req);

        let names: Vec<&[u8]> = scope.headers().iter().map(|(n, _)| n.as_ref()).collect();
        assert_eq!(names, vec![&b"cookie"[..], &b"accept"[..], &b"cookie"[..]]);
        assert_eq!(scope.header("COOKIE").unwrap().as_ref(), b"a=1");
    }

    #[test]
    fn path_and_query() {
        let plain = Scope::from_request(&InboundRequest::new("GET", "/api/health"));
        assert_eq!(plain.path_and_query(), "/api/health");

        let with_query = Scope::from_request(
            &InboundRequest::new("GET", "/api/students").with_query_string("class=1A&page=2"),
        );
        assert_eq!(with_query.path_and_query(), "/api/students?class=1A&page=2");
        assert_eq!(with_query.query_string().as_ref(), b"class=1A&page=2");
    }

    #[test]
    fn query_bytes_outside_uri_charset_are_escaped() {
        let scope = Scope::from_request(
            &InboundRequest::new("GET", "/api/students")
                .with_query_string(&b"name=\xea\xb9\x80 lee&tag=#1&raw=\xff&ok=%20"[..]),
        );
        assert_eq!(
            scope.path_and_query(),
            "/api/students?name=%EA%B9%80%20lee&tag=%231&raw=%FF&ok=%20"
        );
    }
}
