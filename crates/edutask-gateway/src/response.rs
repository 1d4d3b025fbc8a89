use std::collections::BTreeMap;

use bytes::Bytes;

/// The finished response handed back to the hosting runtime.
///
/// Header names are lowercase and unique; lookups through
/// [`header()`](AssembledResponse::header) are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledResponse {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Bytes,
}

impl AssembledResponse {
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// A JSON error response: `{"error": "<message>"}` with the given status.
    pub fn json_error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        let headers = BTreeMap::from([(
            "content-type".to_string(),
            "application/json".to_string(),
        )]);
        Self::new(status, headers, body)
    }

    /// The uniform 500 response every failed call is converted into.
    pub fn internal_error(message: &str) -> Self {
        Self::json_error(500, &format!("Internal Server Error: {message}"))
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_parts(self) -> (u16, BTreeMap<String, String>, Bytes) {
        (self.status, self.headers, self.body)
    }
}
