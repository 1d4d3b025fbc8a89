//! Cross-origin policy.
//!
//! A fixed origin allow-list; all methods and request headers are
//! allowed. Requests without an `Origin` header pass through untouched.
//!
//! - Preflight (`OPTIONS` + `Access-Control-Request-Method`): answered
//!   here with 200 for allowed origins, 400 otherwise. Never reaches the
//!   routes.
//! - Simple requests from an allowed origin: routed normally, then the
//!   response gets `Access-Control-Allow-Origin` echoing the origin.
//! - Simple requests from other origins: routed normally, no CORS headers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ACCESS_CONTROL_REQUEST_HEADERS,
    ACCESS_CONTROL_REQUEST_METHOD, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::debug;

/// Front-end origins allowed to call the API: local dev server, hosting
/// emulator, and the two production hosting domains.
pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:5173",
    "http://127.0.0.1:5003",
    "http://localhost:5003",
    "https://edutask-54a15.web.app",
    "https://edutask-54a15.firebaseapp.com",
];

const ALLOWED_METHODS: &str = "DELETE, GET, HEAD, OPTIONS, PATCH, POST, PUT";
const PREFLIGHT_MAX_AGE_SECS: &str = "600";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    allow_origins: Vec<String>,
    allow_credentials: bool,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allow_origins: DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .collect(),
            allow_credentials: true,
        }
    }
}

impl CorsPolicy {
    pub fn new(allow_origins: Vec<String>, allow_credentials: bool) -> Self {
        Self {
            allow_origins,
            allow_credentials,
        }
    }

    pub fn allows(&self, origin: &str) -> bool {
        self.allow_origins.iter().any(|o| o == origin)
    }

    pub fn allow_origins(&self) -> &[String] {
        &self.allow_origins
    }

    pub fn allow_credentials(&self) -> bool {
        self.allow_credentials
    }

    fn allow_origin_headers(&self, origin: &HeaderValue, headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin.clone());
        if self.allow_credentials {
            headers.insert(
                ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
        headers.append(VARY, HeaderValue::from_static("Origin"));
    }

    fn preflight(&self, origin: &HeaderValue, request_headers: &HeaderMap) -> Response {
        let allowed = origin.to_str().map(|o| self.allows(o)).unwrap_or(false);
        if !allowed {
            debug!(origin = ?origin, "rejecting preflight from disallowed origin");
            return (StatusCode::BAD_REQUEST, "Disallowed CORS origin").into_response();
        }

        let mut response = StatusCode::OK.into_response();
        let headers = response.headers_mut();
        self.allow_origin_headers(origin, headers);
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE_SECS),
        );
        // All headers are allowed; with credentials a literal `*` is not
        // honored by browsers, so echo what was asked for.
        if let Some(requested) = request_headers.get(ACCESS_CONTROL_REQUEST_HEADERS) {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested.clone());
        }
        response
    }
}

fn is_preflight(request: &Request) -> bool {
    request.method() == Method::OPTIONS
        && request.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD)
}

/// axum middleware applying a [`CorsPolicy`].
pub async fn apply_cors(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(origin) = request.headers().get(ORIGIN).cloned() else {
        return next.run(request).await;
    };

    if is_preflight(&request) {
        return policy.preflight(&origin, request.headers());
    }

    let allowed = origin.to_str().map(|o| policy.allows(o)).unwrap_or(false);
    let mut response = next.run(request).await;
    if allowed {
        policy.allow_origin_headers(&origin, response.headers_mut());
    }
    response
}
