//! edutask-api — the EduTask HTTP API.
//!
//! Provides the axum router and the CORS policy, and serves them over
//! the gateway protocol through [`RouterApp`] so the function adapter
//! can drive them.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/health` | Liveness check, `{"status":"ok"}` |
//!
//! Every other path answers 404.

pub mod app;
pub mod convert;
pub mod cors;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;

pub use app::RouterApp;
pub use cors::CorsPolicy;

/// Build the complete API router with the CORS layer applied.
pub fn build_router(policy: CorsPolicy) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .layer(middleware::from_fn_with_state(
            Arc::new(policy),
            cors::apply_cors,
        ))
}

/// Build the router and wrap it as a gateway-protocol application.
pub fn build_app(policy: CorsPolicy) -> RouterApp {
    RouterApp::new(build_router(policy))
}
