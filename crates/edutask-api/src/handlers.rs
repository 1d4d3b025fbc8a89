//! Route handlers.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
}

/// GET /api/health
pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn health_check_reports_ok() {
        let Json(status) = health_check().await;
        assert_eq!(status.status, "ok");
        assert_eq!(serde_json::to_string(&status).unwrap(), r#"{"status":"ok"}"#);
    }
}
