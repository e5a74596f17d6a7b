use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use super::data_source::*;

/// Readiness must answer well inside a load balancer's probe interval
const READINESS_TIMEOUT: Duration = Duration::from_secs(3);

#[tracing::instrument]
pub async fn handler(data_src: StateDataSource) -> Response {
    match timeout(READINESS_TIMEOUT, data_src.is_ready()).await {
        Ok(Ok(())) => (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response(),
        Ok(Err(DataSourceError::DependencyFailure)) => {
            unavailable("one or more dependencies aren't available")
        }
        Err(_) => unavailable("health check timed out"),
    }
}

fn unavailable(message: &str) -> Response {
    let msg = serde_json::json!({"status": "failure", "message": message});
    (StatusCode::SERVICE_UNAVAILABLE, Json(msg)).into_response()
}
