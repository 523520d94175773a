use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::{errors::ServiceError, ApiResponse, AppState};

/// Service metadata and build information
#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses(
        (status = 200, description = "Service status")
    ),
    tag = "Health"
)]
pub async fn api_status() -> Result<Json<ApiResponse<Value>>, ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "boxoffice-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

/// Liveness check covering the data store
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health report")
    ),
    tag = "Health"
)]
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
