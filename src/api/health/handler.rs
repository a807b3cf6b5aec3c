//! Health API Handlers

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::core::ServerState;
use crate::utils::AppResult;

#[derive(Serialize)]
pub struct HealthStatus {
    status: &'static str,
    database: &'static str,
    version: &'static str,
}

/// GET /api/health - 健康检查
pub async fn health(State(state): State<ServerState>) -> AppResult<Json<HealthStatus>> {
    // Cheap liveness probe against the pool
    let database = match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => "up",
        Err(e) => {
            tracing::warn!(error = %e, "Health check database probe failed");
            "down"
        }
    };

    Ok(Json(HealthStatus {
        status: "ok",
        database,
        version: env!("CARGO_PKG_VERSION"),
    }))
}
