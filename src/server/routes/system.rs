use crate::db::DbStatus;
use crate::error::MedflowError;
use crate::server::router::MedflowState;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use tracing::warn;

pub fn router() -> Router<MedflowState> {
    Router::new()
        .route("/api/system/status", get(database_status))
        .route("/api/system/reset", post(reset_database))
}

/// GET /api/system/status
pub async fn database_status(
    State(state): State<MedflowState>,
) -> Result<Json<DbStatus>, MedflowError> {
    Ok(Json(state.db.status().await?))
}

/// POST /api/system/reset
///
/// Manual recovery: closes the connection and runs a fresh initialization.
pub async fn reset_database(
    State(state): State<MedflowState>,
) -> Result<Json<DbStatus>, MedflowError> {
    warn!("Database reset requested over HTTP");
    state.db.reset().await?;
    Ok(Json(state.db.status().await?))
}
