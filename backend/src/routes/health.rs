use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::core::{ApiError, ArcContext, DbError};

pub async fn health_check(State(context): State<ArcContext>) -> Result<Json<Value>, ApiError> {
    sqlx::query("SELECT 1").execute(&context.db).await.map_err(|e| {
        tracing::error!("Health check failed to reach the database: {}", e);
        DbError::from(e)
    })?;

    Ok(Json(json!({ "status": "ok" })))
}
