use axum::extract::State;
use axum::Json;

use clinic_core::Treatment;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// `GET /api/treatments`: active catalog entries.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Treatment>>, ApiError> {
    let treatments = ctx
        .pool
        .run(|db| db.list_active_treatments())
        .await
        .map_err(ApiError::storage("fetch treatments"))?;
    Ok(Json(treatments))
}
