//! Dashboard endpoint.

use axum::extract::State;
use axum::Json;

use clinic_core::DashboardStats;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// `GET /api/dashboard/stats`
pub async fn stats(State(ctx): State<ApiContext>) -> Result<Json<DashboardStats>, ApiError> {
    let stats = ctx
        .pool
        .run(|db| db.dashboard_stats())
        .await
        .map_err(ApiError::storage("fetch dashboard stats"))?;
    Ok(Json(stats))
}
