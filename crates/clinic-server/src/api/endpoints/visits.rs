//! Visit endpoints.
//!
//! Creation goes through the capped insert: at most five visits per consent
//! form, each slot used once.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use clinic_core::{NewPatientVisit, PatientVisit, ValidationErrors, VisitUpdate};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// `POST /api/visits`
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewPatientVisit>, JsonRejection>,
) -> Result<(StatusCode, Json<PatientVisit>), ApiError> {
    let Json(new) = payload?;
    new.validate()?;

    let visit = ctx
        .pool
        .run(move |db| db.create_visit(PatientVisit::from_new(new)))
        .await
        .map_err(ApiError::storage("create visit"))?;
    tracing::info!(
        visit_id = %visit.id,
        consent_form_id = %visit.consent_form_id,
        visit_number = visit.visit_number.get(),
        "recorded visit"
    );
    Ok((StatusCode::CREATED, Json(visit)))
}

/// `GET /api/visits/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<PatientVisit>, ApiError> {
    ctx.pool
        .run(move |db| db.get_visit(&id))
        .await
        .map_err(ApiError::storage("fetch visit"))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Visit not found".into()))
}

/// `PUT /api/visits/:id`: partial update; number and owners are fixed.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    payload: Result<Json<VisitUpdate>, JsonRejection>,
) -> Result<Json<PatientVisit>, ApiError> {
    let Json(update) = payload?;
    update.validate()?;
    if update.is_empty() {
        return Err(ValidationErrors::single("body", "must change at least one field").into());
    }

    ctx.pool
        .run(move |db| db.update_visit(&id, update))
        .await
        .map_err(ApiError::storage("update visit"))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Visit not found".into()))
}

/// `DELETE /api/visits/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = ctx
        .pool
        .run(move |db| db.delete_visit(&id))
        .await
        .map_err(ApiError::storage("delete visit"))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Visit not found".into()))
    }
}
