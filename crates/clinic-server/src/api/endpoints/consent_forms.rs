//! Consent form endpoints. Forms are immutable once signed.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use clinic_core::{ConsentForm, NewConsentForm, PatientVisit};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// `GET /api/consent-forms`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<ConsentForm>>, ApiError> {
    let forms = ctx
        .pool
        .run(|db| db.list_consent_forms())
        .await
        .map_err(ApiError::storage("fetch consent forms"))?;
    Ok(Json(forms))
}

/// `GET /api/consent-forms/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<ConsentForm>, ApiError> {
    ctx.pool
        .run(move |db| db.get_consent_form(&id))
        .await
        .map_err(ApiError::storage("fetch consent form"))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Consent form not found".into()))
}

/// `POST /api/consent-forms`: 400 if the patient does not exist.
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewConsentForm>, JsonRejection>,
) -> Result<(StatusCode, Json<ConsentForm>), ApiError> {
    let Json(new) = payload?;
    new.validate()?;

    let form = ctx
        .pool
        .run(move |db| db.insert_consent_form(ConsentForm::from_new(new)))
        .await
        .map_err(ApiError::storage("create consent form"))?;
    tracing::info!(
        consent_form_id = %form.id,
        patient_id = %form.patient_id,
        treatment = form.treatment_type.as_str(),
        "recorded consent form"
    );
    Ok((StatusCode::CREATED, Json(form)))
}

/// `GET /api/consent-forms/:id/visits`: ordered by visit number.
pub async fn visits(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PatientVisit>>, ApiError> {
    let visits = ctx
        .pool
        .run(move |db| db.list_visits_for_consent_form(&id))
        .await
        .map_err(ApiError::storage("fetch consent form visits"))?;
    Ok(Json(visits))
}
