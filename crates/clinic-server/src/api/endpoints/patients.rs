//! Patient endpoints.
//!
//! - `GET /api/patients`: all patients, newest first
//! - `GET /api/patients/today`: patients active today
//! - `GET /api/patients/search/:query`: name or phone search
//! - `GET|PUT|DELETE /api/patients/:id`
//! - `POST /api/patients`: register
//! - `GET /api/patients/:id/consent-forms`, `GET /api/patients/:id/visits`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use clinic_core::{ConsentForm, NewPatient, Patient, PatientVisit};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// `GET /api/patients`
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<Patient>>, ApiError> {
    let patients = ctx
        .pool
        .run(|db| db.list_patients())
        .await
        .map_err(ApiError::storage("fetch patients"))?;
    Ok(Json(patients))
}

/// `GET /api/patients/today`: registered or consented today, latest first.
pub async fn today(State(ctx): State<ApiContext>) -> Result<Json<Vec<Patient>>, ApiError> {
    let patients = ctx
        .pool
        .run(|db| db.todays_patients())
        .await
        .map_err(ApiError::storage("fetch today's patients"))?;
    Ok(Json(patients))
}

/// `GET /api/patients/search/:query`
pub async fn search(
    State(ctx): State<ApiContext>,
    Path(query): Path<String>,
) -> Result<Json<Vec<Patient>>, ApiError> {
    let patients = ctx
        .pool
        .run(move |db| db.search_patients(&query))
        .await
        .map_err(ApiError::storage("search patients"))?;
    Ok(Json(patients))
}

/// `GET /api/patients/:id`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Patient>, ApiError> {
    ctx.pool
        .run(move |db| db.get_patient(&id))
        .await
        .map_err(ApiError::storage("fetch patient"))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))
}

/// `POST /api/patients`
pub async fn create(
    State(ctx): State<ApiContext>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(new) = payload?;
    new.validate()?;

    let patient = ctx
        .pool
        .run(move |db| db.insert_patient(Patient::from_new(new)))
        .await
        .map_err(ApiError::storage("create patient"))?;
    tracing::info!(patient_id = %patient.id, "registered patient");
    Ok((StatusCode::CREATED, Json(patient)))
}

/// `PUT /api/patients/:id`: full replacement of the editable fields.
pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let Json(changes) = payload?;
    changes.validate()?;

    ctx.pool
        .run(move |db| db.update_patient(&id, changes))
        .await
        .map_err(ApiError::storage("update patient"))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Patient not found".into()))
}

/// `DELETE /api/patients/:id`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let deleted = ctx
        .pool
        .run(move |db| db.delete_patient(&id))
        .await
        .map_err(ApiError::storage("delete patient"))?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Patient not found".into()))
    }
}

/// `GET /api/patients/:id/consent-forms`
pub async fn consent_forms(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ConsentForm>>, ApiError> {
    let forms = ctx
        .pool
        .run(move |db| db.list_consent_forms_for_patient(&id))
        .await
        .map_err(ApiError::storage("fetch consent forms"))?;
    Ok(Json(forms))
}

/// `GET /api/patients/:id/visits`
pub async fn visits(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Vec<PatientVisit>>, ApiError> {
    let visits = ctx
        .pool
        .run(move |db| db.list_visits_for_patient(&id))
        .await
        .map_err(ApiError::storage("fetch patient visits"))?;
    Ok(Json(visits))
}
