//! Data export endpoints.
//!
//! - `GET /api/export`: full JSON backup as a download
//! - `GET /api/export/patients.csv`: patient list

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};

use clinic_core::export::patients_to_csv;
use clinic_core::BackupExporter;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

/// `GET /api/export`
pub async fn backup(State(ctx): State<ApiContext>) -> Result<Response, ApiError> {
    let backup = ctx
        .pool
        .run(|db| BackupExporter::new(db).export())
        .await
        .map_err(ApiError::storage("export data"))?;
    let json = backup
        .to_json()
        .map_err(|e| ApiError::internal("export data", e))?;

    let disposition = format!("attachment; filename=\"{}\"", backup.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        json,
    )
        .into_response())
}

/// `GET /api/export/patients.csv`
pub async fn patients_csv(State(ctx): State<ApiContext>) -> Result<Response, ApiError> {
    let patients = ctx
        .pool
        .run(|db| db.list_patients())
        .await
        .map_err(ApiError::storage("export patients"))?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"patients.csv\""),
        ],
        patients_to_csv(&patients),
    )
        .into_response())
}
