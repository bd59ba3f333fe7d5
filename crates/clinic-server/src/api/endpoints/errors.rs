//! Client error reports.
//!
//! The web client posts uncaught errors here. Reports are written to the
//! log at error level; there is no other delivery.

use axum::extract::rejection::JsonRejection;
use axum::Json;
use serde::{Deserialize, Serialize};

use clinic_core::ValidationErrors;

use crate::api::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    #[serde(default)]
    pub message: String,
    pub stack: Option<String>,
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub timestamp: Option<String>,
    pub user_id: Option<String>,
    pub additional_info: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub message: &'static str,
}

/// `POST /api/report-error`: no session required.
pub async fn report(
    payload: Result<Json<ErrorReport>, JsonRejection>,
) -> Result<Json<ReportResponse>, ApiError> {
    let Json(report) = payload?;
    if report.message.trim().is_empty() {
        return Err(ValidationErrors::single("message", "is required").into());
    }

    tracing::error!(
        report = %report.message,
        url = report.url.as_deref().unwrap_or("-"),
        user_agent = report.user_agent.as_deref().unwrap_or("-"),
        user_id = report.user_id.as_deref().unwrap_or("-"),
        timestamp = report.timestamp.as_deref().unwrap_or("-"),
        stack = report.stack.as_deref().unwrap_or(""),
        additional_info = %report.additional_info.unwrap_or_default(),
        "client error report"
    );

    Ok(Json(ReportResponse {
        message: "Error report sent successfully",
    }))
}
