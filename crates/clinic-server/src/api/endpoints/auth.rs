//! Login, logout and current-user endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use clinic_core::ValidationErrors;

use crate::api::error::ApiError;
use crate::api::session::{clear_cookie, session_cookie, token_from_headers};
use crate::api::types::{ApiContext, SessionUser};

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: SessionUser,
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: SessionUser,
}

/// `POST /api/auth/login`: check credentials and start a session.
pub async fn login(
    State(ctx): State<ApiContext>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    let mut errors = ValidationErrors::new();
    errors.require("username", &request.username);
    errors.require("password", &request.password);
    errors.into_result()?;

    let username = request.username.trim().to_string();
    let user = ctx
        .pool
        .run({
            let username = username.clone();
            move |db| db.get_user_by_username(&username)
        })
        .await
        .map_err(ApiError::storage("log in"))?;

    let user = match user {
        Some(user) if user.verify_password(&request.password) => SessionUser::from(&user),
        _ => {
            tracing::warn!(username = %username, "login failed");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let (token, ttl) = {
        let mut sessions = ctx.sessions()?;
        (sessions.create(user.clone()), sessions.ttl())
    };
    tracing::info!(username = %user.username, "login succeeded");

    let body = LoginResponse {
        user,
        message: "Login successful",
    };
    Ok((
        [(header::SET_COOKIE, session_cookie(&token, ttl))],
        Json(body),
    )
        .into_response())
}

/// `POST /api/auth/logout`: end the session, if any, and clear the cookie.
pub async fn logout(
    State(ctx): State<ApiContext>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = token_from_headers(&headers) {
        ctx.sessions()?.revoke(&token);
    }
    let body = MessageResponse {
        message: "Logout successful",
    };
    Ok(([(header::SET_COOKIE, clear_cookie())], Json(body)).into_response())
}

/// `GET /api/auth/me`: the signed-in user.
pub async fn me(Extension(user): Extension<SessionUser>) -> Json<MeResponse> {
    Json(MeResponse { user })
}
