//! Session cookie authentication middleware.
//!
//! Reads the `clinic_sid` cookie, validates it against the session store,
//! and injects `SessionUser` into request extensions for downstream handlers.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::session::token_from_headers;
use crate::api::types::ApiContext;

/// Require a live session.
///
/// Accesses `ApiContext` from request extensions (injected by Extension layer).
pub async fn require_session(req: Request<axum::body::Body>, next: Next) -> Response {
    match require_session_inner(req, next).await {
        Ok(resp) => resp,
        Err(err) => err.into_response(),
    }
}

async fn require_session_inner(
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let ctx: ApiContext = req
        .extensions()
        .get::<ApiContext>()
        .cloned()
        .ok_or_else(|| ApiError::internal("authenticate request", "missing API context"))?;

    let token = token_from_headers(req.headers()).ok_or(ApiError::Unauthorized)?;

    // Guard dropped before any .await
    let user = ctx.sessions()?.validate(&token).ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
