//! Clinic API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.
//!
//! Middleware stack (outermost → innermost):
//! 1. Session validator (protected routes) → 2. Access logger

use axum::routing::{get, post};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the clinic API router.
///
/// Middleware uses `Extension<ApiContext>` (injected as the outermost layer).
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn clinic_api_router(ctx: ApiContext) -> Router {
    // Protected routes: session required.
    //
    // Layers are applied from bottom (innermost) to top (outermost):
    //   Extension (outermost) → Session → Access log (innermost) → Handler
    //
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let protected = Router::new()
        .route("/auth/me", get(endpoints::auth::me))
        .route(
            "/patients",
            get(endpoints::patients::list).post(endpoints::patients::create),
        )
        .route("/patients/today", get(endpoints::patients::today))
        .route("/patients/search/:query", get(endpoints::patients::search))
        .route(
            "/patients/:id",
            get(endpoints::patients::get)
                .put(endpoints::patients::update)
                .delete(endpoints::patients::delete),
        )
        .route(
            "/patients/:id/consent-forms",
            get(endpoints::patients::consent_forms),
        )
        .route("/patients/:id/visits", get(endpoints::patients::visits))
        .route(
            "/consent-forms",
            get(endpoints::consent_forms::list).post(endpoints::consent_forms::create),
        )
        .route("/consent-forms/:id", get(endpoints::consent_forms::get))
        .route(
            "/consent-forms/:id/visits",
            get(endpoints::consent_forms::visits),
        )
        .route("/visits", post(endpoints::visits::create))
        .route(
            "/visits/:id",
            get(endpoints::visits::get)
                .put(endpoints::visits::update)
                .delete(endpoints::visits::delete),
        )
        .route("/dashboard/stats", get(endpoints::dashboard::stats))
        .route("/treatments", get(endpoints::treatments::list))
        .route("/export", get(endpoints::export::backup))
        .route("/export/patients.csv", get(endpoints::export::patients_csv))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::middleware::from_fn(middleware::auth::require_session))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    // Unprotected routes
    let unprotected = Router::new()
        .route("/auth/login", post(endpoints::auth::login))
        .route("/auth/logout", post(endpoints::auth::logout))
        .route("/report-error", post(endpoints::errors::report))
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(middleware::audit::log_access))
        .layer(axum::Extension(ctx));

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
}
