//! HTTP API for the clinic.
//!
//! All routes live under `/api`. Everything except login, logout and the
//! client error-report sink requires a session cookie.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod session;
pub mod types;

pub use error::ApiError;
pub use router::clinic_api_router;
pub use types::{ApiContext, SessionUser};
