//! Clinic Server
//!
//! axum HTTP service over [`clinic_core`]: session login, patient
//! registration, consent forms, visit tracking, dashboard and export.
//!
//! # Modules
//!
//! - [`api`]: router, handlers, middleware and session store
//! - [`config`]: environment configuration

pub mod api;
pub mod config;

pub use api::{clinic_api_router, ApiContext, ApiError};
pub use config::{ConfigError, ServerConfig};
