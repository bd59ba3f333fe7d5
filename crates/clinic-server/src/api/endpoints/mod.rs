//! API endpoint handlers.
//!
//! Handlers validate input, run one storage call on the pool and return JSON.

pub mod auth;
pub mod consent_forms;
pub mod dashboard;
pub mod errors;
pub mod export;
pub mod patients;
pub mod treatments;
pub mod visits;
