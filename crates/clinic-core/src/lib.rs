//! Clinic Core Library
//!
//! Patient registration, treatment consent forms and follow-up visit tracking
//! for a small clinic, stored in SQLite.
//!
//! # Architecture
//!
//! ```text
//!   Registration ──► patients ◄──────────────┐
//!                      │                     │
//!                      ▼                     │
//!   Consent ──────► consent_forms            │
//!                      │                     │
//!                      ▼                     │
//!   Visit ─[cap: 5 per form]─► patient_visits
//!
//!   patients (created today) ─┐
//!                             ├─► merge (one entry per patient, newest first)
//!   consent_forms (today) ────┘        │
//!                                      ▼
//!                         today's patients, dashboard stats
//! ```
//!
//! # Core Rule
//!
//! **A consent form never has more than five visits.** The check and the
//! insert share one immediate transaction, and the schema enforces the same
//! cap with a trigger and a unique `(consent_form_id, visit_number)` index.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer and connection pool
//! - [`models`]: Domain types (Patient, ConsentForm, PatientVisit, etc.)
//! - [`activity`]: Daily activity merge and dashboard counters
//! - [`export`]: JSON backup and CSV export

pub mod activity;
pub mod db;
pub mod export;
pub mod models;

// Re-export commonly used types
pub use activity::{merge_activity, ActivitySource, DashboardStats, PatientActivity};
pub use db::{Database, DbError, DbPool, DbResult, PoolConfig};
pub use export::{BackupExport, BackupExporter};
pub use models::{
    ConsentForm, NewConsentForm, NewPatient, NewPatientVisit, Patient, PatientVisit, Treatment,
    TreatmentType, User, ValidationErrors, VisitNumber, VisitUpdate,
};
