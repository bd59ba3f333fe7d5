//! Database layer for the clinic.

mod activity;
mod consent_forms;
mod patients;
mod pool;
mod schema;
mod treatments;
mod users;
mod visits;

pub use pool::*;
pub use schema::*;

use std::path::Path;
use std::time::Duration;

use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use thiserror::Error;

/// How long a writer waits on a locked database file before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// A referenced row does not exist.
    #[error("Unknown reference: {0}")]
    UnknownReference(String),

    #[error("Visit patient {patient_id} does not own consent form {consent_form_id}")]
    PatientMismatch {
        patient_id: String,
        consent_form_id: String,
    },

    #[error("Visit limit exceeded: consent form {consent_form_id} already has {limit} visits")]
    VisitLimitExceeded { consent_form_id: String, limit: u32 },

    #[error("Visit {visit_number} already recorded for consent form {consent_form_id}")]
    DuplicateVisitNumber {
        consent_form_id: String,
        visit_number: String,
    },
}

pub type DbResult<T> = Result<T, DbError>;

/// Message of a failed constraint (CHECK, UNIQUE, FOREIGN KEY or trigger), if
/// that is what went wrong.
pub(crate) fn constraint_message(err: &rusqlite::Error) -> Option<&str> {
    match err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            Some(message.as_deref().unwrap_or("constraint failed"))
        }
        _ => None,
    }
}

pub(crate) fn is_foreign_key_failure(err: &rusqlite::Error) -> bool {
    constraint_message(err).is_some_and(|m| m.contains("FOREIGN KEY"))
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Register SQL functions and initialize schema.
    fn initialize(&self) -> DbResult<()> {
        // SQLite's LOWER() and LIKE only fold ASCII
        self.conn.create_scalar_function(
            "lower_unicode",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase())),
        )?;
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Begin a write transaction that takes the database lock up front, so
    /// concurrent writers are serialized from their first read.
    pub fn immediate_transaction(&mut self) -> DbResult<rusqlite::Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}
