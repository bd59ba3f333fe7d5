//! Full JSON backup of the clinic database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{Database, DbResult};
use crate::models::{ConsentForm, Patient, PatientVisit};

/// Name recorded in every backup.
pub const SYSTEM_NAME: &str = "Mbeki Healthcare Patient Management System";

/// Backup document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupExport {
    pub export_info: ExportInfo,
    /// Oldest registration first
    pub patients: Vec<Patient>,
    /// Oldest first
    pub consent_forms: Vec<ConsentForm>,
    /// Oldest first
    pub visits: Vec<PatientVisit>,
    pub statistics: ExportStatistics,
}

/// Backup metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInfo {
    pub system: String,
    /// Crate version that wrote the backup
    pub version: String,
    pub exported_at: DateTime<Utc>,
}

/// Row counts included in the backup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExportStatistics {
    pub total_patients: usize,
    pub total_consent_forms: usize,
    pub total_visits: usize,
}

impl BackupExport {
    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Suggested download name, e.g. `mbeki-healthcare-backup-2025-03-11-14-05-09.json`.
    pub fn file_name(&self) -> String {
        format!(
            "mbeki-healthcare-backup-{}.json",
            self.export_info.exported_at.format("%Y-%m-%d-%H-%M-%S")
        )
    }
}

/// Backup exporter.
pub struct BackupExporter<'a> {
    db: &'a Database,
}

impl<'a> BackupExporter<'a> {
    /// Create a new backup exporter.
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Snapshot every patient, consent form and visit.
    pub fn export(&self) -> DbResult<BackupExport> {
        let mut patients = self.db.list_patients()?;
        patients.reverse();
        let mut consent_forms = self.db.list_consent_forms()?;
        consent_forms.reverse();
        let visits = self.db.list_visits()?;

        let statistics = ExportStatistics {
            total_patients: patients.len(),
            total_consent_forms: consent_forms.len(),
            total_visits: visits.len(),
        };
        tracing::info!(
            patients = statistics.total_patients,
            consent_forms = statistics.total_consent_forms,
            visits = statistics.total_visits,
            "exported backup"
        );

        Ok(BackupExport {
            export_info: ExportInfo {
                system: SYSTEM_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                exported_at: Utc::now(),
            },
            patients,
            consent_forms,
            visits,
            statistics,
        })
    }
}
