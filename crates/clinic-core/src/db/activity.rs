//! Daily activity and dashboard queries.

use chrono::{DateTime, NaiveDate, Utc};

use super::patients::{PatientRow, PATIENT_COLUMNS};
use super::{Database, DbResult};
use crate::activity::{merge_activity, DashboardStats, PatientActivity};
use crate::models::Patient;

impl Database {
    /// Patients registered on `day` (UTC).
    pub fn patients_registered_on(&self, day: NaiveDate) -> DbResult<Vec<PatientActivity>> {
        let patients = self.query_patients(
            &format!(
                r#"
                SELECT {PATIENT_COLUMNS}
                FROM patients p
                WHERE substr(p.created_at, 1, 10) = ?1
                "#
            ),
            [day],
        )?;
        Ok(patients.into_iter().map(PatientActivity::registration).collect())
    }

    /// Patients with a consent form created on `day` (UTC), each with the
    /// time of their latest form that day.
    pub fn consent_activity_on(&self, day: NaiveDate) -> DbResult<Vec<PatientActivity>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {PATIENT_COLUMNS}, c.last_activity
            FROM patients p
            JOIN (
                SELECT patient_id, MAX(created_at) AS last_activity
                FROM consent_forms
                WHERE substr(created_at, 1, 10) = ?1
                GROUP BY patient_id
            ) c ON c.patient_id = p.id
            "#
        ))?;

        let rows = stmt.query_map([day], |row| {
            let last_activity: DateTime<Utc> = row.get(19)?;
            Ok((PatientRow::from_row(row)?, last_activity))
        })?;

        let mut activity = Vec::new();
        for row in rows {
            let (patient_row, last_activity) = row?;
            let patient: Patient = patient_row.try_into()?;
            activity.push(PatientActivity::consent_form(patient, last_activity));
        }
        Ok(activity)
    }

    /// Everyone active on `day`, one entry per patient, newest activity first.
    pub fn patient_activity_on(&self, day: NaiveDate) -> DbResult<Vec<PatientActivity>> {
        let registrations = self.patients_registered_on(day)?;
        let consents = self.consent_activity_on(day)?;
        Ok(merge_activity(registrations, consents))
    }

    /// Patients active on `day`, most recent activity first.
    pub fn patients_active_on(&self, day: NaiveDate) -> DbResult<Vec<Patient>> {
        Ok(self
            .patient_activity_on(day)?
            .into_iter()
            .map(|entry| entry.patient)
            .collect())
    }

    /// Patients active today (UTC).
    pub fn todays_patients(&self) -> DbResult<Vec<Patient>> {
        self.patients_active_on(Utc::now().date_naive())
    }

    /// Dashboard counters with "today" fixed to `day`.
    pub fn dashboard_stats_on(&self, day: NaiveDate) -> DbResult<DashboardStats> {
        Ok(DashboardStats {
            total_patients: self.count_patients()?,
            consent_forms: self.count_consent_forms()?,
            today_visits: self.patient_activity_on(day)?.len() as u64,
            pending_reports: 0,
        })
    }

    pub fn dashboard_stats(&self) -> DbResult<DashboardStats> {
        self.dashboard_stats_on(Utc::now().date_naive())
    }
}
