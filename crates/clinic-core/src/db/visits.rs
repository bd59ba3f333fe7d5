//! Patient visit database operations, including the per-form visit cap.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{
    constraint_message, Database, DbError, DbResult, PATIENT_MISMATCH_MESSAGE,
    VISIT_LIMIT_MESSAGE,
};
use crate::models::{PatientVisit, VisitNumber, VisitUpdate, MAX_VISITS_PER_CONSENT_FORM};

const VISIT_COLUMNS: &str = r#"
    id, patient_id, consent_form_id, visit_number, visit_date, nurse_name,
    progress_notes, next_appointment_date, vitals, created_at, updated_at
"#;

impl Database {
    /// Record a visit, enforcing the consent form rules.
    ///
    /// Checks run in order inside one immediate transaction: the consent form
    /// exists, it belongs to the visit's patient, it has fewer than
    /// [`MAX_VISITS_PER_CONSENT_FORM`] visits, and the visit number is free.
    /// Nothing is written when a check fails.
    pub fn create_visit(&mut self, visit: PatientVisit) -> DbResult<PatientVisit> {
        let vitals_json = serde_json::to_string(&visit.vitals)?;
        let tx = self.immediate_transaction()?;

        let owner: Option<String> = tx
            .query_row(
                "SELECT patient_id FROM consent_forms WHERE id = ?",
                [&visit.consent_form_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(owner) = owner else {
            return Err(DbError::UnknownReference(format!(
                "consent form {}",
                visit.consent_form_id
            )));
        };
        if owner != visit.patient_id {
            return Err(patient_mismatch(&visit));
        }

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM patient_visits WHERE consent_form_id = ?",
            [&visit.consent_form_id],
            |row| row.get(0),
        )?;
        if existing >= i64::from(MAX_VISITS_PER_CONSENT_FORM) {
            tracing::warn!(
                consent_form_id = %visit.consent_form_id,
                existing,
                "rejected visit over the per-form limit"
            );
            return Err(limit_exceeded(&visit));
        }

        let taken: bool = tx.query_row(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM patient_visits
                WHERE consent_form_id = ?1 AND visit_number = ?2
            )
            "#,
            params![visit.consent_form_id, visit.visit_number.get()],
            |row| row.get(0),
        )?;
        if taken {
            return Err(duplicate_number(&visit));
        }

        tx.execute(
            r#"
            INSERT INTO patient_visits (
                id, patient_id, consent_form_id, visit_number, visit_date,
                nurse_name, progress_notes, next_appointment_date, vitals,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                visit.id,
                visit.patient_id,
                visit.consent_form_id,
                visit.visit_number.get(),
                visit.visit_date,
                visit.nurse_name,
                visit.progress_notes,
                visit.next_appointment_date,
                vitals_json,
                visit.created_at,
                visit.updated_at,
            ],
        )
        .map_err(|e| classify_insert_error(e, &visit))?;
        tx.commit()?;

        tracing::debug!(
            visit_id = %visit.id,
            consent_form_id = %visit.consent_form_id,
            visit_number = %visit.visit_number,
            "recorded visit"
        );
        Ok(visit)
    }

    /// Apply an update to a visit's mutable fields.
    ///
    /// Returns `None` if the visit does not exist.
    pub fn update_visit(&self, id: &str, update: VisitUpdate) -> DbResult<Option<PatientVisit>> {
        let Some(mut visit) = self.get_visit(id)? else {
            return Ok(None);
        };
        visit.apply(update);
        let vitals_json = serde_json::to_string(&visit.vitals)?;

        self.conn.execute(
            r#"
            UPDATE patient_visits SET
                visit_date = ?2,
                nurse_name = ?3,
                progress_notes = ?4,
                next_appointment_date = ?5,
                vitals = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                visit.id,
                visit.visit_date,
                visit.nurse_name,
                visit.progress_notes,
                visit.next_appointment_date,
                vitals_json,
                visit.updated_at,
            ],
        )?;
        Ok(Some(visit))
    }

    /// Get a visit by ID.
    pub fn get_visit(&self, id: &str) -> DbResult<Option<PatientVisit>> {
        self.conn
            .query_row(
                &format!("SELECT {VISIT_COLUMNS} FROM patient_visits WHERE id = ?"),
                [id],
                VisitRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List a patient's visits by visit date.
    pub fn list_visits_for_patient(&self, patient_id: &str) -> DbResult<Vec<PatientVisit>> {
        self.query_visits(
            &format!(
                r#"
                SELECT {VISIT_COLUMNS}
                FROM patient_visits
                WHERE patient_id = ?
                ORDER BY visit_date, visit_number
                "#
            ),
            [patient_id],
        )
    }

    /// List the visits recorded under a consent form by visit number.
    pub fn list_visits_for_consent_form(
        &self,
        consent_form_id: &str,
    ) -> DbResult<Vec<PatientVisit>> {
        self.query_visits(
            &format!(
                r#"
                SELECT {VISIT_COLUMNS}
                FROM patient_visits
                WHERE consent_form_id = ?
                ORDER BY visit_number
                "#
            ),
            [consent_form_id],
        )
    }

    /// List every visit, oldest first.
    pub fn list_visits(&self) -> DbResult<Vec<PatientVisit>> {
        self.query_visits(
            &format!("SELECT {VISIT_COLUMNS} FROM patient_visits ORDER BY created_at"),
            [],
        )
    }

    pub fn count_visits_for_consent_form(&self, consent_form_id: &str) -> DbResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM patient_visits WHERE consent_form_id = ?",
            [consent_form_id],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    pub fn count_visits(&self) -> DbResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patient_visits", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Delete a visit.
    pub fn delete_visit(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patient_visits WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    fn query_visits<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> DbResult<Vec<PatientVisit>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, VisitRow::from_row)?;

        let mut visits = Vec::new();
        for row in rows {
            visits.push(row?.try_into()?);
        }
        Ok(visits)
    }
}

fn patient_mismatch(visit: &PatientVisit) -> DbError {
    DbError::PatientMismatch {
        patient_id: visit.patient_id.clone(),
        consent_form_id: visit.consent_form_id.clone(),
    }
}

fn limit_exceeded(visit: &PatientVisit) -> DbError {
    DbError::VisitLimitExceeded {
        consent_form_id: visit.consent_form_id.clone(),
        limit: MAX_VISITS_PER_CONSENT_FORM,
    }
}

fn duplicate_number(visit: &PatientVisit) -> DbError {
    DbError::DuplicateVisitNumber {
        consent_form_id: visit.consent_form_id.clone(),
        visit_number: visit.visit_number.to_string(),
    }
}

/// Map a failed visit insert to the rule the schema enforced.
fn classify_insert_error(err: rusqlite::Error, visit: &PatientVisit) -> DbError {
    match constraint_message(&err) {
        Some(m) if m.contains(VISIT_LIMIT_MESSAGE) => limit_exceeded(visit),
        Some(m) if m.contains(PATIENT_MISMATCH_MESSAGE) => patient_mismatch(visit),
        Some(m) if m.contains("UNIQUE") && m.contains("visit_number") => duplicate_number(visit),
        Some(m) if m.contains("FOREIGN KEY") => {
            DbError::UnknownReference(format!("patient {}", visit.patient_id))
        }
        _ => err.into(),
    }
}

/// Intermediate row struct for database mapping.
struct VisitRow {
    id: String,
    patient_id: String,
    consent_form_id: String,
    visit_number: i64,
    visit_date: String,
    nurse_name: String,
    progress_notes: Option<String>,
    next_appointment_date: Option<String>,
    vitals: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VisitRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            consent_form_id: row.get(2)?,
            visit_number: row.get(3)?,
            visit_date: row.get(4)?,
            nurse_name: row.get(5)?,
            progress_notes: row.get(6)?,
            next_appointment_date: row.get(7)?,
            vitals: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl TryFrom<VisitRow> for PatientVisit {
    type Error = DbError;

    fn try_from(row: VisitRow) -> Result<Self, Self::Error> {
        let visit_number = VisitNumber::try_from(row.visit_number).map_err(DbError::Constraint)?;

        Ok(PatientVisit {
            id: row.id,
            patient_id: row.patient_id,
            consent_form_id: row.consent_form_id,
            visit_number,
            visit_date: row.visit_date,
            nurse_name: row.nurse_name,
            progress_notes: row.progress_notes,
            next_appointment_date: row.next_appointment_date,
            vitals: serde_json::from_str(&row.vitals)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ConsentForm, NewConsentForm, NewPatient, NewPatientVisit, Patient, Reading,
        TreatmentType,
    };

    struct Fixture {
        db: Database,
        patient: Patient,
        form: ConsentForm,
    }

    fn setup() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let patient = db
            .insert_patient(Patient::from_new(NewPatient::new(
                "Thandi",
                "Nkosi",
                "1988-04-12",
                "0825550101",
            )))
            .unwrap();
        let form = db
            .insert_consent_form(ConsentForm::from_new(NewConsentForm::new(
                &patient.id,
                "Sister Mokoena",
                TreatmentType::Lipolytic,
                "2025-03-10",
            )))
            .unwrap();
        Fixture { db, patient, form }
    }

    fn visit(patient_id: &str, form_id: &str, number: i64) -> PatientVisit {
        PatientVisit::from_new(NewPatientVisit::new(
            patient_id,
            form_id,
            VisitNumber::new(number).unwrap(),
            "2025-03-17",
            "Sister Dube",
        ))
    }

    #[test]
    fn test_create_and_get() {
        let mut fx = setup();
        let mut new = visit(&fx.patient.id, &fx.form.id, 1);
        new.vitals.pulse = Some(Reading::from(72.0));
        new.progress_notes = Some("First session".into());

        let created = fx.db.create_visit(new).unwrap();
        let retrieved = fx.db.get_visit(&created.id).unwrap().unwrap();
        assert_eq!(retrieved, created);
        assert_eq!(retrieved.vitals.pulse, Some(Reading::Number(72.0)));
    }

    #[test]
    fn test_unknown_consent_form() {
        let mut fx = setup();
        let err = fx
            .db
            .create_visit(visit(&fx.patient.id, "missing-form", 1))
            .unwrap_err();
        assert!(matches!(err, DbError::UnknownReference(_)));
        assert_eq!(fx.db.count_visits().unwrap(), 0);
    }

    #[test]
    fn test_patient_mismatch() {
        let mut fx = setup();
        let other = fx
            .db
            .insert_patient(Patient::from_new(NewPatient::new(
                "Sipho",
                "Mahlangu",
                "1975-09-30",
                "0731112222",
            )))
            .unwrap();

        let err = fx
            .db
            .create_visit(visit(&other.id, &fx.form.id, 1))
            .unwrap_err();
        assert!(matches!(err, DbError::PatientMismatch { .. }));
        assert_eq!(fx.db.count_visits_for_consent_form(&fx.form.id).unwrap(), 0);
    }

    #[test]
    fn test_duplicate_visit_number() {
        let mut fx = setup();
        fx.db
            .create_visit(visit(&fx.patient.id, &fx.form.id, 2))
            .unwrap();

        let err = fx
            .db
            .create_visit(visit(&fx.patient.id, &fx.form.id, 2))
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateVisitNumber { .. }));
        assert_eq!(fx.db.count_visits_for_consent_form(&fx.form.id).unwrap(), 1);
    }

    #[test]
    fn test_limit_checked_before_duplicate() {
        let mut fx = setup();
        for n in 1..=5 {
            fx.db
                .create_visit(visit(&fx.patient.id, &fx.form.id, n))
                .unwrap();
        }

        let err = fx
            .db
            .create_visit(visit(&fx.patient.id, &fx.form.id, 3))
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::VisitLimitExceeded { limit: 5, .. }
        ));
    }

    #[test]
    fn test_trigger_caps_direct_inserts() {
        let fx = setup();
        for n in 1..=5 {
            fx.db
                .conn()
                .execute(
                    r#"
                    INSERT INTO patient_visits (
                        id, patient_id, consent_form_id, visit_number, visit_date,
                        nurse_name, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, '2025-03-17', 'Sister Dube',
                              '2025-03-17 09:00:00+00:00', '2025-03-17 09:00:00+00:00')
                    "#,
                    params![format!("v{n}"), fx.patient.id, fx.form.id, n],
                )
                .unwrap();
        }

        // BEFORE INSERT triggers fire ahead of the unique index
        let err = fx
            .db
            .conn()
            .execute(
                r#"
                INSERT INTO patient_visits (
                    id, patient_id, consent_form_id, visit_number, visit_date,
                    nurse_name, created_at, updated_at
                ) VALUES ('v6', ?1, ?2, 1, '2025-03-17', 'Sister Dube',
                          '2025-03-17 09:00:00+00:00', '2025-03-17 09:00:00+00:00')
                "#,
                params![fx.patient.id, fx.form.id],
            )
            .unwrap_err();
        assert_eq!(constraint_message(&err), Some(VISIT_LIMIT_MESSAGE));
    }

    #[test]
    fn test_update_visit() {
        let mut fx = setup();
        let created = fx
            .db
            .create_visit(visit(&fx.patient.id, &fx.form.id, 1))
            .unwrap();

        let updated = fx
            .db
            .update_visit(
                &created.id,
                VisitUpdate {
                    progress_notes: Some("Good response".into()),
                    next_appointment_date: Some("2025-03-31".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.progress_notes.as_deref(), Some("Good response"));

        let retrieved = fx.db.get_visit(&created.id).unwrap().unwrap();
        assert_eq!(retrieved.next_appointment_date.as_deref(), Some("2025-03-31"));
        assert_eq!(retrieved.visit_number, created.visit_number);

        assert!(fx
            .db
            .update_visit("missing", VisitUpdate::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_list_and_delete() {
        let mut fx = setup();
        let mut later = visit(&fx.patient.id, &fx.form.id, 2);
        later.visit_date = "2025-03-24".into();
        fx.db.create_visit(later).unwrap();
        let first = fx
            .db
            .create_visit(visit(&fx.patient.id, &fx.form.id, 1))
            .unwrap();

        let numbers: Vec<u8> = fx
            .db
            .list_visits_for_consent_form(&fx.form.id)
            .unwrap()
            .iter()
            .map(|v| v.visit_number.get())
            .collect();
        assert_eq!(numbers, vec![1, 2]);

        let dates: Vec<String> = fx
            .db
            .list_visits_for_patient(&fx.patient.id)
            .unwrap()
            .into_iter()
            .map(|v| v.visit_date)
            .collect();
        assert_eq!(dates, vec!["2025-03-17", "2025-03-24"]);

        assert!(fx.db.delete_visit(&first.id).unwrap());
        assert!(!fx.db.delete_visit(&first.id).unwrap());
        assert_eq!(fx.db.count_visits_for_consent_form(&fx.form.id).unwrap(), 1);
    }
}
