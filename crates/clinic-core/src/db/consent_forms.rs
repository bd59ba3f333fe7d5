//! Consent form database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{is_foreign_key_failure, Database, DbError, DbResult};
use crate::models::{ConsentForm, TreatmentSpecifics, TreatmentType};

const CONSENT_FORM_COLUMNS: &str = r#"
    id, patient_id, nurse_name, treatment_type, treatment_name, treatment_date,
    custom_terms, vitals, treatment_specifics, medical_profile, signature,
    consent_given, created_at, updated_at
"#;

impl Database {
    /// Insert a new consent form.
    ///
    /// Fails with [`DbError::UnknownReference`] if the patient does not exist.
    pub fn insert_consent_form(&self, form: ConsentForm) -> DbResult<ConsentForm> {
        let vitals_json = serde_json::to_string(&form.vitals)?;
        let specifics_json = form
            .treatment_specifics
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let profile_json = serde_json::to_string(&form.medical_profile)?;

        let result = self.conn.execute(
            r#"
            INSERT INTO consent_forms (
                id, patient_id, nurse_name, treatment_type, treatment_name,
                treatment_date, custom_terms, vitals, treatment_specifics,
                medical_profile, signature, consent_given, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                form.id,
                form.patient_id,
                form.nurse_name,
                form.treatment_type.as_str(),
                form.treatment_name,
                form.treatment_date,
                form.custom_terms,
                vitals_json,
                specifics_json,
                profile_json,
                form.signature,
                form.consent_given,
                form.created_at,
                form.updated_at,
            ],
        );

        match result {
            Ok(_) => Ok(form),
            Err(e) if is_foreign_key_failure(&e) => Err(DbError::UnknownReference(format!(
                "patient {}",
                form.patient_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Get a consent form by ID.
    pub fn get_consent_form(&self, id: &str) -> DbResult<Option<ConsentForm>> {
        self.conn
            .query_row(
                &format!("SELECT {CONSENT_FORM_COLUMNS} FROM consent_forms WHERE id = ?"),
                [id],
                ConsentFormRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all consent forms, newest first.
    pub fn list_consent_forms(&self) -> DbResult<Vec<ConsentForm>> {
        self.query_consent_forms(
            &format!("SELECT {CONSENT_FORM_COLUMNS} FROM consent_forms ORDER BY created_at DESC"),
            [],
        )
    }

    /// List a patient's consent forms, newest first.
    pub fn list_consent_forms_for_patient(&self, patient_id: &str) -> DbResult<Vec<ConsentForm>> {
        self.query_consent_forms(
            &format!(
                r#"
                SELECT {CONSENT_FORM_COLUMNS}
                FROM consent_forms
                WHERE patient_id = ?
                ORDER BY created_at DESC
                "#
            ),
            [patient_id],
        )
    }

    pub fn count_consent_forms(&self) -> DbResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM consent_forms", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn query_consent_forms<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> DbResult<Vec<ConsentForm>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, ConsentFormRow::from_row)?;

        let mut forms = Vec::new();
        for row in rows {
            forms.push(row?.try_into()?);
        }
        Ok(forms)
    }
}

/// Intermediate row struct for database mapping.
struct ConsentFormRow {
    id: String,
    patient_id: String,
    nurse_name: String,
    treatment_type: String,
    treatment_name: Option<String>,
    treatment_date: String,
    custom_terms: Option<String>,
    vitals: String,
    treatment_specifics: Option<String>,
    medical_profile: String,
    signature: Option<String>,
    consent_given: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConsentFormRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            nurse_name: row.get(2)?,
            treatment_type: row.get(3)?,
            treatment_name: row.get(4)?,
            treatment_date: row.get(5)?,
            custom_terms: row.get(6)?,
            vitals: row.get(7)?,
            treatment_specifics: row.get(8)?,
            medical_profile: row.get(9)?,
            signature: row.get(10)?,
            consent_given: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }
}

impl TryFrom<ConsentFormRow> for ConsentForm {
    type Error = DbError;

    fn try_from(row: ConsentFormRow) -> Result<Self, Self::Error> {
        let treatment_type = row
            .treatment_type
            .parse::<TreatmentType>()
            .map_err(|e| DbError::Constraint(format!("{e}")))?;
        let treatment_specifics = row
            .treatment_specifics
            .as_deref()
            .map(serde_json::from_str::<TreatmentSpecifics>)
            .transpose()?;

        Ok(ConsentForm {
            id: row.id,
            patient_id: row.patient_id,
            nurse_name: row.nurse_name,
            treatment_type,
            treatment_name: row.treatment_name,
            treatment_date: row.treatment_date,
            custom_terms: row.custom_terms,
            vitals: serde_json::from_str(&row.vitals)?,
            treatment_specifics,
            medical_profile: serde_json::from_str(&row.medical_profile)?,
            signature: row.signature,
            consent_given: row.consent_given,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewConsentForm, NewPatient, Patient, Reading};
    use chrono::Duration;

    fn setup_db() -> (Database, Patient) {
        let db = Database::open_in_memory().unwrap();
        let patient = db
            .insert_patient(Patient::from_new(NewPatient::new(
                "Thandi",
                "Nkosi",
                "1988-04-12",
                "0825550101",
            )))
            .unwrap();
        (db, patient)
    }

    #[test]
    fn test_insert_and_get() {
        let (db, patient) = setup_db();

        let mut payload = NewConsentForm::new(
            &patient.id,
            "Sister Mokoena",
            TreatmentType::OzempicMounjaro,
            "2025-03-10",
        );
        payload.vitals.bp = Some(Reading::from("120/80"));
        payload.vitals.weight = Some(Reading::from(91.4));
        payload.medical_profile.allergies = Some("Penicillin".into());
        let mut specifics = TreatmentSpecifics::default();
        specifics.0.insert("dose".into(), "0.25mg".into());
        payload.treatment_specifics = Some(specifics);

        let form = db.insert_consent_form(ConsentForm::from_new(payload)).unwrap();

        let retrieved = db.get_consent_form(&form.id).unwrap().unwrap();
        assert_eq!(retrieved, form);
        assert_eq!(retrieved.vitals.bp, Some(Reading::Text("120/80".into())));
        assert_eq!(
            retrieved.treatment_specifics.unwrap().0.get("dose"),
            Some(&serde_json::Value::from("0.25mg"))
        );
    }

    #[test]
    fn test_unknown_patient_rejected() {
        let (db, _) = setup_db();
        let form = ConsentForm::from_new(NewConsentForm::new(
            "no-such-patient",
            "Sister Mokoena",
            TreatmentType::Lipolytic,
            "2025-03-10",
        ));

        let err = db.insert_consent_form(form).unwrap_err();
        assert!(matches!(err, DbError::UnknownReference(_)));
        assert_eq!(db.count_consent_forms().unwrap(), 0);
    }

    #[test]
    fn test_list_for_patient_newest_first() {
        let (db, patient) = setup_db();
        let other = db
            .insert_patient(Patient::from_new(NewPatient::new(
                "Sipho",
                "Mahlangu",
                "1975-09-30",
                "0731112222",
            )))
            .unwrap();

        let now = Utc::now();
        let mut older = ConsentForm::from_new(NewConsentForm::new(
            &patient.id,
            "Sister Mokoena",
            TreatmentType::IvTherapy,
            "2025-03-01",
        ));
        older.created_at = now - Duration::days(9);
        let older = db.insert_consent_form(older).unwrap();
        let newer = db
            .insert_consent_form(ConsentForm::from_new(NewConsentForm::new(
                &patient.id,
                "Sister Mokoena",
                TreatmentType::ToothWhitening,
                "2025-03-10",
            )))
            .unwrap();
        db.insert_consent_form(ConsentForm::from_new(NewConsentForm::new(
            &other.id,
            "Sister Mokoena",
            TreatmentType::SkinRemoval,
            "2025-03-10",
        )))
        .unwrap();

        let ids: Vec<String> = db
            .list_consent_forms_for_patient(&patient.id)
            .unwrap()
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        assert_eq!(db.list_consent_forms().unwrap().len(), 3);
    }
}
