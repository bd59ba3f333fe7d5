//! Patient database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::{is_foreign_key_failure, Database, DbError, DbResult};
use crate::models::{Gender, NewPatient, Patient, PaymentMethod};

/// Column list shared by every patient query, in [`PatientRow`] order.
pub(crate) const PATIENT_COLUMNS: &str = r#"
    p.id, p.first_name, p.last_name, p.date_of_birth, p.gender, p.id_number,
    p.address, p.phone, p.email, p.next_of_kin, p.next_of_kin_phone,
    p.relationship, p.payment_method, p.medical_aid_number,
    p.medical_aid_provider, p.medical_aid_principal_member,
    p.medical_aid_dependent_code, p.created_at, p.updated_at
"#;

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: Patient) -> DbResult<Patient> {
        self.conn.execute(
            r#"
            INSERT INTO patients (
                id, first_name, last_name, date_of_birth, gender, id_number,
                address, phone, email, next_of_kin, next_of_kin_phone,
                relationship, payment_method, medical_aid_number,
                medical_aid_provider, medical_aid_principal_member,
                medical_aid_dependent_code, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
            params![
                patient.id,
                patient.first_name,
                patient.last_name,
                patient.date_of_birth,
                patient.gender.map(|g| g.as_str()),
                patient.id_number,
                patient.address,
                patient.phone,
                patient.email,
                patient.next_of_kin,
                patient.next_of_kin_phone,
                patient.relationship,
                patient.payment_method.as_str(),
                patient.medical_aid_number,
                patient.medical_aid_provider,
                patient.medical_aid_principal_member,
                patient.medical_aid_dependent_code,
                patient.created_at,
                patient.updated_at,
            ],
        )?;
        Ok(patient)
    }

    /// Replace the editable fields of a patient.
    ///
    /// Returns `None` if the patient does not exist.
    pub fn update_patient(&self, id: &str, changes: NewPatient) -> DbResult<Option<Patient>> {
        let Some(mut patient) = self.get_patient(id)? else {
            return Ok(None);
        };
        patient.apply(changes);

        self.conn.execute(
            r#"
            UPDATE patients SET
                first_name = ?2,
                last_name = ?3,
                date_of_birth = ?4,
                gender = ?5,
                id_number = ?6,
                address = ?7,
                phone = ?8,
                email = ?9,
                next_of_kin = ?10,
                next_of_kin_phone = ?11,
                relationship = ?12,
                payment_method = ?13,
                medical_aid_number = ?14,
                medical_aid_provider = ?15,
                medical_aid_principal_member = ?16,
                medical_aid_dependent_code = ?17,
                updated_at = ?18
            WHERE id = ?1
            "#,
            params![
                patient.id,
                patient.first_name,
                patient.last_name,
                patient.date_of_birth,
                patient.gender.map(|g| g.as_str()),
                patient.id_number,
                patient.address,
                patient.phone,
                patient.email,
                patient.next_of_kin,
                patient.next_of_kin_phone,
                patient.relationship,
                patient.payment_method.as_str(),
                patient.medical_aid_number,
                patient.medical_aid_provider,
                patient.medical_aid_principal_member,
                patient.medical_aid_dependent_code,
                patient.updated_at,
            ],
        )?;
        Ok(Some(patient))
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                &format!("SELECT {PATIENT_COLUMNS} FROM patients p WHERE p.id = ?"),
                [id],
                PatientRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List all patients, newest registration first.
    pub fn list_patients(&self) -> DbResult<Vec<Patient>> {
        self.query_patients(
            &format!("SELECT {PATIENT_COLUMNS} FROM patients p ORDER BY p.created_at DESC"),
            [],
        )
    }

    /// Case-insensitive substring search on first name, last name and phone,
    /// newest registration first. Case folding covers non-ASCII letters.
    pub fn search_patients(&self, query: &str) -> DbResult<Vec<Patient>> {
        let pattern = format!("%{}%", escape_like(&query.trim().to_lowercase()));
        self.query_patients(
            &format!(
                r#"
                SELECT {PATIENT_COLUMNS}
                FROM patients p
                WHERE lower_unicode(p.first_name) LIKE ?1 ESCAPE '\'
                   OR lower_unicode(p.last_name) LIKE ?1 ESCAPE '\'
                   OR p.phone LIKE ?1 ESCAPE '\'
                ORDER BY p.created_at DESC
                "#
            ),
            [pattern],
        )
    }

    /// Delete a patient.
    ///
    /// Fails with [`DbError::Constraint`] while consent forms or visits still
    /// reference the patient.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        match self.conn.execute("DELETE FROM patients WHERE id = ?", [id]) {
            Ok(rows_affected) => Ok(rows_affected > 0),
            Err(e) if is_foreign_key_failure(&e) => Err(DbError::Constraint(format!(
                "patient {id} still has consent forms or visits"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub fn count_patients(&self) -> DbResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Run a patient query whose select list is [`PATIENT_COLUMNS`].
    pub(crate) fn query_patients<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
    ) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, PatientRow::from_row)?;

        let mut patients = Vec::new();
        for row in rows {
            patients.push(row?.try_into()?);
        }
        Ok(patients)
    }
}

/// Escape LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Intermediate row struct for database mapping.
pub(crate) struct PatientRow {
    id: String,
    first_name: String,
    last_name: String,
    date_of_birth: String,
    gender: Option<String>,
    id_number: Option<String>,
    address: Option<String>,
    phone: String,
    email: Option<String>,
    next_of_kin: Option<String>,
    next_of_kin_phone: Option<String>,
    relationship: Option<String>,
    payment_method: String,
    medical_aid_number: Option<String>,
    medical_aid_provider: Option<String>,
    medical_aid_principal_member: Option<String>,
    medical_aid_dependent_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PatientRow {
    /// Read the leading [`PATIENT_COLUMNS`] of a row.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            date_of_birth: row.get(3)?,
            gender: row.get(4)?,
            id_number: row.get(5)?,
            address: row.get(6)?,
            phone: row.get(7)?,
            email: row.get(8)?,
            next_of_kin: row.get(9)?,
            next_of_kin_phone: row.get(10)?,
            relationship: row.get(11)?,
            payment_method: row.get(12)?,
            medical_aid_number: row.get(13)?,
            medical_aid_provider: row.get(14)?,
            medical_aid_principal_member: row.get(15)?,
            medical_aid_dependent_code: row.get(16)?,
            created_at: row.get(17)?,
            updated_at: row.get(18)?,
        })
    }
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, Self::Error> {
        let gender = row
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(|e| DbError::Constraint(format!("{e}")))?;
        let payment_method = row
            .payment_method
            .parse::<PaymentMethod>()
            .map_err(|e| DbError::Constraint(format!("{e}")))?;

        Ok(Patient {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            date_of_birth: row.date_of_birth,
            gender,
            id_number: row.id_number,
            address: row.address,
            phone: row.phone,
            email: row.email,
            next_of_kin: row.next_of_kin,
            next_of_kin_phone: row.next_of_kin_phone,
            relationship: row.relationship,
            payment_method,
            medical_aid_number: row.medical_aid_number,
            medical_aid_provider: row.medical_aid_provider,
            medical_aid_principal_member: row.medical_aid_principal_member,
            medical_aid_dependent_code: row.medical_aid_dependent_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
