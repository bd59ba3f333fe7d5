//! SQLite schema definition.

/// Message raised by the visit cap trigger.
pub const VISIT_LIMIT_MESSAGE: &str = "visit limit exceeded";

/// Message raised when a visit names a patient other than its form's.
pub const PATIENT_MISMATCH_MESSAGE: &str = "visit patient does not match consent form";

/// Complete database schema for the clinic.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Users
-- ============================================================================

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL                       -- pbkdf2$<iterations>$<salt>$<hash> or legacy plaintext
);

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    date_of_birth TEXT NOT NULL,                 -- YYYY-MM-DD
    gender TEXT CHECK (gender IN ('male', 'female', 'other')),
    id_number TEXT,
    address TEXT,
    phone TEXT NOT NULL,
    email TEXT,
    next_of_kin TEXT,
    next_of_kin_phone TEXT,
    relationship TEXT,
    payment_method TEXT NOT NULL DEFAULT 'cash'
        CHECK (payment_method IN ('cash', 'card', 'eft', 'medical_aid')),
    medical_aid_number TEXT,
    medical_aid_provider TEXT,
    medical_aid_principal_member TEXT,
    medical_aid_dependent_code TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_patients_created ON patients(created_at);
CREATE INDEX IF NOT EXISTS idx_patients_last_name ON patients(last_name);

-- ============================================================================
-- Consent Forms (created once, never edited)
-- ============================================================================

CREATE TABLE IF NOT EXISTS consent_forms (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    nurse_name TEXT NOT NULL,
    treatment_type TEXT NOT NULL,
    treatment_name TEXT,
    treatment_date TEXT NOT NULL,
    custom_terms TEXT,
    vitals TEXT NOT NULL DEFAULT '{}',           -- JSON object
    treatment_specifics TEXT,                    -- JSON object
    medical_profile TEXT NOT NULL DEFAULT '{}',  -- JSON object
    signature TEXT,
    consent_given INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_consent_forms_patient ON consent_forms(patient_id);
CREATE INDEX IF NOT EXISTS idx_consent_forms_created ON consent_forms(created_at);

-- ============================================================================
-- Treatments
-- ============================================================================

CREATE TABLE IF NOT EXISTS treatments (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    consent_template TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

-- ============================================================================
-- Patient Visits (at most five per consent form)
-- ============================================================================

CREATE TABLE IF NOT EXISTS patient_visits (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES patients(id),
    consent_form_id TEXT NOT NULL REFERENCES consent_forms(id),
    visit_number INTEGER NOT NULL CHECK (visit_number BETWEEN 1 AND 5),
    visit_date TEXT NOT NULL,
    nurse_name TEXT NOT NULL,
    progress_notes TEXT,
    next_appointment_date TEXT,
    vitals TEXT NOT NULL DEFAULT '{}',           -- JSON object
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (consent_form_id, visit_number)
);

CREATE INDEX IF NOT EXISTS idx_visits_patient ON patient_visits(patient_id);

-- Cap visits per consent form
CREATE TRIGGER IF NOT EXISTS patient_visits_limit BEFORE INSERT ON patient_visits
BEGIN
    SELECT CASE
        WHEN (SELECT COUNT(*) FROM patient_visits
              WHERE consent_form_id = new.consent_form_id) >= 5 THEN
            RAISE(ABORT, 'visit limit exceeded')
    END;
END;

-- Visit must belong to the consent form's patient
CREATE TRIGGER IF NOT EXISTS patient_visits_owner BEFORE INSERT ON patient_visits
BEGIN
    SELECT CASE
        WHEN EXISTS (SELECT 1 FROM consent_forms
                     WHERE id = new.consent_form_id
                       AND patient_id <> new.patient_id) THEN
            RAISE(ABORT, 'visit patient does not match consent form')
    END;
END;
"#;
