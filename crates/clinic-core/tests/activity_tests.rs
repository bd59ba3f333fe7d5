//! Daily activity integration tests.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use clinic_core::activity::ActivitySource;
use clinic_core::db::Database;
use clinic_core::models::{ConsentForm, NewConsentForm, NewPatient, Patient, TreatmentType};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()
}

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 11, hour, 0, 0).unwrap()
}

fn register(db: &Database, name: &str, created_at: DateTime<Utc>) -> Patient {
    let mut patient = Patient::from_new(NewPatient::new(name, "Test", "1990-01-01", "0820000000"));
    patient.created_at = created_at;
    patient.updated_at = created_at;
    db.insert_patient(patient).unwrap()
}

fn consent(db: &Database, patient: &Patient, created_at: DateTime<Utc>) -> ConsentForm {
    let mut form = ConsentForm::from_new(NewConsentForm::new(
        &patient.id,
        "Sister Mokoena",
        TreatmentType::Lipolytic,
        "2025-03-11",
    ));
    form.created_at = created_at;
    form.updated_at = created_at;
    db.insert_consent_form(form).unwrap()
}

#[test]
fn test_registration_appears_in_activity() {
    let db = Database::open_in_memory().unwrap();
    let a = register(&db, "A", at(9));

    let activity = db.patient_activity_on(day()).unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].patient.id, a.id);
    assert_eq!(activity[0].last_activity, at(9));
}

#[test]
fn test_consent_form_moves_activity_forward() {
    let db = Database::open_in_memory().unwrap();
    let a = register(&db, "A", at(9));
    consent(&db, &a, at(14));

    let activity = db.patient_activity_on(day()).unwrap();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].last_activity, at(14));
    assert_eq!(activity[0].source, ActivitySource::ConsentForm);
}

#[test]
fn test_most_recent_registration_first() {
    let db = Database::open_in_memory().unwrap();
    let a = register(&db, "A", at(9));
    let b = register(&db, "B", at(10));

    let ids: Vec<String> = db
        .patient_activity_on(day())
        .unwrap()
        .into_iter()
        .map(|e| e.patient.id)
        .collect();
    assert_eq!(ids, vec![b.id, a.id]);
}

#[test]
fn test_dashboard_counts_each_active_patient_once() {
    let db = Database::open_in_memory().unwrap();
    register(&db, "New1", at(8));
    register(&db, "New2", at(9));
    let returning = register(&db, "Returning", at(9) - Duration::days(40));
    consent(&db, &returning, at(11));
    // Consent from another day does not count
    consent(&db, &returning, at(11) - Duration::days(3));

    let stats = db.dashboard_stats_on(day()).unwrap();
    assert_eq!(stats.today_visits, 3);
    assert_eq!(stats.total_patients, 3);
    assert_eq!(stats.consent_forms, 2);
    assert_eq!(stats.pending_reports, 0);
}

#[test]
fn test_inactive_day_is_empty() {
    let db = Database::open_in_memory().unwrap();
    register(&db, "A", at(9));

    let next_day = day().succ_opt().unwrap();
    assert!(db.patient_activity_on(next_day).unwrap().is_empty());
    assert_eq!(db.dashboard_stats_on(next_day).unwrap().today_visits, 0);
}
