//! Daily patient activity.
//!
//! A patient is active on a day if they registered that day or had a consent
//! form created that day. Both sources are merged into one list with a
//! single entry per patient, ordered by most recent activity.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Patient;

/// What made a patient active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivitySource {
    Registration,
    ConsentForm,
}

/// A patient with their latest activity on the day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientActivity {
    pub patient: Patient,
    pub last_activity: DateTime<Utc>,
    pub source: ActivitySource,
}

impl PatientActivity {
    pub fn registration(patient: Patient) -> Self {
        Self {
            last_activity: patient.created_at,
            patient,
            source: ActivitySource::Registration,
        }
    }

    pub fn consent_form(patient: Patient, last_activity: DateTime<Utc>) -> Self {
        Self {
            patient,
            last_activity,
            source: ActivitySource::ConsentForm,
        }
    }
}

/// Summary counters for the dashboard.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_patients: u64,
    pub consent_forms: u64,
    /// Patients active today, each counted once
    pub today_visits: u64,
    /// Always zero; report tracking is not implemented
    pub pending_reports: u64,
}

/// Merge registrations and consent activity into one entry per patient.
///
/// Registrations are applied first. A later entry for the same patient
/// replaces the current one only if its timestamp is strictly later. The
/// result is sorted newest first, ties broken by patient id.
pub fn merge_activity(
    registrations: impl IntoIterator<Item = PatientActivity>,
    consents: impl IntoIterator<Item = PatientActivity>,
) -> Vec<PatientActivity> {
    let mut by_patient: HashMap<String, PatientActivity> = HashMap::new();

    for entry in registrations.into_iter().chain(consents) {
        match by_patient.get(&entry.patient.id) {
            Some(current) if current.last_activity >= entry.last_activity => {}
            _ => {
                by_patient.insert(entry.patient.id.clone(), entry);
            }
        }
    }

    let mut merged: Vec<PatientActivity> = by_patient.into_values().collect();
    merged.sort_by(newest_first);
    merged
}

fn newest_first(a: &PatientActivity, b: &PatientActivity) -> Ordering {
    b.last_activity
        .cmp(&a.last_activity)
        .then_with(|| a.patient.id.cmp(&b.patient.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPatient;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 11, 6, 0, 0).unwrap()
    }

    fn patient(id: &str, created_at: DateTime<Utc>) -> Patient {
        let mut patient =
            Patient::from_new(NewPatient::new("Test", id, "1990-01-01", "0820000000"));
        patient.id = id.to_string();
        patient.created_at = created_at;
        patient.updated_at = created_at;
        patient
    }

    #[test]
    fn test_registration_only() {
        let a = patient("a", base() + Duration::hours(1));
        let b = patient("b", base() + Duration::hours(2));

        let merged = merge_activity(
            vec![PatientActivity::registration(a), PatientActivity::registration(b)],
            vec![],
        );
        let ids: Vec<&str> = merged.iter().map(|e| e.patient.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(merged.iter().all(|e| e.source == ActivitySource::Registration));
    }

    #[test]
    fn test_consent_later_than_registration_wins() {
        let a = patient("a", base() + Duration::hours(1));
        let b = patient("b", base() + Duration::hours(2));

        let merged = merge_activity(
            vec![
                PatientActivity::registration(a.clone()),
                PatientActivity::registration(b),
            ],
            vec![PatientActivity::consent_form(a, base() + Duration::hours(3))],
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].patient.id, "a");
        assert_eq!(merged[0].source, ActivitySource::ConsentForm);
        assert_eq!(merged[0].last_activity, base() + Duration::hours(3));
    }

    #[test]
    fn test_earlier_consent_keeps_registration() {
        let a = patient("a", base() + Duration::hours(5));

        let merged = merge_activity(
            vec![PatientActivity::registration(a.clone())],
            vec![PatientActivity::consent_form(a, base() + Duration::hours(1))],
        );

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, ActivitySource::Registration);
        assert_eq!(merged[0].last_activity, base() + Duration::hours(5));
    }

    #[test]
    fn test_ties_ordered_by_id() {
        let at = base();
        let merged = merge_activity(
            vec![
                PatientActivity::registration(patient("c", at)),
                PatientActivity::registration(patient("a", at)),
            ],
            vec![PatientActivity::consent_form(patient("b", at), at)],
        );
        let ids: Vec<&str> = merged.iter().map(|e| e.patient.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_stats_serialize_camel_case() {
        let stats = DashboardStats {
            total_patients: 12,
            consent_forms: 30,
            today_visits: 3,
            pending_reports: 0,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["totalPatients"], 12);
        assert_eq!(json["todayVisits"], 3);
        assert_eq!(json["pendingReports"], 0);
    }

    /// (patient index, minutes after base)
    fn entries() -> impl Strategy<Value = Vec<(u8, i64)>> {
        prop::collection::vec((0u8..6, 0i64..600), 0..12)
    }

    fn build(
        entries: &[(u8, i64)],
        make: fn(Patient, DateTime<Utc>) -> PatientActivity,
    ) -> Vec<PatientActivity> {
        entries
            .iter()
            .map(|(idx, minutes)| {
                let at = base() + Duration::minutes(*minutes);
                make(patient(&format!("p{idx}"), at), at)
            })
            .collect()
    }

    proptest! {
        #[test]
        fn merged_has_one_entry_per_patient(regs in entries(), consents in entries()) {
            let merged = merge_activity(
                build(&regs, |p, _| PatientActivity::registration(p)),
                build(&consents, PatientActivity::consent_form),
            );

            let mut ids: Vec<&str> = merged.iter().map(|e| e.patient.id.as_str()).collect();
            let total = ids.len();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), total);

            let mut expected: Vec<u8> = regs.iter().chain(&consents).map(|(i, _)| *i).collect();
            expected.sort();
            expected.dedup();
            prop_assert_eq!(total, expected.len());
        }

        #[test]
        fn merged_is_newest_first(regs in entries(), consents in entries()) {
            let merged = merge_activity(
                build(&regs, |p, _| PatientActivity::registration(p)),
                build(&consents, PatientActivity::consent_form),
            );
            for pair in merged.windows(2) {
                prop_assert!(pair[0].last_activity >= pair[1].last_activity);
            }
        }

        #[test]
        fn merged_keeps_latest_timestamp(regs in entries(), consents in entries()) {
            let merged = merge_activity(
                build(&regs, |p, _| PatientActivity::registration(p)),
                build(&consents, PatientActivity::consent_form),
            );
            for entry in &merged {
                let latest = regs
                    .iter()
                    .chain(&consents)
                    .filter(|(idx, _)| format!("p{idx}") == entry.patient.id)
                    .map(|(_, minutes)| base() + Duration::minutes(*minutes))
                    .max();
                prop_assert_eq!(Some(entry.last_activity), latest);
            }
        }
    }
}
