//! Patient visit models.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::bags::Vitals;
use super::validation::{blank_as_none, non_blank, parse_date, ValidationErrors};

/// Maximum number of visits recorded under one consent form.
pub const MAX_VISITS_PER_CONSENT_FORM: u32 = 5;

/// Slot of a visit within a treatment course, 1 through 5.
///
/// Serialized as text (`"3"`) to match what clients send; integers are
/// accepted on input as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VisitNumber(u8);

impl VisitNumber {
    pub const FIRST: VisitNumber = VisitNumber(1);
    pub const LAST: VisitNumber = VisitNumber(MAX_VISITS_PER_CONSENT_FORM as u8);

    pub fn new(value: i64) -> Option<Self> {
        if (i64::from(Self::FIRST.0)..=i64::from(Self::LAST.0)).contains(&value) {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All valid slots in order.
    pub fn all() -> impl Iterator<Item = VisitNumber> {
        (Self::FIRST.0..=Self::LAST.0).map(VisitNumber)
    }
}

impl fmt::Display for VisitNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for VisitNumber {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        VisitNumber::new(value).ok_or_else(|| {
            format!(
                "visit number must be between {} and {}, got {}",
                VisitNumber::FIRST,
                VisitNumber::LAST,
                value
            )
        })
    }
}

impl Serialize for VisitNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for VisitNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        let value = match Raw::deserialize(deserializer)? {
            Raw::Number(n) => n,
            Raw::Text(s) => s.trim().parse::<i64>().map_err(|_| {
                serde::de::Error::custom(format!("visit number must be an integer, got {s:?}"))
            })?,
        };
        VisitNumber::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// One follow-up visit under a consent form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientVisit {
    pub id: String,
    /// Must match the consent form's patient
    pub patient_id: String,
    pub consent_form_id: String,
    pub visit_number: VisitNumber,
    /// `YYYY-MM-DD`
    pub visit_date: String,
    pub nurse_name: String,
    pub progress_notes: Option<String>,
    pub next_appointment_date: Option<String>,
    pub vitals: Vitals,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for recording a visit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewPatientVisit {
    pub patient_id: String,
    pub consent_form_id: String,
    pub visit_number: VisitNumber,
    pub visit_date: String,
    pub nurse_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub progress_notes: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub next_appointment_date: Option<String>,
    #[serde(default)]
    pub vitals: Vitals,
}

impl NewPatientVisit {
    pub fn new(
        patient_id: &str,
        consent_form_id: &str,
        visit_number: VisitNumber,
        visit_date: &str,
        nurse_name: &str,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            consent_form_id: consent_form_id.into(),
            visit_number,
            visit_date: visit_date.into(),
            nurse_name: nurse_name.into(),
            progress_notes: None,
            next_appointment_date: None,
            vitals: Vitals::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("patientId", &self.patient_id);
        errors.require("consentFormId", &self.consent_form_id);
        errors.require("nurseName", &self.nurse_name);
        errors.require_date("visitDate", &self.visit_date);
        if let Some(next) = &self.next_appointment_date {
            if parse_date(next).is_none() {
                errors.add("nextAppointmentDate", "must be a date in YYYY-MM-DD format");
            }
        }
        errors.into_result()
    }
}

/// Partial update of a visit. Absent fields are left unchanged.
///
/// Ownership and slot are fixed at creation; the corresponding fields exist
/// only so that a payload carrying them can be rejected with a clear message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitUpdate {
    #[serde(default)]
    pub visit_date: Option<String>,
    #[serde(default)]
    pub nurse_name: Option<String>,
    /// An empty string clears the notes
    #[serde(default)]
    pub progress_notes: Option<String>,
    /// An empty string clears the appointment
    #[serde(default)]
    pub next_appointment_date: Option<String>,
    #[serde(default)]
    pub vitals: Option<Vitals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_form_id: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_number: Option<serde_json::Value>,
}

impl VisitUpdate {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let fixed = [
            ("patientId", &self.patient_id),
            ("consentFormId", &self.consent_form_id),
            ("visitNumber", &self.visit_number),
        ];
        for (field, value) in fixed {
            if value.is_some() {
                errors.add(field, "cannot be changed after the visit is recorded");
            }
        }

        if let Some(date) = &self.visit_date {
            errors.require_date("visitDate", date);
        }
        if let Some(nurse) = &self.nurse_name {
            errors.require("nurseName", nurse);
        }
        if let Some(next) = self.next_appointment_date.as_deref().map(str::trim) {
            if !next.is_empty() && parse_date(next).is_none() {
                errors.add("nextAppointmentDate", "must be a date in YYYY-MM-DD format");
            }
        }

        errors.into_result()
    }

    /// True when the update carries no editable field.
    pub fn is_empty(&self) -> bool {
        self.visit_date.is_none()
            && self.nurse_name.is_none()
            && self.progress_notes.is_none()
            && self.next_appointment_date.is_none()
            && self.vitals.is_none()
    }
}

impl PatientVisit {
    pub fn from_new(new: NewPatientVisit) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: new.patient_id.trim().to_string(),
            consent_form_id: new.consent_form_id.trim().to_string(),
            visit_number: new.visit_number,
            visit_date: new.visit_date.trim().to_string(),
            nurse_name: new.nurse_name.trim().to_string(),
            progress_notes: non_blank(new.progress_notes),
            next_appointment_date: non_blank(new.next_appointment_date),
            vitals: new.vitals,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the mutable fields of an update.
    pub fn apply(&mut self, update: VisitUpdate) {
        if let Some(date) = update.visit_date {
            self.visit_date = date.trim().to_string();
        }
        if let Some(nurse) = update.nurse_name {
            self.nurse_name = nurse.trim().to_string();
        }
        if let Some(notes) = update.progress_notes {
            self.progress_notes = non_blank(Some(notes));
        }
        if let Some(next) = update.next_appointment_date {
            self.next_appointment_date = non_blank(Some(next));
        }
        if let Some(vitals) = update.vitals {
            self.vitals = vitals;
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(n: i64) -> VisitNumber {
        VisitNumber::new(n).unwrap()
    }

    #[test]
    fn test_visit_number_bounds() {
        assert!(VisitNumber::new(0).is_none());
        assert!(VisitNumber::new(6).is_none());
        assert!(VisitNumber::new(-1).is_none());
        assert_eq!(VisitNumber::all().count(), 5);
        assert_eq!(number(3).get(), 3);
    }

    #[test]
    fn test_visit_number_serializes_as_text() {
        assert_eq!(serde_json::to_string(&number(4)).unwrap(), r#""4""#);
    }

    #[test]
    fn test_visit_number_accepts_text_and_integer() {
        let from_text: VisitNumber = serde_json::from_str(r#""2""#).unwrap();
        let from_int: VisitNumber = serde_json::from_str("2").unwrap();
        assert_eq!(from_text, from_int);

        assert!(serde_json::from_str::<VisitNumber>(r#""6""#).is_err());
        assert!(serde_json::from_str::<VisitNumber>("0").is_err());
        assert!(serde_json::from_str::<VisitNumber>(r#""two""#).is_err());
    }

    #[test]
    fn test_new_visit_validation() {
        let mut visit = NewPatientVisit::new("p-1", "c-1", number(1), "2025-03-11", "Sister Dube");
        assert!(visit.validate().is_ok());

        visit.visit_date = "11 March".into();
        visit.next_appointment_date = Some("soon".into());
        let errors = visit.validate().unwrap_err();
        assert!(errors.has_field("visitDate"));
        assert!(errors.has_field("nextAppointmentDate"));
    }

    #[test]
    fn test_update_rejects_fixed_fields() {
        let update: VisitUpdate =
            serde_json::from_str(r#"{"progressNotes": "healing well", "visitNumber": "2"}"#)
                .unwrap();
        let errors = update.validate().unwrap_err();
        assert!(errors.has_field("visitNumber"));
        assert_eq!(errors.errors.len(), 1);
    }

    #[test]
    fn test_update_is_empty() {
        let update: VisitUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.is_empty());

        let update: VisitUpdate = serde_json::from_str(r#"{"progressNotes": ""}"#).unwrap();
        assert!(!update.is_empty());
    }

    #[test]
    fn test_apply_update() {
        let mut visit = PatientVisit::from_new(NewPatientVisit::new(
            "p-1",
            "c-1",
            number(2),
            "2025-03-11",
            "Sister Dube",
        ));
        let created = visit.created_at;

        visit.apply(VisitUpdate {
            progress_notes: Some("Swelling reduced".into()),
            next_appointment_date: Some("2025-03-25".into()),
            ..Default::default()
        });
        assert_eq!(visit.progress_notes.as_deref(), Some("Swelling reduced"));
        assert_eq!(visit.next_appointment_date.as_deref(), Some("2025-03-25"));
        assert_eq!(visit.visit_number, number(2));
        assert_eq!(visit.created_at, created);

        visit.apply(VisitUpdate {
            progress_notes: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(visit.progress_notes, None);
    }
}
