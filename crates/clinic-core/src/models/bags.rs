//! Semi-structured clinical data captured on consent forms and visits.
//!
//! Known keys are typed; anything else is carried through untouched so older
//! and newer clients can share the same records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single vital-sign reading. Nurses type either a number or free text
/// such as `"120/80"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Text(String),
}

impl From<f64> for Reading {
    fn from(value: f64) -> Self {
        Reading::Number(value)
    }
}

impl From<&str> for Reading {
    fn from(value: &str) -> Self {
        Reading::Text(value.to_string())
    }
}

/// Vital signs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// Blood pressure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse: Option<Reading>,
    /// Temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<Reading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<Reading>,
    /// Blood glucose
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hgt: Option<Reading>,
    /// Haemoglobin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hb: Option<Reading>,
    /// Unrecognized keys, passed through as-is
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Medical background recorded at consent time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Treatment-specific answers; the shape depends on the treatment type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreatmentSpecifics(pub BTreeMap<String, Value>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vitals_mixed_readings() {
        let vitals: Vitals = serde_json::from_str(
            r#"{"bp": "120/80", "pulse": 72, "temp": "36.6", "spo2": 98}"#,
        )
        .unwrap();

        assert_eq!(vitals.bp, Some(Reading::Text("120/80".into())));
        assert_eq!(vitals.pulse, Some(Reading::Number(72.0)));
        assert_eq!(vitals.temp, Some(Reading::Text("36.6".into())));
        assert_eq!(vitals.extra.get("spo2"), Some(&Value::from(98)));
    }

    #[test]
    fn test_vitals_unknown_keys_survive_roundtrip() {
        let json = r#"{"bp":"118/76","spo2":97}"#;
        let vitals: Vitals = serde_json::from_str(json).unwrap();
        let back = serde_json::to_value(&vitals).unwrap();
        assert_eq!(back["spo2"], 97);
        assert_eq!(back["bp"], "118/76");
        assert!(back.get("pulse").is_none());
    }

    #[test]
    fn test_medical_profile_camel_case() {
        let profile: MedicalProfile = serde_json::from_str(
            r#"{"allergies": "Penicillin", "medicalHistory": "Asthma", "smoker": true}"#,
        )
        .unwrap();
        assert_eq!(profile.allergies.as_deref(), Some("Penicillin"));
        assert_eq!(profile.medical_history.as_deref(), Some("Asthma"));
        assert_eq!(profile.extra.get("smoker"), Some(&Value::Bool(true)));
    }
}
