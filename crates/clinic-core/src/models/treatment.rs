//! Treatment catalog models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{non_blank, ValidationErrors};

/// A treatment offered by the clinic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Consent wording shown to the patient
    pub consent_template: Option<String>,
    /// Inactive treatments are hidden from listings
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for a catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewTreatment {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub consent_template: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl NewTreatment {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            description: None,
            consent_template: None,
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("name", &self.name);
        errors.into_result()
    }
}

impl Treatment {
    pub fn from_new(new: NewTreatment) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            description: non_blank(new.description),
            consent_template: non_blank(new.consent_template),
            is_active: new.is_active,
            created_at: Utc::now(),
        }
    }
}
