//! Consent form models.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bags::{MedicalProfile, TreatmentSpecifics, Vitals};
use super::patient::UnknownVariant;
use super::validation::{blank_as_none, non_blank, ValidationErrors};

/// Treatments offered by the clinic. Each has its own consent template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentType {
    Lipolytic,
    OzempicMounjaro,
    SkinRemoval,
    IvTherapy,
    ToothWhitening,
    /// Free-form treatment with custom terms
    Other,
}

impl TreatmentType {
    pub const ALL: [TreatmentType; 6] = [
        TreatmentType::Lipolytic,
        TreatmentType::OzempicMounjaro,
        TreatmentType::SkinRemoval,
        TreatmentType::IvTherapy,
        TreatmentType::ToothWhitening,
        TreatmentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TreatmentType::Lipolytic => "lipolytic",
            TreatmentType::OzempicMounjaro => "ozempic_mounjaro",
            TreatmentType::SkinRemoval => "skin_removal",
            TreatmentType::IvTherapy => "iv_therapy",
            TreatmentType::ToothWhitening => "tooth_whitening",
            TreatmentType::Other => "other",
        }
    }

    /// Catalog display name. `Other` has none; the form supplies it.
    pub fn display_name(&self) -> Option<&'static str> {
        match self {
            TreatmentType::Lipolytic => Some("Lipolytic Injections"),
            TreatmentType::OzempicMounjaro => Some("Ozempic/Mounjaro Weight Loss"),
            TreatmentType::SkinRemoval => Some("Skin Tag/Mole/Wart Removal"),
            TreatmentType::IvTherapy => Some("IV Therapy"),
            TreatmentType::ToothWhitening => Some("Tooth Whitening"),
            TreatmentType::Other => None,
        }
    }
}

impl FromStr for TreatmentType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TreatmentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("treatment type", s))
    }
}

/// A signed consent form for one treatment episode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsentForm {
    pub id: String,
    /// Owning patient
    pub patient_id: String,
    /// Nurse who took consent
    pub nurse_name: String,
    pub treatment_type: TreatmentType,
    /// Required when the type is `Other`
    pub treatment_name: Option<String>,
    /// `YYYY-MM-DD`
    pub treatment_date: String,
    pub custom_terms: Option<String>,
    pub vitals: Vitals,
    pub treatment_specifics: Option<TreatmentSpecifics>,
    pub medical_profile: MedicalProfile,
    /// Signature image, usually a base64 PNG data URL
    pub signature: Option<String>,
    pub consent_given: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for a new consent form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewConsentForm {
    pub patient_id: String,
    pub nurse_name: String,
    pub treatment_type: TreatmentType,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub treatment_name: Option<String>,
    pub treatment_date: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub custom_terms: Option<String>,
    pub vitals: Vitals,
    #[serde(default)]
    pub treatment_specifics: Option<TreatmentSpecifics>,
    #[serde(default)]
    pub medical_profile: MedicalProfile,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub signature: Option<String>,
    #[serde(default)]
    pub consent_given: bool,
}

impl NewConsentForm {
    /// Minimal signed payload.
    pub fn new(
        patient_id: &str,
        nurse_name: &str,
        treatment_type: TreatmentType,
        treatment_date: &str,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            nurse_name: nurse_name.into(),
            treatment_type,
            treatment_name: None,
            treatment_date: treatment_date.into(),
            custom_terms: None,
            vitals: Vitals::default(),
            treatment_specifics: None,
            medical_profile: MedicalProfile::default(),
            signature: Some("data:image/png;base64,iVBORw0KGgo=".into()),
            consent_given: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("patientId", &self.patient_id);
        errors.require("nurseName", &self.nurse_name);
        errors.require_date("treatmentDate", &self.treatment_date);

        if self.treatment_type == TreatmentType::Other
            && non_blank(self.treatment_name.clone()).is_none()
        {
            errors.add("treatmentName", "is required for other treatments");
        }
        if !self.consent_given {
            errors.add("consentGiven", "patient consent is required");
        }
        if non_blank(self.signature.clone()).is_none() {
            errors.add("signature", "is required");
        }

        errors.into_result()
    }
}

impl ConsentForm {
    pub fn from_new(new: NewConsentForm) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            patient_id: new.patient_id.trim().to_string(),
            nurse_name: new.nurse_name.trim().to_string(),
            treatment_type: new.treatment_type,
            treatment_name: non_blank(new.treatment_name),
            treatment_date: new.treatment_date.trim().to_string(),
            custom_terms: non_blank(new.custom_terms),
            vitals: new.vitals,
            treatment_specifics: new.treatment_specifics,
            medical_profile: new.medical_profile,
            signature: non_blank(new.signature),
            consent_given: new.consent_given,
            created_at: now,
            updated_at: now,
        }
    }

    /// Name shown on lists and exports.
    pub fn display_name(&self) -> &str {
        match (&self.treatment_name, self.treatment_type.display_name()) {
            (Some(name), _) => name,
            (None, Some(catalog)) => catalog,
            (None, None) => "Other",
        }
    }
}
