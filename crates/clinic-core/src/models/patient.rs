//! Patient models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{blank_as_none, non_blank, ValidationErrors};

/// Patient gender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" => Ok(Gender::Other),
            _ => Err(UnknownVariant::new("gender", s)),
        }
    }
}

/// How the patient pays.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Eft,
    /// Third-party health insurance
    MedicalAid,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Eft => "eft",
            PaymentMethod::MedicalAid => "medical_aid",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "eft" => Ok(PaymentMethod::Eft),
            "medical_aid" => Ok(PaymentMethod::MedicalAid),
            _ => Err(UnknownVariant::new("payment method", s)),
        }
    }
}

/// A text value that does not name any variant of an enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {}: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// A registered patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// UUID, assigned on registration
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// `YYYY-MM-DD`
    pub date_of_birth: String,
    pub gender: Option<Gender>,
    /// National ID or passport number
    pub id_number: Option<String>,
    pub address: Option<String>,
    pub phone: String,
    pub email: Option<String>,
    pub next_of_kin: Option<String>,
    pub next_of_kin_phone: Option<String>,
    pub relationship: Option<String>,
    pub payment_method: PaymentMethod,
    pub medical_aid_number: Option<String>,
    pub medical_aid_provider: Option<String>,
    pub medical_aid_principal_member: Option<String>,
    pub medical_aid_dependent_code: Option<String>,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Registration or edit payload for a patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub id_number: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub address: Option<String>,
    pub phone: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub next_of_kin: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub next_of_kin_phone: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub relationship: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub medical_aid_number: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub medical_aid_provider: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub medical_aid_principal_member: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub medical_aid_dependent_code: Option<String>,
}

impl NewPatient {
    /// Minimal payload with the required fields.
    pub fn new(first_name: &str, last_name: &str, date_of_birth: &str, phone: &str) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            date_of_birth: date_of_birth.into(),
            phone: phone.into(),
            ..Default::default()
        }
    }

    /// Validate required fields and the medical-aid rule.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("firstName", &self.first_name);
        errors.require("lastName", &self.last_name);
        errors.require("phone", &self.phone);

        if let Some(dob) = errors.require_date("dateOfBirth", &self.date_of_birth) {
            if dob > Utc::now().date_naive() {
                errors.add("dateOfBirth", "cannot be in the future");
            }
        }

        if let Some(email) = &self.email {
            if !email.contains('@') {
                errors.add("email", "must be a valid email address");
            }
        }

        if self.payment_method == PaymentMethod::MedicalAid {
            if non_blank(self.medical_aid_provider.clone()).is_none() {
                errors.add("medicalAidProvider", "is required for medical aid payments");
            }
            if non_blank(self.medical_aid_number.clone()).is_none() {
                errors.add("medicalAidNumber", "is required for medical aid payments");
            }
        }

        errors.into_result()
    }
}

impl Patient {
    /// Create a new patient from a registration payload.
    pub fn from_new(new: NewPatient) -> Self {
        let now = Utc::now();
        let mut patient = Self {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: String::new(),
            last_name: String::new(),
            date_of_birth: String::new(),
            gender: None,
            id_number: None,
            address: None,
            phone: String::new(),
            email: None,
            next_of_kin: None,
            next_of_kin_phone: None,
            relationship: None,
            payment_method: PaymentMethod::Cash,
            medical_aid_number: None,
            medical_aid_provider: None,
            medical_aid_principal_member: None,
            medical_aid_dependent_code: None,
            created_at: now,
            updated_at: now,
        };
        patient.apply(new);
        patient
    }

    /// Overwrite the editable fields from a payload.
    ///
    /// Medical-aid details are only kept for medical-aid payments.
    pub fn apply(&mut self, new: NewPatient) {
        self.first_name = new.first_name.trim().to_string();
        self.last_name = new.last_name.trim().to_string();
        self.date_of_birth = new.date_of_birth.trim().to_string();
        self.gender = new.gender;
        self.id_number = non_blank(new.id_number);
        self.address = non_blank(new.address);
        self.phone = new.phone.trim().to_string();
        self.email = non_blank(new.email);
        self.next_of_kin = non_blank(new.next_of_kin);
        self.next_of_kin_phone = non_blank(new.next_of_kin_phone);
        self.relationship = non_blank(new.relationship);
        self.payment_method = new.payment_method;

        if new.payment_method == PaymentMethod::MedicalAid {
            self.medical_aid_number = non_blank(new.medical_aid_number);
            self.medical_aid_provider = non_blank(new.medical_aid_provider);
            self.medical_aid_principal_member = non_blank(new.medical_aid_principal_member);
            self.medical_aid_dependent_code = non_blank(new.medical_aid_dependent_code);
        } else {
            self.medical_aid_number = None;
            self.medical_aid_provider = None;
            self.medical_aid_principal_member = None;
            self.medical_aid_dependent_code = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medical_aid_payload() -> NewPatient {
        NewPatient {
            payment_method: PaymentMethod::MedicalAid,
            medical_aid_provider: Some("Discovery".into()),
            medical_aid_number: Some("DH-998877".into()),
            medical_aid_dependent_code: Some("01".into()),
            ..NewPatient::new("Thandi", "Nkosi", "1988-04-12", "082 555 0101")
        }
    }

    #[test]
    fn test_from_new() {
        let patient = Patient::from_new(NewPatient::new(
            " Thandi ",
            "Nkosi",
            "1988-04-12",
            "0825550101",
        ));
        assert_eq!(patient.first_name, "Thandi");
        assert_eq!(patient.last_name, "Nkosi");
        assert_eq!(patient.payment_method, PaymentMethod::Cash);
        assert_eq!(patient.id.len(), 36); // UUID format
        assert_eq!(patient.created_at, patient.updated_at);
    }

    #[test]
    fn test_validate_required_fields() {
        let errors = NewPatient::default().validate().unwrap_err();
        assert!(errors.has_field("firstName"));
        assert!(errors.has_field("lastName"));
        assert!(errors.has_field("phone"));
        assert!(errors.has_field("dateOfBirth"));
    }

    #[test]
    fn test_validate_future_birth_date() {
        let payload = NewPatient::new("A", "B", "2999-01-01", "0821234567");
        let errors = payload.validate().unwrap_err();
        assert!(errors.has_field("dateOfBirth"));
    }

    #[test]
    fn test_medical_aid_requires_provider_and_number() {
        let payload = NewPatient {
            payment_method: PaymentMethod::MedicalAid,
            ..NewPatient::new("Thandi", "Nkosi", "1988-04-12", "0825550101")
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.has_field("medicalAidProvider"));
        assert!(errors.has_field("medicalAidNumber"));

        assert!(medical_aid_payload().validate().is_ok());
    }

    #[test]
    fn test_medical_aid_fields_cleared_for_cash() {
        let mut payload = medical_aid_payload();
        payload.payment_method = PaymentMethod::Cash;

        let patient = Patient::from_new(payload);
        assert_eq!(patient.payment_method, PaymentMethod::Cash);
        assert_eq!(patient.medical_aid_provider, None);
        assert_eq!(patient.medical_aid_number, None);
        assert_eq!(patient.medical_aid_dependent_code, None);
    }

    #[test]
    fn test_deserialize_form_payload() {
        let payload: NewPatient = serde_json::from_str(
            r#"{
                "firstName": "Sipho",
                "lastName": "Mahlangu",
                "dateOfBirth": "1975-09-30",
                "gender": "",
                "phone": "0731112222",
                "email": "",
                "paymentMethod": "medical_aid",
                "medicalAidProvider": "Bonitas",
                "medicalAidNumber": "B123"
            }"#,
        )
        .unwrap();

        assert_eq!(payload.gender, None);
        assert_eq!(payload.email, None);
        assert_eq!(payload.payment_method, PaymentMethod::MedicalAid);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn test_unknown_payment_method_rejected() {
        let result: Result<NewPatient, _> = serde_json::from_str(
            r#"{"firstName":"A","lastName":"B","dateOfBirth":"1990-01-01","phone":"1","paymentMethod":"bitcoin"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_enum_text_roundtrip() {
        assert_eq!("medical_aid".parse::<PaymentMethod>(), Ok(PaymentMethod::MedicalAid));
        assert_eq!(PaymentMethod::Eft.as_str(), "eft");
        assert_eq!("female".parse::<Gender>(), Ok(Gender::Female));
        assert!("unknown".parse::<Gender>().is_err());
    }
}
