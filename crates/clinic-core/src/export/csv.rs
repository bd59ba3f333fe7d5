//! Patient list as CSV.

use crate::models::Patient;

const PATIENT_CSV_HEADER: &str = "id,first_name,last_name,date_of_birth,gender,phone,email,id_number,payment_method,medical_aid_provider,medical_aid_number,registered_at";

/// Render patients as CSV, one line per patient after the header.
pub fn patients_to_csv(patients: &[Patient]) -> String {
    let mut csv = String::new();

    // Header
    csv.push_str(PATIENT_CSV_HEADER);
    csv.push('\n');

    for patient in patients {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}\n",
            escape_csv(&patient.id),
            escape_csv(&patient.first_name),
            escape_csv(&patient.last_name),
            escape_csv(&patient.date_of_birth),
            patient.gender.map(|g| g.as_str()).unwrap_or(""),
            escape_csv(&patient.phone),
            escape_csv(patient.email.as_deref().unwrap_or("")),
            escape_csv(patient.id_number.as_deref().unwrap_or("")),
            patient.payment_method.as_str(),
            escape_csv(patient.medical_aid_provider.as_deref().unwrap_or("")),
            escape_csv(patient.medical_aid_number.as_deref().unwrap_or("")),
            patient.created_at.to_rfc3339(),
        ));
    }

    csv
}

/// Escape a string for CSV output.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPatient;

    #[test]
    fn test_patients_csv() {
        let mut payload = NewPatient::new("Thandi", "Nkosi, Jr", "1988-04-12", "0825550101");
        payload.email = Some("thandi@example.com".into());
        let patients = vec![
            Patient::from_new(payload),
            Patient::from_new(NewPatient::new("Sipho", "Mahlangu", "1975-09-30", "0731112222")),
        ];

        let csv = patients_to_csv(&patients);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3); // Header + 2 patients
        assert!(lines[0].starts_with("id,first_name"));
        assert!(lines[1].contains("\"Nkosi, Jr\""));
        assert!(lines[1].contains("thandi@example.com"));
        assert!(lines[2].contains(",cash,"));
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
        assert_eq!(escape_csv("two\nlines"), "\"two\nlines\"");
    }
}
