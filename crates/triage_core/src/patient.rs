//! Patient profiles

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    id::{PatientId, UserId},
    user::NewUser,
    validation::{Validate, Validator},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Allergy {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

impl Validate for Allergy {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.length("name", self.name.trim(), 1, 100);
        v.optional_length("severity", self.severity.as_deref(), 0, 20);
        v.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChronicCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icd10: Option<String>,
    pub name: String,
}

impl Validate for ChronicCondition {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.optional_length("icd10", self.icd10.as_deref(), 0, 10);
        v.length("name", self.name.trim(), 1, 200);
        v.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Medication {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
}

impl Validate for Medication {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.length("name", self.name.trim(), 1, 100);
        v.optional_length("dosage", self.dosage.as_deref(), 0, 50);
        v.finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EmergencyContact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

impl Validate for EmergencyContact {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.optional_length("name", self.name.as_deref(), 0, 100);
        v.optional_length("phone", self.phone.as_deref(), 0, 20);
        v.optional_length("relationship", self.relationship.as_deref(), 0, 50);
        v.finish()
    }
}

/// A stored patient profile, linked one-to-one with a user
#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    pub id: PatientId,
    pub user_id: UserId,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    pub blood_type: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub insurance_provider: Option<String>,
    pub insurance_policy_number: Option<String>,
    pub allergies: Vec<Allergy>,
    pub chronic_conditions: Vec<ChronicCondition>,
    pub medications: Vec<Medication>,
    pub emergency_contact: Option<EmergencyContact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn new(user_id: UserId, profile: PatientProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: PatientId::generate(),
            user_id,
            date_of_birth: profile.date_of_birth,
            gender: profile.gender,
            blood_type: profile.blood_type,
            address_line1: profile.address_line1,
            address_line2: profile.address_line2,
            city: profile.city,
            postal_code: profile.postal_code,
            country: profile.country,
            insurance_provider: profile.insurance_provider,
            insurance_policy_number: profile.insurance_policy_number,
            allergies: profile.allergies,
            chronic_conditions: profile.chronic_conditions,
            medications: profile.medications,
            emergency_contact: profile.emergency_contact,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Age in whole years on the given day
    pub fn age_on(&self, day: NaiveDate) -> u32 {
        day.years_since(self.date_of_birth).unwrap_or(0)
    }

    pub fn apply(&mut self, changes: PatientChanges, now: DateTime<Utc>) {
        let PatientChanges {
            date_of_birth,
            gender,
            blood_type,
            address_line1,
            address_line2,
            city,
            postal_code,
            country,
            insurance_provider,
            insurance_policy_number,
            allergies,
            chronic_conditions,
            medications,
            emergency_contact,
        } = changes;

        if let Some(value) = date_of_birth {
            self.date_of_birth = value;
        }
        replace(&mut self.gender, gender);
        replace(&mut self.blood_type, blood_type);
        replace(&mut self.address_line1, address_line1);
        replace(&mut self.address_line2, address_line2);
        replace(&mut self.city, city);
        replace(&mut self.postal_code, postal_code);
        replace(&mut self.country, country);
        replace(&mut self.insurance_provider, insurance_provider);
        replace(&mut self.insurance_policy_number, insurance_policy_number);
        if let Some(value) = allergies {
            self.allergies = value;
        }
        if let Some(value) = chronic_conditions {
            self.chronic_conditions = value;
        }
        if let Some(value) = medications {
            self.medications = value;
        }
        replace(&mut self.emergency_contact, emergency_contact);
        self.updated_at = now;
    }
}

fn replace<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Clinical and demographic fields of a patient profile
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PatientProfile {
    pub date_of_birth: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_policy_number: Option<String>,
    #[serde(default)]
    pub allergies: Vec<Allergy>,
    #[serde(default)]
    pub chronic_conditions: Vec<ChronicCondition>,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
}

impl PatientProfile {
    pub fn minimal(date_of_birth: NaiveDate) -> Self {
        Self {
            date_of_birth,
            gender: None,
            blood_type: None,
            address_line1: None,
            address_line2: None,
            city: None,
            postal_code: None,
            country: None,
            insurance_provider: None,
            insurance_policy_number: None,
            allergies: Vec::new(),
            chronic_conditions: Vec::new(),
            medications: Vec::new(),
            emergency_contact: None,
        }
    }

    fn validate_into(&self, v: &mut Validator) {
        check_date_of_birth(v, self.date_of_birth);
        check_demographics(
            v,
            Demographics {
                gender: self.gender.as_deref(),
                blood_type: self.blood_type.as_deref(),
                address_line1: self.address_line1.as_deref(),
                address_line2: self.address_line2.as_deref(),
                city: self.city.as_deref(),
                postal_code: self.postal_code.as_deref(),
                country: self.country.as_deref(),
                insurance_provider: self.insurance_provider.as_deref(),
                insurance_policy_number: self.insurance_policy_number.as_deref(),
            },
        );
        v.each("allergies", &self.allergies);
        v.each("chronic_conditions", &self.chronic_conditions);
        v.each("medications", &self.medications);
        v.nested("emergency_contact", &self.emergency_contact);
    }
}

impl Validate for PatientProfile {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        self.validate_into(&mut v);
        v.finish()
    }
}

/// Self-service registration body: account fields plus the profile, flat
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PatientRegistration {
    #[serde(flatten)]
    pub account: NewUser,
    #[serde(flatten)]
    pub profile: PatientProfile,
}

impl Validate for PatientRegistration {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        self.account.validate_into(&mut v);
        self.profile.validate_into(&mut v);
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PatientChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance_policy_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<Vec<Allergy>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chronic_conditions: Option<Vec<ChronicCondition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications: Option<Vec<Medication>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
}

impl Validate for PatientChanges {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        if let Some(dob) = self.date_of_birth {
            check_date_of_birth(&mut v, dob);
        }
        check_demographics(
            &mut v,
            Demographics {
                gender: self.gender.as_deref(),
                blood_type: self.blood_type.as_deref(),
                address_line1: self.address_line1.as_deref(),
                address_line2: self.address_line2.as_deref(),
                city: self.city.as_deref(),
                postal_code: self.postal_code.as_deref(),
                country: self.country.as_deref(),
                insurance_provider: self.insurance_provider.as_deref(),
                insurance_policy_number: self.insurance_policy_number.as_deref(),
            },
        );
        if let Some(items) = &self.allergies {
            v.each("allergies", items);
        }
        if let Some(items) = &self.chronic_conditions {
            v.each("chronic_conditions", items);
        }
        if let Some(items) = &self.medications {
            v.each("medications", items);
        }
        v.nested("emergency_contact", &self.emergency_contact);
        v.finish()
    }
}

struct Demographics<'a> {
    gender: Option<&'a str>,
    blood_type: Option<&'a str>,
    address_line1: Option<&'a str>,
    address_line2: Option<&'a str>,
    city: Option<&'a str>,
    postal_code: Option<&'a str>,
    country: Option<&'a str>,
    insurance_provider: Option<&'a str>,
    insurance_policy_number: Option<&'a str>,
}

fn check_demographics(v: &mut Validator, d: Demographics<'_>) {
    v.optional_length("gender", d.gender, 0, 20);
    v.optional_length("blood_type", d.blood_type, 0, 5);
    v.optional_length("address_line1", d.address_line1, 0, 200);
    v.optional_length("address_line2", d.address_line2, 0, 200);
    v.optional_length("city", d.city, 0, 100);
    v.optional_length("postal_code", d.postal_code, 0, 20);
    v.optional_length("country", d.country, 0, 100);
    v.optional_length("insurance_provider", d.insurance_provider, 0, 100);
    v.optional_length("insurance_policy_number", d.insurance_policy_number, 0, 50);
}

fn check_date_of_birth(v: &mut Validator, dob: NaiveDate) {
    v.check(
        "date_of_birth",
        dob <= Utc::now().date_naive(),
        "cannot be in the future",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use chrono::Days;

    fn dob() -> NaiveDate {
        NaiveDate::from_ymd_opt(1985, 3, 14).unwrap()
    }

    #[test]
    fn test_future_birth_date_rejected() {
        let tomorrow = Utc::now().date_naive() + Days::new(1);
        let err = PatientProfile::minimal(tomorrow).validate().unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn test_nested_fields_are_reported_with_path() {
        let mut profile = PatientProfile::minimal(dob());
        profile.allergies = vec![
            Allergy {
                name: "Penicillin".to_string(),
                severity: Some("high".to_string()),
            },
            Allergy {
                name: String::new(),
                severity: None,
            },
        ];
        profile.emergency_contact = Some(EmergencyContact {
            phone: Some("1".repeat(30)),
            ..Default::default()
        });

        let CoreError::Validation { fields, .. } = profile.validate().unwrap_err() else {
            panic!("expected validation error");
        };
        let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
        assert_eq!(names, ["allergies[1].name", "emergency_contact.phone"]);
    }

    #[test]
    fn test_registration_parses_flat_body() {
        let body = serde_json::json!({
            "email": "grace@example.com",
            "password": "hunter2hunter2",
            "first_name": "Grace",
            "last_name": "Hopper",
            "date_of_birth": "1985-03-14",
            "blood_type": "O+",
            "medications": [{"name": "Metformin", "dosage": "500mg"}]
        });
        let reg: PatientRegistration = serde_json::from_value(body).unwrap();
        assert_eq!(reg.account.first_name, "Grace");
        assert_eq!(reg.profile.blood_type.as_deref(), Some("O+"));
        assert_eq!(reg.profile.medications.len(), 1);
        assert!(reg.validate().is_ok());
    }

    #[test]
    fn test_apply_only_touches_supplied_fields() {
        let now = Utc::now();
        let mut profile = PatientProfile::minimal(dob());
        profile.city = Some("Lisbon".to_string());
        let mut patient = Patient::new(UserId::generate(), profile, now);

        patient.apply(
            PatientChanges {
                blood_type: Some("AB-".to_string()),
                ..Default::default()
            },
            now,
        );

        assert_eq!(patient.blood_type.as_deref(), Some("AB-"));
        assert_eq!(patient.city.as_deref(), Some("Lisbon"));
    }

    #[test]
    fn test_age() {
        let patient = Patient::new(UserId::generate(), PatientProfile::minimal(dob()), Utc::now());
        let day = NaiveDate::from_ymd_opt(2025, 3, 13).unwrap();
        assert_eq!(patient.age_on(day), 39);
    }
}
