//! Healthcare provider profiles

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    Result,
    id::{ProviderId, UserId},
    user::NewUser,
    validation::{Validate, Validator},
};

fn default_languages() -> Vec<String> {
    vec!["English".to_string()]
}

fn default_accepting() -> bool {
    true
}

/// A stored provider profile, linked one-to-one with a user
#[derive(Debug, Clone, PartialEq)]
pub struct Provider {
    pub id: ProviderId,
    pub user_id: UserId,
    pub specialty: String,
    /// Unique across live providers
    pub license_number: String,
    pub credentials: Option<String>,
    pub languages_spoken: Vec<String>,
    pub accepted_insurances: Vec<String>,
    pub certifications: Vec<String>,
    pub accepting_new_patients: bool,
    pub years_of_experience: Option<u32>,
    pub additional_info: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Provider {
    pub fn new(user_id: UserId, profile: ProviderProfile, now: DateTime<Utc>) -> Self {
        Self {
            id: ProviderId::generate(),
            user_id,
            specialty: profile.specialty.trim().to_string(),
            license_number: profile.license_number.trim().to_string(),
            credentials: profile.credentials,
            languages_spoken: profile.languages_spoken,
            accepted_insurances: profile.accepted_insurances,
            certifications: profile.certifications,
            accepting_new_patients: profile.accepting_new_patients,
            years_of_experience: profile.years_of_experience,
            additional_info: profile.additional_info,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn has_specialty(&self, specialty: &str) -> bool {
        self.specialty.eq_ignore_ascii_case(specialty.trim())
    }

    pub fn apply(&mut self, changes: ProviderChanges, now: DateTime<Utc>) {
        if let Some(value) = changes.specialty {
            self.specialty = value.trim().to_string();
        }
        if let Some(value) = changes.license_number {
            self.license_number = value.trim().to_string();
        }
        if changes.credentials.is_some() {
            self.credentials = changes.credentials;
        }
        if let Some(value) = changes.languages_spoken {
            self.languages_spoken = value;
        }
        if let Some(value) = changes.accepted_insurances {
            self.accepted_insurances = value;
        }
        if let Some(value) = changes.certifications {
            self.certifications = value;
        }
        if let Some(value) = changes.accepting_new_patients {
            self.accepting_new_patients = value;
        }
        if changes.years_of_experience.is_some() {
            self.years_of_experience = changes.years_of_experience;
        }
        if changes.additional_info.is_some() {
            self.additional_info = changes.additional_info;
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProviderProfile {
    pub specialty: String,
    pub license_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(default = "default_languages")]
    pub languages_spoken: Vec<String>,
    #[serde(default)]
    pub accepted_insurances: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default = "default_accepting")]
    pub accepting_new_patients: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<serde_json::Value>,
}

impl ProviderProfile {
    pub fn new(specialty: impl Into<String>, license_number: impl Into<String>) -> Self {
        Self {
            specialty: specialty.into(),
            license_number: license_number.into(),
            credentials: None,
            languages_spoken: default_languages(),
            accepted_insurances: Vec::new(),
            certifications: Vec::new(),
            accepting_new_patients: true,
            years_of_experience: None,
            additional_info: None,
        }
    }

    fn validate_into(&self, v: &mut Validator) {
        v.length("specialty", self.specialty.trim(), 1, 100);
        v.length("license_number", self.license_number.trim(), 1, 50);
        v.optional_length("credentials", self.credentials.as_deref(), 0, 20);
        if let Some(years) = self.years_of_experience {
            v.range("years_of_experience", years, 0, 80);
        }
        check_additional_info(v, self.additional_info.as_ref());
    }
}

impl Validate for ProviderProfile {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        self.validate_into(&mut v);
        v.finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProviderRegistration {
    #[serde(flatten)]
    pub account: NewUser,
    #[serde(flatten)]
    pub profile: ProviderProfile,
}

impl Validate for ProviderRegistration {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        self.account.validate_into(&mut v);
        self.profile.validate_into(&mut v);
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProviderChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages_spoken: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_insurances: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certifications: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepting_new_patients: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years_of_experience: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_info: Option<serde_json::Value>,
}

impl Validate for ProviderChanges {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.optional_length("specialty", self.specialty.as_deref().map(str::trim), 1, 100);
        v.optional_length(
            "license_number",
            self.license_number.as_deref().map(str::trim),
            1,
            50,
        );
        v.optional_length("credentials", self.credentials.as_deref(), 0, 20);
        if let Some(years) = self.years_of_experience {
            v.range("years_of_experience", years, 0, 80);
        }
        check_additional_info(&mut v, self.additional_info.as_ref());
        v.finish()
    }
}

fn check_additional_info(v: &mut Validator, info: Option<&serde_json::Value>) {
    if let Some(info) = info {
        v.check("additional_info", info.is_object(), "must be a JSON object");
    }
}

/// Filters for provider listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderFilter {
    pub specialty: Option<String>,
    pub accepting_new_patients: Option<bool>,
}

impl ProviderFilter {
    pub fn matches(&self, provider: &Provider) -> bool {
        self.specialty
            .as_deref()
            .is_none_or(|s| provider.has_specialty(s))
            && self
                .accepting_new_patients
                .is_none_or(|a| provider.accepting_new_patients == a)
    }
}
