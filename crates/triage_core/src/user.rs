//! User accounts and roles

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{
    CoreError, Result,
    id::UserId,
    validation::{Validate, Validator, normalize_email},
};

/// What a user is allowed to do
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Provider,
    Patient,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Provider => "provider",
            Role::Patient => "patient",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "provider" => Ok(Role::Provider),
            "patient" => Ok(Role::Patient),
            other => Err(CoreError::validation(
                "role",
                format!("unknown role '{other}', expected admin, provider or patient"),
            )),
        }
    }
}

/// A stored user account
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    /// Always lowercase
    pub email: String,
    pub hashed_password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Account fields supplied at registration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl NewUser {
    pub(crate) fn validate_into(&self, v: &mut Validator) {
        v.email("email", self.email.trim());
        v.length("password", &self.password, 8, 128);
        v.length("first_name", self.first_name.trim(), 1, 100);
        v.length("last_name", self.last_name.trim(), 1, 100);
        v.optional_length("phone_number", self.phone_number.as_deref(), 0, 20);
    }

    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

impl Validate for NewUser {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        self.validate_into(&mut v);
        v.finish()
    }
}

/// Partial update for a user; `None` leaves the field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UserChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Validate for UserChanges {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        if let Some(email) = &self.email {
            v.email("email", email.trim());
        }
        v.optional_length("first_name", self.first_name.as_deref().map(str::trim), 1, 100);
        v.optional_length("last_name", self.last_name.as_deref().map(str::trim), 1, 100);
        v.optional_length("phone_number", self.phone_number.as_deref(), 0, 20);
        v.optional_length("password", self.password.as_deref(), 8, 128);
        v.finish()
    }
}
