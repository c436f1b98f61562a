use chrono::{DateTime, Utc};
use miette::Diagnostic;
use thiserror::Error;

use crate::{
    appointment::AppointmentStatus,
    db::DatabaseError,
    id::{AppointmentId, PatientId, ProviderId, UserId},
    validation::FieldViolation,
};

#[derive(Error, Diagnostic, Debug)]
pub enum CoreError {
    #[error("Email {email} already registered")]
    #[diagnostic(
        code(triage_core::email_already_exists),
        help("Log in with the existing account or register with a different email")
    )]
    EmailAlreadyExists { email: String },

    #[error("User {id} not found")]
    #[diagnostic(
        code(triage_core::user_not_found),
        help("Check that the user ID is correct and the account has not been deleted")
    )]
    UserNotFound { id: UserId },

    #[error("Invalid email or password")]
    #[diagnostic(code(triage_core::invalid_credentials))]
    InvalidCredentials,

    #[error("User {id} is not active")]
    #[diagnostic(
        code(triage_core::user_not_active),
        help("An administrator must reactivate this account")
    )]
    UserNotActive { id: UserId },

    #[error("Patient {id} not found")]
    #[diagnostic(code(triage_core::patient_not_found))]
    PatientNotFound { id: PatientId },

    #[error("Patient profile already exists for user {user_id}")]
    #[diagnostic(
        code(triage_core::patient_already_exists),
        help("Update the existing patient profile instead of creating a new one")
    )]
    PatientAlreadyExists { user_id: UserId },

    #[error("Provider {id} not found")]
    #[diagnostic(code(triage_core::provider_not_found))]
    ProviderNotFound { id: ProviderId },

    #[error("Provider profile already exists for user {user_id}")]
    #[diagnostic(
        code(triage_core::provider_already_exists),
        help("Update the existing provider profile instead of creating a new one")
    )]
    ProviderAlreadyExists { user_id: UserId },

    #[error("License number {license_number} already registered")]
    #[diagnostic(code(triage_core::license_already_exists))]
    LicenseAlreadyExists { license_number: String },

    #[error("Provider {id} is not accepting new patients")]
    #[diagnostic(
        code(triage_core::provider_not_accepting_patients),
        help("Choose another provider or ask this provider to reopen their schedule")
    )]
    ProviderNotAcceptingPatients { id: ProviderId },

    #[error("Appointment {id} not found")]
    #[diagnostic(code(triage_core::appointment_not_found))]
    AppointmentNotFound { id: AppointmentId },

    #[error("Provider {provider_id} already has appointment at {at}")]
    #[diagnostic(
        code(triage_core::appointment_conflict),
        help("Pick a time that does not overlap an existing appointment with this provider")
    )]
    AppointmentConflict {
        provider_id: ProviderId,
        at: DateTime<Utc>,
    },

    #[error("Cannot change status from {from} to {to}")]
    #[diagnostic(
        code(triage_core::invalid_appointment_status),
        help("Allowed transitions from {from}: {}", from.allowed_transitions_display())
    )]
    InvalidAppointmentStatus {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Cannot schedule appointment in the past")]
    #[diagnostic(code(triage_core::appointment_in_past))]
    AppointmentInPast,

    #[error("Validation failed: {message}")]
    #[diagnostic(
        code(triage_core::validation_failed),
        help("{}", fields.iter().map(|f| format!("{}: {}", f.field, f.message)).collect::<Vec<_>>().join("; "))
    )]
    Validation {
        message: String,
        fields: Vec<FieldViolation>,
    },

    #[error("Password hashing failed")]
    #[diagnostic(code(triage_core::password_hash_failed))]
    PasswordHash { message: String },

    #[error("Condition lookup failed")]
    #[diagnostic(
        code(triage_core::condition_lookup_failed),
        help("The condition service returned an unexpected response: {message}")
    )]
    ConditionLookupFailed { message: String },

    #[error("Condition lookup service unavailable after {attempts} attempts")]
    #[diagnostic(
        code(triage_core::condition_lookup_unavailable),
        help("Check connectivity to {base_url} and try again later")
    )]
    ConditionLookupUnavailable {
        base_url: String,
        attempts: u32,
        #[source]
        cause: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Configuration error")]
    #[diagnostic(
        code(triage_core::configuration_error),
        help("Check configuration file at {config_path}")
    )]
    ConfigurationError {
        config_path: String,
        field: String,
        expected: String,
        #[source]
        cause: ConfigError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        Self::Validation {
            message: format!("{field}: {message}"),
            fields: vec![FieldViolation { field, message }],
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UserNotFound { .. }
                | Self::PatientNotFound { .. }
                | Self::ProviderNotFound { .. }
                | Self::AppointmentNotFound { .. }
        )
    }
}
