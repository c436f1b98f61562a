//! API request types
//!
//! Query structs repeat `page`/`page_size` instead of flattening
//! [`PaginationParams`]; flattened numbers do not survive urlencoded parsing.

use crate::{ApiError, PaginationParams};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use triage_core::{
    AppointmentStatus, PatientId, ProviderId, Role, Symptom,
    appointment::Cancellation,
    validation::{Validate, Validator},
};

pub use triage_core::appointment::{
    AppointmentChanges as UpdateAppointmentRequest, NewAppointment as CreateAppointmentRequest,
};
pub use triage_core::patient::{
    PatientChanges as UpdatePatientRequest, PatientRegistration as RegisterPatientRequest,
};
pub use triage_core::provider::{
    ProviderChanges as UpdateProviderRequest, ProviderRegistration as RegisterProviderRequest,
};
pub use triage_core::user::UserChanges as UpdateUserRequest;

fn default_page() -> u32 {
    1
}
fn default_page_size() -> u32 {
    crate::DEFAULT_PAGE_SIZE
}

/// Login with email and password
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CancelAppointmentRequest {
    pub canceled_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<CancelAppointmentRequest> for Cancellation {
    fn from(req: CancelAppointmentRequest) -> Self {
        Cancellation {
            canceled_by: req.canceled_by,
            reason: req.reason,
        }
    }
}

/// Ad hoc triage of a symptom list
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TriageRequest {
    pub symptoms: Vec<Symptom>,
}

impl Validate for TriageRequest {
    fn validate(&self) -> triage_core::Result<()> {
        let mut v = Validator::new();
        v.check("symptoms", self.symptoms.len() <= 50, "at most 50 symptoms per request");
        v.each("symptoms", &self.symptoms);
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct UserListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub role: Option<Role>,
}

impl UserListQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProviderListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub specialty: Option<String>,
    #[serde(default)]
    pub accepting_patients: Option<bool>,
}

impl ProviderListQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AppointmentListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub patient_id: Option<PatientId>,
    #[serde(default)]
    pub provider_id: Option<ProviderId>,
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
}

impl AppointmentListQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.page_size)
    }
}

/// Appointments belonging to one patient or provider
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct OwnedAppointmentsQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Only scheduled or confirmed appointments from now on, earliest first
    #[serde(default)]
    pub upcoming: bool,
}

impl OwnedAppointmentsQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams::new(self.page, self.page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScheduleQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ScheduleQuery {
    pub fn check(&self) -> Result<(), ApiError> {
        if self.end <= self.start {
            return Err(ApiError::invalid_field("end", "must be after start"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConditionSearchQuery {
    pub terms: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_query_defaults() {
        let query: AppointmentListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.pagination(), PaginationParams::default());
        assert!(query.status.is_none());
    }

    #[test]
    fn test_appointment_query_parses_ids_and_status() {
        let patient = PatientId::generate();
        let query: AppointmentListQuery = serde_json::from_value(serde_json::json!({
            "patient_id": patient.to_string(),
            "status": "no_show",
        }))
        .unwrap();
        assert_eq!(query.patient_id, Some(patient));
        assert_eq!(query.status, Some(AppointmentStatus::NoShow));
    }

    #[test]
    fn test_triage_request_validates_symptoms() {
        let request = TriageRequest {
            symptoms: vec![Symptom::named("")],
        };
        let err = request.validate().unwrap_err();
        match err {
            triage_core::CoreError::Validation { fields, .. } => {
                assert_eq!(fields[0].field, "symptoms[0].name");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_schedule_window() {
        let start = Utc::now();
        let query = ScheduleQuery {
            start,
            end: start,
        };
        assert!(query.check().is_err());
    }
}
