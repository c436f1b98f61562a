//! API response types

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use triage_core::{
    Appointment, AppointmentId, AppointmentStatus, AppointmentType, Page, Patient, PatientId,
    Provider, ProviderId, Role, Symptom, User, UserId,
    appointment::{Cancellation, Diagnosis},
    patient::{Allergy, ChronicCondition, EmergencyContact, Medication},
};

use crate::PaginationParams;

pub use triage_core::conditions::ConditionSearch as ConditionSearchResponse;
pub use triage_core::triage::TriageAssessment as TriageResponse;

/// Issued tokens
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TokenResponse {
    /// Access token for API requests
    pub access_token: String,
    /// Refresh token for getting new access tokens
    pub refresh_token: String,
    /// Always "bearer"
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

impl TokenResponse {
    pub fn bearer(access_token: String, refresh_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in,
        }
    }
}

/// User response; the password hash never leaves the server
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            full_name: user.full_name(),
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            phone_number: user.phone_number,
            role: user.role,
            is_active: user.is_active,
            is_verified: user.is_verified,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PatientResponse {
    pub id: PatientId,
    pub user_id: UserId,
    pub date_of_birth: NaiveDate,
    /// Whole years as of today (UTC)
    pub age: u32,
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
}

impl From<Patient> for PatientResponse {
    fn from(patient: Patient) -> Self {
        Self {
            age: patient.age_on(Utc::now().date_naive()),
            id: patient.id,
            user_id: patient.user_id,
            date_of_birth: patient.date_of_birth,
            gender: patient.gender,
            blood_type: patient.blood_type,
            address_line1: patient.address_line1,
            address_line2: patient.address_line2,
            city: patient.city,
            postal_code: patient.postal_code,
            country: patient.country,
            insurance_provider: patient.insurance_provider,
            insurance_policy_number: patient.insurance_policy_number,
            allergies: patient.allergies,
            chronic_conditions: patient.chronic_conditions,
            medications: patient.medications,
            emergency_contact: patient.emergency_contact,
            created_at: patient.created_at,
            updated_at: patient.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProviderResponse {
    pub id: ProviderId,
    pub user_id: UserId,
    pub specialty: String,
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
}

impl From<Provider> for ProviderResponse {
    fn from(provider: Provider) -> Self {
        Self {
            id: provider.id,
            user_id: provider.user_id,
            specialty: provider.specialty,
            license_number: provider.license_number,
            credentials: provider.credentials,
            languages_spoken: provider.languages_spoken,
            accepted_insurances: provider.accepted_insurances,
            certifications: provider.certifications,
            accepting_new_patients: provider.accepting_new_patients,
            years_of_experience: provider.years_of_experience,
            additional_info: provider.additional_info,
            created_at: provider.created_at,
            updated_at: provider.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AppointmentResponse {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub provider_id: ProviderId,
    pub appointment_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub appointment_type: Option<AppointmentType>,
    pub chief_complaint: Option<String>,
    pub notes: Option<String>,
    pub symptoms: Vec<Symptom>,
    pub diagnosis: Vec<Diagnosis>,
    pub cancellation: Option<Cancellation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(appt: Appointment) -> Self {
        Self {
            end_datetime: appt.ends_at(),
            id: appt.id,
            patient_id: appt.patient_id,
            provider_id: appt.provider_id,
            appointment_datetime: appt.appointment_datetime,
            duration_minutes: appt.duration_minutes,
            status: appt.status,
            appointment_type: appt.appointment_type,
            chief_complaint: appt.chief_complaint,
            notes: appt.notes,
            symptoms: appt.symptoms,
            diagnosis: appt.diagnosis,
            cancellation: appt.cancellation,
            created_at: appt.created_at,
            updated_at: appt.updated_at,
        }
    }
}

macro_rules! list_response {
    ($name:ident, $field:ident, $item:ty, $entity:ty) => {
        #[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
        pub struct $name {
            pub $field: Vec<$item>,
            pub total: u64,
            pub page: u32,
            pub page_size: u32,
        }

        impl $name {
            pub fn from_page(page: Page<$entity>, params: &PaginationParams) -> Self {
                let page = page.map(<$item>::from);
                Self {
                    $field: page.items,
                    total: page.total,
                    page: params.page,
                    page_size: params.page_size,
                }
            }
        }
    };
}

list_response!(UserListResponse, users, UserResponse, User);
list_response!(PatientListResponse, patients, PatientResponse, Patient);
list_response!(ProviderListResponse, providers, ProviderResponse, Provider);
list_response!(
    AppointmentListResponse,
    appointments,
    AppointmentResponse,
    Appointment
);

/// `GET /`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
    pub docs: String,
}

/// `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
}

/// `GET /health/live`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LivenessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReadinessChecks {
    pub database: String,
    pub conditions_api: String,
}

/// `GET /health/ready`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
    pub timestamp: DateTime<Utc>,
}
