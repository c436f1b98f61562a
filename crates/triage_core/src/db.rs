//! Storage abstractions
//!
//! Services talk to storage through the repository traits below. Every query
//! hides soft-deleted rows. Unique constraints and the provider double-booking
//! check are the store's responsibility so they hold under concurrent writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use thiserror::Error;

use crate::{
    Result,
    appointment::{Appointment, AppointmentEdit, AppointmentQuery, EditOutcome},
    id::{AppointmentId, PatientId, ProviderId, UserId},
    patient::{Patient, PatientChanges},
    provider::{Provider, ProviderChanges, ProviderFilter},
    user::{Role, User},
};

pub mod memory;

pub use memory::MemoryStore;

/// Database-specific errors
#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("Unique constraint violated on {table}.{field}")]
    #[diagnostic(
        code(triage_core::db::unique_violation),
        help("A live {table} row already has {field} = '{value}'")
    )]
    UniqueViolation {
        table: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{table} row {id} not found")]
    #[diagnostic(code(triage_core::db::not_found))]
    NotFound { table: &'static str, id: String },

    #[error("Time slot starting {starts_at} overlaps appointment {existing}")]
    #[diagnostic(
        code(triage_core::db::schedule_conflict),
        help("The provider already has an active appointment in this time range")
    )]
    ScheduleConflict {
        existing: AppointmentId,
        provider_id: ProviderId,
        starts_at: DateTime<Utc>,
    },

    #[error("Storage unavailable: {message}")]
    #[diagnostic(code(triage_core::db::unavailable))]
    Unavailable { message: String },
}

pub type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Offset/limit window over a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    /// 1-indexed page of `page_size` rows; `page` 0 is treated as 1
    pub fn new(page: u32, page_size: u32) -> Self {
        let page = page.max(1) as usize;
        let page_size = page_size as usize;
        Self {
            offset: (page - 1).saturating_mul(page_size),
            limit: page_size,
        }
    }

    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: usize::MAX,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}

/// One page of results plus the total count of matching rows
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
        }
    }
}

/// Field-level user update; `None` leaves the stored value alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub hashed_password: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; fails with `UniqueViolation` if the email is taken
    async fn insert_user(&self, user: User) -> DbResult<User>;
    async fn get_user(&self, id: UserId) -> DbResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>>;
    /// Apply `patch` to the stored row; fails with `UniqueViolation` if the
    /// new email is taken
    async fn update_user(
        &self,
        id: UserId,
        patch: UserPatch,
        at: DateTime<Utc>,
    ) -> DbResult<User>;
    /// Change only the activation flag
    async fn set_user_active(
        &self,
        id: UserId,
        active: bool,
        at: DateTime<Utc>,
    ) -> DbResult<User>;
    /// Stamp `last_login_at` if the stored row is still active; the row is
    /// returned either way so the caller can see its current state
    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> DbResult<User>;
    /// Soft delete; returns false if no live row existed
    async fn delete_user(&self, id: UserId, at: DateTime<Utc>) -> DbResult<bool>;
    async fn list_users(&self, role: Option<Role>, page: PageRequest) -> DbResult<Page<User>>;
    async fn count_users(&self) -> DbResult<u64>;
}

#[async_trait]
pub trait PatientRepository: Send + Sync {
    /// Insert a patient; fails with `UniqueViolation` if the user already has one
    async fn insert_patient(&self, patient: Patient) -> DbResult<Patient>;
    async fn get_patient(&self, id: PatientId) -> DbResult<Option<Patient>>;
    async fn find_patient_by_user(&self, user_id: UserId) -> DbResult<Option<Patient>>;
    /// Apply `changes` to the stored row
    async fn update_patient(
        &self,
        id: PatientId,
        changes: PatientChanges,
        at: DateTime<Utc>,
    ) -> DbResult<Patient>;
    async fn delete_patient(&self, id: PatientId, at: DateTime<Utc>) -> DbResult<bool>;
    async fn list_patients(&self, page: PageRequest) -> DbResult<Page<Patient>>;
}

#[async_trait]
pub trait ProviderRepository: Send + Sync {
    /// Insert a provider; enforces unique `user_id` and `license_number`
    async fn insert_provider(&self, provider: Provider) -> DbResult<Provider>;
    async fn get_provider(&self, id: ProviderId) -> DbResult<Option<Provider>>;
    async fn find_provider_by_user(&self, user_id: UserId) -> DbResult<Option<Provider>>;
    async fn find_provider_by_license(&self, license: &str) -> DbResult<Option<Provider>>;
    /// Apply `changes` to the stored row; a new license must be unique
    async fn update_provider(
        &self,
        id: ProviderId,
        changes: ProviderChanges,
        at: DateTime<Utc>,
    ) -> DbResult<Provider>;
    async fn delete_provider(&self, id: ProviderId, at: DateTime<Utc>) -> DbResult<bool>;
    async fn list_providers(
        &self,
        filter: ProviderFilter,
        page: PageRequest,
    ) -> DbResult<Page<Provider>>;
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Insert unless it overlaps an active appointment with the same provider
    async fn insert_appointment(&self, appointment: Appointment) -> DbResult<Appointment>;
    async fn get_appointment(&self, id: AppointmentId) -> DbResult<Option<Appointment>>;
    /// Apply `edit` to the stored row under the table lock, re-checking the
    /// provider's calendar when the slot moves; status rules are judged
    /// against the row as stored at that moment
    async fn edit_appointment(
        &self,
        id: AppointmentId,
        edit: AppointmentEdit,
        at: DateTime<Utc>,
    ) -> Result<(Appointment, EditOutcome)>;
    async fn delete_appointment(&self, id: AppointmentId, at: DateTime<Utc>) -> DbResult<bool>;
    async fn list_appointments(
        &self,
        query: AppointmentQuery,
        page: PageRequest,
    ) -> DbResult<Page<Appointment>>;
}

/// Any backend that can hold every entity
pub trait Store:
    UserRepository + PatientRepository + ProviderRepository + AppointmentRepository
{
}

impl<T> Store for T where
    T: UserRepository + PatientRepository + ProviderRepository + AppointmentRepository
{
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_offsets() {
        assert_eq!(PageRequest::new(1, 10).offset, 0);
        assert_eq!(PageRequest::new(3, 25).offset, 50);
        assert_eq!(PageRequest::new(0, 10).offset, 0);
    }
}
