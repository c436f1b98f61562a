//! Triage Core - domain model and services for patient triage
//!
//! Users, patients, providers and appointments, the storage traits they are
//! persisted through, and the symptom triage engine.

pub mod appointment;
pub mod conditions;
pub mod config;
pub mod db;
pub mod error;
pub mod id;
pub mod password;
pub mod patient;
pub mod provider;
pub mod services;
pub mod triage;
pub mod user;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use appointment::{Appointment, AppointmentStatus, AppointmentType, Symptom};
pub use conditions::{ConditionsClient, ConditionsConfig};
pub use db::{MemoryStore, Page, PageRequest, Store};
pub use error::{CoreError, Result};
pub use id::{AppointmentId, Id, IdError, IdType, PatientId, ProviderId, UserId};
pub use patient::Patient;
pub use provider::Provider;
pub use services::Services;
pub use triage::{TriageAssessment, Urgency};
pub use user::{Role, User};
pub use validation::{FieldViolation, Validate};
