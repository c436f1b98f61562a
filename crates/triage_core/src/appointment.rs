//! Appointments and their status lifecycle
//!
//! An appointment starts as `scheduled` and moves through the status machine:
//!
//! ```text
//! scheduled ──► confirmed ──► completed
//!     │             ├───────► no_show
//!     └──► cancelled ◄┘
//! ```
//!
//! `completed`, `cancelled` and `no_show` are terminal.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{
    CoreError, Result,
    id::{AppointmentId, PatientId, ProviderId},
    validation::{Validate, Validator},
};

pub const MIN_DURATION_MINUTES: u32 = 5;
pub const MAX_DURATION_MINUTES: u32 = 480;
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 5] = [
        Self::Scheduled,
        Self::Confirmed,
        Self::Completed,
        Self::Cancelled,
        Self::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        }
    }

    /// Statuses reachable in one step from this one
    pub fn allowed_transitions(&self) -> &'static [AppointmentStatus] {
        match self {
            Self::Scheduled => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::Completed, Self::Cancelled, Self::NoShow],
            Self::Completed | Self::Cancelled | Self::NoShow => &[],
        }
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }

    /// Whether an appointment in this status occupies the provider's calendar
    pub fn occupies_slot(&self) -> bool {
        !matches!(self, Self::Cancelled | Self::NoShow)
    }

    /// Whether an appointment in this status is still expected to happen
    pub fn is_upcoming(&self) -> bool {
        matches!(self, Self::Scheduled | Self::Confirmed)
    }

    pub fn allowed_transitions_display(&self) -> String {
        let allowed = self.allowed_transitions();
        if allowed.is_empty() {
            return "none (terminal status)".to_string();
        }
        allowed
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Check a transition, treating a repeat of the current status as a no-op
    pub fn transition(self, next: AppointmentStatus) -> Result<AppointmentStatus> {
        if self == next || self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidAppointmentStatus {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| CoreError::validation("status", format!("unknown status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Consultation,
    FollowUp,
    Emergency,
    Telemedicine,
}

/// A reported symptom, optionally coded in ICD-10
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Symptom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icd10: Option<String>,
    pub name: String,
    /// Free text such as "mild", "moderate", "severe"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

impl Symptom {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            icd10: None,
            name: name.into(),
            severity: None,
        }
    }

    pub fn coded(icd10: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            icd10: Some(icd10.into()),
            name: name.into(),
            severity: None,
        }
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }
}

impl Validate for Symptom {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.optional_length("icd10", self.icd10.as_deref(), 0, 10);
        v.length("name", self.name.trim(), 1, 200);
        v.optional_length("severity", self.severity.as_deref(), 0, 20);
        v.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Diagnosis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icd10: Option<String>,
    pub name: String,
}

impl Validate for Diagnosis {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.optional_length("icd10", self.icd10.as_deref(), 0, 10);
        v.length("name", self.name.trim(), 1, 200);
        v.finish()
    }
}

/// Who cancelled an appointment and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Cancellation {
    pub canceled_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Validate for Cancellation {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.length("canceled_by", self.canceled_by.trim(), 1, 50);
        v.optional_length("reason", self.reason.as_deref(), 0, 500);
        v.finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: AppointmentId,
    pub patient_id: PatientId,
    pub provider_id: ProviderId,
    pub appointment_datetime: DateTime<Utc>,
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
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Appointment {
    pub fn new(input: NewAppointment, now: DateTime<Utc>) -> Self {
        Self {
            id: AppointmentId::generate(),
            patient_id: input.patient_id,
            provider_id: input.provider_id,
            appointment_datetime: input.appointment_datetime,
            duration_minutes: input.duration_minutes,
            status: AppointmentStatus::Scheduled,
            appointment_type: input.appointment_type,
            chief_complaint: input.chief_complaint,
            notes: input.notes,
            symptoms: input.symptoms,
            diagnosis: Vec::new(),
            cancellation: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn ends_at(&self) -> DateTime<Utc> {
        self.appointment_datetime + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Half-open interval overlap: `[start, end)` against this appointment's slot
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.appointment_datetime < end && start < self.ends_at()
    }

    /// Whether `other` would double-book the same provider
    pub fn conflicts_with(&self, other: &Appointment) -> bool {
        self.id != other.id
            && self.provider_id == other.provider_id
            && self.deleted_at.is_none()
            && self.status.occupies_slot()
            && other.status.occupies_slot()
            && self.overlaps(other.appointment_datetime, other.ends_at())
    }

    /// Apply `edit` against this row as it is stored now
    ///
    /// Every check runs before the first field is written, so an error leaves
    /// the row untouched. `updated_at` only moves when something changed.
    pub fn apply_edit(
        &mut self,
        edit: AppointmentEdit,
        now: DateTime<Utc>,
    ) -> Result<EditOutcome> {
        let before = self.clone();
        let mut outcome = EditOutcome {
            previous_status: self.status,
            changed: false,
            rescheduled: false,
        };

        match edit {
            AppointmentEdit::Cancel(cancellation) => {
                let next = self.status.transition(AppointmentStatus::Cancelled)?;
                // a repeated cancel keeps the first cancellation record
                if next != self.status {
                    self.status = next;
                    self.cancellation = Some(cancellation);
                }
            }
            AppointmentEdit::Update(changes) => {
                let status = match changes.status {
                    Some(status) => self.status.transition(status)?,
                    None => self.status,
                };
                let moved_to = changes
                    .appointment_datetime
                    .filter(|at| *at != self.appointment_datetime);
                if moved_to.is_some_and(|at| at < now) {
                    return Err(CoreError::AppointmentInPast);
                }

                self.status = status;
                if let Some(at) = moved_to {
                    self.appointment_datetime = at;
                    outcome.rescheduled = true;
                }
                if let Some(duration) = changes.duration_minutes {
                    if duration != self.duration_minutes {
                        self.duration_minutes = duration;
                        outcome.rescheduled = true;
                    }
                }
                if changes.appointment_type.is_some() {
                    self.appointment_type = changes.appointment_type;
                }
                if changes.chief_complaint.is_some() {
                    self.chief_complaint = changes.chief_complaint;
                }
                if changes.notes.is_some() {
                    self.notes = changes.notes;
                }
                if let Some(symptoms) = changes.symptoms {
                    self.symptoms = symptoms;
                }
                if let Some(diagnosis) = changes.diagnosis {
                    self.diagnosis = diagnosis;
                }
            }
        }

        outcome.changed = *self != before;
        if outcome.changed {
            self.updated_at = now;
        }
        Ok(outcome)
    }
}

/// A change to a stored appointment
#[derive(Debug, Clone)]
pub enum AppointmentEdit {
    Update(AppointmentChanges),
    /// Move to `cancelled`, recording who cancelled and why
    Cancel(Cancellation),
}

/// What `Appointment::apply_edit` did to the row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    pub previous_status: AppointmentStatus,
    pub changed: bool,
    /// The slot moved, so the provider's calendar needs re-checking
    pub rescheduled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NewAppointment {
    pub patient_id: PatientId,
    pub provider_id: ProviderId,
    pub appointment_datetime: DateTime<Utc>,
    #[serde(default = "default_duration", alias = "duration")]
    pub duration_minutes: u32,
    #[serde(
        default,
        alias = "type",
        skip_serializing_if = "Option::is_none"
    )]
    pub appointment_type: Option<AppointmentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<Symptom>,
}

impl NewAppointment {
    pub fn new(
        patient_id: PatientId,
        provider_id: ProviderId,
        appointment_datetime: DateTime<Utc>,
    ) -> Self {
        Self {
            patient_id,
            provider_id,
            appointment_datetime,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            appointment_type: None,
            chief_complaint: None,
            notes: None,
            symptoms: Vec::new(),
        }
    }
}

impl Validate for NewAppointment {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        v.range(
            "duration_minutes",
            self.duration_minutes,
            MIN_DURATION_MINUTES,
            MAX_DURATION_MINUTES,
        );
        v.optional_length("chief_complaint", self.chief_complaint.as_deref(), 0, 500);
        v.optional_length("notes", self.notes.as_deref(), 0, 2000);
        v.each("symptoms", &self.symptoms);
        v.finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AppointmentChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_datetime: Option<DateTime<Utc>>,
    #[serde(default, alias = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AppointmentStatus>,
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub appointment_type: Option<AppointmentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chief_complaint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<Vec<Symptom>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<Vec<Diagnosis>>,
}

impl AppointmentChanges {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Whether applying these changes can move the appointment's slot
    pub fn reschedules(&self) -> bool {
        self.appointment_datetime.is_some() || self.duration_minutes.is_some()
    }
}

impl Validate for AppointmentChanges {
    fn validate(&self) -> Result<()> {
        let mut v = Validator::new();
        if let Some(duration) = self.duration_minutes {
            v.range(
                "duration_minutes",
                duration,
                MIN_DURATION_MINUTES,
                MAX_DURATION_MINUTES,
            );
        }
        v.optional_length("chief_complaint", self.chief_complaint.as_deref(), 0, 500);
        v.optional_length("notes", self.notes.as_deref(), 0, 2000);
        if let Some(symptoms) = &self.symptoms {
            v.each("symptoms", symptoms);
        }
        if let Some(diagnosis) = &self.diagnosis {
            v.each("diagnosis", diagnosis);
        }
        v.finish()
    }
}

/// Query over appointments; unset fields do not filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentQuery {
    pub patient_id: Option<PatientId>,
    pub provider_id: Option<ProviderId>,
    /// Empty means any status
    pub statuses: Vec<AppointmentStatus>,
    pub starts_at_or_after: Option<DateTime<Utc>>,
    pub starts_before: Option<DateTime<Utc>>,
    pub order: AppointmentOrder,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppointmentOrder {
    #[default]
    Created,
    EarliestFirst,
    LatestFirst,
}

impl AppointmentQuery {
    pub fn matches(&self, appt: &Appointment) -> bool {
        self.patient_id.is_none_or(|id| appt.patient_id == id)
            && self.provider_id.is_none_or(|id| appt.provider_id == id)
            && (self.statuses.is_empty() || self.statuses.contains(&appt.status))
            && self
                .starts_at_or_after
                .is_none_or(|t| appt.appointment_datetime >= t)
            && self
                .starts_before
                .is_none_or(|t| appt.appointment_datetime < t)
    }
}
