use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    CoreError, Result,
    appointment::{
        Appointment, AppointmentChanges, AppointmentEdit, AppointmentOrder, AppointmentQuery,
        AppointmentStatus, Cancellation, NewAppointment,
    },
    db::{
        AppointmentRepository, DatabaseError, Page, PageRequest, PatientRepository,
        ProviderRepository,
    },
    id::{AppointmentId, PatientId, ProviderId},
    validation::Validate,
};

/// Booking and lifecycle management for appointments
#[derive(Clone)]
pub struct AppointmentService {
    appointments: Arc<dyn AppointmentRepository>,
    patients: Arc<dyn PatientRepository>,
    providers: Arc<dyn ProviderRepository>,
}

impl AppointmentService {
    pub fn new(
        appointments: Arc<dyn AppointmentRepository>,
        patients: Arc<dyn PatientRepository>,
        providers: Arc<dyn ProviderRepository>,
    ) -> Self {
        Self {
            appointments,
            patients,
            providers,
        }
    }

    /// Book a new appointment
    ///
    /// Checks run in a fixed order: field validation, not in the past, patient
    /// exists, provider exists, provider accepting, then the slot is free.
    pub async fn create_appointment(&self, input: NewAppointment) -> Result<Appointment> {
        input.validate()?;

        let now = Utc::now();
        if input.appointment_datetime < now {
            return Err(CoreError::AppointmentInPast);
        }

        if self.patients.get_patient(input.patient_id).await?.is_none() {
            return Err(CoreError::PatientNotFound {
                id: input.patient_id,
            });
        }

        let provider = self
            .providers
            .get_provider(input.provider_id)
            .await?
            .ok_or(CoreError::ProviderNotFound {
                id: input.provider_id,
            })?;
        if !provider.accepting_new_patients {
            return Err(CoreError::ProviderNotAcceptingPatients { id: provider.id });
        }

        let appointment = self
            .appointments
            .insert_appointment(Appointment::new(input, now))
            .await
            .map_err(slot_conflict)?;

        tracing::info!(
            appointment_id = %appointment.id,
            patient_id = %appointment.patient_id,
            provider_id = %appointment.provider_id,
            at = %appointment.appointment_datetime,
            "appointment scheduled"
        );
        Ok(appointment)
    }

    pub async fn get_appointment(&self, id: AppointmentId) -> Result<Appointment> {
        self.appointments
            .get_appointment(id)
            .await?
            .ok_or(CoreError::AppointmentNotFound { id })
    }

    pub async fn update_appointment(
        &self,
        id: AppointmentId,
        changes: AppointmentChanges,
    ) -> Result<Appointment> {
        changes.validate()?;
        self.edit(id, AppointmentEdit::Update(changes)).await
    }

    /// Apply an edit against the stored row; a repeat of the current status
    /// returns the row unchanged
    async fn edit(&self, id: AppointmentId, edit: AppointmentEdit) -> Result<Appointment> {
        let (appt, outcome) = self
            .appointments
            .edit_appointment(id, edit, Utc::now())
            .await
            .map_err(|err| match err {
                CoreError::Database(DatabaseError::NotFound { .. }) => {
                    CoreError::AppointmentNotFound { id }
                }
                CoreError::Database(err) => slot_conflict(err),
                other => other,
            })?;

        if appt.status != outcome.previous_status {
            tracing::info!(
                appointment_id = %appt.id,
                from = %outcome.previous_status,
                to = %appt.status,
                "appointment status changed"
            );
        }
        Ok(appt)
    }

    pub async fn confirm_appointment(&self, id: AppointmentId) -> Result<Appointment> {
        self.update_appointment(id, AppointmentChanges::status(AppointmentStatus::Confirmed))
            .await
    }

    pub async fn complete_appointment(&self, id: AppointmentId) -> Result<Appointment> {
        self.update_appointment(id, AppointmentChanges::status(AppointmentStatus::Completed))
            .await
    }

    pub async fn mark_no_show(&self, id: AppointmentId) -> Result<Appointment> {
        self.update_appointment(id, AppointmentChanges::status(AppointmentStatus::NoShow))
            .await
    }

    pub async fn cancel_appointment(
        &self,
        id: AppointmentId,
        cancellation: Cancellation,
    ) -> Result<Appointment> {
        cancellation.validate()?;
        self.edit(id, AppointmentEdit::Cancel(cancellation)).await
    }

    pub async fn delete_appointment(&self, id: AppointmentId) -> Result<()> {
        if !self.appointments.delete_appointment(id, Utc::now()).await? {
            return Err(CoreError::AppointmentNotFound { id });
        }
        tracing::info!(appointment_id = %id, "deleted appointment");
        Ok(())
    }

    pub async fn list_appointments(
        &self,
        query: AppointmentQuery,
        page: PageRequest,
    ) -> Result<Page<Appointment>> {
        Ok(self.appointments.list_appointments(query, page).await?)
    }

    /// A patient's appointments, most recent first
    pub async fn list_by_patient(
        &self,
        patient_id: PatientId,
        page: PageRequest,
    ) -> Result<Page<Appointment>> {
        self.list_appointments(
            AppointmentQuery {
                patient_id: Some(patient_id),
                order: AppointmentOrder::LatestFirst,
                ..Default::default()
            },
            page,
        )
        .await
    }

    /// A provider's appointments, most recent first
    pub async fn list_by_provider(
        &self,
        provider_id: ProviderId,
        page: PageRequest,
    ) -> Result<Page<Appointment>> {
        self.list_appointments(
            AppointmentQuery {
                provider_id: Some(provider_id),
                order: AppointmentOrder::LatestFirst,
                ..Default::default()
            },
            page,
        )
        .await
    }

    pub async fn upcoming_for_patient(
        &self,
        patient_id: PatientId,
        page: PageRequest,
    ) -> Result<Page<Appointment>> {
        self.list_appointments(
            AppointmentQuery {
                patient_id: Some(patient_id),
                ..upcoming_query()
            },
            page,
        )
        .await
    }

    pub async fn upcoming_for_provider(
        &self,
        provider_id: ProviderId,
        page: PageRequest,
    ) -> Result<Page<Appointment>> {
        self.list_appointments(
            AppointmentQuery {
                provider_id: Some(provider_id),
                ..upcoming_query()
            },
            page,
        )
        .await
    }

    /// Everything occupying the provider's calendar within `[start, end)`
    pub async fn provider_schedule(
        &self,
        provider_id: ProviderId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Appointment>> {
        if end <= start {
            return Err(CoreError::validation("end", "must be after start"));
        }
        if self.providers.get_provider(provider_id).await?.is_none() {
            return Err(CoreError::ProviderNotFound { id: provider_id });
        }

        let page = self
            .list_appointments(
                AppointmentQuery {
                    provider_id: Some(provider_id),
                    statuses: AppointmentStatus::ALL
                        .into_iter()
                        .filter(AppointmentStatus::occupies_slot)
                        .collect(),
                    starts_at_or_after: Some(start),
                    starts_before: Some(end),
                    order: AppointmentOrder::EarliestFirst,
                    ..Default::default()
                },
                PageRequest::all(),
            )
            .await?;
        Ok(page.items)
    }
}

fn upcoming_query() -> AppointmentQuery {
    AppointmentQuery {
        statuses: vec![AppointmentStatus::Scheduled, AppointmentStatus::Confirmed],
        starts_at_or_after: Some(Utc::now()),
        order: AppointmentOrder::EarliestFirst,
        ..Default::default()
    }
}

fn slot_conflict(err: DatabaseError) -> CoreError {
    match err {
        DatabaseError::ScheduleConflict {
            provider_id,
            starts_at,
            ..
        } => CoreError::AppointmentConflict {
            provider_id,
            at: starts_at,
        },
        other => other.into(),
    }
}
