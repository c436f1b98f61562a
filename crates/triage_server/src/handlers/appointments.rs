//! Appointment handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use triage_api::{
    ApiError,
    requests::{
        AppointmentListQuery, CancelAppointmentRequest, CreateAppointmentRequest,
        UpdateAppointmentRequest,
    },
    responses::{AppointmentListResponse, AppointmentResponse, TriageResponse},
};
use triage_core::{
    Appointment, AppointmentId, PatientId, Role,
    appointment::{AppointmentOrder, AppointmentQuery},
    triage,
};

use crate::{
    extract::{ApiJson, ApiQuery},
    middleware::AuthUser,
    state::AppState,
};

/// Fail unless a patient-role caller owns `patient_id`; staff always pass
async fn ensure_owns_patient(
    state: &AppState,
    caller: &AuthUser,
    patient_id: PatientId,
) -> Result<(), ApiError> {
    if caller.role != Role::Patient {
        return Ok(());
    }
    match state.services.patients.get_patient_by_user(caller.id).await? {
        Some(own) if own.id == patient_id => Ok(()),
        _ => Err(ApiError::forbidden(
            "Patients can only access their own appointments",
        )),
    }
}

async fn load_for(
    state: &AppState,
    caller: &AuthUser,
    id: String,
) -> Result<Appointment, ApiError> {
    let appt = state
        .services
        .appointments
        .get_appointment(id.parse::<AppointmentId>()?)
        .await?;
    ensure_owns_patient(state, caller, appt.patient_id).await?;
    Ok(appt)
}

pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(request): ApiJson<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<AppointmentResponse>), ApiError> {
    ensure_owns_patient(&state, &caller, request.patient_id).await?;
    let appt = state
        .services
        .appointments
        .create_appointment(request)
        .await?;
    Ok((StatusCode::CREATED, Json(appt.into())))
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<AppointmentListQuery>,
) -> Result<Json<AppointmentListResponse>, ApiError> {
    caller.require_role(&[Role::Admin, Role::Provider])?;
    let params = query.pagination();
    let filter = AppointmentQuery {
        patient_id: query.patient_id,
        provider_id: query.provider_id,
        statuses: query.status.into_iter().collect(),
        order: AppointmentOrder::LatestFirst,
        ..Default::default()
    };
    let page = state
        .services
        .appointments
        .list_appointments(filter, params.to_page_request()?)
        .await?;
    Ok(Json(AppointmentListResponse::from_page(page, &params)))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    Ok(Json(load_for(&state, &caller, id).await?.into()))
}

/// Patients may reschedule or edit notes on their own bookings; status and
/// diagnosis changes are for staff
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<UpdateAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let appt = load_for(&state, &caller, id).await?;
    if caller.role == Role::Patient && (changes.status.is_some() || changes.diagnosis.is_some()) {
        return Err(ApiError::forbidden(
            "Only staff can change appointment status or diagnosis",
        ));
    }

    let appt = state
        .services
        .appointments
        .update_appointment(appt.id, changes)
        .await?;
    Ok(Json(appt.into()))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require_role(&[Role::Admin])?;
    state
        .services
        .appointments
        .delete_appointment(id.parse()?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn confirm_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    caller.require_role(&[Role::Admin, Role::Provider])?;
    let appt = state
        .services
        .appointments
        .confirm_appointment(id.parse()?)
        .await?;
    Ok(Json(appt.into()))
}

pub async fn complete_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    caller.require_role(&[Role::Admin, Role::Provider])?;
    let appt = state
        .services
        .appointments
        .complete_appointment(id.parse()?)
        .await?;
    Ok(Json(appt.into()))
}

pub async fn mark_no_show(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    caller.require_role(&[Role::Admin, Role::Provider])?;
    let appt = state
        .services
        .appointments
        .mark_no_show(id.parse()?)
        .await?;
    Ok(Json(appt.into()))
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<CancelAppointmentRequest>,
) -> Result<Json<AppointmentResponse>, ApiError> {
    let appt = load_for(&state, &caller, id).await?;
    let appt = state
        .services
        .appointments
        .cancel_appointment(appt.id, request.into())
        .await?;
    Ok(Json(appt.into()))
}

/// Triage the symptoms recorded on an appointment
pub async fn appointment_triage(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<TriageResponse>, ApiError> {
    let appt = load_for(&state, &caller, id).await?;
    Ok(Json(triage::assess(&appt.symptoms)))
}
