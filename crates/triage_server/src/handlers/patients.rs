//! Patient handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use triage_api::{
    ApiError, PaginationParams,
    requests::{OwnedAppointmentsQuery, RegisterPatientRequest, UpdatePatientRequest},
    responses::{AppointmentListResponse, PatientListResponse, PatientResponse},
};
use triage_core::{Patient, PatientId, Role};

use crate::{
    extract::{ApiJson, ApiQuery},
    middleware::AuthUser,
    state::AppState,
};

/// Staff see every patient; a patient sees only their own record
pub(crate) fn ensure_patient_access(caller: &AuthUser, patient: &Patient) -> Result<(), ApiError> {
    match caller.role {
        Role::Admin | Role::Provider => Ok(()),
        Role::Patient if patient.user_id == caller.id => Ok(()),
        Role::Patient => Err(ApiError::forbidden(
            "Patients can only access their own records",
        )),
    }
}

/// Public self-registration
pub async fn register_patient(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterPatientRequest>,
) -> Result<(StatusCode, Json<PatientResponse>), ApiError> {
    let (_, patient) = state.services.patients.register_patient(request).await?;
    Ok((StatusCode::CREATED, Json(patient.into())))
}

pub async fn list_patients(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<Json<PatientListResponse>, ApiError> {
    caller.require_role(&[Role::Admin, Role::Provider])?;
    let page = state
        .services
        .patients
        .list_patients(params.to_page_request()?)
        .await?;
    Ok(Json(PatientListResponse::from_page(page, &params)))
}

pub async fn get_patient(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<PatientResponse>, ApiError> {
    let patient = state.services.patients.get_patient(id.parse()?).await?;
    ensure_patient_access(&caller, &patient)?;
    Ok(Json(patient.into()))
}

pub async fn update_patient(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<UpdatePatientRequest>,
) -> Result<Json<PatientResponse>, ApiError> {
    let id: PatientId = id.parse()?;
    let patient = state.services.patients.get_patient(id).await?;
    ensure_patient_access(&caller, &patient)?;

    let patient = state.services.patients.update_patient(id, changes).await?;
    Ok(Json(patient.into()))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require_role(&[Role::Admin])?;
    state.services.patients.delete_patient(id.parse()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A patient's appointments; `upcoming=true` keeps only future, active ones
pub async fn patient_appointments(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<OwnedAppointmentsQuery>,
) -> Result<Json<AppointmentListResponse>, ApiError> {
    let patient = state.services.patients.get_patient(id.parse()?).await?;
    ensure_patient_access(&caller, &patient)?;

    let params = query.pagination();
    let page_request = params.to_page_request()?;
    let appointments = &state.services.appointments;
    let page = if query.upcoming {
        appointments
            .upcoming_for_patient(patient.id, page_request)
            .await?
    } else {
        appointments.list_by_patient(patient.id, page_request).await?
    };
    Ok(Json(AppointmentListResponse::from_page(page, &params)))
}
