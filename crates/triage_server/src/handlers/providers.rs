//! Provider handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use triage_api::{
    ApiError,
    requests::{
        OwnedAppointmentsQuery, ProviderListQuery, RegisterProviderRequest, ScheduleQuery,
        UpdateProviderRequest,
    },
    responses::{AppointmentListResponse, AppointmentResponse, ProviderListResponse, ProviderResponse},
};
use triage_core::{Provider, ProviderId, provider::ProviderFilter};

use crate::{
    extract::{ApiJson, ApiQuery},
    middleware::AuthUser,
    state::AppState,
};

fn ensure_admin_or_owner(caller: &AuthUser, provider: &Provider) -> Result<(), ApiError> {
    if caller.is_admin() || provider.user_id == caller.id {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "Only an administrator or the provider themselves may do this",
        ))
    }
}

/// Public self-registration
pub async fn register_provider(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterProviderRequest>,
) -> Result<(StatusCode, Json<ProviderResponse>), ApiError> {
    let (_, provider) = state.services.providers.register_provider(request).await?;
    Ok((StatusCode::CREATED, Json(provider.into())))
}

pub async fn list_providers(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ProviderListQuery>,
) -> Result<Json<ProviderListResponse>, ApiError> {
    let params = query.pagination();
    let filter = ProviderFilter {
        specialty: query.specialty,
        accepting_new_patients: query.accepting_patients,
    };
    let page = state
        .services
        .providers
        .list_providers(filter, params.to_page_request()?)
        .await?;
    Ok(Json(ProviderListResponse::from_page(page, &params)))
}

pub async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProviderResponse>, ApiError> {
    let provider = state.services.providers.get_provider(id.parse()?).await?;
    Ok(Json(provider.into()))
}

pub async fn update_provider(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<UpdateProviderRequest>,
) -> Result<Json<ProviderResponse>, ApiError> {
    let id: ProviderId = id.parse()?;
    let provider = state.services.providers.get_provider(id).await?;
    ensure_admin_or_owner(&caller, &provider)?;

    let provider = state.services.providers.update_provider(id, changes).await?;
    Ok(Json(provider.into()))
}

pub async fn delete_provider(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require_role(&[triage_core::Role::Admin])?;
    state.services.providers.delete_provider(id.parse()?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A provider's appointments; `upcoming=true` keeps only future, active ones
pub async fn provider_appointments(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<OwnedAppointmentsQuery>,
) -> Result<Json<AppointmentListResponse>, ApiError> {
    let provider = state.services.providers.get_provider(id.parse()?).await?;
    ensure_admin_or_owner(&caller, &provider)?;

    let params = query.pagination();
    let page_request = params.to_page_request()?;
    let appointments = &state.services.appointments;
    let page = if query.upcoming {
        appointments
            .upcoming_for_provider(provider.id, page_request)
            .await?
    } else {
        appointments
            .list_by_provider(provider.id, page_request)
            .await?
    };
    Ok(Json(AppointmentListResponse::from_page(page, &params)))
}

/// Booked slots in `[start, end)`, earliest first
pub async fn provider_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(query): ApiQuery<ScheduleQuery>,
) -> Result<Json<Vec<AppointmentResponse>>, ApiError> {
    query.check()?;
    let schedule = state
        .services
        .appointments
        .provider_schedule(id.parse()?, query.start, query.end)
        .await?;
    Ok(Json(schedule.into_iter().map(Into::into).collect()))
}
