//! User administration handlers

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use triage_api::{
    ApiError,
    requests::{UpdateUserRequest, UserListQuery},
    responses::{UserListResponse, UserResponse},
};
use triage_core::{Role, UserId};

use crate::{
    extract::{ApiJson, ApiQuery},
    middleware::AuthUser,
    state::AppState,
};

pub async fn list_users(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> Result<Json<UserListResponse>, ApiError> {
    caller.require_role(&[Role::Admin])?;
    let params = query.pagination();
    let page = state
        .services
        .users
        .list_users(query.role, params.to_page_request()?)
        .await?;
    Ok(Json(UserListResponse::from_page(page, &params)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id: UserId = id.parse()?;
    caller.admin_or_self(id)?;
    Ok(Json(state.services.users.get_user(id).await?.into()))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
    ApiJson(changes): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let id: UserId = id.parse()?;
    caller.admin_or_self(id)?;
    Ok(Json(state.services.users.update_user(id, changes).await?.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    caller.require_role(&[Role::Admin])?;
    let id: UserId = id.parse()?;
    state.services.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn activate_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    set_active(state, caller, id, true).await
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    set_active(state, caller, id, false).await
}

async fn set_active(
    state: AppState,
    caller: AuthUser,
    id: String,
    active: bool,
) -> Result<Json<UserResponse>, ApiError> {
    caller.require_role(&[Role::Admin])?;
    let id: UserId = id.parse()?;
    if !active && id == caller.id {
        return Err(ApiError::BadRequest {
            message: "Administrators cannot deactivate their own account".to_string(),
        });
    }
    Ok(Json(state.services.users.set_active(id, active).await?.into()))
}
