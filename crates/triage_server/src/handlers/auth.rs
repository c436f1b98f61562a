//! Authentication handlers

use axum::{
    Extension, Json,
    extract::State,
    http::HeaderMap,
};
use triage_api::{
    ApiError,
    requests::LoginRequest,
    responses::{TokenResponse, UserResponse},
};

use crate::{
    auth::{issue_tokens, validate_refresh_token},
    extract::ApiJson,
    middleware::{AuthUser, extract_bearer_token},
    state::AppState,
};

/// Handle login requests
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .services
        .auth
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(issue_tokens(&state, &user, None)?))
}

/// Handle token refresh requests
///
/// The refresh token travels as the Bearer credential. The user is re-loaded
/// so deactivated or deleted accounts cannot keep refreshing.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = extract_bearer_token(&headers).ok_or_else(|| ApiError::Unauthorized {
        message: Some("Missing refresh token".to_string()),
    })?;

    let claims = validate_refresh_token(token, &state.jwt_decoding_key).map_err(|e| {
        tracing::warn!(error = %e, "rejected refresh token");
        ApiError::Unauthorized {
            message: Some("Invalid or expired refresh token".to_string()),
        }
    })?;

    let user = state
        .services
        .auth
        .user_for_token(claims.sub)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::NotFound { .. } => ApiError::unauthorized("User no longer exists"),
            other => other,
        })?;

    tracing::debug!(user_id = %user.id, family = %claims.family, "refreshed tokens");
    Ok(Json(issue_tokens(&state, &user, Some(claims.family))?))
}

/// The caller's own account
pub async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.services.auth.user_for_token(caller.id).await?;
    Ok(Json(user.into()))
}
