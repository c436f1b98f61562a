//! Authentication middleware and the caller identity it attaches

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use triage_api::ApiError;
use triage_core::{Role, UserId};

use crate::state::AppState;

/// The authenticated caller, taken from a validated access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with 403 unless the caller holds one of `roles`
    pub fn require_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!(
                "This action requires one of: {}",
                roles
                    .iter()
                    .map(Role::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }

    /// Fail with 403 unless the caller is an admin or the user `owner`
    pub fn admin_or_self(&self, owner: UserId) -> Result<(), ApiError> {
        if self.is_admin() || self.id == owner {
            Ok(())
        } else {
            Err(ApiError::forbidden("You can only access your own account"))
        }
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Authentication middleware
pub async fn require_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).ok_or_else(|| ApiError::Unauthorized {
        message: Some("Missing authorization header".to_string()),
    })?;

    let claims =
        crate::auth::validate_access_token(token, &state.jwt_decoding_key).map_err(|e| {
            tracing::warn!(error = %e, "rejected access token");
            ApiError::Unauthorized {
                message: Some("Invalid or expired token".to_string()),
            }
        })?;

    request.extensions_mut().insert(AuthUser {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer_token(&headers), Some("abc.def"));

        headers.insert("Authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer_token(&headers), None);

        headers.insert("Authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn test_role_checks() {
        let caller = AuthUser {
            id: UserId::generate(),
            email: "p@example.com".to_string(),
            role: Role::Patient,
        };
        assert!(caller.require_role(&[Role::Admin, Role::Provider]).is_err());
        assert!(caller.require_role(&[Role::Patient]).is_ok());
        assert!(caller.admin_or_self(caller.id).is_ok());
        assert_eq!(
            caller.admin_or_self(UserId::generate()).unwrap_err().status_code(),
            403
        );
    }
}
