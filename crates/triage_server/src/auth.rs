//! JWT issuance and validation

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use triage_api::responses::TokenResponse;
use triage_core::{Role, User, UserId};

use crate::{
    error::{ServerError, ServerResult},
    state::AppState,
};

pub const ACCESS_TOKEN_TYPE: &str = "access";
pub const REFRESH_TOKEN_TYPE: &str = "refresh";

/// Claims carried by an access token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: uuid::Uuid,
    pub token_type: String,
}

/// Claims carried by a refresh token; `family` survives every refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub jti: uuid::Uuid,
    pub token_type: String,
    pub family: uuid::Uuid,
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

fn expires_at(now: i64, ttl_seconds: u64) -> ServerResult<i64> {
    i64::try_from(ttl_seconds)
        .ok()
        .and_then(|ttl| now.checked_add(ttl))
        .ok_or_else(|| {
            ServerError::Config(format!("token lifetime of {ttl_seconds}s is out of range"))
        })
}

/// Generate an access token
pub fn generate_access_token(
    user: &User,
    encoding_key: &EncodingKey,
    ttl_seconds: u64,
) -> ServerResult<String> {
    let now = chrono::Utc::now().timestamp();

    let claims = AccessTokenClaims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        iat: now,
        exp: expires_at(now, ttl_seconds)?,
        jti: uuid::Uuid::new_v4(),
        token_type: ACCESS_TOKEN_TYPE.to_string(),
    };

    Ok(encode(&Header::new(Algorithm::HS256), &claims, encoding_key)?)
}

/// Generate a refresh token
pub fn generate_refresh_token(
    user: &User,
    family: uuid::Uuid,
    encoding_key: &EncodingKey,
    ttl_seconds: u64,
) -> ServerResult<String> {
    let now = chrono::Utc::now().timestamp();

    let claims = RefreshTokenClaims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        iat: now,
        exp: expires_at(now, ttl_seconds)?,
        jti: uuid::Uuid::new_v4(),
        token_type: REFRESH_TOKEN_TYPE.to_string(),
        family,
    };

    Ok(encode(&Header::new(Algorithm::HS256), &claims, encoding_key)?)
}

/// Validate an access token; refresh tokens are rejected
pub fn validate_access_token(
    token: &str,
    decoding_key: &DecodingKey,
) -> ServerResult<AccessTokenClaims> {
    let claims = decode::<AccessTokenClaims>(token, decoding_key, &validation())?.claims;
    if claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken).into());
    }
    Ok(claims)
}

/// Validate a refresh token; access tokens are rejected
pub fn validate_refresh_token(
    token: &str,
    decoding_key: &DecodingKey,
) -> ServerResult<RefreshTokenClaims> {
    let claims = decode::<RefreshTokenClaims>(token, decoding_key, &validation())?.claims;
    if claims.token_type != REFRESH_TOKEN_TYPE {
        return Err(jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken).into());
    }
    Ok(claims)
}

/// Issue an access/refresh pair for `user`, continuing `family` if given
pub fn issue_tokens(
    state: &AppState,
    user: &User,
    family: Option<uuid::Uuid>,
) -> ServerResult<TokenResponse> {
    let family = family.unwrap_or_else(uuid::Uuid::new_v4);
    let access_token = generate_access_token(
        user,
        &state.jwt_encoding_key,
        state.config.access_token_ttl,
    )?;
    let refresh_token = generate_refresh_token(
        user,
        family,
        &state.jwt_encoding_key,
        state.config.refresh_token_ttl,
    )?;

    Ok(TokenResponse::bearer(
        access_token,
        refresh_token,
        state.config.access_token_ttl,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: UserId::generate(),
            email: "ada@example.com".to_string(),
            hashed_password: String::new(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone_number: None,
            role: Role::Provider,
            is_active: true,
            is_verified: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn keys() -> (EncodingKey, DecodingKey) {
        (
            EncodingKey::from_secret(b"test-secret"),
            DecodingKey::from_secret(b"test-secret"),
        )
    }

    #[test]
    fn test_access_token_round_trip() {
        let (enc, dec) = keys();
        let user = user();
        let token = generate_access_token(&user, &enc, 60).unwrap();
        let claims = validate_access_token(&token, &dec).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Provider);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let (enc, dec) = keys();
        let user = user();
        let access = generate_access_token(&user, &enc, 60).unwrap();
        let refresh = generate_refresh_token(&user, uuid::Uuid::new_v4(), &enc, 60).unwrap();

        assert!(validate_refresh_token(&access, &dec).is_err());
        assert!(validate_access_token(&refresh, &dec).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let (enc, _) = keys();
        let token = generate_access_token(&user(), &enc, 60).unwrap();
        let other = DecodingKey::from_secret(b"another-secret");
        assert!(validate_access_token(&token, &other).is_err());
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        let (enc, _) = keys();
        let err = generate_access_token(&user(), &enc, u64::MAX).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
        let err = generate_refresh_token(&user(), uuid::Uuid::new_v4(), &enc, i64::MAX as u64)
            .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let (enc, dec) = keys();
        let user = user();
        let now = Utc::now().timestamp();
        let claims = AccessTokenClaims {
            sub: user.id,
            email: user.email,
            role: user.role,
            iat: now - 120,
            exp: now - 60,
            jti: uuid::Uuid::new_v4(),
            token_type: ACCESS_TOKEN_TYPE.to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &enc).unwrap();
        assert!(validate_access_token(&token, &dec).is_err());
    }
}
