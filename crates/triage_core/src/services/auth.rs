use std::sync::Arc;

use crate::{
    CoreError, Result,
    db::{DatabaseError, UserRepository},
    id::UserId,
    password::verify_password,
    user::User,
    validation::normalize_email,
};

/// Credential checks; token issuance lives in the HTTP layer
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Verify credentials and record the login
    ///
    /// Unknown email and wrong password both yield `InvalidCredentials`.
    /// Account state is only revealed once the password has been verified.
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        let Some(user) = self.users.find_user_by_email(&email).await? else {
            tracing::warn!("login attempt for unknown email");
            return Err(CoreError::InvalidCredentials);
        };

        if !verify_password(password, &user.hashed_password) {
            tracing::warn!(user_id = %user.id, "login attempt with wrong password");
            return Err(CoreError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(CoreError::UserNotActive { id: user.id });
        }

        // the account may have been deactivated while the hash was checked
        let user = self
            .users
            .record_login(user.id, chrono::Utc::now())
            .await
            .map_err(|err| match err {
                DatabaseError::NotFound { .. } => CoreError::InvalidCredentials,
                other => other.into(),
            })?;
        if !user.is_active {
            tracing::warn!(user_id = %user.id, "account deactivated during login");
            return Err(CoreError::UserNotActive { id: user.id });
        }

        tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
        Ok(user)
    }

    /// Load the live, active user a token was issued to
    pub async fn user_for_token(&self, user_id: UserId) -> Result<User> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(CoreError::UserNotFound { id: user_id })?;
        if !user.is_active {
            return Err(CoreError::UserNotActive { id: user.id });
        }
        Ok(user)
    }
}
