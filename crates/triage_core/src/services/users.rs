use chrono::Utc;
use std::sync::Arc;

use crate::{
    CoreError, Result,
    db::{DatabaseError, Page, PageRequest, UserPatch, UserRepository},
    id::UserId,
    password::{hash_password, verify_password},
    user::{NewUser, Role, User, UserChanges},
    validation::{Validate, normalize_email},
};

/// Account management
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn create_user(&self, input: NewUser, role: Role) -> Result<User> {
        input.validate()?;
        let email = input.normalized_email();

        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(CoreError::EmailAlreadyExists { email });
        }

        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            email,
            hashed_password: hash_password(&input.password)?,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
            phone_number: input.phone_number,
            role,
            is_active: true,
            is_verified: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        let user = self.users.insert_user(user).await.map_err(email_conflict)?;
        tracing::info!(user_id = %user.id, role = %user.role, "created user");
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User> {
        self.users
            .get_user(id)
            .await?
            .ok_or(CoreError::UserNotFound { id })
    }

    pub async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get_user(id).await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .find_user_by_email(&normalize_email(email))
            .await?)
    }

    pub async fn email_taken(&self, email: &str) -> Result<bool> {
        Ok(self.get_user_by_email(email).await?.is_some())
    }

    pub async fn update_user(&self, id: UserId, changes: UserChanges) -> Result<User> {
        changes.validate()?;
        let current = self.get_user(id).await?;

        let mut patch = UserPatch {
            first_name: changes.first_name.map(|n| n.trim().to_string()),
            last_name: changes.last_name.map(|n| n.trim().to_string()),
            phone_number: changes.phone_number,
            ..Default::default()
        };
        if let Some(email) = changes.email {
            let email = normalize_email(&email);
            if email != current.email {
                if self.users.find_user_by_email(&email).await?.is_some() {
                    return Err(CoreError::EmailAlreadyExists { email });
                }
                patch.email = Some(email);
            }
        }
        if let Some(password) = changes.password {
            patch.hashed_password = Some(hash_password(&password)?);
        }

        let user = self
            .users
            .update_user(id, patch, Utc::now())
            .await
            .map_err(|err| user_write_error(err, id))?;
        tracing::debug!(user_id = %user.id, "updated user");
        Ok(user)
    }

    /// Activate or deactivate an account; inactive users cannot log in
    pub async fn set_active(&self, id: UserId, active: bool) -> Result<User> {
        let user = self
            .users
            .set_user_active(id, active, Utc::now())
            .await
            .map_err(|err| user_write_error(err, id))?;
        tracing::info!(user_id = %user.id, active, "changed account activation");
        Ok(user)
    }

    pub async fn delete_user(&self, id: UserId) -> Result<()> {
        if !self.users.delete_user(id, Utc::now()).await? {
            return Err(CoreError::UserNotFound { id });
        }
        tracing::info!(user_id = %id, "deleted user");
        Ok(())
    }

    pub async fn list_users(&self, role: Option<Role>, page: PageRequest) -> Result<Page<User>> {
        Ok(self.users.list_users(role, page).await?)
    }

    pub async fn count_users(&self) -> Result<u64> {
        Ok(self.users.count_users().await?)
    }

    /// Look up a user by email and check the password; no activity checks
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.get_user_by_email(email).await? else {
            return Ok(None);
        };
        Ok(verify_password(password, &user.hashed_password).then_some(user))
    }
}

fn email_conflict(err: DatabaseError) -> CoreError {
    match err {
        DatabaseError::UniqueViolation {
            field: "email",
            value,
            ..
        } => CoreError::EmailAlreadyExists { email: value },
        other => other.into(),
    }
}

fn user_write_error(err: DatabaseError, id: UserId) -> CoreError {
    match err {
        DatabaseError::NotFound { .. } => CoreError::UserNotFound { id },
        other => email_conflict(other),
    }
}
