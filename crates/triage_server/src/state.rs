//! Application state

use std::{sync::Arc, time::Instant};

use triage_core::{ConditionsClient, Role, Services, user::NewUser};

use crate::{config::ServerConfig, error::ServerResult};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub services: Services,
    pub conditions: ConditionsClient,
    pub jwt_encoding_key: jsonwebtoken::EncodingKey,
    pub jwt_decoding_key: jsonwebtoken::DecodingKey,
    pub started_at: Instant,
}

impl AppState {
    /// State backed by a fresh in-memory store
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        Self::with_services(config, Services::in_memory())
    }

    pub fn with_services(config: ServerConfig, services: Services) -> ServerResult<Self> {
        let conditions = ConditionsClient::new(config.conditions.clone())?;

        // Create JWT keys
        let jwt_encoding_key = jsonwebtoken::EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let jwt_decoding_key = jsonwebtoken::DecodingKey::from_secret(config.jwt_secret.as_bytes());

        Ok(Self {
            config: Arc::new(config),
            services,
            conditions,
            jwt_encoding_key,
            jwt_decoding_key,
            started_at: Instant::now(),
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Create the configured bootstrap admin unless its email is in use
    pub async fn seed_admin(&self) -> ServerResult<()> {
        let Some(admin) = &self.config.bootstrap_admin else {
            return Ok(());
        };

        if self.services.users.email_taken(&admin.email).await? {
            tracing::debug!(email = %admin.email, "bootstrap admin already exists");
            return Ok(());
        }

        let user = self
            .services
            .users
            .create_user(
                NewUser {
                    email: admin.email.clone(),
                    password: admin.password.clone(),
                    first_name: admin.first_name.clone(),
                    last_name: admin.last_name.clone(),
                    phone_number: None,
                },
                Role::Admin,
            )
            .await?;
        tracing::info!(user_id = %user.id, email = %user.email, "created bootstrap admin");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BootstrapAdmin;

    fn config_with_admin() -> ServerConfig {
        ServerConfig {
            bootstrap_admin: Some(BootstrapAdmin {
                email: "Root@Example.com".to_string(),
                password: "change-me-now".to_string(),
                first_name: "System".to_string(),
                last_name: "Administrator".to_string(),
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_seed_admin_once() {
        let state = AppState::new(config_with_admin()).unwrap();
        state.seed_admin().await.unwrap();
        state.seed_admin().await.unwrap();

        let admin = state
            .services
            .users
            .get_user_by_email("root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(state.services.users.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_no_bootstrap_admin_configured() {
        let state = AppState::new(ServerConfig::default()).unwrap();
        state.seed_admin().await.unwrap();
        assert_eq!(state.services.users.count_users().await.unwrap(), 0);
    }
}
