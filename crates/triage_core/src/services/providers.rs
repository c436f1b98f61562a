use chrono::Utc;
use std::sync::Arc;

use crate::{
    CoreError, Result,
    db::{DatabaseError, Page, PageRequest, ProviderRepository},
    id::{ProviderId, UserId},
    provider::{Provider, ProviderChanges, ProviderFilter, ProviderProfile, ProviderRegistration},
    user::{Role, User},
    validation::Validate,
};

use super::UserService;

#[derive(Clone)]
pub struct ProviderService {
    users: UserService,
    providers: Arc<dyn ProviderRepository>,
}

impl ProviderService {
    pub fn new(users: UserService, providers: Arc<dyn ProviderRepository>) -> Self {
        Self { users, providers }
    }

    /// Create a provider-role account and its profile
    ///
    /// The license is checked before the account exists so a rejected
    /// registration leaves no orphan user behind.
    pub async fn register_provider(&self, input: ProviderRegistration) -> Result<(User, Provider)> {
        input.validate()?;
        let ProviderRegistration { account, profile } = input;

        self.ensure_license_free(profile.license_number.trim(), None)
            .await?;

        let user = self.users.create_user(account, Role::Provider).await?;
        let provider = self.create_provider(user.id, profile).await?;
        tracing::info!(
            provider_id = %provider.id,
            user_id = %user.id,
            specialty = %provider.specialty,
            "registered provider"
        );
        Ok((user, provider))
    }

    pub async fn create_provider(
        &self,
        user_id: UserId,
        profile: ProviderProfile,
    ) -> Result<Provider> {
        profile.validate()?;
        if self.providers.find_provider_by_user(user_id).await?.is_some() {
            return Err(CoreError::ProviderAlreadyExists { user_id });
        }
        self.ensure_license_free(profile.license_number.trim(), None)
            .await?;

        let provider = Provider::new(user_id, profile, Utc::now());
        self.providers
            .insert_provider(provider)
            .await
            .map_err(|e| unique_to_core(e, user_id))
    }

    pub async fn get_provider(&self, id: ProviderId) -> Result<Provider> {
        self.providers
            .get_provider(id)
            .await?
            .ok_or(CoreError::ProviderNotFound { id })
    }

    pub async fn get_provider_by_user(&self, user_id: UserId) -> Result<Option<Provider>> {
        Ok(self.providers.find_provider_by_user(user_id).await?)
    }

    pub async fn get_provider_by_license(&self, license: &str) -> Result<Option<Provider>> {
        Ok(self.providers.find_provider_by_license(license.trim()).await?)
    }

    pub async fn update_provider(
        &self,
        id: ProviderId,
        changes: ProviderChanges,
    ) -> Result<Provider> {
        changes.validate()?;
        let provider = self.get_provider(id).await?;

        if let Some(license) = changes.license_number.as_deref().map(str::trim) {
            if license != provider.license_number {
                self.ensure_license_free(license, Some(id)).await?;
            }
        }

        self.providers
            .update_provider(id, changes, Utc::now())
            .await
            .map_err(|err| match err {
                DatabaseError::NotFound { .. } => CoreError::ProviderNotFound { id },
                other => unique_to_core(other, provider.user_id),
            })
    }

    pub async fn delete_provider(&self, id: ProviderId) -> Result<()> {
        if !self.providers.delete_provider(id, Utc::now()).await? {
            return Err(CoreError::ProviderNotFound { id });
        }
        tracing::info!(provider_id = %id, "deleted provider");
        Ok(())
    }

    pub async fn list_providers(
        &self,
        filter: ProviderFilter,
        page: PageRequest,
    ) -> Result<Page<Provider>> {
        Ok(self.providers.list_providers(filter, page).await?)
    }

    async fn ensure_license_free(&self, license: &str, owner: Option<ProviderId>) -> Result<()> {
        match self.providers.find_provider_by_license(license).await? {
            Some(existing) if Some(existing.id) != owner => Err(CoreError::LicenseAlreadyExists {
                license_number: license.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

fn unique_to_core(err: DatabaseError, user_id: UserId) -> CoreError {
    match err {
        DatabaseError::UniqueViolation {
            field: "license_number",
            value,
            ..
        } => CoreError::LicenseAlreadyExists {
            license_number: value,
        },
        DatabaseError::UniqueViolation {
            field: "user_id", ..
        } => CoreError::ProviderAlreadyExists { user_id },
        other => other.into(),
    }
}
