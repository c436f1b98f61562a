use chrono::Utc;
use std::sync::Arc;

use crate::{
    CoreError, Result,
    db::{DatabaseError, Page, PageRequest, PatientRepository},
    id::{PatientId, UserId},
    patient::{Patient, PatientChanges, PatientProfile, PatientRegistration},
    user::{Role, User},
    validation::Validate,
};

use super::UserService;

#[derive(Clone)]
pub struct PatientService {
    users: UserService,
    patients: Arc<dyn PatientRepository>,
}

impl PatientService {
    pub fn new(users: UserService, patients: Arc<dyn PatientRepository>) -> Self {
        Self { users, patients }
    }

    /// Create a patient-role account and its profile in one step
    pub async fn register_patient(&self, input: PatientRegistration) -> Result<(User, Patient)> {
        input.validate()?;
        let PatientRegistration { account, profile } = input;

        let user = self.users.create_user(account, Role::Patient).await?;
        let patient = self.create_patient(user.id, profile).await?;
        tracing::info!(patient_id = %patient.id, user_id = %user.id, "registered patient");
        Ok((user, patient))
    }

    /// Attach a profile to an existing user
    pub async fn create_patient(&self, user_id: UserId, profile: PatientProfile) -> Result<Patient> {
        profile.validate()?;
        if self.patients.find_patient_by_user(user_id).await?.is_some() {
            return Err(CoreError::PatientAlreadyExists { user_id });
        }

        let patient = Patient::new(user_id, profile, Utc::now());
        self.patients
            .insert_patient(patient)
            .await
            .map_err(|e| match e {
                DatabaseError::UniqueViolation { .. } => CoreError::PatientAlreadyExists { user_id },
                other => other.into(),
            })
    }

    pub async fn get_patient(&self, id: PatientId) -> Result<Patient> {
        self.patients
            .get_patient(id)
            .await?
            .ok_or(CoreError::PatientNotFound { id })
    }

    pub async fn get_patient_by_user(&self, user_id: UserId) -> Result<Option<Patient>> {
        Ok(self.patients.find_patient_by_user(user_id).await?)
    }

    pub async fn update_patient(&self, id: PatientId, changes: PatientChanges) -> Result<Patient> {
        changes.validate()?;
        self.patients
            .update_patient(id, changes, Utc::now())
            .await
            .map_err(|err| match err {
                DatabaseError::NotFound { .. } => CoreError::PatientNotFound { id },
                other => other.into(),
            })
    }

    pub async fn delete_patient(&self, id: PatientId) -> Result<()> {
        if !self.patients.delete_patient(id, Utc::now()).await? {
            return Err(CoreError::PatientNotFound { id });
        }
        tracing::info!(patient_id = %id, "deleted patient");
        Ok(())
    }

    pub async fn list_patients(&self, page: PageRequest) -> Result<Page<Patient>> {
        Ok(self.patients.list_patients(page).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::MemoryStore,
        test_support::{new_user, patient_registration},
    };
    use chrono::NaiveDate;

    fn service() -> PatientService {
        let store = Arc::new(MemoryStore::new());
        PatientService::new(UserService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_register_patient_creates_user_and_profile() {
        let patients = service();
        let (user, patient) = patients
            .register_patient(patient_registration("ada@example.com"))
            .await
            .unwrap();

        assert_eq!(user.role, Role::Patient);
        assert_eq!(patient.user_id, user.id);
        assert_eq!(
            patients.get_patient_by_user(user.id).await.unwrap(),
            Some(patient)
        );
    }

    #[tokio::test]
    async fn test_register_rejects_taken_email_before_any_write() {
        let patients = service();
        patients
            .register_patient(patient_registration("ada@example.com"))
            .await
            .unwrap();

        let err = patients
            .register_patient(patient_registration("ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::EmailAlreadyExists { .. }));
        assert_eq!(
            patients.list_patients(PageRequest::all()).await.unwrap().total,
            1
        );
    }

    #[tokio::test]
    async fn test_second_profile_for_user_rejected() {
        let store = Arc::new(MemoryStore::new());
        let users = UserService::new(store.clone());
        let patients = PatientService::new(users.clone(), store);
        let user = users
            .create_user(new_user("grace@example.com"), Role::Patient)
            .await
            .unwrap();
        let dob = NaiveDate::from_ymd_opt(1970, 5, 5).unwrap();

        patients
            .create_patient(user.id, PatientProfile::minimal(dob))
            .await
            .unwrap();
        let err = patients
            .create_patient(user.id, PatientProfile::minimal(dob))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::PatientAlreadyExists { user_id } if user_id == user.id));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let patients = service();
        let (_, patient) = patients
            .register_patient(patient_registration("ada@example.com"))
            .await
            .unwrap();

        let updated = patients
            .update_patient(
                patient.id,
                PatientChanges {
                    city: Some("Porto".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.city.as_deref(), Some("Porto"));
        assert!(updated.updated_at >= patient.updated_at);

        patients.delete_patient(patient.id).await.unwrap();
        assert!(matches!(
            patients.get_patient(patient.id).await.unwrap_err(),
            CoreError::PatientNotFound { .. }
        ));
    }
}
