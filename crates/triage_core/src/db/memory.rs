//! In-process store backed by locked hash maps
//!
//! Each entity lives in its own table. Constraint checks run while the
//! table's write lock is held, so check-then-insert is atomic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

use super::{
    AppointmentRepository, DatabaseError, DbResult, Page, PageRequest, PatientRepository,
    ProviderRepository, UserPatch, UserRepository,
};
use crate::{
    CoreError, Result,
    appointment::{Appointment, AppointmentEdit, AppointmentOrder, AppointmentQuery, EditOutcome},
    id::{AppointmentId, PatientId, ProviderId, UserId},
    patient::{Patient, PatientChanges},
    provider::{Provider, ProviderChanges, ProviderFilter},
    user::{Role, User},
};

/// Common shape of stored rows
trait Row: Clone + Send + Sync {
    type Key: Copy + Eq + Hash + Ord + std::fmt::Display;
    const TABLE: &'static str;

    fn key(&self) -> Self::Key;
    fn created_at(&self) -> DateTime<Utc>;
    fn deleted_at(&self) -> Option<DateTime<Utc>>;
    fn mark_deleted(&mut self, at: DateTime<Utc>);

    fn is_live(&self) -> bool {
        self.deleted_at().is_none()
    }
}

macro_rules! impl_row {
    ($entity:ty, $key:ty, $table:literal) => {
        impl Row for $entity {
            type Key = $key;
            const TABLE: &'static str = $table;

            fn key(&self) -> Self::Key {
                self.id
            }

            fn created_at(&self) -> DateTime<Utc> {
                self.created_at
            }

            fn deleted_at(&self) -> Option<DateTime<Utc>> {
                self.deleted_at
            }

            fn mark_deleted(&mut self, at: DateTime<Utc>) {
                self.deleted_at = Some(at);
                self.updated_at = at;
            }
        }
    };
}

impl_row!(User, UserId, "user");
impl_row!(Patient, PatientId, "patient");
impl_row!(Provider, ProviderId, "provider");
impl_row!(Appointment, AppointmentId, "appointment");

struct Table<R: Row> {
    rows: RwLock<HashMap<R::Key, R>>,
}

impl<R: Row> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<R: Row> Table<R> {
    fn get(&self, key: R::Key) -> Option<R> {
        self.rows.read().get(&key).filter(|r| r.is_live()).cloned()
    }

    fn find(&self, pred: impl Fn(&R) -> bool) -> Option<R> {
        self.rows
            .read()
            .values()
            .filter(|r| r.is_live())
            .find(|r| pred(r))
            .cloned()
    }

    fn count(&self) -> u64 {
        self.rows.read().values().filter(|r| r.is_live()).count() as u64
    }

    /// Filter, sort, then slice; `total` counts all matches
    fn query(
        &self,
        pred: impl Fn(&R) -> bool,
        order: impl Fn(&R, &R) -> Ordering,
        page: PageRequest,
    ) -> Page<R> {
        let mut matched: Vec<R> = self
            .rows
            .read()
            .values()
            .filter(|r| r.is_live() && pred(r))
            .cloned()
            .collect();
        matched.sort_by(|a, b| order(a, b).then_with(|| a.key().cmp(&b.key())));

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        Page { items, total }
    }

    fn soft_delete(&self, key: R::Key, at: DateTime<Utc>) -> bool {
        let mut rows = self.rows.write();
        match rows.get_mut(&key) {
            Some(row) if row.is_live() => {
                row.mark_deleted(at);
                true
            }
            _ => false,
        }
    }

    /// Insert under the write lock after `check` passes
    fn insert_checked(
        &self,
        row: R,
        check: impl Fn(&HashMap<R::Key, R>, &R) -> DbResult<()>,
    ) -> DbResult<R> {
        let mut rows = self.rows.write();
        check(&rows, &row)?;
        rows.insert(row.key(), row.clone());
        Ok(row)
    }

    /// Change a live row in place under the write lock
    ///
    /// `apply` works on a copy and sees every other row, so checks and the
    /// write are one step. Nothing is stored if it fails.
    fn modify<T, E: From<DatabaseError>>(
        &self,
        key: R::Key,
        apply: impl FnOnce(&HashMap<R::Key, R>, &mut R) -> std::result::Result<T, E>,
    ) -> std::result::Result<(R, T), E> {
        let mut rows = self.rows.write();
        let mut row = rows
            .get(&key)
            .filter(|r| r.is_live())
            .cloned()
            .ok_or_else(|| DatabaseError::NotFound {
                table: R::TABLE,
                id: key.to_string(),
            })?;
        let out = apply(&rows, &mut row)?;
        rows.insert(key, row.clone());
        Ok((row, out))
    }
}

fn by_created<R: Row>(a: &R, b: &R) -> Ordering {
    a.created_at().cmp(&b.created_at())
}

/// Reject `row` if another live row has the same value for `field`
fn unique<R: Row, V: PartialEq + ToString>(
    rows: &HashMap<R::Key, R>,
    row: &R,
    field: &'static str,
    value: impl Fn(&R) -> V,
) -> DbResult<()> {
    let wanted = value(row);
    let taken = rows
        .values()
        .any(|other| other.is_live() && other.key() != row.key() && value(other) == wanted);
    if taken {
        return Err(DatabaseError::UniqueViolation {
            table: R::TABLE,
            field,
            value: wanted.to_string(),
        });
    }
    Ok(())
}

fn free_slot(rows: &HashMap<AppointmentId, Appointment>, candidate: &Appointment) -> DbResult<()> {
    if !candidate.status.occupies_slot() {
        return Ok(());
    }
    match rows.values().find(|existing| existing.conflicts_with(candidate)) {
        Some(existing) => Err(DatabaseError::ScheduleConflict {
            existing: existing.id,
            provider_id: candidate.provider_id,
            starts_at: candidate.appointment_datetime,
        }),
        None => Ok(()),
    }
}

/// All tables in one process-local store
#[derive(Default)]
pub struct MemoryStore {
    users: Table<User>,
    patients: Table<Patient>,
    providers: Table<Provider>,
    appointments: Table<Appointment>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: User) -> DbResult<User> {
        self.users.insert_checked(user, |rows, row| {
            unique(rows, row, "email", |u| u.email.clone())
        })
    }

    async fn get_user(&self, id: UserId) -> DbResult<Option<User>> {
        Ok(self.users.get(id))
    }

    async fn find_user_by_email(&self, email: &str) -> DbResult<Option<User>> {
        Ok(self.users.find(|u| u.email == email))
    }

    async fn update_user(
        &self,
        id: UserId,
        patch: UserPatch,
        at: DateTime<Utc>,
    ) -> DbResult<User> {
        let (user, ()) = self.users.modify::<_, DatabaseError>(id, |rows, user| {
            if let Some(email) = patch.email {
                user.email = email;
                unique(rows, user, "email", |u| u.email.clone())?;
            }
            if let Some(first_name) = patch.first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = patch.last_name {
                user.last_name = last_name;
            }
            if patch.phone_number.is_some() {
                user.phone_number = patch.phone_number;
            }
            if let Some(hashed_password) = patch.hashed_password {
                user.hashed_password = hashed_password;
            }
            user.updated_at = at;
            Ok(())
        })?;
        Ok(user)
    }

    async fn set_user_active(
        &self,
        id: UserId,
        active: bool,
        at: DateTime<Utc>,
    ) -> DbResult<User> {
        let (user, ()) = self.users.modify::<_, DatabaseError>(id, |_, user| {
            if user.is_active != active {
                user.is_active = active;
                user.updated_at = at;
            }
            Ok(())
        })?;
        Ok(user)
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> DbResult<User> {
        let (user, ()) = self.users.modify::<_, DatabaseError>(id, |_, user| {
            if user.is_active {
                user.last_login_at = Some(at);
                user.updated_at = at;
            }
            Ok(())
        })?;
        Ok(user)
    }

    async fn delete_user(&self, id: UserId, at: DateTime<Utc>) -> DbResult<bool> {
        Ok(self.users.soft_delete(id, at))
    }

    async fn list_users(&self, role: Option<Role>, page: PageRequest) -> DbResult<Page<User>> {
        Ok(self.users.query(
            |u| role.is_none_or(|r| u.role == r),
            by_created,
            page,
        ))
    }

    async fn count_users(&self) -> DbResult<u64> {
        Ok(self.users.count())
    }
}

#[async_trait]
impl PatientRepository for MemoryStore {
    async fn insert_patient(&self, patient: Patient) -> DbResult<Patient> {
        self.patients.insert_checked(patient, |rows, row| {
            unique(rows, row, "user_id", |p| p.user_id)
        })
    }

    async fn get_patient(&self, id: PatientId) -> DbResult<Option<Patient>> {
        Ok(self.patients.get(id))
    }

    async fn find_patient_by_user(&self, user_id: UserId) -> DbResult<Option<Patient>> {
        Ok(self.patients.find(|p| p.user_id == user_id))
    }

    async fn update_patient(
        &self,
        id: PatientId,
        changes: PatientChanges,
        at: DateTime<Utc>,
    ) -> DbResult<Patient> {
        let (patient, ()) = self.patients.modify::<_, DatabaseError>(id, |_, patient| {
            patient.apply(changes, at);
            Ok(())
        })?;
        Ok(patient)
    }

    async fn delete_patient(&self, id: PatientId, at: DateTime<Utc>) -> DbResult<bool> {
        Ok(self.patients.soft_delete(id, at))
    }

    async fn list_patients(&self, page: PageRequest) -> DbResult<Page<Patient>> {
        Ok(self.patients.query(|_| true, by_created, page))
    }
}

#[async_trait]
impl ProviderRepository for MemoryStore {
    async fn insert_provider(&self, provider: Provider) -> DbResult<Provider> {
        self.providers.insert_checked(provider, |rows, row| {
            unique(rows, row, "user_id", |p| p.user_id)?;
            unique(rows, row, "license_number", |p| p.license_number.clone())
        })
    }

    async fn get_provider(&self, id: ProviderId) -> DbResult<Option<Provider>> {
        Ok(self.providers.get(id))
    }

    async fn find_provider_by_user(&self, user_id: UserId) -> DbResult<Option<Provider>> {
        Ok(self.providers.find(|p| p.user_id == user_id))
    }

    async fn find_provider_by_license(&self, license: &str) -> DbResult<Option<Provider>> {
        Ok(self.providers.find(|p| p.license_number == license))
    }

    async fn update_provider(
        &self,
        id: ProviderId,
        changes: ProviderChanges,
        at: DateTime<Utc>,
    ) -> DbResult<Provider> {
        let (provider, ()) = self.providers.modify::<_, DatabaseError>(id, |rows, provider| {
            provider.apply(changes, at);
            unique(rows, provider, "license_number", |p| p.license_number.clone())
        })?;
        Ok(provider)
    }

    async fn delete_provider(&self, id: ProviderId, at: DateTime<Utc>) -> DbResult<bool> {
        Ok(self.providers.soft_delete(id, at))
    }

    async fn list_providers(
        &self,
        filter: ProviderFilter,
        page: PageRequest,
    ) -> DbResult<Page<Provider>> {
        Ok(self.providers.query(|p| filter.matches(p), by_created, page))
    }
}

#[async_trait]
impl AppointmentRepository for MemoryStore {
    async fn insert_appointment(&self, appointment: Appointment) -> DbResult<Appointment> {
        self.appointments.insert_checked(appointment, free_slot)
    }

    async fn get_appointment(&self, id: AppointmentId) -> DbResult<Option<Appointment>> {
        Ok(self.appointments.get(id))
    }

    async fn edit_appointment(
        &self,
        id: AppointmentId,
        edit: AppointmentEdit,
        at: DateTime<Utc>,
    ) -> Result<(Appointment, EditOutcome)> {
        self.appointments.modify::<_, CoreError>(id, |rows, appt| {
            let outcome = appt.apply_edit(edit, at)?;
            if outcome.rescheduled {
                free_slot(rows, appt)?;
            }
            Ok(outcome)
        })
    }

    async fn delete_appointment(&self, id: AppointmentId, at: DateTime<Utc>) -> DbResult<bool> {
        Ok(self.appointments.soft_delete(id, at))
    }

    async fn list_appointments(
        &self,
        query: AppointmentQuery,
        page: PageRequest,
    ) -> DbResult<Page<Appointment>> {
        let order = query.order;
        Ok(self.appointments.query(
            |a| query.matches(a),
            |a, b| match order {
                AppointmentOrder::Created => by_created(a, b),
                AppointmentOrder::EarliestFirst => {
                    a.appointment_datetime.cmp(&b.appointment_datetime)
                }
                AppointmentOrder::LatestFirst => {
                    b.appointment_datetime.cmp(&a.appointment_datetime)
                }
            },
            page,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        appointment::{AppointmentChanges, AppointmentStatus, NewAppointment},
        patient::PatientProfile,
        provider::ProviderProfile,
    };
    use chrono::{Duration, NaiveDate, TimeZone};
    use pretty_assertions::assert_eq;

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::generate(),
            email: email.to_string(),
            hashed_password: "x".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone_number: None,
            role: Role::Patient,
            is_active: true,
            is_verified: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn slot(provider: ProviderId, hour: u32, minutes: u32) -> Appointment {
        let start = Utc.with_ymd_and_hms(2030, 1, 7, hour, 0, 0).unwrap();
        let mut input = NewAppointment::new(PatientId::generate(), provider, start);
        input.duration_minutes = minutes;
        Appointment::new(input, Utc::now())
    }

    #[tokio::test]
    async fn test_email_unique_among_live_users() {
        let store = MemoryStore::new();
        let first = store.insert_user(user("a@example.com")).await.unwrap();

        let err = store.insert_user(user("a@example.com")).await.unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::UniqueViolation { field: "email", .. }
        ));

        assert!(store.delete_user(first.id, Utc::now()).await.unwrap());
        store.insert_user(user("a@example.com")).await.unwrap();
        assert_eq!(store.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_soft_deleted_rows_are_hidden() {
        let store = MemoryStore::new();
        let u = store.insert_user(user("b@example.com")).await.unwrap();
        store.delete_user(u.id, Utc::now()).await.unwrap();

        assert!(store.get_user(u.id).await.unwrap().is_none());
        assert!(
            store
                .find_user_by_email("b@example.com")
                .await
                .unwrap()
                .is_none()
        );
        assert!(!store.delete_user(u.id, Utc::now()).await.unwrap());

        let err = store
            .update_user(u.id, UserPatch::default(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
        let err = store.record_login(u.id, Utc::now()).await.unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_pages_and_filters() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let mut u = user(&format!("u{i}@example.com"));
            u.created_at += Duration::seconds(i);
            if i % 2 == 0 {
                u.role = Role::Provider;
            }
            store.insert_user(u).await.unwrap();
        }

        let page = store
            .list_users(None, PageRequest::new(2, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        let emails: Vec<_> = page.items.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, ["u2@example.com", "u3@example.com"]);

        let providers = store
            .list_users(Some(Role::Provider), PageRequest::all())
            .await
            .unwrap();
        assert_eq!(providers.total, 3);
    }

    #[tokio::test]
    async fn test_patient_unique_per_user() {
        let store = MemoryStore::new();
        let owner = UserId::generate();
        let dob = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        store
            .insert_patient(Patient::new(owner, PatientProfile::minimal(dob), Utc::now()))
            .await
            .unwrap();
        let err = store
            .insert_patient(Patient::new(owner, PatientProfile::minimal(dob), Utc::now()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::UniqueViolation { field: "user_id", .. }
        ));
    }

    #[tokio::test]
    async fn test_provider_license_unique() {
        let store = MemoryStore::new();
        store
            .insert_provider(Provider::new(
                UserId::generate(),
                ProviderProfile::new("Cardiology", "LIC-1"),
                Utc::now(),
            ))
            .await
            .unwrap();
        let err = store
            .insert_provider(Provider::new(
                UserId::generate(),
                ProviderProfile::new("Neurology", "LIC-1"),
                Utc::now(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DatabaseError::UniqueViolation {
                field: "license_number",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_overlapping_slot_rejected_atomically() {
        let store = MemoryStore::new();
        let provider = ProviderId::generate();
        let first = store
            .insert_appointment(slot(provider, 9, 60))
            .await
            .unwrap();

        let err = store
            .insert_appointment(slot(provider, 9, 15))
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::ScheduleConflict { existing, .. } if existing == first.id));

        // adjacent slot is fine
        store
            .insert_appointment(slot(provider, 10, 30))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_skips_self_when_checking_schedule() {
        let store = MemoryStore::new();
        let provider = ProviderId::generate();
        let appt = store
            .insert_appointment(slot(provider, 9, 30))
            .await
            .unwrap();
        let (appt, outcome) = store
            .edit_appointment(
                appt.id,
                AppointmentEdit::Update(AppointmentChanges {
                    duration_minutes: Some(45),
                    ..Default::default()
                }),
                Utc::now(),
            )
            .await
            .unwrap();
        assert!(outcome.rescheduled);
        assert_eq!(appt.duration_minutes, 45);
    }

    #[tokio::test]
    async fn test_cancelled_slot_can_be_rebooked() {
        let store = MemoryStore::new();
        let provider = ProviderId::generate();
        let appt = store
            .insert_appointment(slot(provider, 14, 30))
            .await
            .unwrap();
        store
            .edit_appointment(
                appt.id,
                AppointmentEdit::Update(AppointmentChanges::status(AppointmentStatus::Cancelled)),
                Utc::now(),
            )
            .await
            .unwrap();

        store
            .insert_appointment(slot(provider, 14, 30))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_bookings_admit_exactly_one() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let provider = ProviderId::generate();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.insert_appointment(slot(provider, 11, 30)).await
            }));
        }

        let mut booked = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                booked += 1;
            }
        }
        assert_eq!(booked, 1);
    }

    #[tokio::test]
    async fn test_user_patch_touches_only_given_fields() {
        let store = MemoryStore::new();
        let u = store.insert_user(user("c@example.com")).await.unwrap();
        store.insert_user(user("d@example.com")).await.unwrap();

        let err = store
            .update_user(
                u.id,
                UserPatch {
                    email: Some("d@example.com".to_string()),
                    first_name: Some("Changed".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::UniqueViolation { field: "email", .. }));
        assert_eq!(store.get_user(u.id).await.unwrap().unwrap().first_name, "Test");

        store.set_user_active(u.id, false, Utc::now()).await.unwrap();
        let updated = store
            .update_user(
                u.id,
                UserPatch {
                    last_name: Some("Renamed".to_string()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .await
            .unwrap();
        assert_eq!(updated.last_name, "Renamed");
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn test_record_login_skips_inactive_rows() {
        let store = MemoryStore::new();
        let u = store.insert_user(user("e@example.com")).await.unwrap();

        let stamped = store.record_login(u.id, Utc::now()).await.unwrap();
        assert!(stamped.last_login_at.is_some());

        store.set_user_active(u.id, false, Utc::now()).await.unwrap();
        let later = Utc::now() + Duration::minutes(5);
        let row = store.record_login(u.id, later).await.unwrap();
        assert!(!row.is_active);
        assert_eq!(row.last_login_at, stamped.last_login_at);
    }

    #[tokio::test]
    async fn test_concurrent_terminal_transitions_admit_exactly_one() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let appt = store
            .insert_appointment(slot(ProviderId::generate(), 15, 30))
            .await
            .unwrap();
        store
            .edit_appointment(
                appt.id,
                AppointmentEdit::Update(AppointmentChanges::status(AppointmentStatus::Confirmed)),
                Utc::now(),
            )
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let next = if i % 2 == 0 {
                AppointmentStatus::Completed
            } else {
                AppointmentStatus::NoShow
            };
            handles.push(tokio::spawn(async move {
                store
                    .edit_appointment(
                        appt.id,
                        AppointmentEdit::Update(AppointmentChanges::status(next)),
                        Utc::now(),
                    )
                    .await
            }));
        }

        let mut moved = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok((_, outcome)) if outcome.changed => moved += 1,
                Ok(_) => {}
                Err(err) => assert!(matches!(err, CoreError::InvalidAppointmentStatus { .. })),
            }
        }
        assert_eq!(moved, 1);
    }
}
