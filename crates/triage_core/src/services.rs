//! Application services
//!
//! Services own the business rules and talk to storage only through the
//! repository traits in [`crate::db`].

mod appointments;
mod auth;
mod patients;
mod providers;
mod users;

pub use appointments::AppointmentService;
pub use auth::AuthService;
pub use patients::PatientService;
pub use providers::ProviderService;
pub use users::UserService;

use std::sync::Arc;

use crate::db::{MemoryStore, Store};

/// Every service wired to one shared store
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub patients: PatientService,
    pub providers: ProviderService,
    pub appointments: AppointmentService,
    pub auth: AuthService,
}

impl Services {
    pub fn new<S: Store + 'static>(store: Arc<S>) -> Self {
        let users = UserService::new(store.clone());
        Self {
            patients: PatientService::new(users.clone(), store.clone()),
            providers: ProviderService::new(users.clone(), store.clone()),
            appointments: AppointmentService::new(store.clone(), store.clone(), store.clone()),
            auth: AuthService::new(store),
            users,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }
}
