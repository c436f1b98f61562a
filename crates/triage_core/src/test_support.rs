//! Fixtures shared by the unit tests

use chrono::NaiveDate;

use crate::{
    patient::{PatientProfile, PatientRegistration},
    provider::{ProviderProfile, ProviderRegistration},
    user::NewUser,
};

pub(crate) fn new_user(email: &str) -> NewUser {
    NewUser {
        email: email.to_string(),
        password: "s3cure-passw0rd".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        phone_number: None,
    }
}

pub(crate) fn patient_registration(email: &str) -> PatientRegistration {
    PatientRegistration {
        account: new_user(email),
        profile: PatientProfile::minimal(
            NaiveDate::from_ymd_opt(1985, 3, 14).expect("valid date"),
        ),
    }
}

pub(crate) fn provider_registration(
    email: &str,
    specialty: &str,
    license: &str,
) -> ProviderRegistration {
    ProviderRegistration {
        account: new_user(email),
        profile: ProviderProfile::new(specialty, license),
    }
}
