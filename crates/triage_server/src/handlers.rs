//! HTTP request handlers

use axum::{
    Router, middleware,
    routing::{get, post},
};

pub mod appointments;
pub mod auth;
pub mod conditions;
pub mod health;
pub mod patients;
pub mod providers;
pub mod triage;
pub mod users;

use crate::{middleware::require_auth, state::AppState};

/// Liveness, readiness and the summary health check
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
}

/// Build all `/api/v1` routes
pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/patients/register", post(patients::register_patient))
        .route("/providers/register", post(providers::register_provider))
        .merge(health_routes());

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        // Users
        .route("/users", get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/:id/activate", post(users::activate_user))
        .route("/users/:id/deactivate", post(users::deactivate_user))
        // Patients
        .route("/patients", get(patients::list_patients))
        .route(
            "/patients/:id",
            get(patients::get_patient)
                .patch(patients::update_patient)
                .delete(patients::delete_patient),
        )
        .route(
            "/patients/:id/appointments",
            get(patients::patient_appointments),
        )
        // Providers
        .route("/providers", get(providers::list_providers))
        .route(
            "/providers/:id",
            get(providers::get_provider)
                .patch(providers::update_provider)
                .delete(providers::delete_provider),
        )
        .route(
            "/providers/:id/appointments",
            get(providers::provider_appointments),
        )
        .route("/providers/:id/schedule", get(providers::provider_schedule))
        // Appointments
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route(
            "/appointments/:id",
            get(appointments::get_appointment)
                .patch(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
        .route(
            "/appointments/:id/confirm",
            post(appointments::confirm_appointment),
        )
        .route(
            "/appointments/:id/complete",
            post(appointments::complete_appointment),
        )
        .route("/appointments/:id/no-show", post(appointments::mark_no_show))
        .route(
            "/appointments/:id/cancel",
            post(appointments::cancel_appointment),
        )
        .route(
            "/appointments/:id/triage",
            get(appointments::appointment_triage),
        )
        // Triage and condition lookup
        .route("/triage", post(triage::assess_symptoms))
        .route("/conditions/search", get(conditions::search_conditions))
        .route_layer(middleware::from_fn_with_state(state, require_auth));

    public.merge(protected)
}
