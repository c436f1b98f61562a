//! Health check endpoints

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use triage_api::responses::{
    HealthResponse, LivenessResponse, ReadinessChecks, ReadinessResponse, RootResponse,
};

use crate::state::AppState;

pub const SERVICE_NAME: &str = "patient-triage-api";

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Patient Triage & Management API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        docs: format!("/api/{}", triage_api::API_VERSION),
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        uptime_seconds: state.uptime_seconds(),
    })
}

pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "alive".to_string(),
        timestamp: Utc::now(),
    })
}

/// Ready once the store answers; the condition service is reported but
/// does not gate readiness
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadinessResponse>) {
    let database_ok = match state.services.users.count_users().await {
        Ok(_) => true,
        Err(e) => {
            tracing::error!(error = %e, "readiness check: store unavailable");
            false
        }
    };

    let conditions_ok = state.conditions.probe().await;
    if !conditions_ok {
        tracing::warn!(
            base_url = %state.conditions.config().base_url,
            "readiness check: condition lookup unreachable"
        );
    }

    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            status: if database_ok { "ready" } else { "not_ready" }.to_string(),
            checks: ReadinessChecks {
                database: check_label(database_ok),
                conditions_api: check_label(conditions_ok),
            },
            timestamp: Utc::now(),
        }),
    )
}

fn check_label(ok: bool) -> String {
    if ok { "ok" } else { "unavailable" }.to_string()
}
