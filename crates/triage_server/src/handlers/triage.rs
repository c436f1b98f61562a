use axum::Json;
use triage_api::{ApiError, requests::TriageRequest, responses::TriageResponse};
use triage_core::{Validate, triage};

use crate::extract::ApiJson;

/// Ad-hoc triage of a symptom list
pub async fn assess_symptoms(
    ApiJson(request): ApiJson<TriageRequest>,
) -> Result<Json<TriageResponse>, ApiError> {
    request.validate()?;
    Ok(Json(triage::assess(&request.symptoms)))
}
