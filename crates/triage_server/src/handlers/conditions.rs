use axum::{Json, extract::State};
use triage_api::{
    ApiError, requests::ConditionSearchQuery, responses::ConditionSearchResponse,
};

use crate::{extract::ApiQuery, state::AppState};

/// Proxy a free-text search to the condition lookup service
pub async fn search_conditions(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ConditionSearchQuery>,
) -> Result<Json<ConditionSearchResponse>, ApiError> {
    Ok(Json(state.conditions.search(&query.terms).await?))
}
