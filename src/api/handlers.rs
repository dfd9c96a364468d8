use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};
use tracing::info;

use super::error::ApiError;
use super::models::{
    ContextsResponse, GenerateParams, GenerateResponse, HistoryResponse, RecommendationRequest,
    RootResponse, StageOutputs,
};
use super::AppState;
use crate::jitter::RngJitter;
use crate::persistence::{NewFarmContext, RECENT_CONTEXTS_LIMIT, RECENT_RECOMMENDATIONS_LIMIT};

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Welcome to the Harvest Planner API".to_string(),
        status: "running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn health() -> &'static str {
    "OK"
}

/// POST /api/recommendations/generate
pub async fn generate_recommendation(
    State(state): State<AppState>,
    Query(params): Query<GenerateParams>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let context = request.into_context()?;

    let context_id = match params.user_id.as_deref() {
        Some(user_id) => {
            let row = NewFarmContext::from_context(user_id, &context)?;
            Some(state.store.save_context(row).await?)
        }
        None => None,
    };

    let mut jitter = RngJitter::for_request(state.orchestrator.config().jitter_seed);
    let report = state.orchestrator.run(&context, &mut jitter).await?;

    if let Some(id) = context_id {
        state.store.save_recommendation(id, &report.recommendation).await?;
        info!("📝 Saved recommendation for context {}", id);
    }

    Ok(Json(GenerateResponse {
        success: true,
        data: report.recommendation,
        analysis: StageOutputs {
            market: report.market,
            logistics: report.logistics,
            storage: report.storage,
        },
        metadata: report.metadata,
        trace: report.trace,
    }))
}

/// GET /api/farm-context/{user_id}
pub async fn get_farm_context(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ContextsResponse>, ApiError> {
    let records = state
        .store
        .recent_contexts(&user_id, RECENT_CONTEXTS_LIMIT)
        .await?;
    Ok(Json(ContextsResponse {
        contexts: records.into_iter().map(|r| r.context).collect(),
    }))
}

/// GET /api/recommendations/history/{user_id}
pub async fn get_recommendation_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let recommendations = state
        .store
        .recent_recommendations(&user_id, RECENT_RECOMMENDATIONS_LIMIT)
        .await?;
    Ok(Json(HistoryResponse { recommendations }))
}
