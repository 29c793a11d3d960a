//! Insight generation API handlers
//!
//! POST /generate, POST /analyze-confusion, GET /insights/:classroom_id

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use cogni_common::models::Insight;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::ProcessResult;
use crate::store::StoreError;
use crate::AppState;

/// POST /generate and POST /analyze-confusion request
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub classroom_id: Option<String>,
    /// Regenerate even when the stored insight is current
    #[serde(default)]
    pub force: bool,
}

/// GET /insights/:classroom_id response
#[derive(Debug, Serialize, Deserialize)]
pub struct InsightsResponse {
    pub classroom_id: String,
    pub insights: Vec<Insight>,
}

/// Validated request parameters
struct GenerateParams {
    classroom_id: String,
    force: bool,
}

/// A missing or unparseable body is reported the same way as a missing id
fn require_classroom(body: Option<Json<GenerateRequest>>) -> ApiResult<GenerateParams> {
    let request = body.map(|Json(request)| request);
    let force = request.as_ref().is_some_and(|r| r.force);
    let classroom_id = request
        .and_then(|r| r.classroom_id)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadRequest("classroom_id is required".to_string()))?;

    Ok(GenerateParams {
        classroom_id,
        force,
    })
}

/// Record failures for the health endpoint and convert to the handler result
async fn finish(
    state: &AppState,
    outcome: Result<ProcessResult, StoreError>,
) -> ApiResult<Json<ProcessResult>> {
    match outcome {
        Ok(result) => {
            if !result.success {
                state.record_error(result.message.clone()).await;
            }
            Ok(Json(result))
        }
        Err(e) => {
            state.record_error(e.to_string()).await;
            Err(ApiError::Store(e))
        }
    }
}

/// POST /generate
///
/// Generate the study guide for a classroom. Returns 200 with the run result
/// even when generation failed (`success: false`); datastore failures are 500.
pub async fn generate_study_guide(
    State(state): State<AppState>,
    body: Option<Json<GenerateRequest>>,
) -> ApiResult<Json<ProcessResult>> {
    let params = require_classroom(body)?;
    let outcome = state
        .pipeline
        .generate_study_guide(&params.classroom_id, params.force)
        .await;
    finish(&state, outcome).await
}

/// POST /analyze-confusion
///
/// Generate the confusion-pattern summary from recent chat messages.
pub async fn analyze_confusion(
    State(state): State<AppState>,
    body: Option<Json<GenerateRequest>>,
) -> ApiResult<Json<ProcessResult>> {
    let params = require_classroom(body)?;
    let outcome = state
        .pipeline
        .generate_confusion_summary(&params.classroom_id, params.force)
        .await;
    finish(&state, outcome).await
}

/// GET /insights/:classroom_id
pub async fn list_insights(
    State(state): State<AppState>,
    Path(classroom_id): Path<String>,
) -> ApiResult<Json<InsightsResponse>> {
    let insights = state.pipeline.store().list_insights(&classroom_id).await?;
    Ok(Json(InsightsResponse {
        classroom_id,
        insights,
    }))
}

/// Build insight routes
pub fn insight_routes() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate_study_guide))
        .route("/analyze-confusion", post(analyze_confusion))
        .route("/insights/:classroom_id", get(list_insights))
}
