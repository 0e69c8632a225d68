//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::analysis::content::GeneratedResumeContent;
use crate::analysis::extractor::ExtractedKeyword;
use crate::analysis::pipeline::{AnalysisOutcome, AnalysisRequest};
use crate::errors::AppError;
use crate::models::analysis::{AnalysisRecord, NewAnalysis};
use crate::models::posting::JobPosting;
use crate::models::profile::UserProfile;
use crate::state::AppState;

const MAX_HISTORY_LIMIT: i64 = 100;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractResponse {
    pub keywords: Vec<ExtractedKeyword>,
    pub vocabulary_version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnalysisRequest {
    pub user_id: Uuid,
    pub posting: JobPosting,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnalysisResponse {
    #[serde(flatten)]
    pub outcome: AnalysisOutcome,
    /// The stored record; absent when saving failed.
    pub analysis: Option<AnalysisRecord>,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Uuid,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegenerateContentResponse {
    pub analysis_id: Uuid,
    pub content: GeneratedResumeContent,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/keywords/extract
///
/// Keyword extraction only; nothing is matched or stored.
pub async fn handle_extract_keywords(
    State(state): State<AppState>,
    Json(request): Json<ExtractRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    if request.description.trim().is_empty() {
        return Err(AppError::Validation("description cannot be empty".to_string()));
    }

    Ok(Json(ExtractResponse {
        keywords: state.pipeline.extract(&request.description),
        vocabulary_version: state.pipeline.vocabulary().version().to_string(),
    }))
}

/// POST /api/v1/analyses
///
/// Runs the full pipeline for the user's stored profile and persists the result,
/// unless a newer analysis for the same user was started in the meantime.
pub async fn handle_create_analysis(
    State(state): State<AppState>,
    Json(request): Json<CreateAnalysisRequest>,
) -> Result<Json<CreateAnalysisResponse>, AppError> {
    if request.posting.description.trim().is_empty() {
        return Err(AppError::Validation(
            "posting.description cannot be empty".to_string(),
        ));
    }

    let profile = load_profile(&state, request.user_id).await?;
    if profile.is_empty() {
        return Err(AppError::Validation(
            "profile has no skills, experience, education or certifications".to_string(),
        ));
    }

    let generation = state.generations.issue(request.user_id);
    let outcome = state
        .pipeline
        .run(AnalysisRequest {
            generation,
            posting: request.posting.clone(),
            profile,
        })
        .await;

    finish_analysis(&state, request.user_id, &request.posting, outcome)
        .await
        .map(Json)
}

/// GET /api/v1/analyses?user_id=&limit=
pub async fn handle_list_analyses(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<AnalysisRecord>>, AppError> {
    let limit = query
        .limit
        .unwrap_or(state.config.analysis_history_limit)
        .clamp(1, MAX_HISTORY_LIMIT);

    Ok(Json(state.analyses.list_analyses(query.user_id, limit).await?))
}

/// GET /api/v1/analyses/latest?user_id=
pub async fn handle_latest_analysis(
    State(state): State<AppState>,
    Query(query): Query<LatestQuery>,
) -> Result<Json<AnalysisRecord>, AppError> {
    state
        .analyses
        .latest_analysis(query.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No analyses for user {}", query.user_id)))
}

/// GET /api/v1/analyses/:id
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisRecord>, AppError> {
    load_analysis(&state, id).await.map(Json)
}

/// POST /api/v1/analyses/:id/content
///
/// Regenerates résumé content from a stored analysis and the user's current profile.
/// The stored record is not modified.
pub async fn handle_regenerate_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RegenerateContentResponse>, AppError> {
    let record = load_analysis(&state, id).await?;
    let profile = load_profile(&state, record.user_id).await?;

    let posting = JobPosting {
        description: record.job_description.clone(),
        title: record.job_title.clone(),
        company: record.job_company.clone(),
    };
    let content = state
        .pipeline
        .regenerate_content(&posting, &record.keywords, &profile);

    Ok(Json(RegenerateContentResponse {
        analysis_id: record.id,
        content,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn load_profile(state: &AppState, user_id: Uuid) -> Result<UserProfile, AppError> {
    state
        .profiles
        .get_user_profile(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No profile for user {user_id}")))
}

async fn load_analysis(state: &AppState, id: Uuid) -> Result<AnalysisRecord, AppError> {
    state
        .analyses
        .get_analysis(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {id} not found")))
}

/// Persists a finished outcome if its generation is still current for the user.
/// A failed save still returns the computed result.
async fn finish_analysis(
    state: &AppState,
    user_id: Uuid,
    posting: &JobPosting,
    outcome: AnalysisOutcome,
) -> Result<CreateAnalysisResponse, AppError> {
    if !state.generations.is_current(user_id, outcome.generation) {
        warn!(
            "Discarding stale analysis generation {} for user {user_id}",
            outcome.generation
        );
        return Err(AppError::StaleAnalysis(
            "A newer analysis for this user superseded this request".to_string(),
        ));
    }

    let new = NewAnalysis {
        user_id,
        job_title: posting.title().map(str::to_string),
        job_company: posting.company().map(str::to_string),
        job_description: posting.description.clone(),
        keywords: outcome.keywords.clone(),
        match_result: outcome.match_result.clone(),
        score_breakdown: outcome.score_breakdown,
        score_basis: outcome.score_basis,
        generated_content: Some(outcome.content.clone()),
        vocabulary_version: state.pipeline.vocabulary().version().to_string(),
        generation: outcome.generation,
    };

    match state.analyses.save_analysis(new).await {
        Ok(record) => Ok(CreateAnalysisResponse {
            outcome,
            analysis: Some(record),
            persisted: true,
            persistence_error: None,
        }),
        Err(e) => {
            error!("Failed to save analysis for user {user_id}: {e}");
            Ok(CreateAnalysisResponse {
                outcome,
                analysis: None,
                persisted: false,
                persistence_error: Some(
                    "The analysis was computed but could not be saved".to_string(),
                ),
            })
        }
    }
}
