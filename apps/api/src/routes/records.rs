//! Read and delete routes over the persistence API's record collections.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Deserialize;
use tracing::info;

use crate::errors::AppError;
use crate::models::activity::Activity;
use crate::models::candidate::Candidate;
use crate::models::job::Job;
use crate::state::AppState;
use crate::store::StoreError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateQuery {
    pub job_id: Option<String>,
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(State(state): State<AppState>) -> Result<Json<Vec<Job>>, AppError> {
    let user_id = state.session.user_id().await;
    let jobs = state.store.jobs.find(user_id.as_deref(), &[]).await?;
    Ok(Json(jobs))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.store.jobs.delete_one(&job_id).await? {
        return Err(AppError::NotFound(format!("Job {job_id} not found")));
    }
    info!("Deleted job {job_id}");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/candidates?jobId=
///
/// Resume payloads are dropped from the list; fetch them per candidate.
pub async fn handle_list_candidates(
    State(state): State<AppState>,
    Query(params): Query<CandidateQuery>,
) -> Result<Json<Vec<Candidate>>, AppError> {
    let user_id = state.session.user_id().await;
    let query: Vec<(&str, &str)> = params
        .job_id
        .as_deref()
        .map(|id| vec![("associatedJdId", id)])
        .unwrap_or_default();

    let candidates = state
        .store
        .candidates
        .find(user_id.as_deref(), &query)
        .await?
        .into_iter()
        .map(|c| Candidate {
            resume_base64: None,
            ..c
        })
        .collect();
    Ok(Json(candidates))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Result<Json<Candidate>, AppError> {
    let candidate = state
        .store
        .candidates
        .find_one(&candidate_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;
    Ok(Json(candidate))
}

/// GET /api/v1/candidates/:id/resume
///
/// Streams back the stored resume with its original MIME type. Resumes that
/// were too large to retain are reported as not found.
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(candidate_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let candidate = state
        .store
        .candidates
        .find_one(&candidate_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))?;

    let encoded = candidate
        .resume_base64
        .filter(|data| !data.is_empty())
        .ok_or_else(|| {
            AppError::NotFound(format!("No resume retained for candidate {candidate_id}"))
        })?;

    let bytes = STANDARD.decode(encoded.as_bytes()).map_err(|e| {
        AppError::from(StoreError::InvalidResponse(format!(
            "stored resume is not valid base64: {e}"
        )))
    })?;
    let mime_type = candidate
        .resume_mime_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(([(header::CONTENT_TYPE, mime_type)], bytes))
}

/// GET /api/v1/activities
pub async fn handle_list_activities(
    State(state): State<AppState>,
) -> Result<Json<Vec<Activity>>, AppError> {
    let user_id = state.session.user_id().await;
    let activities = state.store.activities.find(user_id.as_deref(), &[]).await?;
    Ok(Json(activities))
}
