//! Axum route handlers for the upload queue and the job-posting flow.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{error, info};

use crate::errors::AppError;
use crate::matching::file_reader::ResumeFile;
use crate::matching::jd_extractor::{
    build_job, extract_job_details, ExtractedJobDetails, PublishJobRequest,
};
use crate::matching::queue::QueueView;
use crate::models::job::Job;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractJobResponse {
    pub details: ExtractedJobDetails,
    pub jd_file_name: String,
}

/// Reads every file part of a multipart body.
async fn read_files(mut multipart: Multipart) -> Result<Vec<ResumeFile>, AppError> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let declared = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read {name}: {e}")))?;
        files.push(ResumeFile::new(name, declared.as_deref(), bytes));
    }
    Ok(files)
}

// ────────────────────────────────────────────────────────────────────────────
// Queue
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/queue
pub async fn handle_get_queue(State(state): State<AppState>) -> Json<QueueView> {
    Json(state.queue.read().await.view(Instant::now()))
}

/// POST /api/v1/queue/files
///
/// Adds every uploaded file to the queue in READY state. Any file type is
/// accepted; unsupported formats surface as a per-file error during analysis.
pub async fn handle_upload_files(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<QueueView>), AppError> {
    let files = read_files(multipart).await?;
    if files.is_empty() {
        return Err(AppError::Validation("No files in upload".to_string()));
    }

    let mut queue = state.queue.write().await;
    for file in files {
        info!("Queued {} ({})", file.name, file.size_label());
        queue.add(file);
    }
    Ok((StatusCode::CREATED, Json(queue.view(Instant::now()))))
}

/// DELETE /api/v1/queue/files/:id
pub async fn handle_remove_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<QueueView>, AppError> {
    let mut queue = state.queue.write().await;
    if !queue.remove(&file_id) {
        return Err(AppError::NotFound(format!("File {file_id} not found")));
    }
    Ok(Json(queue.view(Instant::now())))
}

/// DELETE /api/v1/queue
pub async fn handle_reset_queue(
    State(state): State<AppState>,
) -> Result<Json<QueueView>, AppError> {
    let mut queue = state.queue.write().await;
    if !queue.reset() {
        return Err(AppError::Conflict(
            "Cannot reset the queue while analysis is running".to_string(),
        ));
    }
    Ok(Json(queue.view(Instant::now())))
}

/// DELETE /api/v1/queue/error
pub async fn handle_dismiss_error(State(state): State<AppState>) -> Json<QueueView> {
    let mut queue = state.queue.write().await;
    queue.dismiss_error();
    Json(queue.view(Instant::now()))
}

/// POST /api/v1/queue/analyze
///
/// Starts a batch against the selected job and returns immediately; clients
/// poll `GET /api/v1/queue` for progress.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<(StatusCode, Json<QueueView>), AppError> {
    let job_id = request
        .job_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Please select a job first.".to_string()))?;

    if state.queue.read().await.is_empty() {
        return Err(AppError::Validation(
            "Please upload at least one resume.".to_string(),
        ));
    }

    let user_id = state.session.user_id().await;
    info!("Starting batch analysis against job {job_id}");
    let handle = state
        .batch
        .spawn(state.queue.clone(), job_id, user_id)
        .await?;

    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(report)) => info!(
                "Batch done: {} completed, {} failed, {} skipped",
                report.completed, report.failed, report.skipped
            ),
            Ok(Err(e)) => error!("Batch aborted: {e}"),
            Err(e) => error!("Batch task panicked: {e}"),
        }
    });

    let view = state.queue.read().await.view(Instant::now());
    Ok((StatusCode::ACCEPTED, Json(view)))
}

// ────────────────────────────────────────────────────────────────────────────
// Job posting
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/extract
///
/// Reads posting fields out of an uploaded job-description PDF.
pub async fn handle_extract_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractJobResponse>, AppError> {
    let file = read_files(multipart)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Validation("No file in upload".to_string()))?;

    let details = extract_job_details(&file, &state.llm).await?;

    Ok(Json(ExtractJobResponse {
        details,
        jd_file_name: file.name,
    }))
}

/// POST /api/v1/jobs
pub async fn handle_publish_job(
    State(state): State<AppState>,
    Json(request): Json<PublishJobRequest>,
) -> Result<(StatusCode, Json<Job>), AppError> {
    let job = build_job(request, Utc::now())?;
    let user_id = state.session.user_id().await;

    let stored = state.store.jobs.insert_one(user_id.as_deref(), &job).await?;
    info!("Published job {} ({})", stored.id, stored.title);

    Ok((StatusCode::CREATED, Json(stored)))
}
