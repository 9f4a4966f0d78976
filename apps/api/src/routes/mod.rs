pub mod auth;
pub mod health;
pub mod records;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

/// Upper bound for multipart uploads (several resumes per request).
const UPLOAD_BODY_LIMIT: usize = 50 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth / profile
        .route("/api/v1/auth/register", post(auth::handle_register))
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/auth/refresh", post(auth::handle_refresh))
        .route(
            "/api/v1/auth/me",
            get(auth::handle_me).patch(auth::handle_update_me),
        )
        // Jobs
        .route(
            "/api/v1/jobs",
            get(records::handle_list_jobs).post(handlers::handle_publish_job),
        )
        .route("/api/v1/jobs/extract", post(handlers::handle_extract_job))
        .route("/api/v1/jobs/:id", delete(records::handle_delete_job))
        // Candidates / activity feed
        .route("/api/v1/candidates", get(records::handle_list_candidates))
        .route("/api/v1/candidates/:id", get(records::handle_get_candidate))
        .route(
            "/api/v1/candidates/:id/resume",
            get(records::handle_get_resume),
        )
        .route("/api/v1/activities", get(records::handle_list_activities))
        // Upload queue
        .route(
            "/api/v1/queue",
            get(handlers::handle_get_queue).delete(handlers::handle_reset_queue),
        )
        .route("/api/v1/queue/files", post(handlers::handle_upload_files))
        .route(
            "/api/v1/queue/files/:id",
            delete(handlers::handle_remove_file),
        )
        .route("/api/v1/queue/error", delete(handlers::handle_dismiss_error))
        .route("/api/v1/queue/analyze", post(handlers::handle_analyze))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .with_state(state)
}
