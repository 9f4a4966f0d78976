//! Sign-in and profile routes. The signed-in user lives in `AppState::session`
//! and scopes every persistence call made afterwards.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::user::{LoginRequest, RegisterRequest, User};
use crate::state::AppState;

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    require("name", &request.name)?;
    require("email", &request.email)?;
    require("password", &request.password)?;

    let user = state.session.register(&state.store, &request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<User>, AppError> {
    require("email", &request.email)?;
    require("password", &request.password)?;

    let user = state.session.login(&state.store, &request).await?;
    Ok(Json(user))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(State(state): State<AppState>) -> StatusCode {
    state.session.logout().await;
    StatusCode::NO_CONTENT
}

/// POST /api/v1/auth/refresh
///
/// Re-reads the signed-in user from the persistence API.
pub async fn handle_refresh(State(state): State<AppState>) -> Result<Json<User>, AppError> {
    state
        .session
        .refresh(&state.store)
        .await
        .map(Json)
        .ok_or(AppError::Unauthorized)
}

/// GET /api/v1/auth/me
pub async fn handle_me(State(state): State<AppState>) -> Result<Json<User>, AppError> {
    state
        .session
        .current()
        .await
        .map(Json)
        .ok_or(AppError::Unauthorized)
}

/// PATCH /api/v1/auth/me
pub async fn handle_update_me(
    State(state): State<AppState>,
    Json(updates): Json<Value>,
) -> Result<Json<User>, AppError> {
    if !updates.is_object() {
        return Err(AppError::Validation(
            "profile updates must be a JSON object".to_string(),
        ));
    }

    state
        .session
        .update_profile(&state.store, &updates)
        .await?
        .map(Json)
        .ok_or(AppError::Unauthorized)
}
