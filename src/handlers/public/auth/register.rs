// handlers/public/auth/register.rs - POST /api/register

use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub email: String,
}

/// POST /api/register - Create an account
///
/// Input: `{ "email": "...", "password": "..." }`.
/// 201 on success, 409 when the email is taken, 400 when a field is missing.
pub async fn register_post(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<RegisterResponse> {
    let Json(payload) = payload?;

    let user = state
        .users
        .register(
            payload.email.as_deref().unwrap_or_default(),
            payload.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(ApiResponse::created(RegisterResponse {
        message: "User registered".to_string(),
        email: user.email,
    }))
}
