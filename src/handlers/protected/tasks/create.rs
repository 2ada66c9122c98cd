use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};

use crate::database::models::Task;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::CreateTaskRequest;
use crate::state::AppState;

/// POST /api/tasks - Create a pending task owned by the caller
pub async fn post(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<Task> {
    let Json(request) = payload?;
    let task = state.tasks.create(auth_user.user_id, request).await?;
    Ok(ApiResponse::created(task))
}
