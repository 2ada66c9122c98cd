use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path, State,
    },
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::models::Task;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateTaskRequest {
    pub status: Option<String>,
}

/// PUT /api/tasks/:id - Change a task's status
///
/// 404 unknown id, 403 someone else's task, 422 when the lifecycle refuses the move.
pub async fn put(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Task> {
    let Path(id) = id?;
    let Json(request) = payload?;

    let task = state
        .tasks
        .update_status(auth_user.user_id, id, request.status.as_deref())
        .await?;
    Ok(ApiResponse::success(task))
}
