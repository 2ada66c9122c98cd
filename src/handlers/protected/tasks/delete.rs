use std::sync::Arc;

use axum::extract::{rejection::PathRejection, Extension, Path, State};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// DELETE /api/tasks/:id - Remove one of the caller's tasks
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Value> {
    let Path(id) = id?;
    state.tasks.delete(auth_user.user_id, id).await?;
    Ok(ApiResponse::success(json!({ "message": "Deleted" })))
}
