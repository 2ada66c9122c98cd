use std::sync::Arc;

use axum::extract::{Extension, Query, State};
use serde::Deserialize;

use crate::database::models::Task;
use crate::lifecycle::Board;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    /// Case-insensitive title substring
    pub search: Option<String>,
}

/// GET /api/tasks - The caller's tasks, reconciled, in creation order
pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Vec<Task>> {
    let tasks = state.tasks.list(auth_user.user_id).await?;
    Ok(ApiResponse::success(tasks))
}

/// GET /api/tasks/board - Reconciled tasks grouped by status, each column sorted by due date
pub async fn board(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Query(query): Query<BoardQuery>,
) -> ApiResult<Board> {
    let board = state
        .tasks
        .board(auth_user.user_id, query.search.as_deref())
        .await?;
    Ok(ApiResponse::success(board))
}
