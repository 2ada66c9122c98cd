use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Task, TaskStatus, User};

/// Credential store. Only the auth flow talks to it.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`DatabaseError::Conflict`] when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
}

/// Task store. Every mutation is scoped by `(id, owner)`; a row owned by
/// someone else is indistinguishable from a missing one.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert_task(&self, task: &Task) -> Result<(), DatabaseError>;

    /// Unscoped lookup, used only to tell "missing" apart from "not yours".
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError>;

    /// All tasks of one owner in creation order.
    async fn list_tasks(&self, owner: Uuid) -> Result<Vec<Task>, DatabaseError>;

    /// Compare-and-set: writes `status` only while the row still holds
    /// `expected`. `None` when no row matched.
    async fn update_task_status(
        &self,
        id: Uuid,
        owner: Uuid,
        expected: TaskStatus,
        status: TaskStatus,
    ) -> Result<Option<Task>, DatabaseError>;

    /// Conditional `pending -> missed` for one task. Returns whether a row changed.
    async fn mark_task_missed(&self, id: Uuid, owner: Uuid, today: NaiveDate) -> Result<bool, DatabaseError>;

    /// Set-based `pending -> missed` across all owners. Returns the number of rows changed.
    async fn mark_overdue_missed(&self, today: NaiveDate) -> Result<u64, DatabaseError>;

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<bool, DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}
