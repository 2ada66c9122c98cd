//! Task lifecycle orchestration: validation, ownership checks, and the
//! reconciliation pass that persists `pending -> missed`.

use chrono::NaiveDate;
use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clock::{self, SharedClock};
use crate::database::manager::DatabaseError;
use crate::database::models::{parse_due_date, Task, TaskStatus, UnknownStatus};
use crate::database::repository::TaskRepository;
use crate::lifecycle::{self, Board, TransitionError};

/// Body of `POST /api/tasks`. Fields are optional here so that missing ones
/// surface as validation errors rather than JSON decoding failures.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

impl CreateTaskRequest {
    pub fn new(title: impl Into<String>, due_date: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
            due_date: Some(due_date.into()),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum TaskServiceError {
    #[error("invalid field '{field}': {problem}")]
    Validation { field: &'static str, problem: String },

    #[error("task {0} not found")]
    NotFound(Uuid),

    #[error("task {0} belongs to another user")]
    Forbidden(Uuid),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("task {0} keeps changing, try again")]
    Conflict(Uuid),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl TaskServiceError {
    fn required(field: &'static str) -> Self {
        TaskServiceError::Validation {
            field,
            problem: "This field is required".to_string(),
        }
    }
}

pub type TaskServiceResult<T> = Result<T, TaskServiceError>;

const STATUS_WRITE_ATTEMPTS: usize = 2;

#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    clock: SharedClock,
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepository>, clock: SharedClock) -> Self {
        Self { tasks, clock }
    }

    pub fn today(&self) -> NaiveDate {
        clock::today(self.clock.as_ref())
    }

    /// The caller's tasks, reconciled against today.
    pub async fn list(&self, owner: Uuid) -> TaskServiceResult<Vec<Task>> {
        self.reconcile_owner(owner).await
    }

    pub async fn board(&self, owner: Uuid, search: Option<&str>) -> TaskServiceResult<Board> {
        let tasks = self.reconcile_owner(owner).await?;
        Ok(lifecycle::board(tasks, search))
    }

    pub async fn create(&self, owner: Uuid, request: CreateTaskRequest) -> TaskServiceResult<Task> {
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TaskServiceError::required("title"))?;

        let raw_due = request
            .due_date
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| TaskServiceError::required("dueDate"))?;
        let due_date = parse_due_date(raw_due).ok_or_else(|| TaskServiceError::Validation {
            field: "dueDate",
            problem: format!("'{}' is not a date (expected YYYY-MM-DD)", raw_due),
        })?;

        let description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let task = Task::new(owner, title, description, due_date);
        self.tasks.insert_task(&task).await?;
        info!(task_id = %task.id, owner = %owner, "created task");
        Ok(task)
    }

    /// Apply a user-requested status change.
    pub async fn update_status(&self, owner: Uuid, id: Uuid, status: Option<&str>) -> TaskServiceResult<Task> {
        let next: TaskStatus = status
            .ok_or_else(|| TaskServiceError::required("status"))?
            .parse()
            .map_err(|e: UnknownStatus| TaskServiceError::Validation {
                field: "status",
                problem: e.to_string(),
            })?;

        let today = self.today();
        for _ in 0..STATUS_WRITE_ATTEMPTS {
            let stored = self.owned(owner, id).await?;

            // Judge the request against the status the task has today, not a stale stored one.
            let mut current = stored.clone();
            current.status = lifecycle::effective_status(&stored, today);
            lifecycle::check_transition(&current, next, today)?;

            if stored.status == next {
                return Ok(stored);
            }

            // The write only lands if nobody changed the status since it was checked.
            if let Some(updated) = self
                .tasks
                .update_task_status(id, owner, stored.status, next)
                .await?
            {
                return Ok(updated);
            }
            warn!(task_id = %id, "task status changed concurrently, re-checking");
        }
        Err(TaskServiceError::Conflict(id))
    }

    pub async fn delete(&self, owner: Uuid, id: Uuid) -> TaskServiceResult<()> {
        self.owned(owner, id).await?;
        if !self.tasks.delete_task(id, owner).await? {
            return Err(TaskServiceError::NotFound(id));
        }
        info!(task_id = %id, owner = %owner, "deleted task");
        Ok(())
    }

    /// Reconciliation pass for one owner.
    ///
    /// Each stale task is persisted with its own update; failures are logged
    /// and left for the next pass. The returned view always reflects the
    /// transition.
    pub async fn reconcile_owner(&self, owner: Uuid) -> TaskServiceResult<Vec<Task>> {
        let today = self.today();
        let mut tasks = self.tasks.list_tasks(owner).await?;
        let stale = lifecycle::reconcile(&mut tasks, today);
        if stale.is_empty() {
            return Ok(tasks);
        }

        let results = join_all(
            stale
                .iter()
                .map(|id| self.tasks.mark_task_missed(*id, owner, today)),
        )
        .await;

        let mut raced = false;
        let mut persisted = 0usize;
        for (id, result) in stale.iter().zip(results) {
            match result {
                Ok(true) => persisted += 1,
                // changed underneath us (completed or deleted concurrently)
                Ok(false) => raced = true,
                Err(e) => warn!(task_id = %id, error = %e, "failed to persist missed status"),
            }
        }
        info!(owner = %owner, stale = stale.len(), persisted, "reconciled overdue tasks");

        if raced {
            let mut fresh = self.tasks.list_tasks(owner).await?;
            lifecycle::reconcile(&mut fresh, today);
            return Ok(fresh);
        }
        Ok(tasks)
    }

    /// Reconciliation pass across every owner. Returns the number of tasks marked missed.
    pub async fn sweep(&self) -> TaskServiceResult<u64> {
        Ok(self.tasks.mark_overdue_missed(self.today()).await?)
    }

    async fn owned(&self, owner: Uuid, id: Uuid) -> TaskServiceResult<Task> {
        let task = self
            .tasks
            .find_task(id)
            .await?
            .ok_or(TaskServiceError::NotFound(id))?;
        if !task.is_owned_by(owner) {
            return Err(TaskServiceError::Forbidden(id));
        }
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::database::MemoryRepository;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn service_on(today: NaiveDate) -> (TaskService, MemoryRepository) {
        let repo = MemoryRepository::new();
        let service = TaskService::new(Arc::new(repo.clone()), FixedClock::on(today).shared());
        (service, repo)
    }

    #[tokio::test]
    async fn create_validates_required_fields() {
        let (tasks, _) = service_on(day(2024, 1, 2));
        let owner = Uuid::new_v4();

        let err = tasks.create(owner, CreateTaskRequest::new("   ", "2024-01-05")).await.unwrap_err();
        assert!(matches!(err, TaskServiceError::Validation { field: "title", .. }));

        let err = tasks
            .create(owner, CreateTaskRequest { title: Some("t".into()), ..Default::default() })
            .await
            .unwrap_err();
        assert!(matches!(err, TaskServiceError::Validation { field: "dueDate", .. }));

        let err = tasks.create(owner, CreateTaskRequest::new("t", "next week")).await.unwrap_err();
        assert!(matches!(err, TaskServiceError::Validation { field: "dueDate", .. }));

        let task = tasks
            .create(owner, CreateTaskRequest::new(" Report ", "2024-01-05").with_description("  "))
            .await
            .unwrap();
        assert_eq!(task.title, "Report");
        assert_eq!(task.description, None);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.owner, owner);
    }

    #[tokio::test]
    async fn listing_marks_yesterdays_task_missed_and_persists_it() {
        let today = day(2024, 1, 2);
        let (tasks, repo) = service_on(today);
        let owner = Uuid::new_v4();

        let stale = tasks.create(owner, CreateTaskRequest::new("old", "2024-01-01")).await.unwrap();
        let due_today = tasks.create(owner, CreateTaskRequest::new("now", "2024-01-02")).await.unwrap();

        let listed = tasks.list(owner).await.unwrap();
        let status_of = |id| listed.iter().find(|t| t.id == id).unwrap().status;
        assert_eq!(status_of(stale.id), TaskStatus::Missed);
        assert_eq!(status_of(due_today.id), TaskStatus::Pending);

        assert_eq!(repo.find_task(stale.id).await.unwrap().unwrap().status, TaskStatus::Missed);
    }

    #[tokio::test]
    async fn completed_tasks_are_never_reconciled() {
        let (tasks, _) = service_on(day(2024, 1, 2));
        let owner = Uuid::new_v4();
        let task = tasks.create(owner, CreateTaskRequest::new("t", "2024-01-02")).await.unwrap();
        tasks.update_status(owner, task.id, Some("completed")).await.unwrap();

        let later = TaskService::new(tasks.tasks.clone(), FixedClock::on(day(2025, 1, 1)).shared());
        let listed = later.list(owner).await.unwrap();
        assert_eq!(listed[0].status, TaskStatus::Completed);
        assert_eq!(later.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn status_changes_follow_the_lifecycle() {
        let (tasks, _) = service_on(day(2024, 1, 2));
        let owner = Uuid::new_v4();
        let future = tasks.create(owner, CreateTaskRequest::new("f", "2024-02-01")).await.unwrap();
        let stale = tasks.create(owner, CreateTaskRequest::new("s", "2023-12-01")).await.unwrap();

        assert!(matches!(
            tasks.update_status(owner, future.id, Some("missed")).await,
            Err(TaskServiceError::Transition(TransitionError::NotOverdue { .. }))
        ));
        assert!(matches!(
            tasks.update_status(owner, future.id, Some("done")).await,
            Err(TaskServiceError::Validation { field: "status", .. })
        ));
        assert!(matches!(
            tasks.update_status(owner, future.id, None).await,
            Err(TaskServiceError::Validation { field: "status", .. })
        ));

        // stored as pending but effectively missed: reopening is refused
        assert!(matches!(
            tasks.update_status(owner, stale.id, Some("pending")).await,
            Err(TaskServiceError::Transition(TransitionError::Illegal { .. }))
        ));
        let missed = tasks.update_status(owner, stale.id, Some("missed")).await.unwrap();
        assert_eq!(missed.status, TaskStatus::Missed);
        let done = tasks.update_status(owner, stale.id, Some("completed")).await.unwrap();
        assert_eq!(done.status, TaskStatus::Completed);

        assert!(matches!(
            tasks.update_status(owner, stale.id, Some("pending")).await,
            Err(TaskServiceError::Transition(TransitionError::Illegal { .. }))
        ));
        let again = tasks.update_status(owner, stale.id, Some("completed")).await.unwrap();
        assert_eq!(again.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn other_users_tasks_are_forbidden_and_unknown_ids_not_found() {
        let (tasks, _) = service_on(day(2024, 1, 2));
        let alice = Uuid::new_v4();
        let mallory = Uuid::new_v4();
        let task = tasks.create(alice, CreateTaskRequest::new("t", "2024-02-01")).await.unwrap();

        assert!(matches!(
            tasks.update_status(mallory, task.id, Some("completed")).await,
            Err(TaskServiceError::Forbidden(_))
        ));
        assert!(matches!(tasks.delete(mallory, task.id).await, Err(TaskServiceError::Forbidden(_))));
        assert!(matches!(
            tasks.delete(alice, Uuid::new_v4()).await,
            Err(TaskServiceError::NotFound(_))
        ));
        assert!(tasks.list(mallory).await.unwrap().is_empty());

        tasks.delete(alice, task.id).await.unwrap();
        assert!(tasks.list(alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn board_filters_sorts_and_partitions() {
        let (tasks, _) = service_on(day(2024, 1, 2));
        let owner = Uuid::new_v4();
        tasks.create(owner, CreateTaskRequest::new("Report B", "2024-01-03")).await.unwrap();
        tasks.create(owner, CreateTaskRequest::new("report A", "2024-01-01")).await.unwrap();
        tasks.create(owner, CreateTaskRequest::new("Report C", "2024-01-02")).await.unwrap();
        tasks.create(owner, CreateTaskRequest::new("groceries", "2024-01-05")).await.unwrap();

        let board = tasks.board(owner, Some("REPORT")).await.unwrap();
        let titles: Vec<_> = board.pending.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Report C", "Report B"]);
        assert_eq!(board.missed.len(), 1);
        assert_eq!(board.missed[0].title, "report A");
        assert!(board.completed.is_empty());
    }

    /// Wraps the memory store and fails `mark_task_missed` for chosen ids.
    struct FlakyRepository {
        inner: MemoryRepository,
        failing: HashSet<Uuid>,
    }

    #[async_trait]
    impl TaskRepository for FlakyRepository {
        async fn insert_task(&self, task: &Task) -> Result<(), DatabaseError> {
            self.inner.insert_task(task).await
        }
        async fn find_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError> {
            self.inner.find_task(id).await
        }
        async fn list_tasks(&self, owner: Uuid) -> Result<Vec<Task>, DatabaseError> {
            self.inner.list_tasks(owner).await
        }
        async fn update_task_status(
            &self,
            id: Uuid,
            owner: Uuid,
            expected: TaskStatus,
            status: TaskStatus,
        ) -> Result<Option<Task>, DatabaseError> {
            self.inner.update_task_status(id, owner, expected, status).await
        }
        async fn mark_task_missed(&self, id: Uuid, owner: Uuid, today: NaiveDate) -> Result<bool, DatabaseError> {
            if self.failing.contains(&id) {
                return Err(DatabaseError::Corrupt("simulated write failure".to_string()));
            }
            self.inner.mark_task_missed(id, owner, today).await
        }
        async fn mark_overdue_missed(&self, today: NaiveDate) -> Result<u64, DatabaseError> {
            self.inner.mark_overdue_missed(today).await
        }
        async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<bool, DatabaseError> {
            self.inner.delete_task(id, owner).await
        }
        async fn ping(&self) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn partial_persist_failure_does_not_affect_other_tasks() {
        let today = day(2024, 1, 2);
        let inner = MemoryRepository::new();
        let owner = Uuid::new_v4();
        let broken = Task::new(owner, "broken", None, day(2023, 12, 30));
        let fine = Task::new(owner, "fine", None, day(2023, 12, 31));
        let current = Task::new(owner, "current", None, today);
        for task in [&broken, &fine, &current] {
            inner.insert_task(task).await.unwrap();
        }

        let repo = FlakyRepository {
            inner: inner.clone(),
            failing: HashSet::from([broken.id]),
        };
        let tasks = TaskService::new(Arc::new(repo), FixedClock::on(today).shared());

        let listed = tasks.list(owner).await.unwrap();
        assert!(listed
            .iter()
            .filter(|t| t.id != current.id)
            .all(|t| t.status == TaskStatus::Missed));

        let stored = |id| {
            let inner = inner.clone();
            async move { inner.find_task(id).await.unwrap().unwrap().status }
        };
        assert_eq!(stored(fine.id).await, TaskStatus::Missed);
        assert_eq!(stored(broken.id).await, TaskStatus::Pending);
        assert_eq!(stored(current.id).await, TaskStatus::Pending);
    }

    /// Memory store where another writer completes the task right after the
    /// first read, or where every status write loses the race.
    struct RacingRepository {
        inner: MemoryRepository,
        complete_after_read: AtomicBool,
        writes_always_lose: bool,
    }

    #[async_trait]
    impl TaskRepository for RacingRepository {
        async fn insert_task(&self, task: &Task) -> Result<(), DatabaseError> {
            self.inner.insert_task(task).await
        }
        async fn find_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError> {
            let snapshot = self.inner.find_task(id).await?;
            if let Some(task) = &snapshot {
                if self.complete_after_read.swap(false, Ordering::SeqCst) {
                    self.inner
                        .update_task_status(id, task.owner, task.status, TaskStatus::Completed)
                        .await?;
                }
            }
            Ok(snapshot)
        }
        async fn list_tasks(&self, owner: Uuid) -> Result<Vec<Task>, DatabaseError> {
            self.inner.list_tasks(owner).await
        }
        async fn update_task_status(
            &self,
            id: Uuid,
            owner: Uuid,
            expected: TaskStatus,
            status: TaskStatus,
        ) -> Result<Option<Task>, DatabaseError> {
            if self.writes_always_lose {
                return Ok(None);
            }
            self.inner.update_task_status(id, owner, expected, status).await
        }
        async fn mark_task_missed(&self, id: Uuid, owner: Uuid, today: NaiveDate) -> Result<bool, DatabaseError> {
            self.inner.mark_task_missed(id, owner, today).await
        }
        async fn mark_overdue_missed(&self, today: NaiveDate) -> Result<u64, DatabaseError> {
            self.inner.mark_overdue_missed(today).await
        }
        async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<bool, DatabaseError> {
            self.inner.delete_task(id, owner).await
        }
        async fn ping(&self) -> Result<(), DatabaseError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn concurrent_completion_is_not_overwritten() {
        let today = day(2024, 1, 2);
        let inner = MemoryRepository::new();
        let owner = Uuid::new_v4();
        let overdue = Task::new(owner, "overdue", None, day(2024, 1, 1));
        inner.insert_task(&overdue).await.unwrap();

        let repo = RacingRepository {
            inner: inner.clone(),
            complete_after_read: AtomicBool::new(true),
            writes_always_lose: false,
        };
        let tasks = TaskService::new(Arc::new(repo), FixedClock::on(today).shared());

        // checked against the pending snapshot, re-checked against the completed row
        assert!(matches!(
            tasks.update_status(owner, overdue.id, Some("missed")).await,
            Err(TaskServiceError::Transition(TransitionError::Illegal {
                from: TaskStatus::Completed,
                to: TaskStatus::Missed,
            }))
        ));
        let stored = inner.find_task(overdue.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn status_write_that_keeps_losing_is_a_conflict() {
        let today = day(2024, 1, 2);
        let inner = MemoryRepository::new();
        let owner = Uuid::new_v4();
        let task = Task::new(owner, "busy", None, day(2024, 2, 1));
        inner.insert_task(&task).await.unwrap();

        let repo = RacingRepository {
            inner: inner.clone(),
            complete_after_read: AtomicBool::new(false),
            writes_always_lose: true,
        };
        let tasks = TaskService::new(Arc::new(repo), FixedClock::on(today).shared());

        assert!(matches!(
            tasks.update_status(owner, task.id, Some("completed")).await,
            Err(TaskServiceError::Conflict(id)) if id == task.id
        ));
        let stored = inner.find_task(task.id).await.unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
    }
}
