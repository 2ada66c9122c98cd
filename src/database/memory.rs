use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Task, TaskStatus, User};
use crate::database::repository::{TaskRepository, UserRepository};
use crate::lifecycle::needs_reconcile;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    tasks: HashMap<Uuid, Task>,
}

/// In-process store used in development without `DATABASE_URL` and by the tests.
/// Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn insert_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DatabaseError::Conflict(format!("email '{}' is already registered", user.email)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl TaskRepository for MemoryRepository {
    async fn insert_task(&self, task: &Task) -> Result<(), DatabaseError> {
        self.tables.write().await.tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, DatabaseError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, owner: Uuid) -> Result<Vec<Task>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.is_owned_by(owner))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(tasks)
    }

    async fn update_task_status(
        &self,
        id: Uuid,
        owner: Uuid,
        expected: TaskStatus,
        status: TaskStatus,
    ) -> Result<Option<Task>, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .tasks
            .get_mut(&id)
            .filter(|t| t.is_owned_by(owner) && t.status == expected)
            .map(|t| {
                t.status = status;
                t.clone()
            }))
    }

    async fn mark_task_missed(&self, id: Uuid, owner: Uuid, today: NaiveDate) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.tasks.get_mut(&id) {
            Some(task) if task.is_owned_by(owner) && needs_reconcile(task, today) => {
                task.status = TaskStatus::Missed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_overdue_missed(&self, today: NaiveDate) -> Result<u64, DatabaseError> {
        let mut tables = self.tables.write().await;
        let mut changed = 0;
        for task in tables.tasks.values_mut() {
            if needs_reconcile(task, today) {
                task.status = TaskStatus::Missed;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.tasks.get(&id).is_some_and(|t| t.is_owned_by(owner)) {
            tables.tasks.remove(&id);
            return Ok(true);
        }
        Ok(false)
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
