//! Task lifecycle rules.
//!
//! ```text
//! pending ──(user marks done)──────────► completed
//!    │                                       ▲
//!    └──(reconciliation: due < today)──► missed ──(user marks done)
//! ```
//!
//! `completed` is terminal. Everything in this module is pure: callers supply
//! "today" and persist whatever transitions come back.

pub mod board;

pub use board::{board, filter_by_title, partition, sort_by_due_date, Board};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::database::models::{Task, TaskStatus};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot move a task from {from} to {to}")]
    Illegal { from: TaskStatus, to: TaskStatus },

    #[error("task is not overdue yet (due {due}), it cannot be marked missed")]
    NotOverdue { due: NaiveDate },
}

impl TaskStatus {
    /// Whether `self -> next` is allowed at all. Same-state moves are
    /// accepted as no-ops so repeated requests stay idempotent.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        if self.is_terminal() {
            return next == self;
        }
        matches!(
            (self, next),
            (Pending, Pending) | (Pending, Completed) | (Pending, Missed) | (Missed, Missed) | (Missed, Completed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == TaskStatus::Completed
    }
}

/// Day-granularity deadline check. A task due today is never overdue.
pub fn is_overdue(due: NaiveDate, today: NaiveDate) -> bool {
    due < today
}

pub fn needs_reconcile(task: &Task, today: NaiveDate) -> bool {
    task.status == TaskStatus::Pending && is_overdue(task.due_date, today)
}

/// Status as it should be observed today, without writing anything.
pub fn effective_status(task: &Task, today: NaiveDate) -> TaskStatus {
    if needs_reconcile(task, today) {
        TaskStatus::Missed
    } else {
        task.status
    }
}

/// Validate a user-requested status change.
///
/// `pending -> missed` is the transition the reconciliation pass makes, so a
/// client may only request it for a task that is actually overdue.
pub fn check_transition(task: &Task, next: TaskStatus, today: NaiveDate) -> Result<(), TransitionError> {
    if !task.status.can_transition_to(next) {
        return Err(TransitionError::Illegal { from: task.status, to: next });
    }
    if task.status == TaskStatus::Pending && next == TaskStatus::Missed && !is_overdue(task.due_date, today) {
        return Err(TransitionError::NotOverdue { due: task.due_date });
    }
    Ok(())
}

/// Run the reconciliation pass over an in-memory view.
///
/// Every stale pending task is relabelled `missed` in place and its id is
/// returned so the caller can persist the change.
pub fn reconcile(tasks: &mut [Task], today: NaiveDate) -> Vec<Uuid> {
    tasks
        .iter_mut()
        .filter(|task| needs_reconcile(task, today))
        .map(|task| {
            task.status = TaskStatus::Missed;
            task.id
        })
        .collect()
}
