// Board view: search, due-date ordering and status columns.
// None of these touch storage; they work on a loaded, reconciled list.

use serde::Serialize;

use crate::database::models::{Task, TaskStatus};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Board {
    pub pending: Vec<Task>,
    pub completed: Vec<Task>,
    pub missed: Vec<Task>,
}

/// Keep tasks whose title contains `search`, ignoring case. The search is
/// taken literally, whitespace included; only an absent or empty one matches everything.
pub fn filter_by_title(tasks: Vec<Task>, search: Option<&str>) -> Vec<Task> {
    let needle = match search {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => return tasks,
    };

    tasks
        .into_iter()
        .filter(|task| task.title.to_lowercase().contains(&needle))
        .collect()
}

/// Earliest deadline first. `sort_by_key` is stable, so equal dates keep their input order.
pub fn sort_by_due_date(mut tasks: Vec<Task>) -> Vec<Task> {
    tasks.sort_by_key(|task| task.due_date);
    tasks
}

pub fn partition(tasks: Vec<Task>) -> Board {
    let mut board = Board::default();
    for task in tasks {
        match task.status {
            TaskStatus::Pending => board.pending.push(task),
            TaskStatus::Completed => board.completed.push(task),
            TaskStatus::Missed => board.missed.push(task),
        }
    }
    board
}

pub fn board(tasks: Vec<Task>, search: Option<&str>) -> Board {
    partition(sort_by_due_date(filter_by_title(tasks, search)))
}
