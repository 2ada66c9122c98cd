pub mod task;
pub mod user;

pub use task::{parse_due_date, Task, TaskStatus, UnknownStatus};
pub use user::User;
