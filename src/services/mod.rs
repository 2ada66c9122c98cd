pub mod sweeper;
pub mod task_service;
pub mod user_service;

pub use sweeper::{spawn_sweeper, sweep_once};
pub use task_service::{CreateTaskRequest, TaskService, TaskServiceError};
pub use user_service::{Session, UserService, UserServiceError};
