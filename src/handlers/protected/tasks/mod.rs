pub mod create;
pub mod delete;
pub mod list;
pub mod update;

pub use create::post as task_create;
pub use delete::delete as task_delete;
pub use list::board as task_board;
pub use list::get as task_list;
pub use update::put as task_update;
