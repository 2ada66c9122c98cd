pub mod login;    // POST /api/login - verify credentials and issue a JWT
pub mod register; // POST /api/register - create an account

pub use login::login_post;
pub use register::register_post;
