// Public handlers: token acquisition, no authentication required.
pub mod auth;
