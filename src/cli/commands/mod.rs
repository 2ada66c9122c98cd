pub mod serve;
pub mod store;
