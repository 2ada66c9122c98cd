// handlers/mod.rs - two security tiers
//
// Public (no auth) -> Protected (JWT auth, see middleware::jwt_auth_middleware)
pub mod public;    // /api/register, /api/login
pub mod protected; // /api/tasks/*
