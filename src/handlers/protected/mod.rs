// Protected handlers. Every route here sits behind jwt_auth_middleware and
// receives the caller as `Extension<AuthUser>`.
pub mod tasks;
