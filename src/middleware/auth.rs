use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::AuthError;
use crate::database::models::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller, injected as a request extension for protected routes
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
        }
    }
}

/// JWT authentication middleware: verifies the token, confirms the user still
/// exists, and attaches [`AuthUser`] to the request.
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or(AuthError::MissingToken)?;

    let user = state.users.authenticate(&token).await?;
    tracing::debug!(user_id = %user.id, "authenticated request");

    request.extensions_mut().insert(AuthUser::from(user));
    Ok(next.run(request).await)
}

/// Accept either a raw token or `Bearer <token>`.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim_start();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest,
        _ => value,
    }
    .trim();
    (!token.is_empty()).then(|| token.to_string())
}
