use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::auth::{hash_password, verify_password, AuthError, JwtKeys};
use crate::database::manager::DatabaseError;
use crate::database::models::User;
use crate::database::repository::UserRepository;

#[derive(Debug, Error)]
pub enum UserServiceError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("user '{0}' already exists")]
    AlreadyExists(String),

    #[error("user not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

pub type UserServiceResult<T> = Result<T, UserServiceError>;

/// Token handed back by a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub email: String,
}

/// Registration, login, and per-request token verification.
#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    keys: JwtKeys,
    hash_rounds: u32,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>, keys: JwtKeys, hash_rounds: u32) -> Self {
        Self {
            users,
            keys,
            hash_rounds,
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> UserServiceResult<User> {
        let email = User::normalize_email(email);
        if email.is_empty() {
            return Err(UserServiceError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(UserServiceError::MissingField("password"));
        }

        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(UserServiceError::AlreadyExists(email));
        }

        let rounds = self.hash_rounds;
        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password, rounds))
            .await
            .map_err(|e| UserServiceError::Hashing(e.to_string()))?;

        let user = User::new(email, password_hash);
        match self.users.insert_user(&user).await {
            Ok(()) => {}
            // lost a race with a concurrent registration
            Err(DatabaseError::Conflict(_)) => return Err(UserServiceError::AlreadyExists(user.email)),
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, "registered user");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> UserServiceResult<Session> {
        let email = User::normalize_email(email);
        if email.is_empty() {
            return Err(UserServiceError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(UserServiceError::MissingField("password"));
        }

        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or(UserServiceError::NotFound)?;

        let password = password.to_string();
        let stored = user.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| UserServiceError::Hashing(e.to_string()))??;
        if !valid {
            return Err(UserServiceError::InvalidCredentials);
        }

        let token = self.keys.issue(user.id, &user.email)?;
        info!(user_id = %user.id, "issued session token");
        Ok(Session {
            token,
            email: user.email,
        })
    }

    /// Verify a bearer token and confirm its subject still exists.
    pub async fn authenticate(&self, token: &str) -> UserServiceResult<User> {
        if token.is_empty() {
            return Err(AuthError::MissingToken.into());
        }
        let claims = self.keys.verify(token)?;
        self.user_for_claims(claims.sub).await
    }

    async fn user_for_claims(&self, user_id: Uuid) -> UserServiceResult<User> {
        self.users
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::InvalidToken(format!("unknown subject {}", user_id)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryRepository;

    fn service() -> UserService {
        let keys = JwtKeys::new("test-secret", 1).unwrap();
        UserService::new(Arc::new(MemoryRepository::new()), keys, 1_000)
    }

    #[tokio::test]
    async fn register_then_login() {
        let users = service();
        let user = users.register(" Ada@Example.com", "pw").await.unwrap();
        assert_eq!(user.email, "ada@example.com");
        assert_ne!(user.password_hash, "pw");

        let session = users.login("ada@example.com", "pw").await.unwrap();
        assert_eq!(session.email, "ada@example.com");

        let authenticated = users.authenticate(&session.token).await.unwrap();
        assert_eq!(authenticated.id, user.id);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let users = service();
        users.register("ada@example.com", "pw").await.unwrap();
        let err = users.register("ADA@example.com", "other").await.unwrap_err();
        assert!(matches!(err, UserServiceError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn login_failures_are_distinguished() {
        let users = service();
        users.register("ada@example.com", "pw").await.unwrap();

        assert!(matches!(
            users.login("nobody@example.com", "pw").await,
            Err(UserServiceError::NotFound)
        ));
        assert!(matches!(
            users.login("ada@example.com", "wrong").await,
            Err(UserServiceError::InvalidCredentials)
        ));
        assert!(matches!(
            users.login("ada@example.com", "").await,
            Err(UserServiceError::MissingField("password"))
        ));
    }

    #[tokio::test]
    async fn tokens_for_unknown_users_are_rejected() {
        let users = service();
        let stranger = JwtKeys::new("test-secret", 1)
            .unwrap()
            .issue(Uuid::new_v4(), "ghost@example.com")
            .unwrap();

        assert!(matches!(
            users.authenticate(&stranger).await,
            Err(UserServiceError::Auth(AuthError::InvalidToken(_)))
        ));
        assert!(matches!(
            users.authenticate("").await,
            Err(UserServiceError::Auth(AuthError::MissingToken))
        ));
    }
}
