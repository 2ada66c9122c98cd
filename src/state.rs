use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::auth::{AuthError, JwtKeys};
use crate::clock::{system_clock, SharedClock};
use crate::config::{AppConfig, ConfigError, Environment};
use crate::database::{DatabaseManager, MemoryRepository, PgRepository, TaskRepository, UserRepository};
use crate::services::{TaskService, UserService};

/// Everything a request handler needs, built once at startup and shared
/// through the router.
pub struct AppState {
    pub config: AppConfig,
    pub users: UserService,
    pub tasks: TaskService,
    store: Arc<dyn TaskRepository>,
    database: Option<DatabaseManager>,
}

impl AppState {
    /// Wire services over explicit repositories and clock.
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserRepository>,
        tasks: Arc<dyn TaskRepository>,
        clock: SharedClock,
    ) -> Result<Self, AuthError> {
        let keys = JwtKeys::from_config(&config.security)?;
        let hash_rounds = config.security.password_hash_rounds;

        Ok(Self {
            users: UserService::new(users, keys, hash_rounds),
            tasks: TaskService::new(tasks.clone(), clock),
            store: tasks,
            database: None,
            config,
        })
    }

    /// In-memory store; used by development without `DATABASE_URL` and by tests.
    pub fn in_memory(config: AppConfig, clock: SharedClock) -> Result<Self, AuthError> {
        let repo = Arc::new(MemoryRepository::new());
        Self::new(config, repo.clone(), repo, clock)
    }

    /// Build state from configuration: Postgres when a URL is configured,
    /// otherwise the in-memory store (development only).
    pub async fn build(config: AppConfig) -> anyhow::Result<Arc<Self>> {
        let state = if config.database.url.is_some() {
            let manager = DatabaseManager::connect(&config.database)
                .await
                .context("failed to connect to database")?;
            manager.migrate().await.context("failed to apply schema")?;

            let repo = Arc::new(PgRepository::new(&manager));
            let mut state = Self::new(config, repo.clone(), repo, system_clock())?;
            state.database = Some(manager);
            state
        } else if config.environment == Environment::Development {
            warn!("DATABASE_URL not set; using the in-memory store (data is lost on exit)");
            Self::in_memory(config, system_clock())?
        } else {
            return Err(ConfigError::MissingDatabaseUrl(config.environment).into());
        };

        info!(
            "Application state ready ({} store)",
            if state.database.is_some() { "postgres" } else { "memory" }
        );
        Ok(Arc::new(state))
    }

    /// Storage liveness for `/health`.
    pub async fn ping(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "health check failed");
                false
            }
        }
    }

    pub async fn shutdown(&self) {
        if let Some(manager) = &self.database {
            manager.close().await;
        }
    }
}
