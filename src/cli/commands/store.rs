// One-shot storage commands. Both require DATABASE_URL: the in-memory store
// only lives as long as a server process.

use serde_json::json;

use crate::cli::OutputFormat;
use crate::clock::system_clock;
use crate::config::AppConfig;
use crate::database::{DatabaseError, DatabaseManager, PgRepository};
use crate::services::TaskService;

async fn connect(config: &AppConfig) -> anyhow::Result<DatabaseManager> {
    if config.database.url.is_none() {
        return Err(DatabaseError::ConfigMissing("DATABASE_URL").into());
    }
    Ok(DatabaseManager::connect(&config.database).await?)
}

pub async fn migrate(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let manager = connect(&config).await?;
    manager.migrate().await?;
    manager.close().await;

    match output_format {
        OutputFormat::Json => println!("{}", json!({ "migrated": true })),
        OutputFormat::Text => println!("Schema is up to date"),
    }
    Ok(())
}

pub async fn sweep(config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let manager = connect(&config).await?;
    let tasks = TaskService::new(
        std::sync::Arc::new(PgRepository::new(&manager)),
        system_clock(),
    );
    let result = tasks.sweep().await;
    manager.close().await;
    let count = result?;

    match output_format {
        OutputFormat::Json => println!("{}", json!({ "missed": count, "today": tasks.today() })),
        OutputFormat::Text => println!("Marked {} overdue task(s) missed", count),
    }
    Ok(())
}
