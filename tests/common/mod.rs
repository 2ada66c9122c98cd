#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::{json, Value};

use taskboard_api::app::app;
use taskboard_api::clock::FixedClock;
use taskboard_api::config::AppConfig;
use taskboard_api::state::AppState;

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

/// Start an in-process server on a free port, backed by the in-memory store,
/// with "today" pinned to `today`.
pub async fn spawn_server(today: NaiveDate) -> Result<TestServer> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let mut config = AppConfig::development();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = port;
    config.security.password_hash_rounds = 1_000;
    config.sweeper.interval_secs = 0;

    let state = Arc::new(AppState::in_memory(config, FixedClock::on(today).shared())?);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });

    let server = TestServer {
        port,
        base_url,
        client: reqwest::Client::new(),
    };
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

impl TestServer {
    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register `email` and return its bearer token.
    pub async fn register_and_login(&self, email: &str) -> Result<String> {
        let credentials = json!({ "email": email, "password": "correct horse" });

        let res = self.client.post(self.url("/api/register")).json(&credentials).send().await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());

        let res = self.client.post(self.url("/api/login")).json(&credentials).send().await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let body: Value = res.json().await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no token")
    }

    /// Create a task and return its JSON.
    pub async fn create_task(&self, token: &str, title: &str, due_date: &str) -> Result<Value> {
        let res = self
            .client
            .post(self.url("/api/tasks"))
            .bearer_auth(token)
            .json(&json!({ "title": title, "dueDate": due_date }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create failed: {}", res.status());
        Ok(res.json().await?)
    }
}
