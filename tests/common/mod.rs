#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use courseware_api::clock::ManualClock;
use courseware_api::config::{AdminAccount, AppConfig};
use courseware_api::database::memory::MemoryStore;
use courseware_api::storage::LocalFileRepository;
use courseware_api::{app, AppState};

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

/// One application instance per test: in-memory store, manual clock, temporary upload directory
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    pub store: MemoryStore,
    pub storage_dir: TempDir,
    handle: JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
            .with_test_writer()
            .try_init();

        let storage_dir = tempfile::tempdir().context("failed to create storage dir")?;

        let mut config = AppConfig::for_testing();
        config.storage.base_path = storage_dir.path().to_string_lossy().into_owned();
        config.storage.base_url = "/images".to_string();
        config.security.admin = Some(AdminAccount {
            email: ADMIN_EMAIL.to_string(),
            username: "admin".to_string(),
            password: ADMIN_PASSWORD.to_string(),
        });

        let store = MemoryStore::new();
        let clock = Arc::new(ManualClock::starting_at(2024, 1, 1));
        let files = Arc::new(LocalFileRepository::from_config(&config.storage));
        let admin = config.security.admin.clone().context("admin account missing")?;
        let state = AppState::new(config, Arc::new(store.clone()), clock, files);
        state.users().ensure_admin(&admin).await?;

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        let router = app(state);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("test server stopped: {}", e);
            }
        });

        let server = Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: Client::new(),
            store,
            storage_dir,
            handle,
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

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

    pub fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.get(self.url(path)), token)
    }

    pub fn post(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.post(self.url(path)), token)
    }

    pub fn put(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.put(self.url(path)), token)
    }

    pub fn delete(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        with_token(self.client.delete(self.url(path)), token)
    }

    /// Register a user and return the `data` of the response
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<Value> {
        let res = self
            .post("/api/users/register", None)
            .json(&json!({ "username": username, "email": email, "password": password, "grade_level": 7 }))
            .send()
            .await?;
        expect_data(res, StatusCode::OK).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let res = self
            .post("/api/users/login", None)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        let data = expect_data(res, StatusCode::OK).await?;
        data["token"]
            .as_str()
            .map(str::to_string)
            .context("login response without token")
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Register and log in a regular user; returns (user id, token)
    pub async fn user_token(&self, username: &str) -> Result<(String, String)> {
        let email = format!("{}@example.com", username);
        let user = self.register(username, &email, "secret-password").await?;
        let token = self.login(&email, "secret-password").await?;
        let id = user["id"].as_str().context("user without id")?.to_string();
        Ok((id, token))
    }

    pub async fn create_subject(&self, token: &str, name: &str) -> Result<String> {
        let res = self
            .post("/api/admin/subjects", Some(token))
            .json(&json!({ "subject_name": name }))
            .send()
            .await?;
        let data = expect_data(res, StatusCode::OK).await?;
        Ok(data["id"].as_str().context("subject without id")?.to_string())
    }

    pub async fn create_course(&self, token: &str, subject_id: &str, name: &str) -> Result<String> {
        let res = self
            .post("/api/admin/courses", Some(token))
            .json(&json!({
                "course_name": name,
                "subject_id": subject_id,
                "grade_level": 7,
                "content": [{ "type": "text", "data": format!("Welcome to {}", name) }]
            }))
            .send()
            .await?;
        let data = expect_data(res, StatusCode::OK).await?;
        Ok(data["id"].as_str().context("course without id")?.to_string())
    }

    pub async fn grant(&self, token: &str, user_id: &str, course_ids: &[&str]) -> Result<Value> {
        let res = self
            .post("/api/admin/user-courses", Some(token))
            .json(&json!({ "user_id": user_id, "course_ids": course_ids }))
            .send()
            .await?;
        expect_data(res, StatusCode::OK).await
    }
}

fn with_token(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Assert the status and unwrap the `data` member of the envelope
pub async fn expect_data(res: reqwest::Response, status: StatusCode) -> Result<Value> {
    let body = expect_status(res, status).await?;
    Ok(body["data"].clone())
}

/// Assert the status and return the whole JSON body
pub async fn expect_status(res: reqwest::Response, status: StatusCode) -> Result<Value> {
    let actual = res.status();
    let body: Value = res.json().await.context("response body is not JSON")?;
    anyhow::ensure!(actual == status, "expected {}, got {}: {}", status, actual, body);
    Ok(body)
}
