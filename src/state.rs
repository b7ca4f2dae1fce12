use anyhow::{Context, Result};
use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::DbPool;
use crate::pipeline::PipelineContext;
use crate::session;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared state of the web application
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<DbPool>,
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub cookie_key: Key,
    /// Held while a pipeline runs
    pub pipeline_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Builds the state, deriving the cookie key from the session secret
    pub fn new(pool: Arc<DbPool>, config: Config) -> Result<Self> {
        let cookie_key = session::session_key(&config.session_secret)?;
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            pool,
            config: Arc::new(config),
            http,
            cookie_key,
            pipeline_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Whether cookies carry the `Secure` attribute
    pub fn secure_cookies(&self) -> bool {
        self.config.public_base_url.starts_with("https://")
    }

    pub fn pipeline_context(&self) -> PipelineContext {
        PipelineContext {
            pool: self.pool.clone(),
            config: self.config.clone(),
            http: self.http.clone(),
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<AppState> for Arc<DbPool> {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
