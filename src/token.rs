//! Bearer tokens for the inventory services.
//!
//! [`TokenManager`] performs an OAuth client-credentials exchange and caches
//! the result for a fixed window (600 seconds by default). Refresh is lazy
//! and synchronous with the caller: the next [`TokenProvider::get_token`]
//! after the window closes performs the exchange before returning.
//!
//! # Environment Variables
//!
//! - `IDENTITY_TOKEN_SERVER`: token server base URL (overrides `[auth].token_server`)
//! - `IDENTITY_CLIENT_ID`: required
//! - `IDENTITY_CLIENT_SECRET`: required
//!
//! Missing settings surface as [`IngestError::Auth`] on first use, not at
//! construction, so commands that never talk to inventory don't need them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::AuthConfig;
use crate::error::{IngestError, IngestResult};

/// Source of wall-clock time, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Anything that can hand out a bearer token.
#[async_trait]
pub trait TokenProvider: Send {
    /// Return a token that is fresh enough to use now.
    async fn get_token(&mut self) -> IngestResult<String>;

    /// Discard any cached token and obtain a new one.
    async fn force_refresh(&mut self) -> IngestResult<String>;
}

/// A fixed token supplied by the operator. Never refreshes.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn get_token(&mut self) -> IngestResult<String> {
        Ok(self.0.clone())
    }

    async fn force_refresh(&mut self) -> IngestResult<String> {
        Ok(self.0.clone())
    }
}

/// Client-credential settings for the exchange.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub token_server: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Credentials {
    /// Read credentials from the environment, falling back to config for
    /// the server URL.
    pub fn from_env(auth: &AuthConfig) -> Self {
        Self {
            token_server: std::env::var("IDENTITY_TOKEN_SERVER")
                .ok()
                .or_else(|| auth.token_server.clone()),
            client_id: std::env::var("IDENTITY_CLIENT_ID").ok(),
            client_secret: std::env::var("IDENTITY_CLIENT_SECRET").ok(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

struct CachedToken {
    value: String,
    issued_at: DateTime<Utc>,
}

pub struct TokenManager {
    credentials: Credentials,
    max_age: Duration,
    clock: Arc<dyn Clock>,
    client: reqwest::Client,
    cached: Option<CachedToken>,
}

impl TokenManager {
    pub fn new(credentials: Credentials, max_age_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            credentials,
            max_age: Duration::seconds(max_age_secs as i64),
            clock,
            client: reqwest::Client::new(),
            cached: None,
        }
    }

    pub fn from_config(auth: &AuthConfig) -> Self {
        Self::new(
            Credentials::from_env(auth),
            auth.max_age_secs,
            Arc::new(SystemClock),
        )
    }

    fn token_url(&self) -> IngestResult<String> {
        let server = self
            .credentials
            .token_server
            .as_deref()
            .ok_or_else(|| IngestError::Auth("token server is not configured".to_string()))?;
        Ok(format!("{}/oauth/token", server.trim_end_matches('/')))
    }

    async fn exchange(&mut self) -> IngestResult<String> {
        let url = self.token_url()?;
        let client_id = self
            .credentials
            .client_id
            .clone()
            .ok_or_else(|| IngestError::Auth("client id is not configured".to_string()))?;
        let client_secret = self
            .credentials
            .client_secret
            .clone()
            .ok_or_else(|| IngestError::Auth("client secret is not configured".to_string()))?;

        info!(url = %url, "requesting access token");

        let resp = self
            .client
            .post(&url)
            .basic_auth(&client_id, Some(&client_secret))
            .header("accept", "application/json")
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| IngestError::Auth(format!("token request to {} failed: {}", url, e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(IngestError::Auth(format!(
                "token endpoint returned HTTP {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            )));
        }

        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| IngestError::Auth(format!("token response is not JSON: {}", e)))?;
        let token = body
            .access_token
            .ok_or_else(|| IngestError::Auth("token response has no access_token".to_string()))?;

        self.cached = Some(CachedToken {
            value: token.clone(),
            issued_at: self.clock.now(),
        });
        Ok(token)
    }
}

#[async_trait]
impl TokenProvider for TokenManager {
    async fn get_token(&mut self) -> IngestResult<String> {
        if let Some(cached) = &self.cached {
            let elapsed = self.clock.now() - cached.issued_at;
            if elapsed < self.max_age {
                return Ok(cached.value.clone());
            }
            debug!(elapsed_secs = elapsed.num_seconds(), "access token expired");
        }
        self.exchange().await
    }

    async fn force_refresh(&mut self) -> IngestResult<String> {
        self.cached = None;
        self.exchange().await
    }
}
