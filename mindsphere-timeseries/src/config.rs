use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Default config file looked up when `CONFIG_PATH` is not set
pub const DEFAULT_CONFIG_FILE: &str = "config/mindsphere.yaml";

/// Configuration for the time-series client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the time-series API, without trailing `/timeseries`
    pub base_url: String,

    /// Rows requested per page on range reads
    pub page_limit: usize,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Pre-provisioned bearer tokens
    pub tokens: Vec<TenantToken>,
}

/// A bearer token provisioned for one tenant
#[derive(Clone, Serialize, Deserialize)]
pub struct TenantToken {
    pub tenant: String,
    pub token: String,
    /// Lifetime of the token once handed out
    #[serde(default = "default_token_lifetime")]
    pub expires_in_secs: u64,
}

fn default_token_lifetime() -> u64 {
    30 * 60
}

// Keep tokens out of `Loaded configuration` log lines
impl std::fmt::Debug for TenantToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantToken")
            .field("tenant", &self.tenant)
            .field("token", &"<redacted>")
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gateway.eu1.mindsphere.io/api/iottimeseries/v3".to_string(),
            page_limit: 2000,
            request_timeout_ms: 30000,
            connect_timeout_ms: 5000,
            user_agent: format!("mindsphere-timeseries/{}", env!("CARGO_PKG_VERSION")),
            tokens: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file, environment variables, and defaults
    pub fn load() -> Result<Self> {
        let path = env::var("CONFIG_PATH").ok();
        Self::load_with(path.as_deref())
    }

    /// Like [`load`](Self::load) with an explicit config file path
    pub fn load_with(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        config.apply_env()?;
        config.validate()?;

        Ok(config)
    }

    /// Override with environment variables if present
    fn apply_env(&mut self) -> Result<()> {
        if let Ok(base_url) = env::var("MINDSPHERE_BASE_URL") {
            self.base_url = base_url;
        }

        if let Ok(page_limit) = env::var("MINDSPHERE_PAGE_LIMIT") {
            self.page_limit = page_limit
                .parse()
                .with_context(|| format!("Invalid MINDSPHERE_PAGE_LIMIT: {}", page_limit))?;
        }

        if let Ok(timeout) = env::var("MINDSPHERE_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = timeout
                .parse()
                .with_context(|| format!("Invalid MINDSPHERE_REQUEST_TIMEOUT_MS: {}", timeout))?;
        }

        if let (Ok(tenant), Ok(token)) =
            (env::var("MINDSPHERE_TENANT"), env::var("MINDSPHERE_TOKEN"))
        {
            self.tokens.retain(|entry| entry.tenant != tenant);
            self.tokens.push(TenantToken {
                tenant,
                token,
                expires_in_secs: default_token_lifetime(),
            });
        }

        Ok(())
    }

    /// Load configuration from a YAML file
    pub fn load_from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow::anyhow!("Base URL cannot be empty"));
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "Base URL must start with http:// or https://: {}",
                self.base_url
            ));
        }

        if self.page_limit == 0 {
            return Err(anyhow::anyhow!("Page limit must be greater than 0"));
        }

        if self.request_timeout_ms == 0 {
            return Err(anyhow::anyhow!("Request timeout must be greater than 0"));
        }

        if self.connect_timeout_ms == 0 {
            return Err(anyhow::anyhow!("Connect timeout must be greater than 0"));
        }

        if let Some(entry) = self.tokens.iter().find(|entry| entry.tenant.is_empty()) {
            return Err(anyhow::anyhow!(
                "Token entry without tenant (expires_in_secs = {})",
                entry.expires_in_secs
            ));
        }

        Ok(())
    }

    /// Get the request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Get the connection timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
