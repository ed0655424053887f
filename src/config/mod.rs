//! Configuration types and builders.

use crate::error::{ConfigError, McpError, Result};
use serde::Serialize;
use std::borrow::Cow;
use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "deepseek/deepseek-chat";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Application settings.
#[derive(Clone, Serialize)]
pub struct Settings {
    pub name: Cow<'static, str>,
    pub version: Cow<'static, str>,
    #[serde(skip_serializing)]
    pub database_url: String,
    pub pool_size: usize,
    #[serde(skip_serializing)]
    pub openrouter_api_key: String,
    pub openrouter_model: String,
    pub openrouter_base_url: String,
    pub llm_timeout: Duration,
    pub db_timeout: Duration,
    pub rate_limit: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").into(),
            version: env!("CARGO_PKG_VERSION").into(),
            database_url: String::new(),
            pool_size: 10,
            openrouter_api_key: String::new(),
            openrouter_model: DEFAULT_MODEL.into(),
            openrouter_base_url: DEFAULT_BASE_URL.into(),
            llm_timeout: Duration::from_secs(30),
            db_timeout: Duration::from_secs(10),
            rate_limit: Duration::from_secs(3),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("database_url", &redact_url(&self.database_url))
            .field("pool_size", &self.pool_size)
            .field("openrouter_api_key", &"<redacted>")
            .field("openrouter_model", &self.openrouter_model)
            .field("openrouter_base_url", &self.openrouter_base_url)
            .field("llm_timeout", &self.llm_timeout)
            .field("db_timeout", &self.db_timeout)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// Load settings from process environment.
    pub fn from_env() -> Result<Self> {
        SettingsBuilder::new().from_env()?.build()
    }
}

/// Builder for Settings with fluent API.
#[derive(Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.settings.database_url = url.into();
        self
    }

    pub fn pool_size(mut self, size: usize) -> Self {
        self.settings.pool_size = size;
        self
    }

    pub fn openrouter_api_key(mut self, key: impl Into<String>) -> Self {
        self.settings.openrouter_api_key = key.into();
        self
    }

    pub fn openrouter_model(mut self, model: impl Into<String>) -> Self {
        self.settings.openrouter_model = model.into();
        self
    }

    pub fn openrouter_base_url(mut self, url: impl Into<String>) -> Self {
        self.settings.openrouter_base_url = url.into();
        self
    }

    pub fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.settings.llm_timeout = timeout;
        self
    }

    pub fn db_timeout(mut self, timeout: Duration) -> Self {
        self.settings.db_timeout = timeout;
        self
    }

    pub fn rate_limit(mut self, interval: Duration) -> Self {
        self.settings.rate_limit = interval;
        self
    }

    /// Build from environment variables.
    pub fn from_env(self) -> Result<Self> {
        self.from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.settings.database_url = url;
        }

        if let Some(key) = lookup("OPENROUTER_API_KEY") {
            self.settings.openrouter_api_key = key;
        }

        if let Some(model) = lookup("OPENROUTER_MODEL") {
            self.settings.openrouter_model = model;
        }

        if let Some(url) = lookup("OPENROUTER_BASE_URL") {
            self.settings.openrouter_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(value) = lookup("LLM_TIMEOUT") {
            self.settings.llm_timeout = parse_seconds("LLM_TIMEOUT", &value, 1, 300)?;
        }

        if let Some(value) = lookup("DB_TIMEOUT") {
            self.settings.db_timeout = parse_seconds("DB_TIMEOUT", &value, 1, 60)?;
        }

        if let Some(value) = lookup("RATE_LIMIT_SECONDS") {
            self.settings.rate_limit = parse_seconds("RATE_LIMIT_SECONDS", &value, 1, 300)?;
        }

        if let Some(value) = lookup("DATABASE_POOL_SIZE") {
            self.settings.pool_size = value.trim().parse().map_err(|_| {
                McpError::Config(ConfigError::InvalidValue {
                    field: "DATABASE_POOL_SIZE".into(),
                    message: format!("not a number: {}", value).into(),
                })
            })?;
        }

        Ok(self)
    }

    pub fn build(self) -> Result<Settings> {
        self.validate()?;
        Ok(self.settings)
    }

    fn validate(&self) -> Result<()> {
        if self.settings.database_url.trim().is_empty() {
            return Err(ConfigError::MissingField("DATABASE_URL".into()).into());
        }
        if self.settings.openrouter_api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("OPENROUTER_API_KEY".into()).into());
        }
        postgres_url(&self.settings.database_url)?;
        if self.settings.pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DATABASE_POOL_SIZE".into(),
                message: "Pool size must be greater than 0".into(),
            }
            .into());
        }
        Ok(())
    }
}

/// Parse a whole number of seconds within `min..=max`.
fn parse_seconds(field: &'static str, value: &str, min: u64, max: u64) -> Result<Duration> {
    let seconds: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.into(),
        message: format!("not a whole number of seconds: {}", value).into(),
    })?;
    if !(min..=max).contains(&seconds) {
        return Err(ConfigError::InvalidValue {
            field: field.into(),
            message: format!("must be between {} and {} seconds, got {}", min, max, seconds)
                .into(),
        }
        .into());
    }
    Ok(Duration::from_secs(seconds))
}

/// Normalize a database URL for the PostgreSQL driver.
///
/// Accepts SQLAlchemy-style schemes such as `postgresql+asyncpg://` and drops
/// the `+driver` suffix.
pub fn postgres_url(url: &str) -> Result<String> {
    let url = url.trim();
    let (scheme, rest) = url
        .split_once("://")
        .ok_or_else(|| ConfigError::InvalidDatabaseUrl("Missing protocol".into()))?;

    let base = scheme.split('+').next().unwrap_or(scheme).to_lowercase();
    match base.as_str() {
        "postgres" | "postgresql" => Ok(format!("{}://{}", base, rest)),
        other => Err(ConfigError::InvalidDatabaseUrl(format!("Unsupported scheme: {}", other)).into()),
    }
}

/// Hide the password part of a connection URL.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((creds, host)) => {
            let user = creds.split(':').next().unwrap_or_default();
            format!("{}://{}:***@{}", scheme, user, host)
        }
        None => url.to_string(),
    }
}
