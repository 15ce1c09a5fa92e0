//! Configuration management

use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use config::builder::DefaultState;
use serde::Deserialize;

use crate::constants::{DEFAULT_ACQUIRE_TIMEOUT_SECS, DEFAULT_SHARD_DATABASE_PREFIX, DEFAULT_TOTAL_SHARDS};
use crate::error::AppError;
use crate::types::ShardId;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub sharding: ShardingSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// Key/value connection string of the master store.
    pub master_connection: String,
    pub max_connections: u32,
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

/// Shard topology and new-tenant placement.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ShardingSettings {
    /// Base connection template; the shard database name is substituted into it.
    #[serde(default)]
    pub base_connection: Option<String>,
    #[serde(default = "default_total_shards")]
    pub total_shards: u32,
    /// When set and within `[1, total_shards]`, every new tenant lands here.
    #[serde(default)]
    pub hot_shard: Option<ShardId>,
    #[serde(default = "default_prefix")]
    pub database_prefix: String,
}

impl ShardingSettings {
    pub fn new(base_connection: impl Into<String>, total_shards: u32) -> Self {
        Self {
            base_connection: Some(base_connection.into()),
            total_shards,
            hot_shard: None,
            database_prefix: DEFAULT_SHARD_DATABASE_PREFIX.to_string(),
        }
    }

    pub fn with_hot_shard(mut self, hot_shard: Option<ShardId>) -> Self {
        self.hot_shard = hot_shard;
        self
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.total_shards == 0 {
            return Err(AppError::InvalidConfig("sharding.total_shards must be at least 1".into()));
        }
        if self.database_prefix.trim().is_empty() {
            return Err(AppError::InvalidConfig("sharding.database_prefix must not be empty".into()));
        }
        Ok(())
    }

    /// The hot shard, only if it lies within the configured range.
    pub fn effective_hot_shard(&self) -> Option<ShardId> {
        self.hot_shard.filter(|s| (1..=self.total_shards).contains(s))
    }
}

impl Default for ShardingSettings {
    fn default() -> Self {
        Self {
            base_connection: None,
            total_shards: DEFAULT_TOTAL_SHARDS,
            hot_shard: None,
            database_prefix: DEFAULT_SHARD_DATABASE_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    pub level: String,
    pub json: bool,
    #[serde(default)]
    pub log_directory: Option<String>,
}

fn default_acquire_timeout() -> u64 {
    DEFAULT_ACQUIRE_TIMEOUT_SECS
}

fn default_total_shards() -> u32 {
    DEFAULT_TOTAL_SHARDS
}

fn default_prefix() -> String {
    DEFAULT_SHARD_DATABASE_PREFIX.to_string()
}

impl AppConfig {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;
        Self::finish(config)
    }

    /// Builds the configuration from an inline TOML document on top of the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self, AppError> {
        let config = Self::defaults()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::finish(config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, AppError> {
        Ok(Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.name", "fleet")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("sharding.total_shards", i64::from(DEFAULT_TOTAL_SHARDS))?
            .set_default("sharding.database_prefix", DEFAULT_SHARD_DATABASE_PREFIX)?
            .set_default("telemetry.level", "info")?
            .set_default("telemetry.json", true)?)
    }

    fn finish(config: Config) -> Result<Self, AppError> {
        let app: Self = config.try_deserialize()?;
        app.sharding.validate()?;
        Ok(app)
    }
}
