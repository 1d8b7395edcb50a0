//! Application configuration structs
//!
//! Loads configuration from environment variables.

use serde::Deserialize;
use std::env;

/// Main bot configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub app: AppSettings,
    pub gateway: GatewayConfig,
    pub reconnect: ReconnectConfig,
    pub dispatch: DispatchConfig,
    pub reporting: ReportingConfig,
    /// Redis connection; absent only in debug mode
    pub redis: Option<RedisConfig>,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Restricted operating mode: fixed dev prefix, no external stores
    #[serde(default)]
    pub debug: bool,
    /// Instance number, used in cross-instance cache keys
    #[serde(default)]
    pub instance: u32,
    /// Bot owner's user id (owner-only command guard), as a raw integer
    #[serde(default)]
    pub owner_id: Option<i64>,
}

/// Gateway connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// WebSocket URL of the platform gateway
    pub url: String,
    /// Authentication token presented in Identify
    pub token: String,
    /// Total shard count the fleet identifies with
    #[serde(default = "default_shard_count")]
    pub shard_count: u32,
    /// Shard ids this instance runs (defaults to all of them)
    #[serde(default)]
    pub shard_ids: Option<Vec<u32>>,
    /// Delay between consecutive shard identifies (connection-rate limit)
    #[serde(default = "default_identify_delay_ms")]
    pub identify_delay_ms: u64,
    /// The bot's own user id, used for mention-prefix matching
    pub bot_user_id: i64,
}

impl GatewayConfig {
    /// The shard ids this instance is responsible for
    #[must_use]
    pub fn effective_shard_ids(&self) -> Vec<u32> {
        self.shard_ids
            .clone()
            .unwrap_or_else(|| (0..self.shard_count).collect())
    }
}

/// Reconnect/backoff configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Attempt ceiling before a shard is surfaced as permanently failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// A Connected stretch this long resets the attempt counter
    #[serde(default = "default_stability_window_secs")]
    pub stability_window_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            max_attempts: default_max_attempts(),
            stability_window_secs: default_stability_window_secs(),
        }
    }
}

/// Dispatch pipeline configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DispatchConfig {
    /// Number of worker tasks draining the event queues
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Bounded queue depth per worker
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
    /// Grace period for in-flight handlers on shutdown
    #[serde(default = "default_grace_timeout_secs")]
    pub grace_timeout_secs: u64,
    /// How long `stop` waits for shards to drain before force-closing
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_depth: default_queue_depth(),
            grace_timeout_secs: default_grace_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

/// Outbound reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    /// Incident webhook URL; None disables operator reporting
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// REST base URL replies are posted to; None logs replies instead
    #[serde(default)]
    pub rest_url: Option<String>,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

// Default value functions
fn default_app_name() -> String {
    "bot-client".to_string()
}

fn default_shard_count() -> u32 {
    1
}

fn default_identify_delay_ms() -> u64 {
    5000
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

fn default_max_attempts() -> u32 {
    10
}

fn default_stability_window_secs() -> u64 {
    30
}

fn default_workers() -> usize {
    4
}

fn default_queue_depth() -> usize {
    1024
}

fn default_grace_timeout_secs() -> u64 {
    5
}

fn default_shutdown_timeout_secs() -> u64 {
    10
}

fn default_redis_max_connections() -> u32 {
    10
}

impl BotConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing.
    /// `REDIS_URL` is required only outside debug mode.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let debug = env::var("BOT_DEBUG")
            .ok()
            .is_some_and(|s| matches!(s.to_lowercase().as_str(), "1" | "true" | "yes"));

        let redis = match env::var("REDIS_URL") {
            Ok(url) => Some(RedisConfig {
                url,
                max_connections: env::var("REDIS_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_redis_max_connections),
            }),
            Err(_) if debug => None,
            Err(_) => return Err(ConfigError::MissingVar("REDIS_URL")),
        };

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                debug,
                instance: env::var("BOT_INSTANCE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(0),
                owner_id: env::var("BOT_OWNER_ID").ok().and_then(|s| s.parse().ok()),
            },
            gateway: GatewayConfig {
                url: env::var("GATEWAY_URL").map_err(|_| ConfigError::MissingVar("GATEWAY_URL"))?,
                token: env::var("BOT_TOKEN").map_err(|_| ConfigError::MissingVar("BOT_TOKEN"))?,
                shard_count: env::var("SHARD_COUNT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_shard_count),
                shard_ids: env::var("SHARD_IDS").ok().map(|s| {
                    s.split(',')
                        .filter_map(|part| part.trim().parse().ok())
                        .collect()
                }),
                identify_delay_ms: env::var("IDENTIFY_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_identify_delay_ms),
                bot_user_id: env::var("BOT_USER_ID")
                    .map_err(|_| ConfigError::MissingVar("BOT_USER_ID"))?
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("BOT_USER_ID", "expected an integer".to_string()))?,
            },
            reconnect: ReconnectConfig {
                base_delay_ms: env::var("RECONNECT_BASE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_base_delay_ms),
                max_delay_ms: env::var("RECONNECT_MAX_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_max_delay_ms),
                max_attempts: env::var("RECONNECT_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_max_attempts),
                stability_window_secs: env::var("STABILITY_WINDOW_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_stability_window_secs),
            },
            dispatch: DispatchConfig {
                workers: env::var("DISPATCH_WORKERS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_workers),
                queue_depth: env::var("DISPATCH_QUEUE_DEPTH")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_queue_depth),
                grace_timeout_secs: env::var("GRACE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_grace_timeout_secs),
                shutdown_timeout_secs: env::var("SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_else(default_shutdown_timeout_secs),
            },
            reporting: ReportingConfig {
                webhook_url: env::var("INCIDENT_WEBHOOK_URL").ok(),
                rest_url: env::var("REST_URL").ok(),
            },
            redis,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
