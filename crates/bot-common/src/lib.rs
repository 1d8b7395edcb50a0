//! # bot-common
//!
//! Shared infrastructure for the bot client: environment-based
//! configuration, the application-wide error type, and tracing setup.

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{
    AppSettings, BotConfig, ConfigError, DispatchConfig, GatewayConfig, ReconnectConfig,
    RedisConfig, ReportingConfig,
};
pub use error::{AppError, AppResult};
pub use telemetry::{init_tracing, try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
