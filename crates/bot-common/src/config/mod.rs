//! Configuration module

mod bot_config;

pub use bot_config::{
    AppSettings, BotConfig, ConfigError, DispatchConfig, GatewayConfig, ReconnectConfig,
    RedisConfig, ReportingConfig,
};
