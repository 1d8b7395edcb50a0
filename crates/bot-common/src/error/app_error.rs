//! Application error types
//!
//! Unified error handling for startup and the orchestrator. Per-invocation
//! failures never reach this type; they stay inside the dispatch pipeline.

use crate::config::ConfigError;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Configuration errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    // Cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // Command module errors
    #[error("Module error: {0}")]
    Module(String),

    // Internal errors
    #[error("Internal error")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    /// Create a cache error
    #[must_use]
    pub fn cache(msg: impl std::fmt::Display) -> Self {
        Self::Cache(msg.to_string())
    }

    /// Create a gateway error
    #[must_use]
    pub fn gateway(msg: impl std::fmt::Display) -> Self {
        Self::Gateway(msg.to_string())
    }

    /// Create an internal error from any error
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }

    /// Whether this error should abort startup
    ///
    /// Only configuration problems are fatal before the shard fleet is up;
    /// everything else degrades per component.
    #[must_use]
    pub fn is_startup_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
