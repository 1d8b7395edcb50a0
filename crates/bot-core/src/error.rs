//! Command failure taxonomy
//!
//! Handlers and the dispatch stages ahead of them report failures through
//! `CommandError`; the classifier in the dispatch crate decides what each
//! variant means for the invoker and the operator.

use std::time::Duration;

/// Failure raised by (or on behalf of) a command invocation
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    // Silent outcomes - no user-visible response
    #[error("command not found")]
    CommandNotFound,

    #[error("command is disabled")]
    Disabled,

    #[error("command is not available in private messages")]
    PrivateMessageNotAllowed,

    #[error("platform rejected the action (forbidden)")]
    Forbidden,

    #[error("platform entity not found")]
    PlatformNotFound,

    // User-facing outcomes
    #[error("you are not allowed to use that command")]
    NotAllowed,

    #[error("bad argument: {0}")]
    BadArgument(String),

    #[error("missing required argument: {0}")]
    MissingArgument(String),

    #[error("command on cooldown for {0:.2?}")]
    OnCooldown(Duration),

    // Reportable outcomes
    #[error("command failed: {0}")]
    Internal(#[source] anyhow::Error),
}

impl CommandError {
    /// Bad-argument helper
    #[must_use]
    pub fn bad_argument(msg: impl std::fmt::Display) -> Self {
        Self::BadArgument(msg.to_string())
    }

    /// Missing-argument helper
    #[must_use]
    pub fn missing_argument(name: impl std::fmt::Display) -> Self {
        Self::MissingArgument(name.to_string())
    }

    /// Wrap any error as an internal (reportable) failure
    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}
