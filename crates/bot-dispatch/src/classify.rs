//! Error classification
//!
//! Maps a command failure onto what the invoker sees and what the operator
//! receives. Silent failures produce no response at all; user-facing ones
//! produce a terse, auto-expiring notice; reportable ones additionally emit
//! a structured incident record.

use crate::incident::IncidentRecord;
use bot_core::{CommandError, Snowflake};

/// Seconds after which rate/permission notices expire
pub const NOTICE_EXPIRY_SECS: u64 = 5;

/// Broad classification of a command failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No user-visible response
    Silent,
    /// Short notice to the invoker, auto-expiring where rate/permission
    /// related
    UserFacing,
    /// Generic notice to the invoker plus an incident record for the
    /// operator
    Reportable,
}

/// Classify a command failure
#[must_use]
pub fn classify(error: &CommandError) -> ErrorKind {
    match error {
        CommandError::CommandNotFound
        | CommandError::Disabled
        | CommandError::PrivateMessageNotAllowed
        | CommandError::Forbidden
        | CommandError::PlatformNotFound => ErrorKind::Silent,

        CommandError::NotAllowed
        | CommandError::BadArgument(_)
        | CommandError::MissingArgument(_)
        | CommandError::OnCooldown(_) => ErrorKind::UserFacing,

        CommandError::Internal(_) => ErrorKind::Reportable,
    }
}

/// Concrete reaction to a classified failure
#[derive(Debug)]
pub enum Disposition {
    /// Drop without responding
    Silent,
    /// Send a notice to the invoker
    Notice {
        content: String,
        /// Seconds after which the platform should delete the notice
        delete_after: Option<u64>,
    },
    /// Send a generic notice and forward an incident record
    Report {
        notice: String,
        incident: IncidentRecord,
    },
}

/// Context needed to render a failure reaction
#[derive(Debug, Clone, Copy)]
pub struct FailureContext<'a> {
    /// Canonical name of the failing command
    pub command_name: &'a str,
    /// Argument signature for help notices, when the command declares one
    pub usage: Option<&'a str>,
    /// This process's instance number
    pub instance_id: u32,
    /// The invoking user
    pub invoker_id: Snowflake,
}

/// Build the reaction for a classified failure
#[must_use]
pub fn disposition(error: &CommandError, ctx: FailureContext<'_>) -> Disposition {
    match classify(error) {
        ErrorKind::Silent => Disposition::Silent,
        ErrorKind::UserFacing => Disposition::Notice {
            content: user_notice(error, ctx),
            delete_after: notice_expiry(error),
        },
        ErrorKind::Reportable => Disposition::Report {
            notice: format!(
                "An unexpected error occurred in `{}`. It has been reported.",
                ctx.command_name
            ),
            incident: IncidentRecord {
                command_name: ctx.command_name.to_string(),
                instance_id: ctx.instance_id,
                invoker_id: ctx.invoker_id,
                error_text: error.to_string(),
            },
        },
    }
}

fn user_notice(error: &CommandError, ctx: FailureContext<'_>) -> String {
    match error {
        CommandError::NotAllowed => "You are not allowed to use that command.".to_string(),
        CommandError::OnCooldown(remaining) => format!(
            "`{:.2}s` left until you can use this command again.",
            remaining.as_secs_f64()
        ),
        CommandError::BadArgument(_) | CommandError::MissingArgument(_) => match ctx.usage {
            Some(usage) => format!("Usage: `{} {}`", ctx.command_name, usage),
            None => format!("Invalid arguments for `{}`.", ctx.command_name),
        },
        // Remaining variants never reach the user-facing branch
        other => other.to_string(),
    }
}

fn notice_expiry(error: &CommandError) -> Option<u64> {
    match error {
        // Rate/permission notices auto-expire; help text stays
        CommandError::NotAllowed | CommandError::OnCooldown(_) => Some(NOTICE_EXPIRY_SECS),
        _ => None,
    }
}
