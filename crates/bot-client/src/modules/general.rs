//! General commands: ping, choose, info, setlang, setprefix, shutdown

use super::{ModuleContext, ModuleError};
use async_trait::async_trait;
use bot_cache::PreferenceStore;
use bot_core::{
    CommandDescriptor, CommandError, CommandHandler, CommandInvocation, Guard, Reply,
};
use bot_dispatch::{UsageCounters, COMMANDS_USED, MESSAGES_READ};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::Notify;

/// Languages the bot has text for
const LANGUAGES: [&str; 5] = ["en", "es", "fr", "de", "pt"];

/// Longest custom prefix a user may store
const MAX_PREFIX_LEN: usize = 10;

/// Build this module's command set
pub(super) fn commands(ctx: &ModuleContext) -> Result<Vec<CommandDescriptor>, ModuleError> {
    let mut commands = vec![
        CommandDescriptor::new("ping", Arc::new(Ping)),
        CommandDescriptor::new("choose", Arc::new(Choose)).usage("<items...>"),
        CommandDescriptor::new(
            "info",
            Arc::new(Info {
                counters: Arc::clone(&ctx.counters),
                started_at: ctx.started_at,
                shard_count: ctx.shard_count,
            }),
        )
        .alias("version"),
        CommandDescriptor::new(
            "setlang",
            Arc::new(SetLang {
                preferences: ctx.preferences.clone(),
            }),
        )
        .usage("<language>"),
        CommandDescriptor::new(
            "setprefix",
            Arc::new(SetPrefix {
                preferences: ctx.preferences.clone(),
            }),
        )
        .usage("<prefix>"),
    ];

    // Only available when an owner is configured
    if let Some(owner_id) = ctx.owner_id {
        commands.push(
            CommandDescriptor::new(
                "shutdown",
                Arc::new(Shutdown {
                    signal: Arc::clone(&ctx.shutdown),
                }),
            )
            .guard(Guard::OwnerOnly(owner_id)),
        );
    }

    Ok(commands)
}

struct Ping;

#[async_trait]
impl CommandHandler for Ping {
    async fn invoke(&self, _invocation: &CommandInvocation) -> Result<Option<Reply>, CommandError> {
        Ok(Some(Reply::new("Pong!")))
    }
}

struct Choose;

#[async_trait]
impl CommandHandler for Choose {
    async fn invoke(&self, invocation: &CommandInvocation) -> Result<Option<Reply>, CommandError> {
        if invocation.args.is_empty() {
            return Err(CommandError::missing_argument("items"));
        }

        let index = rand::thread_rng().gen_range(0..invocation.args.len());
        Ok(Some(Reply::new(invocation.args[index].clone())))
    }
}

struct Info {
    counters: Arc<UsageCounters>,
    started_at: DateTime<Utc>,
    shard_count: u32,
}

#[async_trait]
impl CommandHandler for Info {
    async fn invoke(&self, _invocation: &CommandInvocation) -> Result<Option<Reply>, CommandError> {
        let uptime = Utc::now().signed_duration_since(self.started_at);
        let content = format!(
            "Uptime: {}d {}h {}m\nShards: {}\nMessages read: {}\nCommands used: {}",
            uptime.num_days(),
            uptime.num_hours() % 24,
            uptime.num_minutes() % 60,
            self.shard_count,
            self.counters.get(MESSAGES_READ),
            self.counters.get(COMMANDS_USED),
        );
        Ok(Some(Reply::new(content)))
    }
}

struct SetLang {
    preferences: PreferenceStore,
}

#[async_trait]
impl CommandHandler for SetLang {
    async fn invoke(&self, invocation: &CommandInvocation) -> Result<Option<Reply>, CommandError> {
        let Some(lang) = invocation.arg(0) else {
            return Err(CommandError::missing_argument("language"));
        };

        if !LANGUAGES.contains(&lang) {
            return Err(CommandError::bad_argument(format!(
                "unknown language, pick one of: {}",
                LANGUAGES.join(", ")
            )));
        }

        self.preferences
            .set_language(invocation.author_id, lang)
            .await
            .map_err(CommandError::internal)?;

        Ok(Some(Reply::new(format!("Language set to `{lang}`."))))
    }
}

struct SetPrefix {
    preferences: PreferenceStore,
}

#[async_trait]
impl CommandHandler for SetPrefix {
    async fn invoke(&self, invocation: &CommandInvocation) -> Result<Option<Reply>, CommandError> {
        let Some(prefix) = invocation.arg(0) else {
            return Err(CommandError::missing_argument("prefix"));
        };

        if prefix.len() > MAX_PREFIX_LEN {
            return Err(CommandError::bad_argument(format!(
                "prefix must be at most {MAX_PREFIX_LEN} characters"
            )));
        }

        self.preferences
            .set_prefix(invocation.author_id, prefix)
            .await
            .map_err(CommandError::internal)?;

        Ok(Some(Reply::new(format!(
            "Prefix set to `{prefix}`. The default prefixes still work."
        ))))
    }
}

struct Shutdown {
    signal: Arc<Notify>,
}

#[async_trait]
impl CommandHandler for Shutdown {
    async fn invoke(&self, invocation: &CommandInvocation) -> Result<Option<Reply>, CommandError> {
        tracing::warn!(author_id = %invocation.author_id, "Shutdown requested by owner");
        self.signal.notify_waiters();
        Ok(Some(Reply::new("Shutting down.")))
    }
}
