//! Usage statistics command

use super::{ModuleContext, ModuleError};
use async_trait::async_trait;
use bot_core::{
    CommandDescriptor, CommandError, CommandHandler, CommandInvocation, CooldownPolicy, Guard,
    Reply,
};
use bot_dispatch::UsageCounters;
use std::fmt::Write as _;
use std::sync::Arc;

/// How many commands the leaderboard shows
const TOP_COMMANDS: usize = 10;

/// Build this module's command set
pub(super) fn commands(ctx: &ModuleContext) -> Result<Vec<CommandDescriptor>, ModuleError> {
    Ok(vec![CommandDescriptor::new(
        "stats",
        Arc::new(Stats {
            counters: Arc::clone(&ctx.counters),
        }),
    )
    .guard(Guard::GuildOnly)
    .cooldown(CooldownPolicy::per_user(1, 5))])
}

struct Stats {
    counters: Arc<UsageCounters>,
}

#[async_trait]
impl CommandHandler for Stats {
    async fn invoke(&self, _invocation: &CommandInvocation) -> Result<Option<Reply>, CommandError> {
        let snapshot = self.counters.command_usage_snapshot();
        if snapshot.is_empty() {
            return Ok(Some(Reply::new("No commands used yet.")));
        }

        let mut content = String::from("Most used commands:\n");
        for (name, count) in snapshot.iter().take(TOP_COMMANDS) {
            let _ = writeln!(content, "`{name}`: {count}");
        }
        Ok(Some(Reply::new(content.trim_end().to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bot_core::Snowflake;

    fn invocation() -> CommandInvocation {
        CommandInvocation {
            author_id: Snowflake::new(123),
            channel_id: Snowflake::new(456),
            guild_id: Some(Snowflake::new(789)),
            command_name: "stats".to_string(),
            args: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_empty_counters() {
        let handler = Stats {
            counters: Arc::new(UsageCounters::new()),
        };
        let reply = handler.invoke(&invocation()).await.unwrap().unwrap();
        assert_eq!(reply.content, "No commands used yet.");
    }

    #[tokio::test]
    async fn test_leaderboard_ordering() {
        let counters = Arc::new(UsageCounters::new());
        counters.incr_command("ping");
        counters.incr_command("choose");
        counters.incr_command("choose");

        let handler = Stats { counters };
        let reply = handler.invoke(&invocation()).await.unwrap().unwrap();

        let choose_pos = reply.content.find("`choose`: 2").unwrap();
        let ping_pos = reply.content.find("`ping`: 1").unwrap();
        assert!(choose_pos < ping_pos);
    }
}
