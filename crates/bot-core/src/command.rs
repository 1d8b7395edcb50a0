//! Command metadata and invocations
//!
//! A `CommandDescriptor` is registered once at startup and never mutated;
//! a `CommandInvocation` is created per matched message and discarded after
//! the handler completes.

use crate::ids::Snowflake;
use crate::traits::CommandHandler;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A parsed command invocation, created per matched event
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    /// User who invoked the command
    pub author_id: Snowflake,
    /// Channel the invocation was posted in
    pub channel_id: Snowflake,
    /// Guild context (None in direct messages)
    pub guild_id: Option<Snowflake>,
    /// Resolved canonical command name
    pub command_name: String,
    /// Arguments, whitespace-tokenized, order preserved
    pub args: Vec<String>,
}

impl CommandInvocation {
    /// Argument at position `index`, if present
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Whether the invocation happened inside a guild
    #[must_use]
    pub fn in_guild(&self) -> bool {
        self.guild_id.is_some()
    }
}

/// Which key a cooldown bucket is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    /// One bucket per invoking user
    User,
    /// One bucket per channel
    Channel,
    /// One bucket per guild (falls back to the channel in direct messages)
    Guild,
}

/// Rate-limit policy for a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    /// Executions allowed per window
    pub rate: u32,
    /// Window length
    pub per: Duration,
    /// Bucket key scope
    pub bucket: BucketKind,
}

impl CooldownPolicy {
    /// Per-user cooldown of `rate` executions per `per_secs` seconds
    #[must_use]
    pub const fn per_user(rate: u32, per_secs: u64) -> Self {
        Self {
            rate,
            per: Duration::from_secs(per_secs),
            bucket: BucketKind::User,
        }
    }

    /// Compute the bucket key for an invocation
    #[must_use]
    pub fn bucket_key(&self, invocation: &CommandInvocation) -> String {
        let scope = match self.bucket {
            BucketKind::User => invocation.author_id,
            BucketKind::Channel => invocation.channel_id,
            BucketKind::Guild => invocation.guild_id.unwrap_or(invocation.channel_id),
        };
        format!("{}:{}", scope, invocation.command_name)
    }
}

/// Reason a guard denied an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDenial {
    /// Invoker lacks permission for this command
    NotAllowed,
    /// Command is restricted to guild channels
    GuildOnly,
    /// Command is administratively disabled
    Disabled,
}

/// A boolean check gating command execution, evaluated in registration order
#[derive(Debug, Clone)]
pub enum Guard {
    /// Only usable inside a guild channel
    GuildOnly,
    /// Only usable by the configured owner
    OwnerOnly(Snowflake),
    /// Command is switched off
    Disabled,
}

impl Guard {
    /// Evaluate the guard against an invocation
    pub fn check(&self, invocation: &CommandInvocation) -> Result<(), GuardDenial> {
        match self {
            Self::GuildOnly => {
                if invocation.in_guild() {
                    Ok(())
                } else {
                    Err(GuardDenial::GuildOnly)
                }
            }
            Self::OwnerOnly(owner_id) => {
                if invocation.author_id == *owner_id {
                    Ok(())
                } else {
                    Err(GuardDenial::NotAllowed)
                }
            }
            Self::Disabled => Err(GuardDenial::Disabled),
        }
    }
}

/// An outbound reply produced by a command handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Message text
    pub content: String,
    /// Seconds after which the platform should delete the message
    pub delete_after: Option<u64>,
}

impl Reply {
    /// A plain reply
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            delete_after: None,
        }
    }

    /// A short-lived reply the platform deletes after `secs` seconds
    #[must_use]
    pub fn expiring(content: impl Into<String>, secs: u64) -> Self {
        Self {
            content: content.into(),
            delete_after: Some(secs),
        }
    }
}

/// Registered command metadata: name, aliases, cooldown, guards, handler
///
/// Immutable after registration; owned by the command registry.
#[derive(Clone)]
pub struct CommandDescriptor {
    /// Canonical command name
    pub canonical_name: String,
    /// Alternate names resolving to this command
    pub aliases: Vec<String>,
    /// Argument signature shown in help notices (e.g. `"choose <items...>"`)
    pub usage: Option<String>,
    /// Rate-limit policy
    pub cooldown: CooldownPolicy,
    /// Guards, evaluated in registration order
    pub guards: Vec<Guard>,
    /// Commands sharing this key never run concurrently (None = unconstrained)
    pub exclusion_key: Option<String>,
    /// The handler invoked on dispatch
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDescriptor {
    /// Start a descriptor with the default cooldown (1 per 3s per user)
    #[must_use]
    pub fn new(canonical_name: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            aliases: Vec::new(),
            usage: None,
            cooldown: CooldownPolicy::per_user(1, 3),
            guards: Vec::new(),
            exclusion_key: None,
            handler,
        }
    }

    /// Add an alias
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Set the argument signature shown in help notices
    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Override the cooldown policy
    #[must_use]
    pub fn cooldown(mut self, policy: CooldownPolicy) -> Self {
        self.cooldown = policy;
        self
    }

    /// Append a guard (evaluated in the order added)
    #[must_use]
    pub fn guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    /// Declare a mutual-exclusion key
    #[must_use]
    pub fn exclusive(mut self, key: impl Into<String>) -> Self {
        self.exclusion_key = Some(key.into());
        self
    }

    /// All tokens this descriptor answers to (canonical name first)
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("canonical_name", &self.canonical_name)
            .field("aliases", &self.aliases)
            .field("cooldown", &self.cooldown)
            .field("guards", &self.guards)
            .field("exclusion_key", &self.exclusion_key)
            .finish()
    }
}
