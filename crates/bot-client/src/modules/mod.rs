//! Built-in command modules
//!
//! The registry is built once at startup from an explicit list of module
//! constructors. Each construction is wrapped in isolated error capture:
//! one failing module is logged and skipped, never aborting the others.

mod general;
mod stats;

use bot_cache::PreferenceStore;
use bot_core::{CommandDescriptor, Snowflake};
use bot_dispatch::{CommandRegistry, RegistryError, UsageCounters};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Notify;

/// Shared dependencies handed to every module constructor
#[derive(Clone)]
pub struct ModuleContext {
    /// Per-user preference store
    pub preferences: PreferenceStore,
    /// Process-wide usage counters
    pub counters: Arc<UsageCounters>,
    /// Process start time, for uptime display
    pub started_at: DateTime<Utc>,
    /// Total shard count, for the info command
    pub shard_count: u32,
    /// Bot owner, for owner-only guards
    pub owner_id: Option<Snowflake>,
    /// Fired by the shutdown command; the orchestrator listens
    pub shutdown: Arc<Notify>,
}

/// Failure constructing or registering a module
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("module construction failed: {0}")]
    Construction(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A module's entry point: build its command descriptors
pub type ModuleConstructor = fn(&ModuleContext) -> Result<Vec<CommandDescriptor>, ModuleError>;

/// The modules shipped with the bot
#[must_use]
pub fn default_modules() -> Vec<(&'static str, ModuleConstructor)> {
    vec![("general", general::commands), ("stats", stats::commands)]
}

/// Build the registry from the default module list
#[must_use]
pub fn build_registry(ctx: &ModuleContext) -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    load_modules(&mut registry, &default_modules(), ctx);
    registry
}

/// Load modules into a registry, isolating failures per module
///
/// Returns the number of modules that loaded successfully.
pub fn load_modules(
    registry: &mut CommandRegistry,
    modules: &[(&str, ModuleConstructor)],
    ctx: &ModuleContext,
) -> usize {
    let mut loaded = 0;

    for (name, constructor) in modules {
        match load_module(registry, constructor(ctx)) {
            Ok(count) => {
                tracing::info!(module = %name, commands = count, "Loaded module");
                loaded += 1;
            }
            Err(e) => {
                tracing::error!(module = %name, error = %e, "Failed to load module");
            }
        }
    }

    loaded
}

fn load_module(
    registry: &mut CommandRegistry,
    result: Result<Vec<CommandDescriptor>, ModuleError>,
) -> Result<usize, ModuleError> {
    let descriptors = result?;
    let count = descriptors.len();
    for descriptor in descriptors {
        registry.register(descriptor)?;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bot_cache::MemoryCache;
    use bot_core::{CommandError, CommandHandler, CommandInvocation, Reply};

    fn test_context() -> ModuleContext {
        ModuleContext {
            preferences: PreferenceStore::new(Arc::new(MemoryCache::new())),
            counters: Arc::new(UsageCounters::new()),
            started_at: Utc::now(),
            shard_count: 2,
            owner_id: Some(Snowflake::new(1)),
            shutdown: Arc::new(Notify::new()),
        }
    }

    struct NoopHandler;

    #[async_trait]
    impl CommandHandler for NoopHandler {
        async fn invoke(
            &self,
            _invocation: &CommandInvocation,
        ) -> Result<Option<Reply>, CommandError> {
            Ok(None)
        }
    }

    fn broken_module(_ctx: &ModuleContext) -> Result<Vec<CommandDescriptor>, ModuleError> {
        Err(ModuleError::Construction("missing api key".to_string()))
    }

    fn tiny_module(_ctx: &ModuleContext) -> Result<Vec<CommandDescriptor>, ModuleError> {
        Ok(vec![CommandDescriptor::new("tiny", Arc::new(NoopHandler))])
    }

    fn conflicting_module(_ctx: &ModuleContext) -> Result<Vec<CommandDescriptor>, ModuleError> {
        Ok(vec![CommandDescriptor::new("tiny", Arc::new(NoopHandler))])
    }

    #[test]
    fn test_default_modules_load() {
        let registry = build_registry(&test_context());
        assert!(registry.lookup("ping").is_some());
        assert!(registry.lookup("choose").is_some());
        assert!(registry.lookup("version").is_some()); // info alias
        assert!(registry.lookup("stats").is_some());
    }

    #[test]
    fn test_failing_module_does_not_abort_the_rest() {
        let mut registry = CommandRegistry::new();
        let modules: Vec<(&str, ModuleConstructor)> = vec![
            ("broken", broken_module),
            ("tiny", tiny_module),
        ];

        let loaded = load_modules(&mut registry, &modules, &test_context());

        assert_eq!(loaded, 1);
        assert!(registry.lookup("tiny").is_some());
    }

    #[test]
    fn test_registry_conflict_aborts_only_that_module() {
        let mut registry = CommandRegistry::new();
        let modules: Vec<(&str, ModuleConstructor)> = vec![
            ("tiny", tiny_module),
            ("conflicting", conflicting_module),
            ("general", general::commands),
        ];

        let loaded = load_modules(&mut registry, &modules, &test_context());

        // The conflicting module fails; tiny and general both survive
        assert_eq!(loaded, 2);
        assert_eq!(registry.lookup("tiny").unwrap().canonical_name, "tiny");
        assert!(registry.lookup("ping").is_some());
    }
}
