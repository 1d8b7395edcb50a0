//! Command registry
//!
//! Maps command names and aliases to descriptors. Built once at startup,
//! immutable afterwards; shared behind an `Arc` with every worker.

use bot_core::CommandDescriptor;
use std::collections::HashMap;
use std::sync::Arc;

/// Registration failure
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate command name or alias: {0}")]
    DuplicateName(String),
}

/// Name/alias lookup table over registered commands
#[derive(Debug, Default)]
pub struct CommandRegistry {
    /// Canonical name to descriptor
    commands: HashMap<String, Arc<CommandDescriptor>>,
    /// Every accepted token (canonical names and aliases) to descriptor
    lookup: HashMap<String, Arc<CommandDescriptor>>,
}

impl CommandRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor
    ///
    /// Fails with `DuplicateName` if the canonical name or any alias
    /// collides with an existing entry; on failure nothing is overwritten
    /// and the registry is unchanged.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        // Validate every token before touching the maps
        for name in descriptor.all_names() {
            if self.lookup.contains_key(name) {
                return Err(RegistryError::DuplicateName(name.to_string()));
            }
        }

        let descriptor = Arc::new(descriptor);
        for name in descriptor.all_names() {
            self.lookup
                .insert(name.to_string(), Arc::clone(&descriptor));
        }
        self.commands
            .insert(descriptor.canonical_name.clone(), Arc::clone(&descriptor));

        tracing::debug!(
            command = %descriptor.canonical_name,
            aliases = ?descriptor.aliases,
            "Command registered"
        );

        Ok(())
    }

    /// Resolve a token (canonical name or alias), case-sensitive
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<Arc<CommandDescriptor>> {
        self.lookup.get(token).cloned()
    }

    /// Number of registered commands (aliases not counted)
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Canonical names, sorted
    #[must_use]
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bot_core::{CommandError, CommandHandler, CommandInvocation, Reply};

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

    fn descriptor(name: &str) -> CommandDescriptor {
        CommandDescriptor::new(name, Arc::new(NoopHandler))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = CommandRegistry::new();
        registry
            .register(descriptor("info").alias("version"))
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert!(registry.lookup("info").is_some());
        assert!(registry.lookup("version").is_some());
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut registry = CommandRegistry::new();
        registry.register(descriptor("ping")).unwrap();

        assert!(registry.lookup("ping").is_some());
        assert!(registry.lookup("Ping").is_none());
        assert!(registry.lookup("PING").is_none());
    }

    #[test]
    fn test_duplicate_canonical_name_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register(descriptor("ping")).unwrap();

        let err = registry.register(descriptor("ping")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(name) if name == "ping"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_overlapping_alias_rejected_without_overwrite() {
        let mut registry = CommandRegistry::new();
        registry
            .register(descriptor("info").alias("version"))
            .unwrap();

        // Colliding alias: rejected, and the original survives intact
        let err = registry
            .register(descriptor("about").alias("version"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName(name) if name == "version"));

        let resolved = registry.lookup("version").unwrap();
        assert_eq!(resolved.canonical_name, "info");
        // The rejected descriptor left no partial entries behind
        assert!(registry.lookup("about").is_none());
    }

    #[test]
    fn test_command_names_sorted() {
        let mut registry = CommandRegistry::new();
        registry.register(descriptor("ping")).unwrap();
        registry.register(descriptor("choose")).unwrap();

        assert_eq!(registry.command_names(), vec!["choose", "ping"]);
    }
}
