//! Prefix resolution
//!
//! Computes the accepted invocation prefixes for a user, per call. The
//! cache is consulted on every invocation so a prefix change takes effect
//! immediately; a failing cache degrades to the default set instead of
//! failing the invocation.

use bot_cache::PreferenceStore;
use bot_core::Snowflake;
use std::time::Duration;

/// Default prefixes accepted for every user
pub const DEFAULT_PREFIXES: [&str; 2] = ["n!", "N!"];
/// Fixed prefix used in the restricted debug mode
pub const DEBUG_PREFIX: &str = "n.";

/// Per-call prefix resolver
#[derive(Debug, Clone)]
pub struct PrefixResolver {
    preferences: PreferenceStore,
    /// Debug mode accepts only the development prefix
    debug: bool,
    /// Mention forms of the bot's own user, always accepted
    mention_forms: [String; 2],
    /// Bound on the cache read before degrading to defaults
    cache_timeout: Duration,
}

impl PrefixResolver {
    /// Default bound on the per-invocation cache read
    pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(250);

    /// Create a resolver for the given bot user
    #[must_use]
    pub fn new(preferences: PreferenceStore, bot_user_id: i64, debug: bool) -> Self {
        Self {
            preferences,
            debug,
            mention_forms: [format!("<@{bot_user_id}> "), format!("<@!{bot_user_id}> ")],
            cache_timeout: Self::DEFAULT_CACHE_TIMEOUT,
        }
    }

    /// Override the cache read bound
    #[must_use]
    pub fn with_cache_timeout(mut self, timeout: Duration) -> Self {
        self.cache_timeout = timeout;
        self
    }

    /// Compute the accepted prefixes for this author
    ///
    /// Debug mode: the development prefix only. Otherwise the user's custom
    /// prefix (when stored) supplements the defaults, never replaces them.
    /// The bot's mention forms are accepted in every branch, including when
    /// the cache read fails.
    pub async fn resolve(&self, author_id: Snowflake) -> Vec<String> {
        let mut prefixes: Vec<String> = Vec::with_capacity(5);

        if self.debug {
            prefixes.push(DEBUG_PREFIX.to_string());
        } else {
            match tokio::time::timeout(self.cache_timeout, self.preferences.prefix(author_id))
                .await
            {
                Ok(Ok(Some(custom))) => {
                    prefixes.push(custom);
                    prefixes.extend(DEFAULT_PREFIXES.iter().map(ToString::to_string));
                }
                Ok(Ok(None)) => {
                    prefixes.extend(DEFAULT_PREFIXES.iter().map(ToString::to_string));
                }
                Ok(Err(e)) => {
                    tracing::debug!(
                        author_id = %author_id,
                        error = %e,
                        "Prefix read failed, using defaults"
                    );
                    prefixes.extend(DEFAULT_PREFIXES.iter().map(ToString::to_string));
                }
                Err(_) => {
                    tracing::debug!(
                        author_id = %author_id,
                        "Prefix read timed out, using defaults"
                    );
                    prefixes.extend(DEFAULT_PREFIXES.iter().map(ToString::to_string));
                }
            }
        }

        prefixes.extend(self.mention_forms.iter().cloned());
        prefixes
    }
}

/// Length of the longest accepted prefix that `content` starts with
///
/// Case-sensitive exact match; when several accepted prefixes match the
/// same message, the longest one wins.
#[must_use]
pub fn longest_match(prefixes: &[String], content: &str) -> Option<usize> {
    prefixes
        .iter()
        .filter(|prefix| !prefix.is_empty() && content.starts_with(prefix.as_str()))
        .map(String::len)
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bot_cache::{FailMode, MemoryCache, PreferenceStore};
    use std::sync::Arc;

    fn resolver(cache: Arc<MemoryCache>, debug: bool) -> PrefixResolver {
        PrefixResolver::new(PreferenceStore::new(cache), 999, debug)
    }

    #[tokio::test]
    async fn test_defaults_when_no_custom_prefix() {
        let cache = Arc::new(MemoryCache::new());
        let prefixes = resolver(cache, false).resolve(Snowflake::new(123)).await;

        assert!(prefixes.contains(&"n!".to_string()));
        assert!(prefixes.contains(&"N!".to_string()));
        assert!(prefixes.contains(&"<@999> ".to_string()));
        assert!(prefixes.contains(&"<@!999> ".to_string()));
        assert_eq!(prefixes.len(), 4);
    }

    #[tokio::test]
    async fn test_custom_prefix_supplements_defaults() {
        let cache = Arc::new(MemoryCache::new());
        let store = PreferenceStore::new(Arc::clone(&cache) as _);
        store.set_prefix(Snowflake::new(123), "$").await.unwrap();

        let prefixes = resolver(cache, false).resolve(Snowflake::new(123)).await;

        // The custom prefix never replaces the defaults
        assert!(prefixes.contains(&"$".to_string()));
        assert!(prefixes.contains(&"n!".to_string()));
        assert!(prefixes.contains(&"N!".to_string()));
        assert_eq!(prefixes.len(), 5);
    }

    #[tokio::test]
    async fn test_debug_mode_uses_development_prefix_only() {
        let cache = Arc::new(MemoryCache::new());
        let store = PreferenceStore::new(Arc::clone(&cache) as _);
        store.set_prefix(Snowflake::new(123), "$").await.unwrap();

        let prefixes = resolver(cache, true).resolve(Snowflake::new(123)).await;

        assert!(prefixes.contains(&"n.".to_string()));
        assert!(!prefixes.contains(&"$".to_string()));
        assert!(!prefixes.contains(&"n!".to_string()));
        // Mention forms are still accepted
        assert!(prefixes.contains(&"<@999> ".to_string()));
    }

    #[tokio::test]
    async fn test_cache_failure_degrades_to_defaults() {
        let cache = Arc::new(MemoryCache::new());
        cache.set_fail_mode(Some(FailMode::Unavailable));

        let prefixes = resolver(cache, false).resolve(Snowflake::new(123)).await;

        assert!(prefixes.contains(&"n!".to_string()));
        assert!(prefixes.contains(&"<@999> ".to_string()));
    }

    #[test]
    fn test_longest_match_wins() {
        let prefixes = vec!["n!".to_string(), "n!mega".to_string(), "N!".to_string()];
        assert_eq!(longest_match(&prefixes, "n!megaping"), Some(6));
        assert_eq!(longest_match(&prefixes, "n!ping"), Some(2));
        assert_eq!(longest_match(&prefixes, "N!ping"), Some(2));
        assert_eq!(longest_match(&prefixes, "!ping"), None);
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let prefixes = vec!["n!".to_string()];
        assert_eq!(longest_match(&prefixes, "N!ping"), None);
    }

    #[test]
    fn test_empty_prefix_never_matches() {
        let prefixes = vec![String::new()];
        assert_eq!(longest_match(&prefixes, "anything"), None);
    }
}
