//! Per-user preference storage.
//!
//! The cache is the single source of truth for prefixes and languages; the
//! core performs short-lived reads per invocation and never holds a copy
//! across invocations.

use bot_core::{CacheResult, KeyValueCache, Snowflake};
use std::sync::Arc;

/// Key suffix for the custom prefix
const PREFIX_SUFFIX: &str = "-prefix";
/// Key suffix for the language preference
const LANG_SUFFIX: &str = "-lang";

/// Typed access to per-user preferences
#[derive(Clone)]
pub struct PreferenceStore {
    cache: Arc<dyn KeyValueCache>,
}

impl PreferenceStore {
    /// Create a store over any cache implementation
    #[must_use]
    pub fn new(cache: Arc<dyn KeyValueCache>) -> Self {
        Self { cache }
    }

    fn prefix_key(user_id: Snowflake) -> String {
        format!("{user_id}{PREFIX_SUFFIX}")
    }

    fn lang_key(user_id: Snowflake) -> String {
        format!("{user_id}{LANG_SUFFIX}")
    }

    /// Read a user's custom prefix, `None` when unset
    pub async fn prefix(&self, user_id: Snowflake) -> CacheResult<Option<String>> {
        self.cache.get(&Self::prefix_key(user_id)).await
    }

    /// Store a user's custom prefix
    pub async fn set_prefix(&self, user_id: Snowflake, prefix: &str) -> CacheResult<()> {
        self.cache.set(&Self::prefix_key(user_id), prefix).await?;

        tracing::debug!(user_id = %user_id, prefix = %prefix, "Stored custom prefix");
        Ok(())
    }

    /// Read a user's language preference, `None` when unset
    pub async fn language(&self, user_id: Snowflake) -> CacheResult<Option<String>> {
        self.cache.get(&Self::lang_key(user_id)).await
    }

    /// Store a user's language preference
    pub async fn set_language(&self, user_id: Snowflake, lang: &str) -> CacheResult<()> {
        self.cache.set(&Self::lang_key(user_id), lang).await?;

        tracing::debug!(user_id = %user_id, lang = %lang, "Stored language preference");
        Ok(())
    }
}

impl std::fmt::Debug for PreferenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreferenceStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCache;

    #[test]
    fn test_key_format() {
        let id = Snowflake::new(310_702_108_997_320_705);
        assert_eq!(
            PreferenceStore::prefix_key(id),
            "310702108997320705-prefix"
        );
        assert_eq!(PreferenceStore::lang_key(id), "310702108997320705-lang");
    }

    #[tokio::test]
    async fn test_prefix_roundtrip() {
        let store = PreferenceStore::new(Arc::new(MemoryCache::new()));
        let user = Snowflake::new(123);

        assert_eq!(store.prefix(user).await.unwrap(), None);
        store.set_prefix(user, "$").await.unwrap();
        assert_eq!(store.prefix(user).await.unwrap(), Some("$".to_string()));
    }

    #[tokio::test]
    async fn test_language_roundtrip() {
        let store = PreferenceStore::new(Arc::new(MemoryCache::new()));
        let user = Snowflake::new(123);

        store.set_language(user, "fr").await.unwrap();
        assert_eq!(store.language(user).await.unwrap(), Some("fr".to_string()));
    }
}
