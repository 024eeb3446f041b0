/*!
 * Translation caching functionality.
 *
 * Identical masked chunks (same text, language pair and glossary hints) are
 * translated once per run and served from memory afterwards.
 */

use log::debug;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;

use crate::translation::glossary::GlossaryHints;

/// Digest identifying a backend request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey([u8; 32]);

impl CacheKey {
    fn new(text: &str, source_language: &str, target_language: &str, hints: &GlossaryHints) -> Self {
        let mut hasher = Sha256::new();
        for field in [text, source_language, target_language] {
            hasher.update(field.as_bytes());
            hasher.update([0u8]);
        }
        for term in &hints.terms {
            hasher.update(term.source.as_bytes());
            hasher.update([0x1f]);
            hasher.update(term.target.as_bytes());
            hasher.update([0u8]);
        }
        Self(hasher.finalize().into())
    }
}

/// Hit and miss counters of a cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Translation cache shared by the workers of a run
#[derive(Debug, Clone)]
pub struct TranslationCache {
    cache: Arc<RwLock<HashMap<CacheKey, String>>>,
    stats: Arc<RwLock<CacheStats>>,
    enabled: bool,
}

impl TranslationCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(RwLock::new(CacheStats::default())),
            enabled,
        }
    }

    /// Get a translation from the cache
    pub fn get(&self, text: &str, source_language: &str, target_language: &str, hints: &GlossaryHints) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let key = CacheKey::new(text, source_language, target_language, hints);
        let found = self.cache.read().get(&key).cloned();
        let mut stats = self.stats.write();
        match found {
            Some(translation) => {
                stats.hits += 1;
                debug!("Cache hit for '{}'", truncate_text(text, 30));
                Some(translation)
            }
            None => {
                stats.misses += 1;
                None
            }
        }
    }

    /// Store a translation in the cache
    pub fn store(&self, text: &str, source_language: &str, target_language: &str, hints: &GlossaryHints, translation: &str) {
        if !self.enabled {
            return;
        }
        let key = CacheKey::new(text, source_language, target_language, hints);
        self.cache.write().insert(key, translation.to_string());
    }

    pub fn stats(&self) -> CacheStats {
        *self.stats.read()
    }

    pub fn clear(&self) {
        self.cache.write().clear();
        *self.stats.write() = CacheStats::default();
        debug!("Translation cache cleared");
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
