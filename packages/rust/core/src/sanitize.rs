//! Search-term sanitizing.
//!
//! Topic labels carry dates and notes that never appear verbatim in the
//! corpus (`Flannery O'Connor (1925-1964)`). The generator rewrites each label
//! into a searchable term. Results are memoized for the run and can be
//! persisted across runs in a [`TermCache`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use quizcards_shared::{QuizcardsError, Result, normalize_text};

use crate::generation::TextGenerator;
use crate::prompt::render_template;

const SANITIZE_TEMPLATE: &str = include_str!("../prompts/sanitize_term.md");

/// Cache key used when no explicit model is configured.
const DEFAULT_MODEL_KEY: &str = "default";

const TERM_CACHE_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Persistent cache
// ---------------------------------------------------------------------------

/// Sanitized terms keyed by model, then by original label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermCache {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    models: BTreeMap<String, BTreeMap<String, String>>,
}

fn default_schema_version() -> u32 {
    TERM_CACHE_SCHEMA_VERSION
}

impl Default for TermCache {
    fn default() -> Self {
        Self {
            schema_version: TERM_CACHE_SCHEMA_VERSION,
            models: BTreeMap::new(),
        }
    }
}

impl TermCache {
    /// Load a cache file. A missing file gives an empty cache; an unreadable
    /// one is logged and replaced by an empty cache.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "term cache not found, starting empty");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| QuizcardsError::io(path, e))?;
        match serde_json::from_str::<Self>(&content) {
            Ok(cache) => {
                debug!(path = %path.display(), entries = cache.len(), "loaded term cache");
                Ok(cache)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable term cache");
                Ok(Self::default())
            }
        }
    }

    /// Write the cache atomically (temp file, then rename).
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| QuizcardsError::io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| {
            QuizcardsError::validation(format!("JSON serialization failed: {e}"))
        })?;

        let temp = path.with_extension("json.tmp");
        std::fs::write(&temp, json).map_err(|e| QuizcardsError::io(&temp, e))?;
        std::fs::rename(&temp, path).map_err(|e| QuizcardsError::io(path, e))?;

        info!(path = %path.display(), entries = self.len(), "saved term cache");
        Ok(())
    }

    pub fn get(&self, model: &str, label: &str) -> Option<&str> {
        self.models
            .get(model)
            .and_then(|terms| terms.get(label))
            .map(String::as_str)
    }

    pub fn insert(&mut self, model: &str, label: &str, term: &str) {
        self.models
            .entry(model.to_string())
            .or_default()
            .insert(label.to_string(), term.to_string());
    }

    /// Total number of cached terms across all models.
    pub fn len(&self) -> usize {
        self.models.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Sanitizer
// ---------------------------------------------------------------------------

/// Rewrites topic labels into search terms, at most one generation call per
/// distinct label.
#[derive(Debug, Default)]
pub struct TermSanitizer {
    model: Option<String>,
    memo: HashMap<String, String>,
    persisted: Option<TermCache>,
    calls: usize,
}

impl TermSanitizer {
    pub fn new(model: Option<String>) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    /// Sanitizer backed by a persistent cache.
    pub fn with_cache(model: Option<String>, cache: TermCache) -> Self {
        Self {
            model,
            persisted: Some(cache),
            ..Self::default()
        }
    }

    /// Return the search term for `label`, asking the generator only on a miss.
    ///
    /// Failed calls are not memoized, so a later occurrence retries.
    pub async fn sanitize<G: TextGenerator>(&mut self, generator: &G, label: &str) -> Result<String> {
        if let Some(term) = self.memo.get(label) {
            return Ok(term.clone());
        }

        let model_key = self.model.as_deref().unwrap_or(DEFAULT_MODEL_KEY);
        if let Some(term) = self.persisted.as_ref().and_then(|c| c.get(model_key, label)) {
            debug!(label, term, "term cache hit");
            let term = term.to_string();
            self.memo.insert(label.to_string(), term.clone());
            return Ok(term);
        }

        let prompt = sanitize_prompt(label)?;
        let reply = generator.generate(&prompt, self.model.as_deref()).await?;
        self.calls += 1;

        let term = clean_reply(&reply, label);
        debug!(label, term = %term, "sanitized search term");

        if let Some(cache) = self.persisted.as_mut() {
            cache.insert(model_key, label, &term);
        }
        self.memo.insert(label.to_string(), term.clone());

        Ok(term)
    }

    /// Generation calls made so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Distinct labels resolved so far.
    pub fn memoized(&self) -> usize {
        self.memo.len()
    }

    pub fn cache(&self) -> Option<&TermCache> {
        self.persisted.as_ref()
    }
}

/// Fill the sanitize prompt for one label.
pub fn sanitize_prompt(label: &str) -> Result<String> {
    let values = HashMap::from([("term", label.to_string())]);
    render_template(SANITIZE_TEMPLATE, &values)
}

/// Reduce a raw sanitize reply to a bare term, falling back to the label.
pub fn clean_reply(reply: &str, label: &str) -> String {
    let stripped = reply.replace("<term>", "").replace("</term>", "");
    let mut term = stripped.trim();

    for (open, close) in [('"', '"'), ('\'', '\''), ('`', '`'), ('\u{201C}', '\u{201D}')] {
        if term.len() > 1 && term.starts_with(open) && term.ends_with(close) {
            term = term[open.len_utf8()..term.len() - close.len_utf8()].trim();
        }
    }

    let term = normalize_text(term);
    if term.is_empty() {
        normalize_text(label)
    } else {
        term
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::ScriptedGenerator;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("qc-sanitize-test-{tag}-{}", uuid::Uuid::now_v7()))
            .join("term-cache.json")
    }

    #[test]
    fn prompt_wraps_label_in_term_tags() {
        let prompt = sanitize_prompt("Flannery O'Connor (1925-1964)").unwrap();
        assert!(prompt.ends_with("<term>Flannery O'Connor (1925-1964)</term>\n"));
    }

    #[test]
    fn clean_reply_strips_wrapping() {
        assert_eq!(clean_reply("  \"Carmen\"\n", "x"), "Carmen");
        assert_eq!(clean_reply("<term>Macondo</term>", "x"), "Macondo");
        assert_eq!(clean_reply("\u{201C}Borges\u{201D}", "x"), "Borges");
        assert_eq!(clean_reply("O'Connor", "x"), "O'Connor");
    }

    #[test]
    fn empty_reply_falls_back_to_label() {
        assert_eq!(clean_reply("   ", "Jorge Luis Borges"), "Jorge Luis Borges");
        assert_eq!(clean_reply("\"\"", "Borges"), "Borges");
    }

    #[tokio::test]
    async fn repeated_label_calls_generator_once() {
        let generator = ScriptedGenerator::new(|_: &str| Ok("Flannery O'Connor".to_string()));
        let mut sanitizer = TermSanitizer::new(Some("test-model".into()));

        let label = "Flannery O'Connor (1925-1964)";
        let first = sanitizer.sanitize(&generator, label).await.unwrap();
        let second = sanitizer.sanitize(&generator, label).await.unwrap();

        assert_eq!(first, "Flannery O'Connor");
        assert_eq!(first, second);
        assert_eq!(generator.call_count(), 1);
        assert_eq!(sanitizer.calls(), 1);

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls[0].1.as_deref(), Some("test-model"));
    }

    #[tokio::test]
    async fn failures_are_not_memoized() {
        let generator = ScriptedGenerator::new(|_: &str| {
            Err(QuizcardsError::Generation("HTTP 500".into()))
        });
        let mut sanitizer = TermSanitizer::new(None);

        assert!(sanitizer.sanitize(&generator, "Carmen").await.is_err());
        assert!(sanitizer.sanitize(&generator, "Carmen").await.is_err());
        assert_eq!(generator.call_count(), 2);
        assert_eq!(sanitizer.memoized(), 0);
    }

    #[tokio::test]
    async fn persisted_cache_skips_generation() {
        let mut cache = TermCache::default();
        cache.insert("m", "Carmen (1875)", "Carmen");

        let generator = ScriptedGenerator::new(|_: &str| Ok("unused".to_string()));
        let mut sanitizer = TermSanitizer::with_cache(Some("m".into()), cache);

        let term = sanitizer.sanitize(&generator, "Carmen (1875)").await.unwrap();
        assert_eq!(term, "Carmen");
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn cache_is_keyed_by_model() {
        let mut cache = TermCache::default();
        cache.insert("other-model", "Carmen (1875)", "Carmen");

        let generator = ScriptedGenerator::new(|_: &str| Ok("Carmen opera".to_string()));
        let mut sanitizer = TermSanitizer::with_cache(Some("m".into()), cache);

        let term = sanitizer.sanitize(&generator, "Carmen (1875)").await.unwrap();
        assert_eq!(term, "Carmen opera");
        assert_eq!(generator.call_count(), 1);

        let cache = sanitizer.cache().unwrap();
        assert_eq!(cache.get("m", "Carmen (1875)"), Some("Carmen opera"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn cache_save_and_load() {
        let path = temp_path("roundtrip");
        let mut cache = TermCache::default();
        cache.insert("openai/gpt-4o-mini", "Jorge Luis Borges (1899-1986)", "Jorge Luis Borges");

        cache.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = TermCache::load(&path).unwrap();
        assert_eq!(
            loaded.get("openai/gpt-4o-mini", "Jorge Luis Borges (1899-1986)"),
            Some("Jorge Luis Borges")
        );

        if let Some(parent) = path.parent() {
            let _ = std::fs::remove_dir_all(parent);
        }
    }

    #[test]
    fn missing_or_corrupt_cache_loads_empty() {
        let path = temp_path("corrupt");
        assert!(TermCache::load(&path).unwrap().is_empty());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(TermCache::load(&path).unwrap().is_empty());

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
