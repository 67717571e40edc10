//! Application configuration for quizcards.
//!
//! User config lives at `~/.quizcards/quizcards.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{QuizcardsError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "quizcards.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".quizcards";

/// File name of the persisted search-term cache inside the config directory.
const TERM_CACHE_FILE_NAME: &str = "term-cache.json";

// ---------------------------------------------------------------------------
// Config structs (matching quizcards.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input data locations.
    #[serde(default)]
    pub data: DataConfig,

    /// Text-generation backend settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Search-term cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// `[data]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root directory holding `qbreader/` and `ygk/`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data".into()
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used when no `--model` flag is given.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            default_model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    /// Resolve the chat-completions endpoint from `base_url`.
    pub fn chat_completions_url(&self) -> Result<Url> {
        let base = if self.base_url.ends_with('/') {
            self.base_url.clone()
        } else {
            format!("{}/", self.base_url)
        };
        Url::parse(&base)
            .and_then(|u| u.join("chat/completions"))
            .map_err(|e| {
                QuizcardsError::config(format!("invalid base_url '{}': {e}", self.base_url))
            })
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        let var_name = &self.api_key_env;
        match std::env::var(var_name) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Err(QuizcardsError::config(format!(
                "API key not found. Set the {var_name} environment variable."
            ))),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_timeout_secs() -> u64 {
    120
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving the per-category CSV files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> String {
    "output".into()
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Keep sanitized search terms on disk between runs.
    #[serde(default = "default_true")]
    pub persist_terms: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persist_terms: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Data layout (runtime, resolved from config + CLI flags)
// ---------------------------------------------------------------------------

/// Resolved locations of the corpus tables and article documents.
#[derive(Debug, Clone)]
pub struct DataPaths {
    /// Root data directory.
    pub data_dir: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// JSON-lines table of single-question records.
    pub fn tossups_path(&self) -> PathBuf {
        self.data_dir.join("qbreader").join("tossups.json")
    }

    /// JSON-lines table of multi-part records.
    pub fn bonuses_path(&self) -> PathBuf {
        self.data_dir.join("qbreader").join("bonuses.json")
    }

    /// Directory of saved article pages.
    pub fn articles_dir(&self) -> PathBuf {
        self.data_dir.join("ygk")
    }

    /// Fail fast when the data directory or either corpus table is missing.
    pub fn validate(&self) -> Result<()> {
        if !self.data_dir.is_dir() {
            return Err(QuizcardsError::config(format!(
                "data directory not found: {}",
                self.data_dir.display()
            )));
        }
        for path in [self.tossups_path(), self.bonuses_path()] {
            if !path.is_file() {
                return Err(QuizcardsError::config(format!(
                    "corpus table not found: {}",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

impl From<&AppConfig> for DataPaths {
    fn from(config: &AppConfig) -> Self {
        Self::new(&config.data.data_dir)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.quizcards/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| QuizcardsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.quizcards/quizcards.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Get the path to the persisted search-term cache.
pub fn term_cache_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(TERM_CACHE_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| QuizcardsError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        QuizcardsError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| QuizcardsError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| QuizcardsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| QuizcardsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    config.generation.api_key().map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("data_dir"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.data.data_dir, "data");
        assert_eq!(parsed.generation.timeout_secs, 120);
        assert!(parsed.cache.persist_terms);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[generation]
default_model = "anthropic/claude-3.5-haiku"

[output]
output_dir = "/tmp/cards"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.generation.default_model, "anthropic/claude-3.5-haiku");
        assert_eq!(config.generation.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(config.output.output_dir, "/tmp/cards");
        assert_eq!(config.data.data_dir, "data");
    }

    #[test]
    fn chat_completions_url_joins_path() {
        let mut generation = GenerationConfig::default();
        assert_eq!(
            generation.chat_completions_url().unwrap().as_str(),
            "https://openrouter.ai/api/v1/chat/completions"
        );

        generation.base_url = "http://127.0.0.1:8080/v1/".into();
        assert_eq!(
            generation.chat_completions_url().unwrap().as_str(),
            "http://127.0.0.1:8080/v1/chat/completions"
        );

        generation.base_url = "not a url".into();
        assert!(generation.chat_completions_url().is_err());
    }

    #[test]
    fn data_paths_layout() {
        let paths = DataPaths::new("/srv/qb");
        assert_eq!(
            paths.tossups_path(),
            PathBuf::from("/srv/qb/qbreader/tossups.json")
        );
        assert_eq!(
            paths.bonuses_path(),
            PathBuf::from("/srv/qb/qbreader/bonuses.json")
        );
        assert_eq!(paths.articles_dir(), PathBuf::from("/srv/qb/ygk"));
    }

    #[test]
    fn data_paths_validate_missing_dir() {
        let paths = DataPaths::new("/definitely/not/a/quizcards/dir");
        let err = paths.validate().unwrap_err();
        assert!(err.to_string().contains("data directory not found"));
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.generation.api_key_env = "QC_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
