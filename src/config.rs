//! Context Configuration
//!
//! Token reservations and compression knobs, injected into the compressor
//! instead of living as process-wide constants.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Total context window assumed for the LLM call
pub const DEFAULT_MAX_TOKENS: u32 = 128_000;
/// Reserved for the system prompt
pub const DEFAULT_MAX_SYSTEM_TOKENS: u32 = 2_000;
/// Reserved for prior conversation turns
pub const DEFAULT_MAX_HISTORY_TOKENS: u32 = 3_000;
/// Reserved for the model's reply
pub const DEFAULT_MAX_RESPONSE_TOKENS: u32 = 4_000;
/// Floor on the per-document allocation
pub const DEFAULT_MIN_TOKENS_PER_DOC: u32 = 5_000;
/// Share of a document budget filled with whole sections (rest goes to summaries)
pub const DEFAULT_SUMMARY_THRESHOLD: f64 = 0.8;
/// Sections above this estimate are split again on paragraphs
pub const DEFAULT_MAX_SECTION_TOKENS: u32 = 2_000;

/// Environment variable pointing at a config file
pub const CONFIG_ENV_VAR: &str = "RINGO_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config file not found: {0}")]
    NotFound(String),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl Serialize for ConfigError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextConfig {
    pub max_tokens: u32,
    pub max_system_tokens: u32,
    pub max_history_tokens: u32,
    pub max_response_tokens: u32,
    pub min_tokens_per_doc: u32,
    /// Fraction of the document budget reserved for whole sections (0, 1]
    pub summary_threshold: f64,
    pub max_section_tokens: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            max_system_tokens: DEFAULT_MAX_SYSTEM_TOKENS,
            max_history_tokens: DEFAULT_MAX_HISTORY_TOKENS,
            max_response_tokens: DEFAULT_MAX_RESPONSE_TOKENS,
            min_tokens_per_doc: DEFAULT_MIN_TOKENS_PER_DOC,
            summary_threshold: DEFAULT_SUMMARY_THRESHOLD,
            max_section_tokens: DEFAULT_MAX_SECTION_TOKENS,
        }
    }
}

impl ContextConfig {
    /// Tokens left for documents once system, history and response are reserved
    pub fn available_tokens(&self) -> u32 {
        self.max_tokens
            .saturating_sub(self.max_system_tokens)
            .saturating_sub(self.max_history_tokens)
            .saturating_sub(self.max_response_tokens)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("maxTokens must be positive".to_string()));
        }
        if !(self.summary_threshold > 0.0 && self.summary_threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "summaryThreshold must be in (0, 1], got {}",
                self.summary_threshold
            )));
        }
        if self.min_tokens_per_doc == 0 {
            return Err(ConfigError::Invalid("minTokensPerDoc must be positive".to_string()));
        }
        if self.max_section_tokens == 0 {
            return Err(ConfigError::Invalid("maxSectionTokens must be positive".to_string()));
        }
        Ok(())
    }

    /// Parse and validate a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let raw = fs::read_to_string(path)?;
        let config: ContextConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config: explicit path, then `$RINGO_CONFIG`, then the user
    /// config dir. Only the implicit default location may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            if !env_path.is_empty() {
                return Self::from_file(Path::new(&env_path));
            }
        }

        match default_config_path() {
            Some(default) if default.exists() => Self::from_file(&default),
            _ => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// `<config dir>/ringo/context.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ringo").join("context.json"))
}
