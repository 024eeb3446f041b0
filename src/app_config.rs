use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::translation::format::FormatKind;
use crate::translation::prompts::PromptTemplate;

/// Application configuration module
/// This module handles loading, validating and saving the settings consumed
/// by the translation engine. Everything the engine needs is carried in an
/// explicit `Config` value handed to the pipeline driver.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Chunking, concurrency and retry settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Format classification settings
    #[serde(default, alias = "protected_formats")]
    pub formats: FormatsConfig,

    /// Optional glossary file (JSON or YAML)
    #[serde(default)]
    pub glossary_path: Option<PathBuf>,

    /// Translation backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Settings of the chunking-and-reassembly engine
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Token budget of a single chunk
    #[serde(default = "default_max_chunk_tokens")]
    pub max_chunk_tokens: usize,

    /// Characters counted as one token by the default estimator
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    /// Maximum number of chunks translated concurrently within a file
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Maximum number of files processed concurrently
    #[serde(default = "default_file_concurrency")]
    pub file_concurrency: usize,

    /// Best-effort timeout of a single backend call in seconds (0 disables it)
    #[serde(default = "default_chunk_timeout_secs")]
    pub chunk_timeout_secs: u64,

    /// Retry count for failed backend calls
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Where an oversized sentence is cut
    #[serde(default)]
    pub hard_split: HardSplitPolicy,

    /// Whether identical chunks are translated only once per run
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: default_max_chunk_tokens(),
            chars_per_token: default_chars_per_token(),
            worker_count: default_worker_count(),
            file_concurrency: default_file_concurrency(),
            chunk_timeout_secs: default_chunk_timeout_secs(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            hard_split: HardSplitPolicy::default(),
            cache_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Timeout applied around every backend call
    pub fn chunk_timeout(&self) -> Option<Duration> {
        if self.chunk_timeout_secs > 0 {
            Some(Duration::from_secs(self.chunk_timeout_secs))
        } else {
            None
        }
    }
}

/// Boundary used when a single sentence exceeds the chunk budget
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HardSplitPolicy {
    /// Cut after the last whitespace that keeps the piece within budget
    #[default]
    Whitespace,
    /// Cut at the last character boundary that keeps the piece within budget
    CharBoundary,
}

/// Which parts of a source-code file are handed to the backend
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CodeMode {
    /// Comment bodies and prose-like string literals are translatable
    #[default]
    CommentsAndStrings,
    /// Only explicitly delimited documentation comments are translatable
    DocCommentsOnly,
}

/// What to do with a file whose extension has no profile
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFormatPolicy {
    /// Skip the file and report it as unsupported
    #[default]
    Skip,
    /// Copy the file through untouched
    Protect,
}

/// Per-extension tweak of the format lookup table
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct FormatOverride {
    /// Profile to use instead of the built-in one
    #[serde(default)]
    pub format: Option<FormatKind>,

    /// Treat the whole file as protected
    #[serde(default)]
    pub whole_file_protected: bool,

    /// Code mode for source-code profiles
    #[serde(default)]
    pub code_mode: Option<CodeMode>,
}

/// Format classification settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct FormatsConfig {
    /// Default code mode for source-code files
    #[serde(default)]
    pub code_mode: CodeMode,

    /// Handling of files with an unknown extension
    #[serde(default)]
    pub unknown_format: UnknownFormatPolicy,

    /// Overrides keyed by lowercase extension without the dot
    #[serde(default)]
    pub overrides: HashMap<String, FormatOverride>,
}

/// Settings of the bundled Ollama backend
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    /// Service endpoint URL
    #[serde(default = "default_ollama_endpoint")]
    pub endpoint: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// System prompt template
    /// Placeholders: {source_language}, {target_language}
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// HTTP timeout of a single request in seconds
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            endpoint: default_ollama_endpoint(),
            model: default_ollama_model(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            timeout_secs: default_backend_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching filter of the `log` facade
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "ar".to_string()
}

fn default_max_chunk_tokens() -> usize {
    2048
}

fn default_chars_per_token() -> usize {
    4
}

fn default_worker_count() -> usize {
    4
}

fn default_file_concurrency() -> usize {
    2
}

fn default_chunk_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_true() -> bool {
    true
}

fn default_temperature() -> f32 {
    0.3
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2".to_string()
}

fn default_backend_timeout_secs() -> u64 {
    300
}

fn default_system_prompt() -> String {
    PromptTemplate::DOC_TRANSLATOR.to_string()
}

impl Config {
    /// Load a configuration file, creating a default one when it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            log::warn!("Config file not found at {:?}, creating default config.", path);
            let config = Config::default();
            let config_json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize default config to JSON")?;
            std::fs::write(path, config_json)
                .with_context(|| format!("Failed to write default config to file: {:?}", path))?;
            Ok(config)
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::get_language_name(&self.source_language)?;
        crate::language_utils::get_language_name(&self.target_language)?;
        if crate::language_utils::language_codes_match(&self.source_language, &self.target_language) {
            return Err(anyhow!(
                "Source and target language are the same: {} / {}",
                self.source_language,
                self.target_language
            ));
        }

        if self.engine.max_chunk_tokens == 0 {
            return Err(anyhow!("max_chunk_tokens must be greater than 0"));
        }
        if self.engine.chars_per_token == 0 {
            return Err(anyhow!("chars_per_token must be greater than 0"));
        }
        if self.engine.worker_count == 0 {
            return Err(anyhow!("worker_count must be at least 1"));
        }
        if self.engine.file_concurrency == 0 {
            return Err(anyhow!("file_concurrency must be at least 1"));
        }
        for extension in self.formats.overrides.keys() {
            if extension.is_empty() || extension.starts_with('.') {
                return Err(anyhow!(
                    "Format override keys must be extensions without a dot, got {:?}",
                    extension
                ));
            }
        }
        if !(0.0..=1.0).contains(&self.backend.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 1.0"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            engine: EngineConfig::default(),
            formats: FormatsConfig::default(),
            glossary_path: None,
            backend: BackendConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
