//! Configuration loading, validation, and management for Murmur.
//!
//! Loads configuration from `~/.murmur/config.toml` with environment
//! variable overrides. Validates all settings at startup. Everything here is
//! consumed once, at construction time; nothing is re-read at runtime.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.murmur/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text-generation backend
    #[serde(default)]
    pub model: ModelConfig,

    /// Conversation memory settings
    #[serde(default)]
    pub session: SessionConfig,

    /// Daily transcript logs
    #[serde(default)]
    pub transcript: TranscriptConfig,

    /// Voice input and output
    #[serde(default)]
    pub speech: SpeechConfig,

    /// HTTP front-end
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// "local" for in-process GGUF inference, otherwise the name of an
    /// OpenAI-compatible completion server ("ollama", "llamacpp", "vllm", ...)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Preset alias, path to a `.gguf` file, or server-side model id
    #[serde(default = "default_model")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Maximum tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Abort a generation after this many seconds (unbounded when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_provider() -> String {
    "ollama".into()
}
fn default_model() -> String {
    "llama3.2".into()
}
fn default_max_tokens() -> u32 {
    256
}
fn default_temperature() -> f32 {
    0.7
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("name", &self.name)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            name: default_model(),
            api_url: None,
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Number of prior utterances included in each prompt
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Oldest utterances beyond this count are dropped (0 = keep everything)
    #[serde(default = "default_max_retained")]
    pub max_retained: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_path: Option<PathBuf>,
}

fn default_window_size() -> usize {
    20
}
fn default_max_retained() -> usize {
    1000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            max_retained: default_max_retained(),
            history_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Speak assistant replies aloud
    #[serde(default)]
    pub enabled: bool,

    /// Program + leading args for synthesis; the text is appended last
    #[serde(default = "default_tts_command")]
    pub tts_command: Vec<String>,

    /// Program + args that record one utterance and print its transcription
    #[serde(default)]
    pub stt_command: Vec<String>,

    /// Console keyword that switches the next turn to voice capture
    #[serde(default = "default_voice_keyword")]
    pub voice_keyword: String,

    /// Cancel the reply being spoken when a new one arrives
    #[serde(default = "default_true")]
    pub interrupt_previous: bool,
}

fn default_tts_command() -> Vec<String> {
    vec!["espeak".into()]
}
fn default_voice_keyword() -> String {
    "voice".into()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tts_command: default_tts_command(),
            stt_command: Vec::new(),
            voice_keyword: default_voice_keyword(),
            interrupt_previous: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.murmur/config.toml).
    ///
    /// Environment variables override file values:
    /// - `MURMUR_PROVIDER`, `MURMUR_MODEL`
    /// - `MURMUR_API_URL`, `MURMUR_API_KEY`
    /// - `MURMUR_WINDOW_SIZE`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup, then re-validate.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(provider) = lookup("MURMUR_PROVIDER") {
            self.model.provider = provider;
        }
        if let Some(model) = lookup("MURMUR_MODEL") {
            self.model.name = model;
        }
        if let Some(url) = lookup("MURMUR_API_URL") {
            self.model.api_url = Some(url);
        }
        if let Some(key) = lookup("MURMUR_API_KEY") {
            self.model.api_key = Some(key);
        }
        if let Some(window) = lookup("MURMUR_WINDOW_SIZE") {
            self.session.window_size = window.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "MURMUR_WINDOW_SIZE must be a non-negative integer, got '{window}'"
                ))
            })?;
        }
        self.validate()
    }

    /// Base directory for config, history, and logs.
    ///
    /// `MURMUR_HOME` wins; otherwise `~/.murmur`.
    pub fn home_dir() -> PathBuf {
        std::env::var("MURMUR_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| dirs_home().join(".murmur"))
    }

    pub fn config_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Resolved session history file.
    pub fn history_path(&self) -> PathBuf {
        self.session
            .history_path
            .clone()
            .unwrap_or_else(|| Self::home_dir().join("history.txt"))
    }

    /// Resolved transcript log directory.
    pub fn log_dir(&self) -> PathBuf {
        self.transcript
            .log_dir
            .clone()
            .unwrap_or_else(|| Self::home_dir().join("logs"))
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(ConfigError::ValidationError(
                "model.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.model.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "model.max_tokens must be > 0".into(),
            ));
        }

        if self.speech.enabled && self.speech.tts_command.is_empty() {
            return Err(ConfigError::ValidationError(
                "speech.tts_command must name a program when speech is enabled".into(),
            ));
        }

        if self.speech.voice_keyword.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "speech.voice_keyword must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
