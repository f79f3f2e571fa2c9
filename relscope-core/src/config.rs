//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/relscope/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/relscope/` (~/.config/relscope/)
//! - Data: `$XDG_DATA_HOME/relscope/` (~/.local/share/relscope/)
//! - State/Logs: `$XDG_STATE_HOME/relscope/` (~/.local/state/relscope/)

use crate::error::{Error, Result};
use crate::types::AnalysisMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default transcript ceiling in characters; older content is cut first.
pub const DEFAULT_MAX_TRANSCRIPT_CHARS: usize = 3_000_000;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analyzer service configuration (required for `analyze`)
    #[serde(default)]
    pub llm: Option<LlmConfig>,

    /// Analysis request defaults
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LLM provider configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Provider type
    pub provider: LlmProvider,
    /// Model to use
    pub model: String,
    /// API endpoint (optional, uses default for provider)
    pub endpoint: Option<String>,
    /// API key (can also use env var)
    pub api_key: Option<String>,
    /// Whole-request timeout; deep analyses can take tens of seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    /// Output token ceiling for providers that require one
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

/// Supported LLM providers
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Ollama,
    Claude,
    OpenAI,
    Gemini,
}

impl LlmProvider {
    /// Returns the default endpoint for this provider
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "http://localhost:11434",
            LlmProvider::Claude => "https://api.anthropic.com",
            LlmProvider::OpenAI => "https://api.openai.com",
            LlmProvider::Gemini => "https://generativelanguage.googleapis.com",
        }
    }

    /// Environment variable consulted when no `api_key` is configured
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LlmProvider::Ollama => None,
            LlmProvider::Claude => Some("ANTHROPIC_API_KEY"),
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Gemini => Some("GEMINI_API_KEY"),
        }
    }
}

impl LlmConfig {
    /// Resolve the API key from config or the provider's env var.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            self.provider
                .api_key_env()
                .and_then(|var| std::env::var(var).ok())
        })
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(Error::Config("llm.model must not be empty".to_string()));
        }
        if self.provider.api_key_env().is_some() && self.resolve_api_key().is_none() {
            return Err(Error::Config(
                "llm.api_key (or provider env var) is required".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_llm_timeout() -> u64 {
    300
}

fn default_max_output_tokens() -> u32 {
    16_000
}

/// Analysis request defaults
#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    /// Transcripts longer than this keep only their most recent characters
    #[serde(default = "default_max_transcript_chars")]
    pub max_transcript_chars: usize,

    /// Mode used when the caller does not pick one
    #[serde(default)]
    pub default_mode: AnalysisMode,

    /// Replace participant names with "Person A" / "Person B"
    #[serde(default = "default_anonymize")]
    pub anonymize: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_transcript_chars: default_max_transcript_chars(),
            default_mode: AnalysisMode::default(),
            anonymize: default_anonymize(),
        }
    }
}

fn default_max_transcript_chars() -> usize {
    DEFAULT_MAX_TRANSCRIPT_CHARS
}

fn default_anonymize() -> bool {
    true
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// The analyzer configuration, or a configuration error naming the section.
    pub fn require_llm(&self) -> Result<&LlmConfig> {
        let llm = self.llm.as_ref().ok_or_else(|| {
            Error::Config(format!(
                "no [llm] section in {}; an analyzer service is required",
                Self::config_path().display()
            ))
        })?;
        llm.validate()?;
        Ok(llm)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/relscope/config.toml` (~/.config/relscope/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("relscope").join("config.toml")
    }

    /// Returns the data directory path (for report history)
    ///
    /// `$XDG_DATA_HOME/relscope/` (~/.local/share/relscope/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("relscope")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/relscope/` (~/.local/state/relscope/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("relscope")
    }

    /// Returns the history file path
    ///
    /// `$XDG_DATA_HOME/relscope/history.json`
    pub fn history_path() -> PathBuf {
        Self::data_dir().join("history.json")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/relscope/relscope.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("relscope.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.llm.is_none());
        assert_eq!(config.analysis.max_transcript_chars, 3_000_000);
        assert_eq!(config.analysis.default_mode, AnalysisMode::Quick);
        assert!(config.analysis.anonymize);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[llm]
provider = "gemini"
model = "gemini-2.5-flash"
api_key = "test-key"

[analysis]
max_transcript_chars = 500000
default_mode = "deep"
anonymize = false

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        let llm = config.llm.unwrap();
        assert_eq!(llm.provider, LlmProvider::Gemini);
        assert_eq!(llm.model, "gemini-2.5-flash");
        assert_eq!(llm.timeout_secs, 300);
        assert_eq!(llm.max_output_tokens, 16_000);
        assert!(llm.validate().is_ok());
        assert_eq!(config.analysis.max_transcript_chars, 500_000);
        assert_eq!(config.analysis.default_mode, AnalysisMode::Deep);
        assert!(!config.analysis.anonymize);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_llm_provider_endpoints() {
        assert_eq!(
            LlmProvider::Ollama.default_endpoint(),
            "http://localhost:11434"
        );
        assert_eq!(
            LlmProvider::Gemini.default_endpoint(),
            "https://generativelanguage.googleapis.com"
        );
        assert_eq!(LlmProvider::Ollama.api_key_env(), None);
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let llm = LlmConfig {
            provider: LlmProvider::Ollama,
            model: "llama3.2".to_string(),
            endpoint: None,
            api_key: None,
            timeout_secs: 30,
            max_output_tokens: 1000,
        };
        assert!(llm.validate().is_ok());

        let blank = LlmConfig {
            model: "  ".to_string(),
            ..llm
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_missing_llm_section_is_config_error() {
        let config = Config::default();
        assert!(matches!(config.require_llm(), Err(Error::Config(_))));
    }
}
