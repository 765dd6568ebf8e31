//! Refiner configuration types and loading

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::domain::{Complexity, FocusArea, MAX_FOCUS_WEIGHT, OutputFormat, OutputStyle, Preferences};
use crate::retry::RetryPolicy;

/// Main Refiner configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Retry policy for transient failures
    pub retry: RetryConfig,

    /// Session preferences
    pub session: SessionConfig,

    /// History storage
    pub storage: StorageConfig,

    /// Event recording
    pub telemetry: TelemetryConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Call this early in startup to fail fast with clear error messages.
    pub fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            bail!("llm.model must not be empty");
        }
        if self.retry.max_attempts == 0 {
            bail!("retry.max-attempts must be at least 1");
        }
        if self.retry.backoff_factor < 1.0 {
            bail!("retry.backoff-factor must be >= 1.0 (got {})", self.retry.backoff_factor);
        }
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            bail!(
                "retry.max-delay-ms ({}) must not be below retry.base-delay-ms ({})",
                self.retry.max_delay_ms,
                self.retry.base_delay_ms
            );
        }
        if self.session.max_rounds == 0 {
            bail!("session.max-rounds must be at least 1");
        }
        if let Some(area) = self.session.focus_areas.iter().find(|a| a.weight > MAX_FOCUS_WEIGHT) {
            bail!(
                "session.focus-areas: weight of '{}' is {} (max {})",
                area.id,
                area.weight,
                MAX_FOCUS_WEIGHT
            );
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .refiner.yml
        let local_config = PathBuf::from(".refiner.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/refiner/refiner.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("refiner").join("refiner.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name (currently only "gemini" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// File containing the API key, used when the variable is unset
    #[serde(rename = "api-key-file", skip_serializing_if = "Option::is_none")]
    pub api_key_file: Option<PathBuf>,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-output-tokens")]
    pub max_output_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-2.5-pro".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            api_key_file: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            max_output_tokens: 8192,
            timeout_ms: 120_000,
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first
    #[serde(rename = "max-attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt
    #[serde(rename = "base-delay-ms")]
    pub base_delay_ms: u64,

    /// Multiplier applied per further attempt
    #[serde(rename = "backoff-factor")]
    pub backoff_factor: f64,

    /// Upper bound for any single delay
    #[serde(rename = "max-delay-ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            backoff_factor: 2.0,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            backoff_factor: self.backoff_factor,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Session preference configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Rounds after which the model is told to finish
    #[serde(rename = "max-rounds")]
    pub max_rounds: u32,

    pub complexity: Complexity,

    pub style: OutputStyle,

    pub format: OutputFormat,

    /// Technologies selected by default
    pub stacks: Vec<String>,

    #[serde(rename = "focus-areas")]
    pub focus_areas: Vec<FocusArea>,

    /// Replaces the built-in base system instruction
    #[serde(rename = "base-instruction", skip_serializing_if = "Option::is_none")]
    pub base_instruction: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let prefs = Preferences::default();
        Self {
            max_rounds: prefs.max_rounds,
            complexity: prefs.complexity,
            style: prefs.style,
            format: prefs.format,
            stacks: Vec::new(),
            focus_areas: prefs.focus_areas,
            base_instruction: None,
        }
    }
}

impl SessionConfig {
    pub fn preferences(&self) -> Preferences {
        Preferences {
            max_rounds: self.max_rounds,
            complexity: self.complexity,
            style: self.style,
            format: self.format,
            stacks: self.stacks.iter().cloned().collect::<BTreeSet<_>>(),
            focus_areas: self.focus_areas.clone(),
        }
    }
}

/// History storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding completed refinements
    #[serde(rename = "history-path")]
    pub history_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_path: data_dir().join("history.json"),
        }
    }
}

/// Event recording configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Write orchestration events to JSONL files
    pub enabled: bool,

    /// Directory for per-session event logs
    #[serde(rename = "events-dir")]
    pub events_dir: PathBuf,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            events_dir: data_dir().join("events"),
        }
    }
}

/// XDG data directory (~/.local/share/refiner on Linux)
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("refiner"))
        .unwrap_or_else(|| PathBuf::from(".refiner"))
}
