//! Configuration loading, validation, and management for Switchyard.
//!
//! Loads configuration from `~/.switchyard/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the only resolution policy shipped with the engine.
pub const RANK_SUM_POLICY: &str = "rank_sum";

/// The root configuration structure.
///
/// Maps directly to `~/.switchyard/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where profile documents come from
    #[serde(default)]
    pub profiles: ProfilesConfig,

    /// Request classification thresholds
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Preference resolution policy
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilesConfig {
    /// Directory scanned for `*.toml` / `*.json` profile documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Load the built-in backend/frontend catalog (default: true)
    #[serde(default = "default_true")]
    pub builtin: bool,

    /// Additional profile documents (absolute paths)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ProfilesConfig {
    fn default() -> Self {
        Self {
            dir: None,
            builtin: true,
            files: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Requests whose best score is below this fail as ambiguous
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Profiles within this distance of the top score are co-primary
    #[serde(default = "default_tie_threshold")]
    pub tie_threshold: f64,
}

fn default_min_confidence() -> f64 {
    0.1
}
fn default_tie_threshold() -> f64 {
    0.05
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            tie_threshold: default_tie_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_policy")]
    pub policy: String,
}

fn default_policy() -> String {
    RANK_SUM_POLICY.into()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
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
    42680
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
    /// Load configuration from the default path (~/.switchyard/config.toml).
    ///
    /// Environment variables override file values:
    /// - `SWITCHYARD_PROFILES_DIR`
    /// - `SWITCHYARD_MIN_CONFIDENCE`
    /// - `SWITCHYARD_TIE_THRESHOLD`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
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

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(dir) = lookup("SWITCHYARD_PROFILES_DIR") {
            self.profiles.dir = Some(dir);
        }
        if let Some(raw) = lookup("SWITCHYARD_MIN_CONFIDENCE") {
            self.classifier.min_confidence = parse_override("SWITCHYARD_MIN_CONFIDENCE", &raw)?;
        }
        if let Some(raw) = lookup("SWITCHYARD_TIE_THRESHOLD") {
            self.classifier.tie_threshold = parse_override("SWITCHYARD_TIE_THRESHOLD", &raw)?;
        }
        self.validate()
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".switchyard")
    }

    /// Default directory for user profile documents.
    pub fn profiles_dir() -> PathBuf {
        Self::config_dir().join("profiles")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let min = self.classifier.min_confidence;
        if !(0.0..=1.0).contains(&min) {
            return Err(ConfigError::ValidationError(
                "classifier.min_confidence must be between 0.0 and 1.0".into(),
            ));
        }

        let tie = self.classifier.tie_threshold;
        if !(0.0..1.0).contains(&tie) {
            return Err(ConfigError::ValidationError(
                "classifier.tie_threshold must be in [0.0, 1.0)".into(),
            ));
        }

        if self.resolver.policy != RANK_SUM_POLICY {
            return Err(ConfigError::ValidationError(format!(
                "unknown resolver.policy '{}' (supported: {RANK_SUM_POLICY})",
                self.resolver.policy
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_override(key: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim().parse::<f64>().map_err(|_| {
        ConfigError::ValidationError(format!("{key} must be a number, got '{raw}'"))
    })
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
