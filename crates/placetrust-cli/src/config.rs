//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use placetrust_engine::EngineConfig;
use placetrust_sources::http_scorer::DEFAULT_ENDPOINT;
use placetrust_sources::places::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name
    #[serde(default = "default_profile")]
    pub active_profile: String,

    /// Available profiles
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Scoring engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Endpoint and storage profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Places provider base URL
    #[serde(default = "default_places_url")]
    pub places_url: String,

    /// Places provider API key (PLACES_API_KEY takes precedence)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Sentiment service endpoint
    #[serde(default = "default_scorer_url")]
    pub scorer_url: String,

    /// SQLite database path
    #[serde(default = "default_database")]
    pub database: String,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load configuration from a specific file, or defaults if absent.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the active profile.
    pub fn get_active_profile(&self) -> Result<&Profile> {
        self.profiles
            .get(&self.active_profile)
            .ok_or_else(|| CliError::Config(format!("Profile '{}' not found", self.active_profile)))
    }

    /// Add or update a profile.
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Switch to a different profile.
    pub fn switch_profile(&mut self, name: String) -> Result<()> {
        if !self.profiles.contains_key(&name) {
            return Err(CliError::Config(format!("Profile '{}' does not exist", name)));
        }
        self.active_profile = name;
        Ok(())
    }
}

impl Profile {
    /// Resolve the API key, preferring an explicit (flag or env) value.
    pub fn resolve_api_key(&self, explicit: Option<&str>) -> Result<String> {
        explicit
            .map(str::to_string)
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                CliError::Config(
                    "No Places API key. Set PLACES_API_KEY or run 'placetrust profile set --api-key'"
                        .to_string(),
                )
            })
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert("default".to_string(), Profile::default());

        Self {
            active_profile: "default".to_string(),
            profiles,
            engine: EngineConfig::default(),
            settings: Settings::default(),
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            places_url: default_places_url(),
            api_key: None,
            scorer_url: default_scorer_url(),
            database: default_database(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
    Ok(home.join(".placetrust"))
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_places_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_scorer_url() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_database() -> String {
    config_dir()
        .map(|dir| dir.join("placetrust.db").to_string_lossy().into_owned())
        .unwrap_or_else(|_| "placetrust.db".to_string())
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}
