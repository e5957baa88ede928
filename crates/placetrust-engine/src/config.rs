//! Configuration for the scoring engine
//!
//! Blend weights, failure policy, write retry budget and refresh schedule.

use crate::EngineError;
use placetrust_domain::{ScoreBlender, ScorerFailurePolicy, HISTORICAL_WEIGHT, RATING_WEIGHT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Scorer failure handling as written in configuration files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnScorerFailure {
    /// Skip the failing review for this run and retry it next run
    #[default]
    SkipReview,
    /// Abort the run without persisting anything
    Abort,
}

impl From<OnScorerFailure> for ScorerFailurePolicy {
    fn from(value: OnScorerFailure) -> Self {
        match value {
            OnScorerFailure::SkipReview => ScorerFailurePolicy::SkipReview,
            OnScorerFailure::Abort => ScorerFailurePolicy::Abort,
        }
    }
}

/// Configuration for the scoring engine
///
/// # Examples
///
/// ```
/// use placetrust_engine::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.historical_weight, 0.6);
/// assert!(config.validate().is_ok());
///
/// let strict = EngineConfig::strict();
/// assert_eq!(strict.max_write_attempts, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Weight of historical sentiment in the blend
    /// Default: 0.6
    #[serde(default = "default_historical_weight")]
    pub historical_weight: f64,

    /// Weight of the external rating in the blend
    /// Default: 0.4
    #[serde(default = "default_rating_weight")]
    pub rating_weight: f64,

    /// Clamp final scores to [0, 100]
    /// Default: true
    #[serde(default = "default_true")]
    pub clamp_output: bool,

    /// What to do when the sentiment scorer fails on one review
    /// Default: skip_review
    #[serde(default)]
    pub scorer_failure_policy: OnScorerFailure,

    /// Fetch both "most relevant" and "newest" review pages
    /// Default: true
    #[serde(default = "default_true")]
    pub fetch_both_sorts: bool,

    /// Attempts at the conditional aggregate write before giving up
    /// Default: 3
    #[serde(default = "default_max_write_attempts")]
    pub max_write_attempts: u32,

    /// Seconds between background refresh cycles
    /// Default: 3600 (hourly)
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Append a score snapshot after each persisted run
    /// Default: true
    #[serde(default = "default_true")]
    pub record_history: bool,
}

fn default_historical_weight() -> f64 {
    HISTORICAL_WEIGHT
}

fn default_rating_weight() -> f64 {
    RATING_WEIGHT
}

fn default_true() -> bool {
    true
}

fn default_max_write_attempts() -> u32 {
    3
}

fn default_refresh_interval_secs() -> u64 {
    3600
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            historical_weight: HISTORICAL_WEIGHT,
            rating_weight: RATING_WEIGHT,
            clamp_output: true,
            scorer_failure_policy: OnScorerFailure::SkipReview,
            fetch_both_sorts: true,
            max_write_attempts: default_max_write_attempts(),
            refresh_interval_secs: default_refresh_interval_secs(),
            record_history: true,
        }
    }
}

impl EngineConfig {
    /// Strict configuration: abort on any scorer failure, more write retries
    ///
    /// Suitable when a partially scored batch is worse than no update.
    pub fn strict() -> Self {
        Self {
            scorer_failure_policy: OnScorerFailure::Abort,
            max_write_attempts: 5,
            ..Self::default()
        }
    }

    /// Lenient configuration: unclamped output, single write attempt, no history
    ///
    /// Suitable for ad-hoc scoring where the raw blend is wanted and a lost
    /// race is not worth retrying.
    pub fn lenient() -> Self {
        Self {
            clamp_output: false,
            max_write_attempts: 1,
            record_history: false,
            ..Self::default()
        }
    }

    /// Parse a configuration from TOML, then validate it
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Invalid engine config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Check weights and budgets
    pub fn validate(&self) -> Result<(), EngineError> {
        self.blender()?;

        if self.max_write_attempts == 0 {
            return Err(EngineError::Config(
                "max_write_attempts must be at least 1".to_string(),
            ));
        }
        if self.refresh_interval_secs == 0 {
            return Err(EngineError::Config(
                "refresh_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the blender described by this configuration
    pub fn blender(&self) -> Result<ScoreBlender, EngineError> {
        ScoreBlender::new(self.historical_weight, self.rating_weight, self.clamp_output).ok_or_else(
            || {
                EngineError::Config(format!(
                    "blend weights must be non-negative and sum to 1.0 (got {} + {})",
                    self.historical_weight, self.rating_weight
                ))
            },
        )
    }

    /// Domain failure policy
    pub fn failure_policy(&self) -> ScorerFailurePolicy {
        self.scorer_failure_policy.into()
    }

    /// Refresh interval as Duration
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}
