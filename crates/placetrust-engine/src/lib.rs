//! Placetrust Engine
//!
//! Orchestrates trust score computation for places: fetches review pages,
//! folds unseen reviews into the durable aggregate, blends the result with
//! the provider rating and persists it.
//!
//! # Overview
//!
//! - **Scoring pipeline**: one end-to-end run per place, incremental across runs
//! - **Conditional writes**: lost races against a concurrent writer are re-read and refolded
//! - **Background refresh**: rescoring a watch list on a schedule
//! - **Metrics collection**: counters for runs, reviews and store failures
//!
//! # Usage
//!
//! ## One-off Scoring
//!
//! ```no_run
//! use placetrust_engine::{EngineConfig, ScorePipeline};
//! use placetrust_sources::{HttpScorer, PlacesClient};
//! use placetrust_store::SqliteStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pipeline = ScorePipeline::new(
//!     PlacesClient::new("api-key")?,
//!     HttpScorer::new("http://localhost:8090/analyze")?,
//!     SqliteStore::new("placetrust.db")?,
//!     EngineConfig::default(),
//! )?;
//!
//! let report = pipeline.score_place("ChIJN1t_tDeuEmsRUsoyG83frY4")?;
//! println!("{} -> {}", report.place_id, report.final_score.rounded());
//! println!("{}", pipeline.metrics().summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Presets
//!
//! ```
//! use placetrust_engine::EngineConfig;
//!
//! // Default: 60/40 blend, skip reviews the scorer fails on
//! let config = EngineConfig::default();
//!
//! // Strict: abort the run on any scorer failure
//! let config = EngineConfig::strict();
//!
//! // Lenient: unclamped output, one write attempt, no history
//! let config = EngineConfig::lenient();
//! ```
//!
//! # Configuration
//!
//! ```toml
//! [engine]
//! historical_weight = 0.6
//! rating_weight = 0.4
//! clamp_output = true
//! scorer_failure_policy = "skip_review"
//! fetch_both_sorts = true
//! max_write_attempts = 3
//! refresh_interval_secs = 3600
//! record_history = true
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod metrics;
mod pipeline;
mod worker;

pub use config::{EngineConfig, OnScorerFailure};
pub use error::EngineError;
pub use metrics::EngineMetrics;
pub use pipeline::{ScorePipeline, ScoreReport};
pub use worker::{CycleSummary, RefreshWorker};
