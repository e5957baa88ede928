//! Metrics collection for scoring runs

use crate::pipeline::ScoreReport;

/// Metrics collected across scoring runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineMetrics {
    /// Scoring runs that produced a report
    pub runs: usize,

    /// Runs that folded no new review
    pub unchanged_runs: usize,

    /// Runs that returned an error
    pub failed_runs: usize,

    /// Reviews folded into aggregates
    pub reviews_folded: u64,

    /// Reviews skipped because the scorer failed
    pub reviews_skipped: usize,

    /// Raw reviews rejected before dedup (missing text or identity)
    pub reviews_rejected: usize,

    /// Runs whose result could not be persisted
    pub store_failures: usize,

    /// Conditional writes lost to a concurrent writer
    pub write_conflicts: usize,

    /// Total runtime in milliseconds
    pub total_runtime_ms: u64,
}

impl EngineMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed run
    pub fn record_run(&mut self, report: &ScoreReport) {
        self.runs += 1;
        if report.new_reviews_processed == 0 {
            self.unchanged_runs += 1;
        }
        self.reviews_folded += report.new_reviews_processed;
        self.reviews_skipped += report.skipped.len();
        self.reviews_rejected += report.rejected;
        self.write_conflicts += report.write_conflicts as usize;
        if !report.persisted {
            self.store_failures += 1;
        }
    }

    /// Record a run that returned an error
    pub fn record_failure(&mut self) {
        self.failed_runs += 1;
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Generate a summary report of metrics
    pub fn summary(&self) -> String {
        let lines = [
            "Scoring Metrics Summary".to_string(),
            "=======================".to_string(),
            format!("Runs: {} ({} unchanged, {} failed)", self.runs, self.unchanged_runs, self.failed_runs),
            format!("Total runtime: {}ms", self.total_runtime_ms),
            String::new(),
            format!("Reviews folded: {}", self.reviews_folded),
            format!("Reviews skipped: {}", self.reviews_skipped),
            format!("Reviews rejected: {}", self.reviews_rejected),
            String::new(),
            format!("Store failures: {}", self.store_failures),
            format!("Write conflicts: {}", self.write_conflicts),
        ];
        lines.join("\n")
    }
}
