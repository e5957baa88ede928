//! Background worker that keeps a watch list of places scored

use crate::{EngineError, EngineMetrics, ScorePipeline};
use placetrust_domain::traits::{PlaceAggregateStore, PlaceReviewSource, TextSentimentScorer};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::time::{interval, Duration};

/// Outcome of one refresh cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleSummary {
    /// Places scored successfully
    pub scored: usize,

    /// Places whose run returned an error
    pub failed: usize,

    /// Reviews folded in across all places
    pub new_reviews: u64,
}

/// Background worker that rescores a watch list on a schedule
///
/// Scoring runs on tokio's blocking pool, so sources and scorers built on
/// blocking HTTP clients are safe to use.
///
/// # Examples
///
/// ```no_run
/// use placetrust_engine::{EngineConfig, RefreshWorker, ScorePipeline};
/// use placetrust_sources::{HttpScorer, PlacesClient};
/// use placetrust_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = ScorePipeline::new(
///         PlacesClient::new("api-key")?,
///         HttpScorer::new("http://localhost:8090/analyze")?,
///         SqliteStore::new("placetrust.db")?,
///         EngineConfig::default(),
///     )?;
///     let worker = RefreshWorker::new(pipeline, vec!["place-1".to_string()]);
///
///     // Run until Ctrl+C
///     worker.run().await?;
///     Ok(())
/// }
/// ```
pub struct RefreshWorker<Src, Sc, St> {
    pipeline: Arc<Mutex<ScorePipeline<Src, Sc, St>>>,
    places: Arc<Vec<String>>,
    interval: Duration,
}

impl<Src, Sc, St> RefreshWorker<Src, Sc, St>
where
    Src: PlaceReviewSource + Send + Sync + 'static,
    Src::Error: fmt::Display,
    Sc: TextSentimentScorer + Send + 'static,
    Sc::Error: fmt::Display,
    St: PlaceAggregateStore + Send + 'static,
    St::Error: fmt::Display,
{
    /// Create a worker for the given watch list
    ///
    /// The interval comes from the pipeline's configuration.
    pub fn new(pipeline: ScorePipeline<Src, Sc, St>, places: Vec<String>) -> Self {
        let interval = pipeline.config().refresh_interval();
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
            places: Arc::new(places),
            interval,
        }
    }

    /// Places refreshed each cycle
    pub fn places(&self) -> &[String] {
        &self.places
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    ///
    /// A failing place is logged and retried next cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if the blocking task cannot be joined.
    pub async fn run(&self) -> Result<(), EngineError> {
        let mut ticker = interval(self.interval);

        tracing::info!(
            places = self.places.len(),
            "Refresh worker started (interval: {:?})",
            self.interval
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summary = self.refresh_once().await?;
                    tracing::info!(
                        "Refresh completed: {} scored, {} failed, {} new reviews",
                        summary.scored,
                        summary.failed,
                        summary.new_reviews
                    );
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping refresh worker");
                    break;
                }
            }
        }

        let metrics = self.metrics()?;
        tracing::info!("Refresh worker stopped. Final metrics:\n{}", metrics.summary());
        Ok(())
    }

    /// Run for a specific number of cycles
    pub async fn run_cycles(&self, cycles: usize) -> Result<Vec<CycleSummary>, EngineError> {
        let mut ticker = interval(self.interval);
        let mut summaries = Vec::with_capacity(cycles);

        for cycle in 0..cycles {
            ticker.tick().await;
            tracing::debug!("Starting refresh cycle {}/{}", cycle + 1, cycles);

            let summary = self.refresh_once().await?;
            tracing::info!(
                "Refresh {}/{} completed: {} scored, {} failed",
                cycle + 1,
                cycles,
                summary.scored,
                summary.failed
            );
            summaries.push(summary);
        }

        Ok(summaries)
    }

    /// Score every watched place once
    pub async fn refresh_once(&self) -> Result<CycleSummary, EngineError> {
        let pipeline = Arc::clone(&self.pipeline);
        let places = Arc::clone(&self.places);

        tokio::task::spawn_blocking(move || {
            let mut pipeline = pipeline
                .lock()
                .map_err(|_| EngineError::Worker("pipeline lock poisoned".to_string()))?;

            let mut summary = CycleSummary::default();
            for (_, result) in pipeline.score_places(places.iter()) {
                match result {
                    Ok(report) => {
                        summary.scored += 1;
                        summary.new_reviews += report.new_reviews_processed;
                    }
                    Err(_) => summary.failed += 1,
                }
            }
            Ok(summary)
        })
        .await
        .map_err(|e| EngineError::Worker(format!("refresh task failed: {}", e)))?
    }

    /// Snapshot of the pipeline's metrics
    pub fn metrics(&self) -> Result<EngineMetrics, EngineError> {
        self.pipeline
            .lock()
            .map(|pipeline| pipeline.metrics().clone())
            .map_err(|_| EngineError::Worker("pipeline lock poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;
    use placetrust_domain::traits::ReviewSort;
    use placetrust_domain::{AggregatePatch, PlaceAggregate, RawReview};
    use placetrust_sources::{MockReviewSource, MockScorer};
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockStore {
        aggregates: HashMap<String, PlaceAggregate>,
    }

    impl PlaceAggregateStore for MockStore {
        type Error = String;

        fn get(&self, place_id: &str) -> Result<Option<PlaceAggregate>, Self::Error> {
            Ok(self.aggregates.get(place_id).cloned())
        }

        fn merge_upsert(&mut self, place_id: &str, patch: &AggregatePatch) -> Result<(), Self::Error> {
            self.aggregates
                .entry(place_id.to_string())
                .or_insert_with(|| PlaceAggregate::empty(place_id))
                .apply(patch);
            Ok(())
        }

        fn merge_upsert_if(
            &mut self,
            place_id: &str,
            expected_review_count: u64,
            patch: &AggregatePatch,
        ) -> Result<bool, Self::Error> {
            let current = self.aggregates.get(place_id).map(|a| a.review_count).unwrap_or(0);
            if current != expected_review_count {
                return Ok(false);
            }
            self.merge_upsert(place_id, patch)?;
            Ok(true)
        }
    }

    fn worker(places: &[&str]) -> (RefreshWorker<MockReviewSource, MockScorer, MockStore>, MockReviewSource) {
        let mut source = MockReviewSource::new();
        source.set_rating("cafe", Some(4.0));
        source.set_page("cafe", ReviewSort::Newest, vec![RawReview::new("a", "good", 1)]);

        let config = EngineConfig {
            refresh_interval_secs: 1,
            ..Default::default()
        };
        let pipeline =
            ScorePipeline::new(source.clone(), MockScorer::new(2.0), MockStore::default(), config).unwrap();
        let places = places.iter().map(|p| p.to_string()).collect();
        (RefreshWorker::new(pipeline, places), source)
    }

    #[tokio::test]
    async fn test_worker_creation() {
        let (worker, _) = worker(&["cafe"]);
        assert_eq!(worker.places().to_vec(), vec!["cafe".to_string()]);
        assert_eq!(worker.metrics().unwrap().runs, 0);
    }

    #[tokio::test]
    async fn test_refresh_once() {
        let (worker, _) = worker(&["cafe", "unknown"]);

        let summary = worker.refresh_once().await.unwrap();
        assert_eq!(summary.scored, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.new_reviews, 1);
    }

    #[tokio::test]
    async fn test_run_cycles_is_incremental() {
        let (worker, mut source) = worker(&["cafe"]);

        let summaries = worker.run_cycles(1).await.unwrap();
        assert_eq!(summaries[0].new_reviews, 1);

        source.set_page(
            "cafe",
            ReviewSort::Newest,
            vec![RawReview::new("a", "good", 1), RawReview::new("b", "better", 2)],
        );
        let summaries = worker.run_cycles(2).await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].new_reviews, 1);
        assert_eq!(summaries[1].new_reviews, 0);

        let metrics = worker.metrics().unwrap();
        assert_eq!(metrics.runs, 3);
        assert_eq!(metrics.reviews_folded, 2);
        assert_eq!(metrics.unchanged_runs, 1);
    }
}
