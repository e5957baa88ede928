//! End-to-end scoring of one place
//!
//! fetch pages -> validate -> dedup -> read prior -> fold -> blend -> persist

use crate::{EngineConfig, EngineError, EngineMetrics};
use placetrust_domain::traits::{
    PlaceAggregateStore, PlaceReviewSource, ReviewSort, TextSentimentScorer,
};
use placetrust_domain::{
    dedupe_reviews, parse_batch, AggregatePatch, FinalScore, IncrementalAggregator,
    PlaceAggregate, PlaceReviews, Review, ScoreBlender, ScoreSnapshot, SkippedReview,
};
use std::fmt;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Current timestamp in milliseconds since Unix epoch
fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Result of scoring one place
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreReport {
    /// Place that was scored
    pub place_id: String,

    /// Display name reported by the provider
    pub name: Option<String>,

    /// Address reported by the provider
    pub address: Option<String>,

    /// Blended score with its breakdown
    pub final_score: FinalScore,

    /// Aggregate after this run (what was, or would have been, persisted)
    pub aggregate: PlaceAggregate,

    /// Mean sentiment of the reviews new in this run, `0` if none
    pub current_sentiment_score: f64,

    /// Reviews folded in by this run
    pub new_reviews_processed: u64,

    /// Reviews the scorer failed on; they stay unprocessed
    pub skipped: Vec<SkippedReview>,

    /// Raw reviews dropped for missing text or identity
    pub rejected: usize,

    /// Whether the store accepted the result
    pub persisted: bool,

    /// Conditional writes lost to a concurrent writer during this run
    pub write_conflicts: u32,
}

impl ScoreReport {
    /// Whether no new review was folded in
    pub fn is_unchanged(&self) -> bool {
        self.new_reviews_processed == 0
    }
}

struct FetchedReviews {
    name: Option<String>,
    address: Option<String>,
    rating: Option<f64>,
    reviews: Vec<Review>,
    rejected: usize,
}

/// Scoring pipeline wiring a review source, a sentiment scorer and a store
///
/// # Examples
///
/// ```no_run
/// use placetrust_engine::{EngineConfig, ScorePipeline};
/// use placetrust_sources::{HttpScorer, PlacesClient};
/// use placetrust_store::SqliteStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let source = PlacesClient::new("api-key")?;
/// let scorer = HttpScorer::new("http://localhost:8090/analyze")?;
/// let store = SqliteStore::new("placetrust.db")?;
///
/// let mut pipeline = ScorePipeline::new(source, scorer, store, EngineConfig::default())?;
/// let report = pipeline.score_place("ChIJN1t_tDeuEmsRUsoyG83frY4")?;
/// println!("score: {}", report.final_score.rounded());
/// # Ok(())
/// # }
/// ```
pub struct ScorePipeline<Src, Sc, St> {
    source: Src,
    aggregator: IncrementalAggregator<Sc>,
    store: St,
    blender: ScoreBlender,
    config: EngineConfig,
    metrics: EngineMetrics,
}

impl<Src, Sc, St> ScorePipeline<Src, Sc, St>
where
    Src: PlaceReviewSource + Sync,
    Src::Error: fmt::Display,
    Sc: TextSentimentScorer,
    Sc::Error: fmt::Display,
    St: PlaceAggregateStore,
    St::Error: fmt::Display,
{
    /// Create a pipeline, validating the configuration
    pub fn new(source: Src, scorer: Sc, store: St, config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let blender = config.blender()?;
        let aggregator = IncrementalAggregator::with_policy(scorer, config.failure_policy());

        Ok(Self {
            source,
            aggregator,
            store,
            blender,
            config,
            metrics: EngineMetrics::new(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Metrics accumulated since creation or the last reset
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    /// Underlying store
    pub fn store(&self) -> &St {
        &self.store
    }

    /// Compute, persist and return the trust score for a place
    ///
    /// Only reviews not folded by an earlier run are scored. A failure to
    /// read or write the aggregate does not fail the run: the in-memory
    /// result comes back with `persisted == false`.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Source`] when no review page could be fetched
    /// - [`EngineError::Aggregation`] when the scorer fails under the abort policy
    pub fn score_place(&mut self, place_id: &str) -> Result<ScoreReport, EngineError> {
        let start = Instant::now();
        let result = self.run(place_id);
        self.metrics.total_runtime_ms += start.elapsed().as_millis() as u64;

        match &result {
            Ok(report) => {
                self.metrics.record_run(report);
                tracing::info!(
                    place_id,
                    score = report.final_score.value,
                    new_reviews = report.new_reviews_processed,
                    persisted = report.persisted,
                    "place scored"
                );
            }
            Err(e) => {
                self.metrics.record_failure();
                tracing::error!(place_id, error = %e, "scoring failed");
            }
        }
        result
    }

    /// Score several places in order, one result per place
    pub fn score_places<I, P>(&mut self, place_ids: I) -> Vec<(String, Result<ScoreReport, EngineError>)>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        place_ids
            .into_iter()
            .map(|id| {
                let id = id.as_ref();
                (id.to_string(), self.score_place(id))
            })
            .collect()
    }

    fn fetch_pages(&self, place_id: &str) -> Vec<(ReviewSort, Result<PlaceReviews, String>)> {
        let source = &self.source;
        let fetch = |sort: ReviewSort| {
            (
                sort,
                source.fetch(place_id, sort).map_err(|e| e.to_string()),
            )
        };

        if !self.config.fetch_both_sorts {
            return vec![fetch(ReviewSort::MostRelevant)];
        }

        std::thread::scope(|scope| {
            let newest = scope.spawn(|| fetch(ReviewSort::Newest));
            let relevant = fetch(ReviewSort::MostRelevant);
            let newest = newest.join().unwrap_or_else(|_| {
                (
                    ReviewSort::Newest,
                    Err("review fetch thread panicked".to_string()),
                )
            });
            vec![relevant, newest]
        })
    }

    fn fetch_reviews(&self, place_id: &str) -> Result<FetchedReviews, EngineError> {
        let mut name = None;
        let mut address = None;
        let mut rating = None;
        let mut batches = Vec::new();
        let mut rejected = 0;
        let mut failures = Vec::new();

        for (sort, page) in self.fetch_pages(place_id) {
            match page {
                Ok(page) => {
                    rating = rating.or(page.rating);
                    name = name.or(page.name);
                    address = address.or(page.address);
                    let parsed = parse_batch(page.reviews);
                    for reason in &parsed.rejected {
                        tracing::warn!(place_id, sort = sort.as_str(), %reason, "review rejected");
                    }
                    rejected += parsed.rejected.len();
                    batches.push(parsed.reviews);
                }
                Err(e) => {
                    tracing::warn!(place_id, sort = sort.as_str(), error = %e, "review page unavailable");
                    failures.push(format!("{}: {}", sort.as_str(), e));
                }
            }
        }

        if batches.is_empty() {
            return Err(EngineError::Source(format!(
                "no reviews fetched for {} ({})",
                place_id,
                failures.join("; ")
            )));
        }

        let reviews = dedupe_reviews(batches);
        tracing::debug!(place_id, candidates = reviews.len(), rejected, "reviews fetched");

        Ok(FetchedReviews {
            name,
            address,
            rating,
            reviews,
            rejected,
        })
    }

    fn read_prior(&self, place_id: &str) -> Option<PlaceAggregate> {
        match self.store.get(place_id) {
            Ok(prior) => Some(prior.unwrap_or_else(|| PlaceAggregate::empty(place_id))),
            Err(e) => {
                tracing::warn!(place_id, error = %e, "aggregate read failed, result will not be persisted");
                None
            }
        }
    }

    fn run(&mut self, place_id: &str) -> Result<ScoreReport, EngineError> {
        let fetched = self.fetch_reviews(place_id)?;
        let mut write_conflicts = 0u32;
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let prior = self.read_prior(place_id);
            let readable = prior.is_some();
            let prior = prior.unwrap_or_else(|| PlaceAggregate::empty(place_id));

            let outcome = self
                .aggregator
                .fold(&prior, &fetched.reviews)
                .map_err(|e| EngineError::Aggregation(e.to_string()))?;

            let mut aggregate = outcome.aggregate;
            let final_score = self.blender.blend(
                aggregate.historical_sentiment_score,
                fetched.rating,
                outcome.current_sentiment_score,
            );
            let changed = outcome.new_reviews_processed > 0;
            if changed {
                aggregate.last_calculated_rating = final_score.external_rating;
            }
            aggregate.final_score = Some(final_score.value);

            let persisted = if !readable {
                false
            } else if changed {
                let patch = AggregatePatch::from_aggregate(&aggregate);
                match self.store.merge_upsert_if(place_id, prior.review_count, &patch) {
                    Ok(true) => true,
                    Ok(false) => {
                        write_conflicts += 1;
                        if attempt < self.config.max_write_attempts {
                            tracing::debug!(place_id, attempt, "aggregate advanced concurrently, refolding");
                            continue;
                        }
                        tracing::warn!(
                            place_id,
                            attempts = attempt,
                            "aggregate kept changing underneath, giving up on write"
                        );
                        false
                    }
                    Err(e) => {
                        tracing::warn!(place_id, error = %e, "aggregate write failed");
                        false
                    }
                }
            } else {
                let patch = AggregatePatch::final_score_only(final_score.value);
                match self.store.merge_upsert(place_id, &patch) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(place_id, error = %e, "final score write failed");
                        false
                    }
                }
            };

            if persisted && self.config.record_history {
                let snapshot = ScoreSnapshot {
                    place_id: place_id.to_string(),
                    final_score: final_score.value,
                    historical_sentiment_score: aggregate.historical_sentiment_score,
                    current_sentiment_score: outcome.current_sentiment_score,
                    external_rating: final_score.external_rating,
                    new_reviews_processed: outcome.new_reviews_processed,
                    recorded_at: current_timestamp_millis(),
                };
                if let Err(e) = self.store.record_snapshot(&snapshot) {
                    tracing::warn!(place_id, error = %e, "snapshot write failed");
                }
            }

            for skipped in &outcome.skipped {
                tracing::warn!(
                    place_id,
                    review_id = %skipped.review_id,
                    reason = %skipped.reason,
                    "review skipped, will retry next run"
                );
            }

            return Ok(ScoreReport {
                place_id: place_id.to_string(),
                name: fetched.name.clone(),
                address: fetched.address.clone(),
                final_score,
                aggregate,
                current_sentiment_score: outcome.current_sentiment_score,
                new_reviews_processed: outcome.new_reviews_processed,
                skipped: outcome.skipped,
                rejected: fetched.rejected,
                persisted,
                write_conflicts,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OnScorerFailure;
    use placetrust_domain::RawReview;
    use placetrust_sources::{MockReviewSource, MockScorer};
    use std::cell::Cell;
    use std::collections::HashMap;

    // In-memory store with failure and conflict injection
    #[derive(Default)]
    struct MockStore {
        aggregates: HashMap<String, PlaceAggregate>,
        snapshots: Vec<ScoreSnapshot>,
        fail_reads: bool,
        fail_writes: bool,
        // Number of conditional writes to reject, bumping review_count each time
        conflicts: usize,
    }

    impl PlaceAggregateStore for MockStore {
        type Error = String;

        fn get(&self, place_id: &str) -> Result<Option<PlaceAggregate>, Self::Error> {
            if self.fail_reads {
                return Err("read unavailable".to_string());
            }
            Ok(self.aggregates.get(place_id).cloned())
        }

        fn merge_upsert(&mut self, place_id: &str, patch: &AggregatePatch) -> Result<(), Self::Error> {
            if self.fail_writes {
                return Err("write unavailable".to_string());
            }
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
            if self.fail_writes {
                return Err("write unavailable".to_string());
            }
            if self.conflicts > 0 {
                self.conflicts -= 1;
                let entry = self
                    .aggregates
                    .entry(place_id.to_string())
                    .or_insert_with(|| PlaceAggregate::empty(place_id));
                entry.review_count += 1;
                entry.processed_review_ids.insert(format!("other-{}", entry.review_count));
                entry.total_sentiment_sum += 2.5;
                return Ok(false);
            }
            let current = self
                .aggregates
                .get(place_id)
                .map(|a| a.review_count)
                .unwrap_or(0);
            if current != expected_review_count {
                return Ok(false);
            }
            self.merge_upsert(place_id, patch)?;
            Ok(true)
        }

        fn record_snapshot(&mut self, snapshot: &ScoreSnapshot) -> Result<(), Self::Error> {
            self.snapshots.push(snapshot.clone());
            Ok(())
        }
    }

    // Counts reads through a Cell, so it is Send but not Sync, like a SQLite connection
    #[derive(Default)]
    struct CountingStore {
        inner: MockStore,
        reads: Cell<usize>,
    }

    impl PlaceAggregateStore for CountingStore {
        type Error = String;

        fn get(&self, place_id: &str) -> Result<Option<PlaceAggregate>, Self::Error> {
            self.reads.set(self.reads.get() + 1);
            self.inner.get(place_id)
        }

        fn merge_upsert(&mut self, place_id: &str, patch: &AggregatePatch) -> Result<(), Self::Error> {
            self.inner.merge_upsert(place_id, patch)
        }

        fn merge_upsert_if(
            &mut self,
            place_id: &str,
            expected_review_count: u64,
            patch: &AggregatePatch,
        ) -> Result<bool, Self::Error> {
            self.inner.merge_upsert_if(place_id, expected_review_count, patch)
        }
    }

    fn source_with(place: &str, rating: Option<f64>, relevant: Vec<RawReview>, newest: Vec<RawReview>) -> MockReviewSource {
        let mut source = MockReviewSource::new();
        source.set_rating(place, rating);
        source.set_page(place, ReviewSort::MostRelevant, relevant);
        source.set_page(place, ReviewSort::Newest, newest);
        source
    }

    fn pipeline(
        source: MockReviewSource,
        scorer: MockScorer,
        store: MockStore,
        config: EngineConfig,
    ) -> ScorePipeline<MockReviewSource, MockScorer, MockStore> {
        ScorePipeline::new(source, scorer, store, config).unwrap()
    }

    #[test]
    fn test_first_run_scores_all_reviews() {
        let mut scorer = MockScorer::default();
        scorer.add_score("great", 5.0); // normalizes to 5.0
        scorer.add_score("fine", 1.0); // normalizes to 3.0
        let source = source_with(
            "p1",
            Some(4.0),
            vec![RawReview::new("a", "great", 1)],
            vec![RawReview::new("b", "fine", 2), RawReview::new("a", "great", 1)],
        );

        let mut pipeline = pipeline(source, scorer.clone(), MockStore::default(), EngineConfig::default());
        let report = pipeline.score_place("p1").unwrap();

        assert_eq!(report.new_reviews_processed, 2);
        assert!(report.persisted);
        assert_eq!(report.aggregate.review_count, 2);
        assert!((report.aggregate.historical_sentiment_score - 4.0).abs() < 1e-9);
        // (4.0 * 0.6 + 4.0 * 0.4) * 20
        assert!((report.final_score.value - 80.0).abs() < 1e-9);
        assert_eq!(scorer.call_count(), 2);

        let stored = pipeline.store().aggregates.get("p1").unwrap();
        assert_eq!(stored.review_count, 2);
        assert_eq!(stored.final_score, Some(report.final_score.value));
        assert_eq!(stored.last_calculated_rating, 4.0);
        assert_eq!(pipeline.store().snapshots.len(), 1);
    }

    #[test]
    fn test_second_run_is_incremental() {
        let scorer = MockScorer::new(1.0);
        let mut source = source_with("p1", Some(3.0), vec![RawReview::new("a", "ok", 1)], vec![]);

        let mut pipeline = pipeline(source.clone(), scorer.clone(), MockStore::default(), EngineConfig::default());
        pipeline.score_place("p1").unwrap();
        assert_eq!(scorer.call_count(), 1);

        // Same page again: nothing new to score
        let report = pipeline.score_place("p1").unwrap();
        assert!(report.is_unchanged());
        assert!(report.persisted);
        assert_eq!(scorer.call_count(), 1);
        assert_eq!(report.aggregate.review_count, 1);

        // One new review arrives
        source.set_page(
            "p1",
            ReviewSort::Newest,
            vec![RawReview::new("b", "new one", 2)],
        );
        let report = pipeline.score_place("p1").unwrap();
        assert_eq!(report.new_reviews_processed, 1);
        assert_eq!(report.aggregate.review_count, 2);
        assert_eq!(scorer.call_count(), 2);
    }

    #[test]
    fn test_unchanged_run_only_updates_final_score() {
        let scorer = MockScorer::new(1.0);
        let mut source = source_with("p1", Some(3.0), vec![RawReview::new("a", "ok", 1)], vec![]);
        let mut pipeline = pipeline(source.clone(), scorer, MockStore::default(), EngineConfig::default());
        pipeline.score_place("p1").unwrap();

        source.set_rating("p1", Some(5.0));
        let report = pipeline.score_place("p1").unwrap();
        assert!(report.is_unchanged());

        let stored = pipeline.store().aggregates.get("p1").unwrap();
        // Rating moved the score but not the fold-time rating
        assert_eq!(stored.final_score, Some(report.final_score.value));
        assert_eq!(stored.last_calculated_rating, 3.0);
        assert_eq!(stored.review_count, 1);
    }

    #[test]
    fn test_no_reviews_no_rating_scores_zero() {
        let source = source_with("empty", None, vec![], vec![]);
        let mut pipeline = pipeline(source, MockScorer::default(), MockStore::default(), EngineConfig::default());

        let report = pipeline.score_place("empty").unwrap();
        assert_eq!(report.final_score.value, 0.0);
        assert!(report.is_unchanged());
        // Record created lazily with only the cached score
        let stored = pipeline.store().aggregates.get("empty").unwrap();
        assert_eq!(stored.review_count, 0);
        assert_eq!(stored.final_score, Some(0.0));
    }

    #[test]
    fn test_report_carries_place_details() {
        let mut source = source_with("p", Some(4.0), vec![RawReview::new("a", "ok", 1)], vec![]);
        source.set_details("p", "Corner Cafe", "1 Main St");
        let mut pipeline = pipeline(source, MockScorer::default(), MockStore::default(), EngineConfig::default());

        let report = pipeline.score_place("p").unwrap();
        assert_eq!(report.name.as_deref(), Some("Corner Cafe"));
        assert_eq!(report.address.as_deref(), Some("1 Main St"));
    }

    #[test]
    fn test_rejected_reviews_counted() {
        let bad = RawReview {
            author_name: Some("x".to_string()),
            text: None,
            time: Some(9),
            rating: None,
        };
        let source = source_with("p", Some(4.0), vec![bad, RawReview::new("a", "ok", 1)], vec![]);
        let mut pipeline = pipeline(source, MockScorer::default(), MockStore::default(), EngineConfig::default());

        let report = pipeline.score_place("p").unwrap();
        assert_eq!(report.rejected, 1);
        assert_eq!(report.new_reviews_processed, 1);
        assert_eq!(pipeline.metrics().reviews_rejected, 1);
    }

    #[test]
    fn test_single_page_failure_degrades() {
        let mut source = source_with("p", Some(4.0), vec![RawReview::new("a", "ok", 1)], vec![]);
        source.fail_sort(ReviewSort::Newest);
        let mut pipeline = pipeline(source, MockScorer::default(), MockStore::default(), EngineConfig::default());

        let report = pipeline.score_place("p").unwrap();
        assert_eq!(report.new_reviews_processed, 1);
    }

    #[test]
    fn test_all_pages_failing_is_source_error() {
        let mut source = source_with("p", Some(4.0), vec![], vec![]);
        source.fail_sort(ReviewSort::Newest);
        source.fail_sort(ReviewSort::MostRelevant);
        let mut pipeline = pipeline(source, MockScorer::default(), MockStore::default(), EngineConfig::default());

        let result = pipeline.score_place("p");
        assert!(matches!(result, Err(EngineError::Source(_))));
        assert_eq!(pipeline.metrics().failed_runs, 1);
    }

    #[test]
    fn test_concurrent_fetch_with_unshared_store() {
        let source = source_with(
            "p",
            Some(4.0),
            vec![RawReview::new("a", "ok", 1)],
            vec![RawReview::new("b", "ok", 2)],
        );
        let mut pipeline =
            ScorePipeline::new(source.clone(), MockScorer::default(), CountingStore::default(), EngineConfig::default())
                .unwrap();

        let report = pipeline.score_place("p").unwrap();
        assert_eq!(report.new_reviews_processed, 2);
        assert!(report.persisted);
        assert_eq!(source.fetch_count(), 2);
        assert_eq!(pipeline.store().reads.get(), 1);
    }

    #[test]
    fn test_single_sort_fetch() {
        let source = source_with("p", Some(4.0), vec![RawReview::new("a", "ok", 1)], vec![RawReview::new("b", "ok", 2)]);
        let config = EngineConfig {
            fetch_both_sorts: false,
            ..Default::default()
        };
        let mut pipeline = pipeline(source.clone(), MockScorer::default(), MockStore::default(), config);

        let report = pipeline.score_place("p").unwrap();
        assert_eq!(report.new_reviews_processed, 1);
        assert_eq!(source.fetch_count(), 1);
    }

    #[test]
    fn test_skip_policy_leaves_review_for_next_run() {
        let mut scorer = MockScorer::new(1.0);
        scorer.add_error("flaky");
        let source = source_with(
            "p",
            Some(4.0),
            vec![RawReview::new("a", "ok", 1), RawReview::new("b", "flaky", 2)],
            vec![],
        );
        let mut pipeline = pipeline(source, scorer, MockStore::default(), EngineConfig::default());

        let report = pipeline.score_place("p").unwrap();
        assert_eq!(report.new_reviews_processed, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].review_id, "2");
        assert!(!report.aggregate.has_processed("2"));
    }

    #[test]
    fn test_abort_policy_persists_nothing() {
        let mut scorer = MockScorer::new(1.0);
        scorer.add_error("flaky");
        let source = source_with(
            "p",
            Some(4.0),
            vec![RawReview::new("a", "ok", 1), RawReview::new("b", "flaky", 2)],
            vec![],
        );
        let config = EngineConfig {
            scorer_failure_policy: OnScorerFailure::Abort,
            ..Default::default()
        };
        let mut pipeline = pipeline(source, scorer, MockStore::default(), config);

        let result = pipeline.score_place("p");
        assert!(matches!(result, Err(EngineError::Aggregation(_))));
        assert!(pipeline.store().aggregates.is_empty());
    }

    #[test]
    fn test_read_failure_returns_unpersisted_result() {
        let source = source_with("p", Some(5.0), vec![RawReview::new("a", "ok", 1)], vec![]);
        let store = MockStore {
            fail_reads: true,
            ..Default::default()
        };
        let mut pipeline = pipeline(source, MockScorer::new(5.0), store, EngineConfig::default());

        let report = pipeline.score_place("p").unwrap();
        assert!(!report.persisted);
        assert_eq!(report.final_score.value, 100.0);
        assert!(pipeline.store().aggregates.is_empty());
        assert!(pipeline.store().snapshots.is_empty());
        assert_eq!(pipeline.metrics().store_failures, 1);
    }

    #[test]
    fn test_write_failure_returns_unpersisted_result() {
        let source = source_with("p", Some(5.0), vec![RawReview::new("a", "ok", 1)], vec![]);
        let store = MockStore {
            fail_writes: true,
            ..Default::default()
        };
        let mut pipeline = pipeline(source, MockScorer::new(5.0), store, EngineConfig::default());

        let report = pipeline.score_place("p").unwrap();
        assert!(!report.persisted);
        assert_eq!(report.new_reviews_processed, 1);
    }

    #[test]
    fn test_conflict_is_refolded() {
        let source = source_with("p", Some(4.0), vec![RawReview::new("a", "ok", 1)], vec![]);
        let store = MockStore {
            conflicts: 1,
            ..Default::default()
        };
        let mut pipeline = pipeline(source, MockScorer::new(1.0), store, EngineConfig::default());

        let report = pipeline.score_place("p").unwrap();
        assert!(report.persisted);
        assert_eq!(report.write_conflicts, 1);
        // Concurrent writer's review plus ours
        assert_eq!(report.aggregate.review_count, 2);
        let stored = pipeline.store().aggregates.get("p").unwrap();
        assert_eq!(stored.review_count, 2);
        assert!(stored.has_processed("1"));
        assert!(stored.is_consistent());
    }

    #[test]
    fn test_conflicts_exhaust_attempts() {
        let source = source_with("p", Some(4.0), vec![RawReview::new("a", "ok", 1)], vec![]);
        let store = MockStore {
            conflicts: 10,
            ..Default::default()
        };
        let config = EngineConfig {
            max_write_attempts: 2,
            ..Default::default()
        };
        let mut pipeline = pipeline(source, MockScorer::new(1.0), store, config);

        let report = pipeline.score_place("p").unwrap();
        assert!(!report.persisted);
        assert_eq!(report.write_conflicts, 2);
        assert_eq!(pipeline.metrics().write_conflicts, 2);
    }

    #[test]
    fn test_history_disabled() {
        let source = source_with("p", Some(4.0), vec![RawReview::new("a", "ok", 1)], vec![]);
        let config = EngineConfig {
            record_history: false,
            ..Default::default()
        };
        let mut pipeline = pipeline(source, MockScorer::default(), MockStore::default(), config);

        pipeline.score_place("p").unwrap();
        assert!(pipeline.store().snapshots.is_empty());
    }

    #[test]
    fn test_score_places_continues_after_failure() {
        let mut source = source_with("good", Some(4.0), vec![RawReview::new("a", "ok", 1)], vec![]);
        source.set_rating("also-good", Some(2.0));
        let mut pipeline = pipeline(source, MockScorer::default(), MockStore::default(), EngineConfig::default());

        let results = pipeline.score_places(["good", "missing", "also-good"]);
        assert_eq!(results.len(), 3);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
        assert_eq!(pipeline.metrics().runs, 2);
        assert_eq!(pipeline.metrics().failed_runs, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            historical_weight: 0.9,
            ..Default::default()
        };
        let result = ScorePipeline::new(
            MockReviewSource::new(),
            MockScorer::default(),
            MockStore::default(),
            config,
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
