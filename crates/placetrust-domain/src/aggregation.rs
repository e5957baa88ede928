//! Incremental sentiment aggregation
//!
//! Folds newly seen reviews into a place's running aggregate. Reviews whose
//! id is already in `processed_review_ids` are never rescored, so running the
//! fold again over the same candidates with the persisted result as prior is
//! a no-op.
//!
//! The fold has two distinct outcomes:
//! 1. **Unchanged**: no unseen reviews. The historical score is carried over
//!    and the current-batch score is `0`.
//! 2. **Folded**: unseen reviews were scored. The current-batch score is the
//!    mean of the new batch only, and the historical score is recomputed
//!    from the updated running sum and count.

use crate::aggregate::historical_mean;
use crate::sentiment::{SentimentError, SentimentNormalizer};
use crate::traits::TextSentimentScorer;
use crate::{PlaceAggregate, Review};
use std::collections::HashSet;
use std::fmt;

/// What to do when the external scorer fails on a single review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScorerFailurePolicy {
    /// Leave the review out of this run; it stays unprocessed and is retried next time
    #[default]
    SkipReview,

    /// Fail the whole fold; the caller persists nothing
    Abort,
}

/// A review together with its normalized sentiment
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredReview {
    /// Review id
    pub id: String,

    /// Normalized sentiment in [0, 5]
    pub sentiment_score: f64,
}

/// A review left out of a run because scoring failed
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedReview {
    /// Review id
    pub review_id: String,

    /// Scorer failure message
    pub reason: String,
}

/// Result of one fold
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationOutcome {
    /// Aggregate after the fold (equal to the prior when unchanged)
    pub aggregate: PlaceAggregate,

    /// Mean sentiment of the reviews folded in by this run, `0` if none
    pub current_sentiment_score: f64,

    /// Number of reviews folded in by this run
    pub new_reviews_processed: u64,

    /// Per-review scores for the reviews folded in
    pub scored: Vec<ScoredReview>,

    /// Reviews skipped under [`ScorerFailurePolicy::SkipReview`]
    pub skipped: Vec<SkippedReview>,
}

impl AggregationOutcome {
    fn unchanged(prior: &PlaceAggregate, skipped: Vec<SkippedReview>) -> Self {
        Self {
            aggregate: prior.clone(),
            current_sentiment_score: 0.0,
            new_reviews_processed: 0,
            scored: Vec::new(),
            skipped,
        }
    }

    /// Whether the fold left the aggregate untouched
    pub fn is_unchanged(&self) -> bool {
        self.new_reviews_processed == 0
    }
}

/// Errors that abort a fold
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationError<E> {
    /// Scoring a review failed under [`ScorerFailurePolicy::Abort`]
    Scorer {
        /// Review that could not be scored
        review_id: String,
        /// Underlying failure
        source: SentimentError<E>,
    },
}

impl<E: fmt::Display> fmt::Display for AggregationError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationError::Scorer { review_id, source } => {
                write!(f, "aggregation aborted at review {}: {}", review_id, source)
            }
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for AggregationError<E> {}

/// Folds unseen reviews into a place aggregate
///
/// # Examples
///
/// ```
/// use placetrust_domain::{IncrementalAggregator, PlaceAggregate, Review};
/// use placetrust_domain::traits::{RawSentiment, TextSentimentScorer};
///
/// struct Neutral;
/// impl TextSentimentScorer for Neutral {
///     type Error = String;
///     fn score(&self, _text: &str) -> Result<RawSentiment, String> {
///         Ok(RawSentiment::default())
///     }
/// }
///
/// let aggregator = IncrementalAggregator::new(Neutral);
/// let prior = PlaceAggregate::empty("place-1");
/// let reviews = vec![Review::new("1", "ok", "a")];
///
/// let first = aggregator.fold(&prior, &reviews).unwrap();
/// assert_eq!(first.new_reviews_processed, 1);
/// assert_eq!(first.aggregate.historical_sentiment_score, 2.5);
///
/// let second = aggregator.fold(&first.aggregate, &reviews).unwrap();
/// assert!(second.is_unchanged());
/// ```
#[derive(Debug, Clone)]
pub struct IncrementalAggregator<S> {
    normalizer: SentimentNormalizer<S>,
    policy: ScorerFailurePolicy,
}

impl<S> IncrementalAggregator<S>
where
    S: TextSentimentScorer,
    S::Error: fmt::Display,
{
    /// Create an aggregator with the default (skip) failure policy
    pub fn new(scorer: S) -> Self {
        Self::with_policy(scorer, ScorerFailurePolicy::default())
    }

    /// Create an aggregator with an explicit failure policy
    pub fn with_policy(scorer: S, policy: ScorerFailurePolicy) -> Self {
        Self {
            normalizer: SentimentNormalizer::new(scorer),
            policy,
        }
    }

    /// Active failure policy
    pub fn policy(&self) -> ScorerFailurePolicy {
        self.policy
    }

    /// Borrow the normalizer
    pub fn normalizer(&self) -> &SentimentNormalizer<S> {
        &self.normalizer
    }

    /// Fold `candidates` into `prior`, scoring only reviews not yet processed
    ///
    /// `prior` is not modified; the new aggregate is returned in the outcome
    /// for the caller to persist.
    pub fn fold(
        &self,
        prior: &PlaceAggregate,
        candidates: &[Review],
    ) -> Result<AggregationOutcome, AggregationError<S::Error>> {
        let mut batch_ids = HashSet::new();
        let unprocessed: Vec<&Review> = candidates
            .iter()
            .filter(|&r| !prior.has_processed(&r.id) && batch_ids.insert(r.id.as_str()))
            .collect();

        if unprocessed.is_empty() {
            return Ok(AggregationOutcome::unchanged(prior, Vec::new()));
        }

        let mut scored = Vec::with_capacity(unprocessed.len());
        let mut skipped = Vec::new();

        for review in unprocessed {
            match self.normalizer.analyze(Some(&review.text)) {
                Ok(sentiment) => scored.push(ScoredReview {
                    id: review.id.clone(),
                    sentiment_score: sentiment.score,
                }),
                Err(source) => match self.policy {
                    ScorerFailurePolicy::Abort => {
                        return Err(AggregationError::Scorer {
                            review_id: review.id.clone(),
                            source,
                        });
                    }
                    ScorerFailurePolicy::SkipReview => skipped.push(SkippedReview {
                        review_id: review.id.clone(),
                        reason: source.to_string(),
                    }),
                },
            }
        }

        if scored.is_empty() {
            return Ok(AggregationOutcome::unchanged(prior, skipped));
        }

        let new_count = scored.len() as u64;
        let new_sum: f64 = scored.iter().map(|s| s.sentiment_score).sum();

        let mut aggregate = prior.clone();
        aggregate.total_sentiment_sum += new_sum;
        aggregate.review_count += new_count;
        aggregate.historical_sentiment_score =
            historical_mean(aggregate.total_sentiment_sum, aggregate.review_count);
        aggregate
            .processed_review_ids
            .extend(scored.iter().map(|s| s.id.clone()));

        Ok(AggregationOutcome {
            aggregate,
            current_sentiment_score: new_sum / new_count as f64,
            new_reviews_processed: new_count,
            scored,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::test_support::TableScorer;

    fn review(id: &str, text: &str) -> Review {
        Review::new(id, text, "someone")
    }

    fn prior_ab() -> PlaceAggregate {
        let mut prior = PlaceAggregate::empty("place-1");
        prior.review_count = 2;
        prior.total_sentiment_sum = 6.0;
        prior.historical_sentiment_score = 3.0;
        prior.processed_review_ids = ["a", "b"].iter().map(|s| s.to_string()).collect();
        prior
    }

    #[test]
    fn test_folds_only_unseen_reviews() {
        // "great place" has raw 3 -> normalized 4
        let aggregator = IncrementalAggregator::new(TableScorer::with(&[("great place", 3.0)]));
        let candidates = vec![review("a", "already seen"), review("c", "great place")];

        let outcome = aggregator.fold(&prior_ab(), &candidates).unwrap();

        assert_eq!(outcome.new_reviews_processed, 1);
        assert_eq!(outcome.scored, vec![ScoredReview { id: "c".to_string(), sentiment_score: 4.0 }]);
        assert_eq!(outcome.current_sentiment_score, 4.0);
        assert_eq!(outcome.aggregate.review_count, 3);
        assert_eq!(outcome.aggregate.total_sentiment_sum, 10.0);
        assert!((outcome.aggregate.historical_sentiment_score - 10.0 / 3.0).abs() < 1e-12);
        assert!(outcome.aggregate.has_processed("c"));
        assert!(outcome.aggregate.is_consistent());
        // "already seen" must not reach the scorer
        assert_eq!(aggregator.normalizer().scorer().calls.get(), 1);
    }

    #[test]
    fn test_prior_not_mutated() {
        let aggregator = IncrementalAggregator::new(TableScorer::default());
        let prior = prior_ab();
        let _ = aggregator.fold(&prior, &[review("z", "new")]).unwrap();
        assert_eq!(prior, prior_ab());
    }

    #[test]
    fn test_absent_prior_and_no_reviews() {
        let aggregator = IncrementalAggregator::new(TableScorer::default());
        let prior = PlaceAggregate::empty("fresh");

        let outcome = aggregator.fold(&prior, &[]).unwrap();

        assert!(outcome.is_unchanged());
        assert_eq!(outcome.aggregate, prior);
        assert_eq!(outcome.aggregate.review_count, 0);
        assert_eq!(outcome.aggregate.total_sentiment_sum, 0.0);
        assert_eq!(outcome.aggregate.historical_sentiment_score, 0.0);
        assert_eq!(outcome.current_sentiment_score, 0.0);
    }

    #[test]
    fn test_all_seen_is_unchanged_branch() {
        let aggregator = IncrementalAggregator::new(TableScorer::default());
        let outcome = aggregator
            .fold(&prior_ab(), &[review("a", "x"), review("b", "y")])
            .unwrap();

        assert!(outcome.is_unchanged());
        assert_eq!(outcome.aggregate.historical_sentiment_score, 3.0);
        assert_eq!(outcome.current_sentiment_score, 0.0);
        assert_eq!(aggregator.normalizer().scorer().calls.get(), 0);
    }

    #[test]
    fn test_second_fold_is_idempotent() {
        let aggregator = IncrementalAggregator::new(TableScorer::with(&[("nice", 2.0), ("meh", -1.0)]));
        let candidates = vec![review("1", "nice"), review("2", "meh")];

        let first = aggregator.fold(&PlaceAggregate::empty("p"), &candidates).unwrap();
        let second = aggregator.fold(&first.aggregate, &candidates).unwrap();

        assert_eq!(second.new_reviews_processed, 0);
        assert_eq!(second.aggregate.review_count, first.aggregate.review_count);
        assert_eq!(second.aggregate.total_sentiment_sum, first.aggregate.total_sentiment_sum);
        assert_eq!(
            second.aggregate.historical_sentiment_score,
            first.aggregate.historical_sentiment_score
        );
    }

    #[test]
    fn test_repeated_id_in_candidates_counted_once() {
        let aggregator = IncrementalAggregator::new(TableScorer::default());
        let outcome = aggregator
            .fold(&PlaceAggregate::empty("p"), &[review("1", "x"), review("1", "y")])
            .unwrap();
        assert_eq!(outcome.new_reviews_processed, 1);
        assert!(outcome.aggregate.is_consistent());
    }

    #[test]
    fn test_empty_text_contributes_zero() {
        let aggregator = IncrementalAggregator::new(TableScorer::default());
        let outcome = aggregator.fold(&PlaceAggregate::empty("p"), &[review("1", "")]).unwrap();
        assert_eq!(outcome.new_reviews_processed, 1);
        assert_eq!(outcome.aggregate.total_sentiment_sum, 0.0);
        assert_eq!(aggregator.normalizer().scorer().calls.get(), 0);
    }

    #[test]
    fn test_skip_policy_leaves_failed_review_unprocessed() {
        let scorer = TableScorer::with(&[("fine", 1.0)]).failing_on("broken");
        let aggregator = IncrementalAggregator::with_policy(scorer, ScorerFailurePolicy::SkipReview);

        let outcome = aggregator
            .fold(&PlaceAggregate::empty("p"), &[review("1", "fine"), review("2", "broken")])
            .unwrap();

        assert_eq!(outcome.new_reviews_processed, 1);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].review_id, "2");
        assert!(!outcome.aggregate.has_processed("2"));
        assert!(outcome.aggregate.is_consistent());
    }

    #[test]
    fn test_skip_policy_all_failed_is_unchanged() {
        let scorer = TableScorer::default().failing_on("broken");
        let aggregator = IncrementalAggregator::new(scorer);
        let prior = prior_ab();

        let outcome = aggregator.fold(&prior, &[review("c", "broken")]).unwrap();

        assert!(outcome.is_unchanged());
        assert_eq!(outcome.aggregate, prior);
        assert_eq!(outcome.skipped.len(), 1);
    }

    #[test]
    fn test_abort_policy_fails_whole_fold() {
        let scorer = TableScorer::with(&[("fine", 1.0)]).failing_on("broken");
        let aggregator = IncrementalAggregator::with_policy(scorer, ScorerFailurePolicy::Abort);

        let result = aggregator.fold(&prior_ab(), &[review("c", "fine"), review("d", "broken")]);

        match result {
            Err(AggregationError::Scorer { review_id, .. }) => assert_eq!(review_id, "d"),
            other => panic!("expected scorer abort, got {:?}", other),
        }
    }
}
