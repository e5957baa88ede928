//! Durable per-place aggregate and its write forms

use std::collections::BTreeSet;

/// Running sentiment aggregate for one place
///
/// Invariants, maintained by [`crate::IncrementalAggregator`]:
/// - `review_count == processed_review_ids.len()`
/// - `historical_sentiment_score == total_sentiment_sum / review_count`,
///   or `0` when `review_count == 0`
/// - `processed_review_ids` only ever grows
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceAggregate {
    /// Unique place key
    pub place_id: String,

    /// Reviews folded in so far
    pub review_count: u64,

    /// Every review id ever scored for this place
    pub processed_review_ids: BTreeSet<String>,

    /// Sum of all folded sentiment scores
    pub total_sentiment_sum: f64,

    /// Mean sentiment across all folded reviews
    pub historical_sentiment_score: f64,

    /// External rating observed at the last fold
    pub last_calculated_rating: f64,

    /// Last blended score written for caching
    pub final_score: Option<f64>,

    /// Last write time (milliseconds since Unix epoch), stamped by the store
    pub last_updated: u64,
}

impl PlaceAggregate {
    /// Zero-valued aggregate for a place that has never been scored
    pub fn empty(place_id: impl Into<String>) -> Self {
        Self {
            place_id: place_id.into(),
            review_count: 0,
            processed_review_ids: BTreeSet::new(),
            total_sentiment_sum: 0.0,
            historical_sentiment_score: 0.0,
            last_calculated_rating: 0.0,
            final_score: None,
            last_updated: 0,
        }
    }

    /// Whether a review id has already been folded in
    pub fn has_processed(&self, review_id: &str) -> bool {
        self.processed_review_ids.contains(review_id)
    }

    /// Check the count/id and mean invariants
    pub fn is_consistent(&self) -> bool {
        let count_matches = self.review_count == self.processed_review_ids.len() as u64;
        let expected_mean = historical_mean(self.total_sentiment_sum, self.review_count);
        count_matches && (self.historical_sentiment_score - expected_mean).abs() < 1e-9
    }

    /// Apply a partial update, leaving absent fields untouched
    ///
    /// Used by stores that implement merge-upsert as read-modify-write.
    /// `last_updated` is the caller's responsibility.
    pub fn apply(&mut self, patch: &AggregatePatch) {
        if let Some(count) = patch.review_count {
            self.review_count = count;
        }
        if let Some(ids) = &patch.processed_review_ids {
            self.processed_review_ids = ids.clone();
        }
        if let Some(sum) = patch.total_sentiment_sum {
            self.total_sentiment_sum = sum;
        }
        if let Some(score) = patch.historical_sentiment_score {
            self.historical_sentiment_score = score;
        }
        if let Some(rating) = patch.last_calculated_rating {
            self.last_calculated_rating = rating;
        }
        if let Some(score) = patch.final_score {
            self.final_score = Some(score);
        }
    }
}

/// `total / count`, or `0` for an empty aggregate
pub fn historical_mean(total: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Partial aggregate fields for merge-upsert
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatePatch {
    /// New review count
    pub review_count: Option<u64>,

    /// New processed id set (full replacement)
    pub processed_review_ids: Option<BTreeSet<String>>,

    /// New running sum
    pub total_sentiment_sum: Option<f64>,

    /// New historical mean
    pub historical_sentiment_score: Option<f64>,

    /// Rating observed at this fold
    pub last_calculated_rating: Option<f64>,

    /// Blended score to cache
    pub final_score: Option<f64>,
}

impl AggregatePatch {
    /// Patch carrying every folded field of an aggregate
    pub fn from_aggregate(aggregate: &PlaceAggregate) -> Self {
        Self {
            review_count: Some(aggregate.review_count),
            processed_review_ids: Some(aggregate.processed_review_ids.clone()),
            total_sentiment_sum: Some(aggregate.total_sentiment_sum),
            historical_sentiment_score: Some(aggregate.historical_sentiment_score),
            last_calculated_rating: Some(aggregate.last_calculated_rating),
            final_score: aggregate.final_score,
        }
    }

    /// Patch that only caches a final score
    pub fn final_score_only(score: f64) -> Self {
        Self {
            final_score: Some(score),
            ..Default::default()
        }
    }

    /// Whether the patch would write nothing
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Point-in-time record of one scoring run, for trend charts
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSnapshot {
    /// Place the run scored
    pub place_id: String,

    /// Blended score (0-100)
    pub final_score: f64,

    /// Historical sentiment after the run
    pub historical_sentiment_score: f64,

    /// Mean sentiment of the reviews new in this run (0 if none)
    pub current_sentiment_score: f64,

    /// External rating used in the blend
    pub external_rating: f64,

    /// Reviews folded in by this run
    pub new_reviews_processed: u64,

    /// When the run completed (milliseconds since Unix epoch)
    pub recorded_at: u64,
}
