//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the scoring core and
//! infrastructure. Implementations live in `placetrust-store` and
//! `placetrust-sources`; tests substitute in-memory doubles.

use crate::{AggregatePatch, PlaceAggregate, RawReview, ScoreSnapshot};

/// Unnormalized output of an external text sentiment scorer
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSentiment {
    /// Signed, unbounded sentiment value (typically within [-5, 5])
    pub raw_score: f64,

    /// Sentiment per token
    pub comparative: f64,

    /// Words the scorer counted as positive
    pub positive_words: Vec<String>,

    /// Words the scorer counted as negative
    pub negative_words: Vec<String>,
}

/// Trait for scoring the sentiment of a single text
///
/// Implemented by the infrastructure layer (placetrust-sources)
pub trait TextSentimentScorer {
    /// Error type for scoring operations
    type Error;

    /// Score a non-empty text
    fn score(&self, text: &str) -> Result<RawSentiment, Self::Error>;
}

/// Trait for the durable per-place aggregate store
///
/// Implemented by the infrastructure layer (placetrust-store)
pub trait PlaceAggregateStore {
    /// Error type for store operations
    type Error;

    /// Get the aggregate for a place, if one was ever written
    fn get(&self, place_id: &str) -> Result<Option<PlaceAggregate>, Self::Error>;

    /// Overwrite only the fields present in `patch`, creating the record if absent
    ///
    /// The store stamps `last_updated` on every write.
    fn merge_upsert(&mut self, place_id: &str, patch: &AggregatePatch) -> Result<(), Self::Error>;

    /// Merge-upsert only if the stored `review_count` still equals `expected_review_count`
    ///
    /// An absent record counts as `review_count == 0`. Returns `false` when
    /// another writer advanced the aggregate first and nothing was written.
    fn merge_upsert_if(
        &mut self,
        place_id: &str,
        expected_review_count: u64,
        patch: &AggregatePatch,
    ) -> Result<bool, Self::Error>;

    /// Append a score snapshot to the place's history
    ///
    /// Stores without history support accept and drop snapshots.
    fn record_snapshot(&mut self, _snapshot: &ScoreSnapshot) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Most recent snapshots for a place, oldest first
    fn history(&self, _place_id: &str, _limit: usize) -> Result<Vec<ScoreSnapshot>, Self::Error> {
        Ok(Vec::new())
    }
}

/// Sort order for a review page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReviewSort {
    /// Provider's relevance ranking
    MostRelevant,

    /// Most recent first
    Newest,
}

impl ReviewSort {
    /// Provider parameter value
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewSort::MostRelevant => "most_relevant",
            ReviewSort::Newest => "newest",
        }
    }

    /// Parse a sort order; anything unrecognised falls back to `MostRelevant`
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "newest" => ReviewSort::Newest,
            _ => ReviewSort::MostRelevant,
        }
    }
}

/// One page of reviews for a place, plus the provider's aggregate rating
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceReviews {
    /// Display name, if the provider sent one
    pub name: Option<String>,

    /// Full address, if the provider sent one
    pub address: Option<String>,

    /// Provider rating on a 0-5 scale, if published
    pub rating: Option<f64>,

    /// Reviews in provider order
    pub reviews: Vec<RawReview>,
}

/// Trait for fetching reviews of a place
///
/// Implemented by the infrastructure layer (placetrust-sources)
pub trait PlaceReviewSource {
    /// Error type for fetch operations
    type Error;

    /// Fetch one review page for a place in the given sort order
    fn fetch(&self, place_id: &str, sort: ReviewSort) -> Result<PlaceReviews, Self::Error>;
}
