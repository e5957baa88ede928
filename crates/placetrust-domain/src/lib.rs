//! Placetrust Domain Layer
//!
//! This crate contains the scoring core of Placetrust: the types and pure
//! logic that turn a place's reviews into a durable running sentiment
//! aggregate and a single 0-100 trust score. It has no external runtime
//! dependencies; storage, review providers and the text sentiment scorer
//! are reached only through the traits in [`traits`].
//!
//! ## Key Concepts
//!
//! - **Review**: immutable provider review with a derived id (timestamp, else author)
//! - **Aggregate**: durable per-place running sum/count of sentiment scores
//! - **Fold**: merging newly scored reviews into the aggregate exactly once
//! - **Blend**: weighted combination of historical sentiment and external rating
//!
//! ## Pipeline
//!
//! ```text
//! review pages -> dedupe_reviews -> IncrementalAggregator::fold -> ScoreBlender::blend
//!                                        |
//!                                SentimentNormalizer -> TextSentimentScorer
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod aggregation;
pub mod blend;
pub mod dedup;
pub mod review;
pub mod sentiment;
pub mod traits;

// Re-exports for convenience
pub use aggregate::{AggregatePatch, PlaceAggregate, ScoreSnapshot};
pub use aggregation::{
    AggregationError, AggregationOutcome, IncrementalAggregator, ScoredReview, ScorerFailurePolicy,
    SkippedReview,
};
pub use blend::{FinalScore, ScoreBlender, HISTORICAL_WEIGHT, RATING_WEIGHT};
pub use dedup::dedupe_reviews;
pub use review::{parse_batch, ParsedBatch, RawReview, Review, ReviewError};
pub use sentiment::{Sentiment, SentimentError, SentimentNormalizer};
pub use traits::{PlaceReviews, RawSentiment, ReviewSort};
