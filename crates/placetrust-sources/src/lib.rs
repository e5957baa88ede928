//! Placetrust External Sources
//!
//! Implementations of the collaborator traits from `placetrust-domain`:
//! the text sentiment scorer and the place review provider.
//!
//! # Implementations
//!
//! - `MockScorer`: deterministic scorer for testing
//! - `MockReviewSource`: canned review pages for testing
//! - `HttpScorer`: remote sentiment service over HTTP
//! - `PlacesClient`: place details and nearby search provider
//!
//! # Examples
//!
//! ```
//! use placetrust_sources::MockScorer;
//! use placetrust_domain::traits::TextSentimentScorer;
//!
//! let mut scorer = MockScorer::new(1.0);
//! scorer.add_score("terrible service", -4.0);
//! assert_eq!(scorer.score("terrible service").unwrap().raw_score, -4.0);
//! assert_eq!(scorer.score("anything else").unwrap().raw_score, 1.0);
//! ```

#![warn(missing_docs)]

pub mod http_scorer;
pub mod places;

use placetrust_domain::traits::{
    PlaceReviewSource, RawSentiment, ReviewSort, TextSentimentScorer,
};
use placetrust_domain::{PlaceReviews, RawReview};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use http_scorer::HttpScorer;
pub use places::{NearbyPlace, PlacesClient};

/// Errors that can occur talking to external sources
#[derive(Error, Debug)]
pub enum SourceError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Provider answered with a non-OK status
    #[error("Provider error ({status}): {message}")]
    Provider {
        /// Provider status code or string
        status: String,
        /// Provider message, if any
        message: String,
    },

    /// Scoring failed for a specific text
    #[error("Scorer error: {0}")]
    Scorer(String),
}

/// Lock a mock's shared state, recovering from poisoning
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock sentiment scorer for deterministic testing
///
/// Returns a configured raw score per text, or a default score. No network
/// calls are made. Clones share call counts.
#[derive(Debug, Clone)]
pub struct MockScorer {
    default_score: f64,
    scores: Arc<Mutex<HashMap<String, f64>>>,
    failing: Arc<Mutex<Vec<String>>>,
    call_count: Arc<Mutex<usize>>,
}

impl MockScorer {
    /// Create a scorer returning `default_score` for every text
    pub fn new(default_score: f64) -> Self {
        Self {
            default_score,
            scores: Arc::new(Mutex::new(HashMap::new())),
            failing: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Set the raw score for a specific text
    pub fn add_score(&mut self, text: impl Into<String>, raw_score: f64) {
        lock(&self.scores).insert(text.into(), raw_score);
    }

    /// Make scoring fail for a specific text
    pub fn add_error(&mut self, text: impl Into<String>) {
        lock(&self.failing).push(text.into());
    }

    /// Number of times `score` was called
    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        *lock(&self.call_count) = 0;
    }
}

impl Default for MockScorer {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl TextSentimentScorer for MockScorer {
    type Error = SourceError;

    fn score(&self, text: &str) -> Result<RawSentiment, Self::Error> {
        *lock(&self.call_count) += 1;

        if lock(&self.failing).iter().any(|t| t == text) {
            return Err(SourceError::Scorer(format!("mock failure for '{}'", text)));
        }

        let raw_score = lock(&self.scores)
            .get(text)
            .copied()
            .unwrap_or(self.default_score);
        let tokens = text.split_whitespace().count().max(1);

        Ok(RawSentiment {
            raw_score,
            comparative: raw_score / tokens as f64,
            positive_words: Vec::new(),
            negative_words: Vec::new(),
        })
    }
}

#[derive(Debug, Default)]
struct MockPlace {
    name: Option<String>,
    address: Option<String>,
    rating: Option<f64>,
    pages: HashMap<ReviewSort, Vec<RawReview>>,
}

/// Mock review provider serving canned pages per place and sort order
///
/// Clones share state, so a test can keep a handle while the pipeline owns
/// another.
#[derive(Debug, Clone, Default)]
pub struct MockReviewSource {
    places: Arc<Mutex<HashMap<String, MockPlace>>>,
    failing: Arc<Mutex<Vec<ReviewSort>>>,
    fetch_count: Arc<Mutex<usize>>,
}

impl MockReviewSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider rating for a place
    pub fn set_rating(&mut self, place_id: impl Into<String>, rating: Option<f64>) {
        lock(&self.places).entry(place_id.into()).or_default().rating = rating;
    }

    /// Set the display name and address for a place
    pub fn set_details(&mut self, place_id: impl Into<String>, name: &str, address: &str) {
        let mut places = lock(&self.places);
        let place = places.entry(place_id.into()).or_default();
        place.name = Some(name.to_string());
        place.address = Some(address.to_string());
    }

    /// Set the review page for a place and sort order
    pub fn set_page(&mut self, place_id: impl Into<String>, sort: ReviewSort, reviews: Vec<RawReview>) {
        lock(&self.places)
            .entry(place_id.into())
            .or_default()
            .pages
            .insert(sort, reviews);
    }

    /// Make every fetch with this sort order fail
    pub fn fail_sort(&mut self, sort: ReviewSort) {
        lock(&self.failing).push(sort);
    }

    /// Number of fetch calls made
    pub fn fetch_count(&self) -> usize {
        *lock(&self.fetch_count)
    }
}

impl PlaceReviewSource for MockReviewSource {
    type Error = SourceError;

    fn fetch(&self, place_id: &str, sort: ReviewSort) -> Result<PlaceReviews, Self::Error> {
        *lock(&self.fetch_count) += 1;

        if lock(&self.failing).contains(&sort) {
            return Err(SourceError::Communication(format!(
                "mock fetch failure ({})",
                sort.as_str()
            )));
        }

        let places = lock(&self.places);
        let Some(place) = places.get(place_id) else {
            return Err(SourceError::Provider {
                status: "NOT_FOUND".to_string(),
                message: format!("unknown place {}", place_id),
            });
        };

        Ok(PlaceReviews {
            name: place.name.clone(),
            address: place.address.clone(),
            rating: place.rating,
            reviews: place.pages.get(&sort).cloned().unwrap_or_default(),
        })
    }
}
