//! Sentiment normalization onto the 0-5 scale
//!
//! The external scorer returns an unbounded signed value. Scores are mapped
//! with `clamp((raw + 5) / 2, 0, 5)`: neutral text lands on 2.5 and outliers
//! saturate at the bounds instead of extrapolating.

use crate::traits::{RawSentiment, TextSentimentScorer};
use std::fmt;

/// Lowest normalized sentiment
pub const MIN_SENTIMENT: f64 = 0.0;

/// Highest normalized sentiment
pub const MAX_SENTIMENT: f64 = 5.0;

/// Normalized sentiment for one text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sentiment {
    /// Score in [0, 5]
    pub score: f64,

    /// Scorer's per-token value, passed through unchanged
    pub comparative: f64,

    /// Positive words reported by the scorer
    pub positive: Vec<String>,

    /// Negative words reported by the scorer
    pub negative: Vec<String>,
}

impl Sentiment {
    /// The zero result used for empty or absent text
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Errors that can occur while normalizing sentiment
#[derive(Debug, Clone, PartialEq)]
pub enum SentimentError<E> {
    /// The external scorer failed
    Scorer(E),

    /// The scorer produced NaN or an infinite score
    NonFinite,
}

impl<E: fmt::Display> fmt::Display for SentimentError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentimentError::Scorer(e) => write!(f, "sentiment scorer failed: {}", e),
            SentimentError::NonFinite => write!(f, "sentiment scorer returned a non-finite score"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for SentimentError<E> {}

/// Map a raw scorer value onto [0, 5]
///
/// # Examples
///
/// ```
/// use placetrust_domain::sentiment::normalize_raw_score;
///
/// assert_eq!(normalize_raw_score(0.0), 2.5);
/// assert_eq!(normalize_raw_score(5.0), 5.0);
/// assert_eq!(normalize_raw_score(-12.0), 0.0);
/// ```
pub fn normalize_raw_score(raw: f64) -> f64 {
    ((raw + 5.0) / 2.0).clamp(MIN_SENTIMENT, MAX_SENTIMENT)
}

/// Normalizes scorer output for review texts
///
/// Wraps a [`TextSentimentScorer`] passed in by the caller.
#[derive(Debug, Clone)]
pub struct SentimentNormalizer<S> {
    scorer: S,
}

impl<S: TextSentimentScorer> SentimentNormalizer<S> {
    /// Create a normalizer around a scorer
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    /// Borrow the wrapped scorer
    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    /// Analyze a text
    ///
    /// Absent or empty text yields [`Sentiment::zero`] without calling the
    /// scorer.
    pub fn analyze(&self, text: Option<&str>) -> Result<Sentiment, SentimentError<S::Error>> {
        let text = match text {
            Some(t) if !t.is_empty() => t,
            _ => return Ok(Sentiment::zero()),
        };

        let RawSentiment {
            raw_score,
            comparative,
            positive_words,
            negative_words,
        } = self.scorer.score(text).map_err(SentimentError::Scorer)?;

        if !raw_score.is_finite() {
            return Err(SentimentError::NonFinite);
        }

        Ok(Sentiment {
            score: normalize_raw_score(raw_score),
            comparative,
            positive: positive_words,
            negative: negative_words,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    /// Scorer returning canned raw values per text; unknown text scores 0
    #[derive(Default)]
    pub struct TableScorer {
        pub scores: HashMap<String, f64>,
        pub failing: Vec<String>,
        pub calls: Cell<usize>,
    }

    impl TableScorer {
        pub fn with(pairs: &[(&str, f64)]) -> Self {
            Self {
                scores: pairs.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
                ..Default::default()
            }
        }

        pub fn failing_on(mut self, text: &str) -> Self {
            self.failing.push(text.to_string());
            self
        }
    }

    impl TextSentimentScorer for TableScorer {
        type Error = String;

        fn score(&self, text: &str) -> Result<RawSentiment, Self::Error> {
            self.calls.set(self.calls.get() + 1);
            if self.failing.iter().any(|t| t == text) {
                return Err(format!("cannot score '{}'", text));
            }
            Ok(RawSentiment {
                raw_score: self.scores.get(text).copied().unwrap_or(0.0),
                comparative: 0.0,
                positive_words: Vec::new(),
                negative_words: Vec::new(),
            })
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: any non-NaN raw value normalizes into [0, 5]
        #[test]
        fn test_normalized_within_bounds(raw in prop::num::f64::ANY) {
            prop_assume!(!raw.is_nan());
            let score = normalize_raw_score(raw);
            prop_assert!((MIN_SENTIMENT..=MAX_SENTIMENT).contains(&score));
        }

        /// Property: normalization is monotone
        #[test]
        fn test_normalization_monotone(a in -100.0f64..100.0, b in -100.0f64..100.0) {
            if a <= b {
                prop_assert!(normalize_raw_score(a) <= normalize_raw_score(b));
            }
        }
    }
}
