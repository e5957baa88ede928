//! Review module - the unit of input to the scoring engine

use std::fmt;

/// A review exactly as a place provider returns it
///
/// Every field is optional because providers omit fields freely. Use
/// [`Review::try_from`] to validate the shape before scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReview {
    /// Display name of the review author
    pub author_name: Option<String>,

    /// Review body
    pub text: Option<String>,

    /// Publication time (seconds since Unix epoch)
    pub time: Option<i64>,

    /// Star rating attached to this review, if any
    pub rating: Option<f64>,
}

impl RawReview {
    /// Create a raw review with text, author and timestamp
    pub fn new(author_name: impl Into<String>, text: impl Into<String>, time: i64) -> Self {
        Self {
            author_name: Some(author_name.into()),
            text: Some(text.into()),
            time: Some(time),
            rating: None,
        }
    }
}

/// A validated, immutable review
///
/// The `id` is the review timestamp when the provider supplied one, and the
/// author label otherwise. Two reviews are duplicates iff their ids match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Review {
    /// Derived identity (timestamp, else author label)
    pub id: String,

    /// Review body
    pub text: String,

    /// Author label shown to the user
    pub author_label: String,
}

impl Review {
    /// Create a review with an explicit id
    pub fn new(id: impl Into<String>, text: impl Into<String>, author_label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            author_label: author_label.into(),
        }
    }
}

/// Reasons a provider review is rejected before scoring
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    /// The review has no text field
    MissingText {
        /// Whatever identity could be recovered, for logging
        author_label: Option<String>,
    },

    /// Neither a timestamp nor an author label is present, so no id can be derived
    MissingIdentity,
}

impl fmt::Display for ReviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewError::MissingText { author_label: Some(author) } => {
                write!(f, "review by '{}' has no text", author)
            }
            ReviewError::MissingText { author_label: None } => write!(f, "review has no text"),
            ReviewError::MissingIdentity => {
                write!(f, "review has neither a timestamp nor an author label")
            }
        }
    }
}

impl std::error::Error for ReviewError {}

impl TryFrom<RawReview> for Review {
    type Error = ReviewError;

    fn try_from(raw: RawReview) -> Result<Self, Self::Error> {
        let author_label = raw.author_name.filter(|a| !a.is_empty());

        let Some(text) = raw.text else {
            return Err(ReviewError::MissingText { author_label });
        };

        let id = match (raw.time, &author_label) {
            (Some(time), _) => time.to_string(),
            (None, Some(author)) => author.clone(),
            (None, None) => return Err(ReviewError::MissingIdentity),
        };

        Ok(Self {
            id,
            text,
            author_label: author_label.unwrap_or_default(),
        })
    }
}

/// A provider batch split into usable reviews and rejections
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBatch {
    /// Reviews that passed shape validation, in input order
    pub reviews: Vec<Review>,

    /// Rejected inputs with their reason, in input order
    pub rejected: Vec<ReviewError>,
}

/// Validate a provider batch, keeping order and collecting rejections
pub fn parse_batch(raw: impl IntoIterator<Item = RawReview>) -> ParsedBatch {
    let mut batch = ParsedBatch::default();
    for review in raw {
        match Review::try_from(review) {
            Ok(review) => batch.reviews.push(review),
            Err(e) => batch.rejected.push(e),
        }
    }
    batch
}
