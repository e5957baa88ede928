//! Review deduplication across provider result pages
//!
//! Providers return reviews in several sort orders ("most relevant",
//! "newest"). The same review commonly appears in more than one page, so the
//! pages are merged with first-seen-wins semantics before aggregation.

use crate::Review;
use std::collections::HashSet;

/// Merge review batches into one ordered sequence without duplicate ids
///
/// Traversal is batch by batch, position by position; the first review seen
/// for an id is kept and later ones are skipped.
///
/// # Examples
///
/// ```
/// use placetrust_domain::{dedupe_reviews, Review};
///
/// let relevant = vec![Review::new("1", "good", "a"), Review::new("2", "bad", "b")];
/// let newest = vec![Review::new("3", "fine", "c"), Review::new("1", "good", "a")];
///
/// let merged = dedupe_reviews([relevant, newest]);
/// let ids: Vec<_> = merged.iter().map(|r| r.id.as_str()).collect();
/// assert_eq!(ids, ["1", "2", "3"]);
/// ```
pub fn dedupe_reviews<B>(batches: impl IntoIterator<Item = B>) -> Vec<Review>
where
    B: IntoIterator<Item = Review>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for batch in batches {
        for review in batch {
            if seen.insert(review.id.clone()) {
                merged.push(review);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: &str, text: &str) -> Review {
        Review::new(id, text, format!("author-{}", id))
    }

    #[test]
    fn test_first_seen_wins() {
        let first = vec![review("1", "first copy")];
        let second = vec![review("1", "second copy"), review("2", "other")];

        let merged = dedupe_reviews([first, second]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, "first copy");
        assert_eq!(merged[1].id, "2");
    }

    #[test]
    fn test_duplicates_within_one_batch() {
        let merged = dedupe_reviews([vec![review("1", "a"), review("1", "b"), review("2", "c")]]);
        let ids: Vec<_> = merged.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_empty_batches() {
        let merged = dedupe_reviews(Vec::<Vec<Review>>::new());
        assert!(merged.is_empty());

        let merged = dedupe_reviews([Vec::new(), vec![review("9", "x")]]);
        assert_eq!(merged.len(), 1);
    }
}
