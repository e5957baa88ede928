//! Final score blending
//!
//! `final = (historical * HISTORICAL_WEIGHT + rating * RATING_WEIGHT) * 20`
//!
//! Both inputs live on a 0-5 scale; the factor of 20 maps the weighted
//! result onto 0-100. The weights must sum to 1.0.

/// Weight of the historical sentiment score
pub const HISTORICAL_WEIGHT: f64 = 0.6;

/// Weight of the external rating
pub const RATING_WEIGHT: f64 = 0.4;

/// Scale factor from the 0-5 input space to 0-100
pub const SCORE_SCALE: f64 = 20.0;

/// Upper bound of a clamped final score
pub const MAX_FINAL_SCORE: f64 = 100.0;

/// Blended score with its breakdown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalScore {
    /// Blended score, in [0, 100] when clamping is on
    pub value: f64,

    /// Historical sentiment that went into the blend (0-5)
    pub historical_component: f64,

    /// Sentiment of the reviews new in this run (0-5, 0 if none)
    pub current_component: f64,

    /// External rating that went into the blend (0-5, 0 if absent)
    pub external_rating: f64,
}

impl FinalScore {
    /// Value rounded to the nearest integer, as shown in summaries
    pub fn rounded(&self) -> f64 {
        self.value.round()
    }
}

/// Combines historical sentiment with an external rating
///
/// # Examples
///
/// ```
/// use placetrust_domain::ScoreBlender;
///
/// let blender = ScoreBlender::default();
/// assert_eq!(blender.blend(5.0, Some(5.0), 0.0).value, 100.0);
/// assert_eq!(blender.blend(0.0, None, 0.0).value, 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBlender {
    historical_weight: f64,
    rating_weight: f64,
    clamp_output: bool,
}

impl Default for ScoreBlender {
    fn default() -> Self {
        Self {
            historical_weight: HISTORICAL_WEIGHT,
            rating_weight: RATING_WEIGHT,
            clamp_output: true,
        }
    }
}

impl ScoreBlender {
    /// Create a blender with custom weights
    ///
    /// Returns `None` unless the weights are non-negative and sum to 1.0.
    pub fn new(historical_weight: f64, rating_weight: f64, clamp_output: bool) -> Option<Self> {
        let valid = historical_weight >= 0.0
            && rating_weight >= 0.0
            && ((historical_weight + rating_weight) - 1.0).abs() < 1e-9;

        valid.then_some(Self {
            historical_weight,
            rating_weight,
            clamp_output,
        })
    }

    /// Blender that trusts the 0-5 input contract and never clamps
    pub fn unclamped() -> Self {
        Self {
            clamp_output: false,
            ..Self::default()
        }
    }

    /// Historical weight
    pub fn historical_weight(&self) -> f64 {
        self.historical_weight
    }

    /// Rating weight
    pub fn rating_weight(&self) -> f64 {
        self.rating_weight
    }

    /// Whether output is clamped to [0, 100]
    pub fn clamps_output(&self) -> bool {
        self.clamp_output
    }

    /// Blend historical sentiment with the external rating
    ///
    /// An absent or NaN rating counts as 0. `current_sentiment` is carried
    /// into the breakdown only; it does not affect the value.
    pub fn blend(
        &self,
        historical_sentiment: f64,
        external_rating: Option<f64>,
        current_sentiment: f64,
    ) -> FinalScore {
        let rating = external_rating.filter(|r| !r.is_nan()).unwrap_or(0.0);
        let historical = if historical_sentiment.is_nan() {
            0.0
        } else {
            historical_sentiment
        };

        let mut value =
            (historical * self.historical_weight + rating * self.rating_weight) * SCORE_SCALE;
        if self.clamp_output {
            value = value.clamp(0.0, MAX_FINAL_SCORE);
        }

        FinalScore {
            value,
            historical_component: historical,
            current_component: current_sentiment,
            external_rating: rating,
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: inputs inside the 0-5 contract land inside 0-100
        #[test]
        fn test_in_domain_inputs_stay_bounded(h in 0.0f64..=5.0, r in 0.0f64..=5.0) {
            let value = ScoreBlender::unclamped().blend(h, Some(r), 0.0).value;
            prop_assert!((0.0..=100.0 + 1e-9).contains(&value));
        }

        /// Property: clamped output is always within 0-100
        #[test]
        fn test_clamped_output_bounded(h in -50.0f64..50.0, r in -50.0f64..50.0) {
            let value = ScoreBlender::default().blend(h, Some(r), 0.0).value;
            prop_assert!((0.0..=MAX_FINAL_SCORE).contains(&value));
        }
    }
}
