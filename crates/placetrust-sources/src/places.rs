//! Places provider client
//!
//! Fetches place details (rating + reviews) and nearby search results from a
//! Places-style JSON API.
//!
//! Details requests always ask for English reviews without machine
//! translation, in one of the two supported sort orders.

use crate::SourceError;
use placetrust_domain::traits::{PlaceReviewSource, ReviewSort};
use placetrust_domain::{PlaceReviews, RawReview};
use serde::Deserialize;
use std::time::Duration;

/// Default provider base URL
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

/// Default nearby search radius in metres
pub const DEFAULT_RADIUS_METRES: u32 = 1500;

/// Default request timeout (15 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Summary of a place returned by nearby search
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NearbyPlace {
    /// Provider place id
    pub place_id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Provider rating (0-5)
    #[serde(default)]
    pub rating: Option<f64>,

    /// Short address
    #[serde(default)]
    pub vicinity: Option<String>,

    /// Number of ratings behind `rating`
    #[serde(default)]
    pub user_ratings_total: Option<u64>,
}

#[derive(Deserialize)]
struct ApiReview {
    author_name: Option<String>,
    text: Option<String>,
    time: Option<i64>,
    rating: Option<f64>,
}

impl From<ApiReview> for RawReview {
    fn from(review: ApiReview) -> Self {
        Self {
            author_name: review.author_name,
            text: review.text,
            time: review.time,
            rating: review.rating,
        }
    }
}

#[derive(Deserialize)]
struct ApiPlaceResult {
    name: Option<String>,
    formatted_address: Option<String>,
    rating: Option<f64>,
    #[serde(default)]
    reviews: Vec<ApiReview>,
}

#[derive(Deserialize)]
struct DetailsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    result: Option<ApiPlaceResult>,
}

#[derive(Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<NearbyPlace>,
}

fn check_status(status: &str, error_message: Option<String>) -> Result<(), SourceError> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        other => Err(SourceError::Provider {
            status: other.to_string(),
            message: error_message.unwrap_or_default(),
        }),
    }
}

/// Parse a place details response body
pub fn parse_details(body: &str) -> Result<PlaceReviews, SourceError> {
    let response: DetailsResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::InvalidResponse(format!("Failed to parse details: {}", e)))?;
    check_status(&response.status, response.error_message)?;

    let Some(result) = response.result else {
        return Ok(PlaceReviews::default());
    };

    Ok(PlaceReviews {
        name: result.name,
        address: result.formatted_address,
        rating: result.rating,
        reviews: result.reviews.into_iter().map(RawReview::from).collect(),
    })
}

/// Parse a nearby search response body
pub fn parse_nearby(body: &str) -> Result<Vec<NearbyPlace>, SourceError> {
    let response: NearbyResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::InvalidResponse(format!("Failed to parse nearby: {}", e)))?;
    check_status(&response.status, response.error_message)?;
    Ok(response.results)
}

/// Client for the places provider
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone)]
pub struct PlacesClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl PlacesClient {
    /// Create a client against the default provider URL
    pub fn new(api_key: impl Into<String>) -> Result<Self, SourceError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SourceError::Communication(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Configured base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String, SourceError> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .map_err(|e| SourceError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SourceError::Communication(format!("Failed to read body: {}", e)))?;

        if !status.is_success() {
            return Err(SourceError::Provider {
                status: status.as_u16().to_string(),
                message: body,
            });
        }
        Ok(body)
    }

    /// Fetch details for a place with reviews in the given sort order
    pub fn details(&self, place_id: &str, sort: ReviewSort) -> Result<PlaceReviews, SourceError> {
        let body = self.get(
            "details/json",
            &[
                ("place_id", place_id.to_string()),
                ("reviews_sort", sort.as_str().to_string()),
                ("language", "en".to_string()),
                ("reviews_no_translation", "true".to_string()),
            ],
        )?;
        parse_details(&body)
    }

    /// Search for places around a coordinate
    pub fn nearby(
        &self,
        latitude: f64,
        longitude: f64,
        radius_metres: u32,
    ) -> Result<Vec<NearbyPlace>, SourceError> {
        let body = self.get(
            "nearbysearch/json",
            &[
                ("location", format!("{},{}", latitude, longitude)),
                ("radius", radius_metres.to_string()),
            ],
        )?;
        let places = parse_nearby(&body)?;
        tracing::debug!(count = places.len(), latitude, longitude, "nearby search complete");
        Ok(places)
    }
}

impl PlaceReviewSource for PlacesClient {
    type Error = SourceError;

    fn fetch(&self, place_id: &str, sort: ReviewSort) -> Result<PlaceReviews, Self::Error> {
        self.details(place_id, sort)
    }
}
