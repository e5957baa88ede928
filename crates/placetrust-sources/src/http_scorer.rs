//! HTTP sentiment scorer
//!
//! Sends review text to a remote sentiment service and reads back the raw
//! (unnormalized) score.
//!
//! Wire contract:
//!
//! ```text
//! POST {endpoint}
//! {"text": "..."}
//!
//! 200 OK
//! {"score": 3, "comparative": 0.6, "positive": ["great"], "negative": []}
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use placetrust_sources::HttpScorer;
//! use placetrust_domain::traits::TextSentimentScorer;
//!
//! let scorer = HttpScorer::new("http://localhost:8090/analyze").unwrap();
//! let raw = scorer.score("lovely staff, great coffee").unwrap();
//! println!("raw sentiment: {}", raw.raw_score);
//! ```

use crate::SourceError;
use placetrust_domain::traits::{RawSentiment, TextSentimentScorer};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default sentiment service endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8090/analyze";

/// Default timeout for scoring requests (10 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of attempts per text
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Remote sentiment scorer
pub struct HttpScorer {
    endpoint: String,
    client: reqwest::blocking::Client,
    max_retries: u32,
    backoff: Duration,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    score: f64,
    #[serde(default)]
    comparative: f64,
    #[serde(default)]
    positive: Vec<String>,
    #[serde(default)]
    negative: Vec<String>,
}

impl From<AnalyzeResponse> for RawSentiment {
    fn from(response: AnalyzeResponse) -> Self {
        Self {
            raw_score: response.score,
            comparative: response.comparative,
            positive_words: response.positive,
            negative_words: response.negative,
        }
    }
}

impl HttpScorer {
    /// Create a scorer for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SourceError::Communication(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Duration::from_millis(500),
        })
    }

    /// Set the maximum number of attempts per text
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the base backoff between attempts (doubled after each failure)
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Configured endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn attempt(&self, text: &str) -> Result<RawSentiment, Attempt> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&AnalyzeRequest { text })
            .send()
            .map_err(|e| Attempt::Retry(SourceError::Communication(format!("Request failed: {}", e))))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<AnalyzeResponse>()
                .map(RawSentiment::from)
                .map_err(|e| {
                    Attempt::Fatal(SourceError::InvalidResponse(format!(
                        "Failed to parse response: {}",
                        e
                    )))
                });
        }

        let body = response
            .text()
            .unwrap_or_else(|_| "Unknown error".to_string());
        let error = SourceError::Provider {
            status: status.as_u16().to_string(),
            message: body,
        };

        // Client errors will not improve on retry
        if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
            Err(Attempt::Fatal(error))
        } else {
            Err(Attempt::Retry(error))
        }
    }
}

enum Attempt {
    Retry(SourceError),
    Fatal(SourceError),
}

impl TextSentimentScorer for HttpScorer {
    type Error = SourceError;

    fn score(&self, text: &str) -> Result<RawSentiment, Self::Error> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            match self.attempt(text) {
                Ok(raw) => return Ok(raw),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry(e)) => {
                    tracing::debug!(attempt = attempt + 1, error = %e, "sentiment request failed");
                    last_error = Some(e);
                }
            }

            if attempt + 1 < self.max_retries {
                // Exponential backoff: base, 2x base, 4x base, ...
                std::thread::sleep(self.backoff * 2u32.pow(attempt));
            }
        }

        Err(last_error
            .unwrap_or_else(|| SourceError::Communication("Max retries exceeded".to_string())))
    }
}
