//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use placetrust_domain::{PlaceAggregate, ScoreSnapshot};
use placetrust_engine::{CycleSummary, ScoreReport};
use placetrust_sources::NearbyPlace;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
    Table,
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Active output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format scoring run results.
    pub fn format_reports(&self, reports: &[ScoreReport]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<serde_json::Value> = reports
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "place_id": r.place_id,
                            "name": r.name,
                            "address": r.address,
                            "final_score": r.final_score.value,
                            "historical_sentiment_score": r.final_score.historical_component,
                            "current_sentiment_score": r.current_sentiment_score,
                            "external_rating": r.final_score.external_rating,
                            "review_count": r.aggregate.review_count,
                            "new_reviews_processed": r.new_reviews_processed,
                            "skipped": r.skipped.iter().map(|s| &s.review_id).collect::<Vec<_>>(),
                            "rejected": r.rejected,
                            "persisted": r.persisted
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(reports
                .iter()
                .map(|r| format!("{} {}", r.place_id, r.final_score.rounded()))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if reports.is_empty() {
                    return Ok(self.colorize("No places scored.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Place", "Name", "Address", "Score", "Historical", "Rating", "Reviews", "New", "Skipped", "Saved"]);

                for r in reports {
                    builder.push_record([
                        r.place_id.clone(),
                        r.name.clone().unwrap_or_else(|| "-".to_string()),
                        r.address.clone().unwrap_or_else(|| "-".to_string()),
                        self.score_cell(r.final_score.value),
                        format!("{:.2}", r.final_score.historical_component),
                        format!("{:.1}", r.final_score.external_rating),
                        r.aggregate.review_count.to_string(),
                        r.new_reviews_processed.to_string(),
                        r.skipped.len().to_string(),
                        if r.persisted { "yes".to_string() } else { self.colorize("no", "red") },
                    ]);
                }

                Ok(self.render(builder))
            }
        }
    }

    /// Format stored aggregates.
    pub fn format_aggregates(&self, aggregates: &[PlaceAggregate]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<serde_json::Value> = aggregates
                    .iter()
                    .map(|a| {
                        serde_json::json!({
                            "place_id": a.place_id,
                            "final_score": a.final_score,
                            "review_count": a.review_count,
                            "total_sentiment_sum": a.total_sentiment_sum,
                            "historical_sentiment_score": a.historical_sentiment_score,
                            "last_calculated_rating": a.last_calculated_rating,
                            "processed_review_ids": a.processed_review_ids,
                            "last_updated": a.last_updated
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(aggregates
                .iter()
                .map(|a| match a.final_score {
                    Some(score) => format!("{} {}", a.place_id, score.round()),
                    None => a.place_id.clone(),
                })
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if aggregates.is_empty() {
                    return Ok(self.colorize("No places stored.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Place", "Score", "Reviews", "Historical", "Rating", "Updated"]);

                for a in aggregates {
                    builder.push_record([
                        a.place_id.clone(),
                        a.final_score
                            .map(|s| self.score_cell(s))
                            .unwrap_or_else(|| "-".to_string()),
                        a.review_count.to_string(),
                        format!("{:.2}", a.historical_sentiment_score),
                        format!("{:.1}", a.last_calculated_rating),
                        a.last_updated.to_string(),
                    ]);
                }

                Ok(self.render(builder))
            }
        }
    }

    /// Format score history, oldest first.
    pub fn format_history(&self, snapshots: &[ScoreSnapshot]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<serde_json::Value> = snapshots
                    .iter()
                    .map(|s| {
                        serde_json::json!({
                            "recorded_at": s.recorded_at,
                            "final_score": s.final_score,
                            "historical_sentiment_score": s.historical_sentiment_score,
                            "current_sentiment_score": s.current_sentiment_score,
                            "external_rating": s.external_rating,
                            "new_reviews_processed": s.new_reviews_processed
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(snapshots
                .iter()
                .map(|s| format!("{} {}", s.recorded_at, s.final_score.round()))
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if snapshots.is_empty() {
                    return Ok(self.colorize("No history recorded.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Recorded", "Score", "Historical", "Current", "Rating", "New"]);

                for s in snapshots {
                    builder.push_record([
                        s.recorded_at.to_string(),
                        self.score_cell(s.final_score),
                        format!("{:.2}", s.historical_sentiment_score),
                        format!("{:.2}", s.current_sentiment_score),
                        format!("{:.1}", s.external_rating),
                        s.new_reviews_processed.to_string(),
                    ]);
                }

                Ok(self.render(builder))
            }
        }
    }

    /// Format nearby search results.
    pub fn format_nearby(&self, places: &[NearbyPlace]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let values: Vec<serde_json::Value> = places
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "place_id": p.place_id,
                            "name": p.name,
                            "rating": p.rating,
                            "vicinity": p.vicinity,
                            "user_ratings_total": p.user_ratings_total
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&values)?)
            }
            OutputFormat::Quiet => Ok(places
                .iter()
                .map(|p| p.place_id.clone())
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if places.is_empty() {
                    return Ok(self.colorize("No places found.", "yellow"));
                }

                let mut builder = Builder::default();
                builder.push_record(["Place ID", "Name", "Rating", "Ratings", "Vicinity"]);

                for p in places {
                    builder.push_record([
                        p.place_id.clone(),
                        p.name.clone(),
                        p.rating.map(|r| format!("{:.1}", r)).unwrap_or_else(|| "-".to_string()),
                        p.user_ratings_total.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string()),
                        p.vicinity.clone().unwrap_or_default(),
                    ]);
                }

                Ok(self.render(builder))
            }
        }
    }

    /// Format a refresh cycle summary.
    pub fn cycle_summary(&self, cycle: usize, summary: &CycleSummary) -> String {
        let msg = format!(
            "Cycle {}: {} scored, {} failed, {} new review(s)",
            cycle, summary.scored, summary.failed, summary.new_reviews
        );
        if summary.failed > 0 {
            self.warning(&msg)
        } else {
            self.success(&msg)
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn render(&self, builder: Builder) -> String {
        let mut table: Table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Rounded score, colored by band.
    fn score_cell(&self, score: f64) -> String {
        let text = format!("{}", score.round());
        let color = if score >= 70.0 {
            "green"
        } else if score >= 40.0 {
            "yellow"
        } else {
            "red"
        };
        self.colorize(&text, color)
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}
