//! Score command implementation.

use crate::error::Result;
use crate::output::Formatter;
use placetrust_domain::traits::{PlaceAggregateStore, PlaceReviewSource, TextSentimentScorer};
use placetrust_engine::{ScorePipeline, ScoreReport};
use std::fmt;

/// Execute the score command.
///
/// Places that fail are reported and skipped; the command fails only when
/// every place failed.
pub fn execute_score<Src, Sc, St>(
    place_ids: &[String],
    pipeline: &mut ScorePipeline<Src, Sc, St>,
    formatter: &Formatter,
) -> Result<Vec<ScoreReport>>
where
    Src: PlaceReviewSource + Sync,
    Src::Error: fmt::Display,
    Sc: TextSentimentScorer,
    Sc::Error: fmt::Display,
    St: PlaceAggregateStore,
    St::Error: fmt::Display,
{
    let mut reports = Vec::with_capacity(place_ids.len());
    let mut last_error = None;

    for (place_id, result) in pipeline.score_places(place_ids) {
        match result {
            Ok(report) => {
                if !report.persisted {
                    eprintln!(
                        "{}",
                        formatter.warning(&format!("Score for '{}' was not saved", place_id))
                    );
                }
                reports.push(report);
            }
            Err(e) => {
                eprintln!("{}", formatter.error(&format!("{}: {}", place_id, e)));
                last_error = Some(e);
            }
        }
    }

    if reports.is_empty() {
        if let Some(e) = last_error {
            return Err(e.into());
        }
    }

    println!("{}", formatter.format_reports(&reports)?);
    Ok(reports)
}
