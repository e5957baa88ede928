//! Watch command implementation.

use crate::error::{CliError, Result};
use crate::output::Formatter;
use placetrust_domain::traits::{PlaceAggregateStore, PlaceReviewSource, TextSentimentScorer};
use placetrust_engine::{RefreshWorker, ScorePipeline};
use std::fmt;

/// Execute the watch command.
///
/// Runs the refresh worker on a dedicated tokio runtime, either for a fixed
/// number of cycles or until Ctrl+C.
pub fn execute_watch<Src, Sc, St>(
    place_ids: Vec<String>,
    cycles: Option<usize>,
    pipeline: ScorePipeline<Src, Sc, St>,
    formatter: &Formatter,
) -> Result<()>
where
    Src: PlaceReviewSource + Send + Sync + 'static,
    Src::Error: fmt::Display,
    Sc: TextSentimentScorer + Send + 'static,
    Sc::Error: fmt::Display,
    St: PlaceAggregateStore + Send + 'static,
    St::Error: fmt::Display,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Config(format!("Failed to start runtime: {}", e)))?;

    let interval = pipeline.config().refresh_interval_secs;
    let worker = RefreshWorker::new(pipeline, place_ids);

    println!(
        "{}",
        formatter.info(&format!(
            "Watching {} place(s) every {}s",
            worker.places().len(),
            interval
        ))
    );

    tracing::debug!(interval, cycles = ?cycles, "refresh worker starting");
    runtime.block_on(async {
        match cycles {
            Some(cycles) => {
                let summaries = worker.run_cycles(cycles).await?;
                for (i, summary) in summaries.iter().enumerate() {
                    println!("{}", formatter.cycle_summary(i + 1, summary));
                }
                Ok::<_, CliError>(())
            }
            None => {
                worker.run().await?;
                Ok(())
            }
        }
    })?;

    println!("{}", worker.metrics()?.summary());
    Ok(())
}
