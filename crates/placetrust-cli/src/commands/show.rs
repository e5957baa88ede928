//! Show command implementation.

use crate::cli::ShowArgs;
use crate::error::Result;
use crate::output::Formatter;
use placetrust_domain::traits::PlaceAggregateStore;
use placetrust_store::SqliteStore;

/// Execute the show command.
pub fn execute_show(args: ShowArgs, store: &SqliteStore, formatter: &Formatter) -> Result<()> {
    let aggregates = match args.place_id {
        Some(place_id) => match store.get(&place_id)? {
            Some(aggregate) => vec![aggregate],
            None => {
                println!(
                    "{}",
                    formatter.warning(&format!("No score recorded for '{}'", place_id))
                );
                return Ok(());
            }
        },
        None => {
            let mut aggregates = Vec::new();
            for place_id in store.place_ids()? {
                if let Some(aggregate) = store.get(&place_id)? {
                    aggregates.push(aggregate);
                }
            }
            aggregates
        }
    };

    println!("{}", formatter.format_aggregates(&aggregates)?);
    Ok(())
}
