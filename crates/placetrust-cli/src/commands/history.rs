//! History command implementation.

use crate::cli::HistoryArgs;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use placetrust_domain::traits::PlaceAggregateStore;
use placetrust_store::SqliteStore;

/// Execute the history command.
pub fn execute_history(args: HistoryArgs, store: &SqliteStore, formatter: &Formatter) -> Result<()> {
    if args.limit == 0 {
        return Err(CliError::InvalidInput("Limit must be at least 1".to_string()));
    }

    let snapshots = store.history(&args.place_id, args.limit)?;
    println!("{}", formatter.format_history(&snapshots)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;

    #[test]
    fn test_zero_limit_rejected() {
        let store = SqliteStore::new(":memory:").unwrap();
        let formatter = Formatter::new(OutputFormat::Table, false);
        let args = HistoryArgs {
            place_id: "p".to_string(),
            limit: 0,
        };
        assert!(matches!(
            execute_history(args, &store, &formatter),
            Err(CliError::InvalidInput(_))
        ));
    }
}
