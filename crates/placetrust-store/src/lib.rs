//! Placetrust Storage Layer
//!
//! Implements the `PlaceAggregateStore` trait on SQLite.
//!
//! # Architecture
//!
//! - `place_aggregates`: one row per place holding the running sentiment
//!   aggregate; the processed review id set is stored as a JSON array
//! - `score_snapshots`: append-only history of scoring runs, keyed by UUIDv7
//!
//! Merge-upserts run inside an `IMMEDIATE` transaction so the
//! read-modify-write of a place row is atomic even with several processes
//! sharing one database file.
//!
//! # Examples
//!
//! ```no_run
//! use placetrust_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for aggregate operations
//! ```

#![warn(missing_docs)]

use placetrust_domain::traits::PlaceAggregateStore;
use placetrust_domain::{AggregatePatch, PlaceAggregate, ScoreSnapshot};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Review id set could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Current time in milliseconds since Unix epoch
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

const SELECT_AGGREGATE: &str = "SELECT place_id, review_count, processed_review_ids, total_sentiment_sum,
        historical_sentiment_score, last_calculated_rating, final_score, last_updated
 FROM place_aggregates WHERE place_id = ?1";

/// SQLite-based implementation of PlaceAggregateStore
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should have its own
/// SqliteStore instance, or share one behind a mutex.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use placetrust_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("placetrust.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    /// Ids of every place with a stored aggregate, sorted
    pub fn place_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT place_id FROM place_aggregates ORDER BY place_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    fn row_to_aggregate(row: &Row<'_>) -> rusqlite::Result<PlaceAggregate> {
        let ids_json: String = row.get(2)?;
        let processed_review_ids: BTreeSet<String> = serde_json::from_str(&ids_json)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
            })?;

        let review_count: i64 = row.get(1)?;
        if review_count < 0 {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                1,
                rusqlite::types::Type::Integer,
                Box::new(StoreError::InvalidData(format!(
                    "negative review_count {}",
                    review_count
                ))),
            ));
        }

        Ok(PlaceAggregate {
            place_id: row.get(0)?,
            review_count: review_count as u64,
            processed_review_ids,
            total_sentiment_sum: row.get(3)?,
            historical_sentiment_score: row.get(4)?,
            last_calculated_rating: row.get(5)?,
            final_score: row.get(6)?,
            last_updated: row.get::<_, i64>(7)? as u64,
        })
    }

    fn read_aggregate(conn: &Connection, place_id: &str) -> Result<Option<PlaceAggregate>, StoreError> {
        let aggregate = conn
            .query_row(SELECT_AGGREGATE, params![place_id], Self::row_to_aggregate)
            .optional()?;
        Ok(aggregate)
    }

    fn write_aggregate(conn: &Connection, aggregate: &PlaceAggregate) -> Result<(), StoreError> {
        let ids_json = serde_json::to_string(&aggregate.processed_review_ids)?;

        conn.execute(
            "INSERT INTO place_aggregates (place_id, review_count, processed_review_ids, total_sentiment_sum,
                historical_sentiment_score, last_calculated_rating, final_score, last_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(place_id) DO UPDATE SET
                review_count = excluded.review_count,
                processed_review_ids = excluded.processed_review_ids,
                total_sentiment_sum = excluded.total_sentiment_sum,
                historical_sentiment_score = excluded.historical_sentiment_score,
                last_calculated_rating = excluded.last_calculated_rating,
                final_score = excluded.final_score,
                last_updated = excluded.last_updated",
            params![
                &aggregate.place_id,
                aggregate.review_count as i64,
                ids_json,
                aggregate.total_sentiment_sum,
                aggregate.historical_sentiment_score,
                aggregate.last_calculated_rating,
                aggregate.final_score,
                aggregate.last_updated as i64,
            ],
        )?;
        Ok(())
    }

    /// Shared body of the two merge-upsert variants
    fn merge(
        &mut self,
        place_id: &str,
        expected_review_count: Option<u64>,
        patch: &AggregatePatch,
    ) -> Result<bool, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut aggregate =
            Self::read_aggregate(&tx, place_id)?.unwrap_or_else(|| PlaceAggregate::empty(place_id));

        if let Some(expected) = expected_review_count {
            if aggregate.review_count != expected {
                tracing::debug!(
                    place_id,
                    expected,
                    actual = aggregate.review_count,
                    "conditional merge rejected"
                );
                return Ok(false);
            }
        }

        aggregate.apply(patch);
        aggregate.last_updated = now_millis();
        Self::write_aggregate(&tx, &aggregate)?;
        tx.commit()?;

        Ok(true)
    }
}

impl PlaceAggregateStore for SqliteStore {
    type Error = StoreError;

    fn get(&self, place_id: &str) -> Result<Option<PlaceAggregate>, Self::Error> {
        Self::read_aggregate(&self.conn, place_id)
    }

    fn merge_upsert(&mut self, place_id: &str, patch: &AggregatePatch) -> Result<(), Self::Error> {
        self.merge(place_id, None, patch).map(|_| ())
    }

    fn merge_upsert_if(
        &mut self,
        place_id: &str,
        expected_review_count: u64,
        patch: &AggregatePatch,
    ) -> Result<bool, Self::Error> {
        self.merge(place_id, Some(expected_review_count), patch)
    }

    fn record_snapshot(&mut self, snapshot: &ScoreSnapshot) -> Result<(), Self::Error> {
        let id = uuid::Uuid::now_v7();

        self.conn.execute(
            "INSERT INTO score_snapshots (id, place_id, final_score, historical_sentiment_score,
                current_sentiment_score, external_rating, new_reviews_processed, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.as_bytes().to_vec(),
                &snapshot.place_id,
                snapshot.final_score,
                snapshot.historical_sentiment_score,
                snapshot.current_sentiment_score,
                snapshot.external_rating,
                snapshot.new_reviews_processed as i64,
                snapshot.recorded_at as i64,
            ],
        )?;
        Ok(())
    }

    fn history(&self, place_id: &str, limit: usize) -> Result<Vec<ScoreSnapshot>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT place_id, final_score, historical_sentiment_score, current_sentiment_score,
                    external_rating, new_reviews_processed, recorded_at
             FROM score_snapshots WHERE place_id = ?1
             ORDER BY recorded_at DESC, id DESC
             LIMIT ?2",
        )?;

        let mut snapshots = stmt
            .query_map(params![place_id, limit as i64], |row| {
                Ok(ScoreSnapshot {
                    place_id: row.get(0)?,
                    final_score: row.get(1)?,
                    historical_sentiment_score: row.get(2)?,
                    current_sentiment_score: row.get(3)?,
                    external_rating: row.get(4)?,
                    new_reviews_processed: row.get::<_, i64>(5)? as u64,
                    recorded_at: row.get::<_, i64>(6)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Oldest first for charting
        snapshots.reverse();
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_is_idempotent() {
        let mut store = SqliteStore::new(":memory:").unwrap();
        store.initialize_schema().unwrap();
        assert!(store.place_ids().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_id_set_reported() {
        let store = SqliteStore::new(":memory:").unwrap();
        store
            .conn
            .execute(
                "INSERT INTO place_aggregates (place_id, processed_review_ids, last_updated)
                 VALUES ('p', 'not json', 0)",
                [],
            )
            .unwrap();

        assert!(store.get("p").is_err());
    }

    #[test]
    fn test_now_millis_is_recent() {
        // 2020-01-01 in milliseconds
        assert!(now_millis() > 1_577_836_800_000);
    }
}
