//! Destination storage and the staging/upsert loader.
//!
//! The loader talks to any [`BookStore`]: it creates the destination table if
//! needed, bulk-loads the batch into a uniquely named temporary staging table,
//! then merges staging into the destination with one `INSERT ... ON CONFLICT`
//! statement inside a transaction. Reruns of the same batch converge on the
//! same destination state, and concurrent runs never share a staging table.
//!
//! Backends:
//! - [`SqliteStore`]: embedded SQLite via `rusqlite`, file or in-memory
//! - [`PostgresStore`]: PostgreSQL via `tokio-postgres` (feature `postgres`)

use std::{borrow::Cow, collections::HashMap};

use log::{info, warn};
use uuid::Uuid;

use crate::validate::BookRow;

pub mod schema;
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use self::postgres::PostgresStore;
pub use self::sqlite::SqliteStore;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to open or connect to the store
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Destination DDL failed
    #[error("Schema creation failed: {0}")]
    SchemaFailed(String),

    /// Staging table creation or bulk load failed
    #[error("Staging failed: {0}")]
    StagingFailed(String),

    /// The merge into the destination failed
    #[error("Upsert failed: {0}")]
    UpsertFailed(String),

    /// A read-only query against the destination failed
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Operations the loader needs from a relational store.
///
/// Staging tables live for the current session only; [`BookStore::drop_staging`]
/// merely releases them early.
pub trait BookStore {
    /// Short backend name for log output
    fn backend_name(&self) -> &'static str;

    /// Create the destination table if it does not exist
    fn ensure_schema(&mut self) -> StoreResult<()>;

    /// Create a temporary table structurally identical to the destination
    fn create_staging(&mut self, staging: &str) -> StoreResult<()>;

    /// Bulk-append rows to the staging table, returning the number written
    fn append_staging(&mut self, staging: &str, rows: &[BookRow]) -> StoreResult<usize>;

    /// Merge staging into the destination atomically, returning affected rows
    fn upsert_from_staging(&mut self, staging: &str) -> StoreResult<u64>;

    fn drop_staging(&mut self, staging: &str) -> StoreResult<()>;

    /// Number of rows currently in the destination
    fn count_destination(&mut self) -> StoreResult<u64>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    pub staging_table: String,
    pub staged: usize,
    /// Rows dropped because a later row in the batch shared their `book_id`
    pub duplicates_collapsed: usize,
    pub upserted: u64,
}

/// Fresh staging-table name, e.g. `_staging_books_3f9a01c2`.
pub fn staging_table_name() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{}{}", schema::STAGING_PREFIX, &token[..8])
}

/// Keeps the last row for each `book_id`, preserving batch order otherwise.
pub fn collapse_duplicate_ids(rows: &[BookRow]) -> (Cow<'_, [BookRow]>, usize) {
    let mut last_seen: HashMap<i32, usize> = HashMap::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        last_seen.insert(row.book_id, idx);
    }
    if last_seen.len() == rows.len() {
        return (Cow::Borrowed(rows), 0);
    }
    let kept: Vec<BookRow> = rows
        .iter()
        .enumerate()
        .filter(|(idx, row)| last_seen.get(&row.book_id) == Some(idx))
        .map(|(_, row)| row.clone())
        .collect();
    let collapsed = rows.len() - kept.len();
    (Cow::Owned(kept), collapsed)
}

pub fn load(store: &mut dyn BookStore, rows: &[BookRow]) -> StoreResult<LoadSummary> {
    store.ensure_schema()?;

    let (batch, duplicates_collapsed) = collapse_duplicate_ids(rows);
    if duplicates_collapsed > 0 {
        warn!(
            "Collapsed {duplicates_collapsed} row(s) sharing a book_id with a later row in the batch"
        );
    }

    let staging = staging_table_name();
    store.create_staging(&staging)?;
    let outcome = stage_and_merge(store, &staging, &batch);
    if let Err(err) = store.drop_staging(&staging) {
        warn!("Could not drop staging table {staging}: {err}");
    }
    let (staged, upserted) = outcome?;

    Ok(LoadSummary {
        staging_table: staging,
        staged,
        duplicates_collapsed,
        upserted,
    })
}

fn stage_and_merge(
    store: &mut dyn BookStore,
    staging: &str,
    rows: &[BookRow],
) -> StoreResult<(usize, u64)> {
    let staged = store.append_staging(staging, rows)?;
    info!("Rows loaded into staging table {staging}: {staged}");
    let upserted = store.upsert_from_staging(staging)?;
    info!("Upsert into {} affected {upserted} row(s)", schema::DESTINATION_TABLE);
    Ok((staged, upserted))
}
