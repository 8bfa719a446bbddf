//! SQLite backend.
//!
//! The staging table is created in the connection's `temp` schema, so it is
//! private to this connection and vanishes when the connection closes.

use std::path::Path;

use log::debug;
use rusqlite::{Connection, params};
use rust_decimal::prelude::ToPrimitive;

use super::{
    BookStore, StoreError, StoreResult,
    schema::{self, Dialect},
};
use crate::validate::BookRow;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to open SQLite database {path:?}: {e}"))
        })?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to open in-memory SQLite: {e}"))
        })?;
        Ok(Self { conn })
    }

    /// Underlying connection, for read-side queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl BookStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn ensure_schema(&mut self) -> StoreResult<()> {
        self.conn
            .execute_batch(&schema::create_destination_sql(Dialect::Sqlite))
            .map_err(|e| StoreError::SchemaFailed(format!("Failed to create books table: {e}")))
    }

    fn create_staging(&mut self, staging: &str) -> StoreResult<()> {
        debug!("Creating staging table {staging}");
        self.conn
            .execute_batch(&schema::create_staging_sql(Dialect::Sqlite, staging))
            .map_err(|e| {
                StoreError::StagingFailed(format!("Failed to create staging table {staging}: {e}"))
            })
    }

    fn append_staging(&mut self, staging: &str, rows: &[BookRow]) -> StoreResult<usize> {
        let staging_err =
            |e: rusqlite::Error| StoreError::StagingFailed(format!("Bulk load into {staging}: {e}"));

        let tx = self.conn.transaction().map_err(staging_err)?;
        {
            let mut stmt = tx
                .prepare(&schema::insert_staging_sql(Dialect::Sqlite, staging))
                .map_err(staging_err)?;
            for row in rows {
                stmt.execute(params![
                    row.book_id,
                    row.title,
                    row.authors_raw,
                    row.average_rating.and_then(|d| d.to_f64()),
                    row.isbn,
                    row.isbn13,
                    row.language_code,
                    row.num_pages,
                    row.ratings_count,
                    row.text_reviews_count,
                    row.publication_date,
                    row.publisher,
                ])
                .map_err(staging_err)?;
            }
        }
        tx.commit().map_err(staging_err)?;
        Ok(rows.len())
    }

    fn upsert_from_staging(&mut self, staging: &str) -> StoreResult<u64> {
        let upsert_err = |e: rusqlite::Error| StoreError::UpsertFailed(e.to_string());

        let tx = self.conn.transaction().map_err(upsert_err)?;
        let affected = tx
            .execute(&schema::upsert_sql(staging), [])
            .map_err(upsert_err)?;
        tx.commit().map_err(upsert_err)?;
        Ok(affected as u64)
    }

    fn drop_staging(&mut self, staging: &str) -> StoreResult<()> {
        self.conn
            .execute_batch(&schema::drop_staging_sql(staging))
            .map_err(|e| StoreError::StagingFailed(format!("Failed to drop {staging}: {e}")))
    }

    fn count_destination(&mut self) -> StoreResult<u64> {
        self.conn
            .query_row(&schema::count_destination_sql(), [], |row| row.get::<_, i64>(0))
            .map(|count| count as u64)
            .map_err(|e| StoreError::QueryFailed(format!("Failed to count books: {e}")))
    }
}
