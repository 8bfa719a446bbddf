//! PostgreSQL backend.
//!
//! Drives a single `tokio-postgres` connection from a current-thread runtime
//! so the rest of the pipeline stays synchronous. One connection means one
//! session, which is what scopes the `TEMP` staging table to this run.

use log::{debug, error};
use tokio::runtime::Runtime;
use tokio_postgres::{Client, NoTls, types::ToSql};

use super::{
    BookStore, StoreError, StoreResult,
    schema::{self, Dialect},
};
use crate::{config::PostgresConfig, validate::BookRow};

pub struct PostgresStore {
    runtime: Runtime,
    client: Client,
    /// Connection target with the password masked.
    target: String,
}

impl PostgresStore {
    pub fn connect(config: &PostgresConfig) -> StoreResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                StoreError::ConnectionFailed(format!("Failed to start async runtime: {e}"))
            })?;

        let mut pg = tokio_postgres::Config::new();
        pg.host(&config.host)
            .port(config.port)
            .user(&config.user)
            .password(config.password.as_bytes())
            .dbname(&config.dbname)
            .application_name("book-ingest");

        let target = config.describe();
        let (client, connection) = runtime.block_on(pg.connect(NoTls)).map_err(|e| {
            StoreError::ConnectionFailed(format!("Failed to connect to {target}: {e}"))
        })?;

        // Polled whenever the runtime is driven by a client call.
        runtime.spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {e}");
            }
        });
        debug!("Connected to {target}");

        Ok(Self {
            runtime,
            client,
            target,
        })
    }
}

impl BookStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    fn ensure_schema(&mut self) -> StoreResult<()> {
        let Self {
            runtime, client, ..
        } = self;
        runtime
            .block_on(client.batch_execute(&schema::create_destination_sql(Dialect::Postgres)))
            .map_err(|e| StoreError::SchemaFailed(format!("Failed to create books table: {e}")))
    }

    fn create_staging(&mut self, staging: &str) -> StoreResult<()> {
        debug!("Creating staging table {staging}");
        let Self {
            runtime, client, ..
        } = self;
        runtime
            .block_on(client.batch_execute(&schema::create_staging_sql(Dialect::Postgres, staging)))
            .map_err(|e| {
                StoreError::StagingFailed(format!("Failed to create staging table {staging}: {e}"))
            })
    }

    fn append_staging(&mut self, staging: &str, rows: &[BookRow]) -> StoreResult<usize> {
        let Self {
            runtime, client, ..
        } = self;
        let sql = schema::insert_staging_sql(Dialect::Postgres, staging);
        runtime
            .block_on(async {
                let tx = client.transaction().await?;
                let stmt = tx.prepare(&sql).await?;
                for row in rows {
                    let params: [&(dyn ToSql + Sync); 12] = [
                        &row.book_id,
                        &row.title,
                        &row.authors_raw,
                        &row.average_rating,
                        &row.isbn,
                        &row.isbn13,
                        &row.language_code,
                        &row.num_pages,
                        &row.ratings_count,
                        &row.text_reviews_count,
                        &row.publication_date,
                        &row.publisher,
                    ];
                    tx.execute(&stmt, &params).await?;
                }
                tx.commit().await?;
                Ok::<usize, tokio_postgres::Error>(rows.len())
            })
            .map_err(|e| StoreError::StagingFailed(format!("Bulk load into {staging}: {e}")))
    }

    fn upsert_from_staging(&mut self, staging: &str) -> StoreResult<u64> {
        let Self {
            runtime, client, ..
        } = self;
        let sql = schema::upsert_sql(staging);
        runtime
            .block_on(async {
                let tx = client.transaction().await?;
                let affected = tx.execute(sql.as_str(), &[]).await?;
                tx.commit().await?;
                Ok::<u64, tokio_postgres::Error>(affected)
            })
            .map_err(|e| StoreError::UpsertFailed(e.to_string()))
    }

    fn drop_staging(&mut self, staging: &str) -> StoreResult<()> {
        let Self {
            runtime, client, ..
        } = self;
        runtime
            .block_on(client.batch_execute(&schema::drop_staging_sql(staging)))
            .map_err(|e| StoreError::StagingFailed(format!("Failed to drop {staging}: {e}")))
    }

    fn count_destination(&mut self) -> StoreResult<u64> {
        let Self {
            runtime,
            client,
            target,
        } = self;
        let row = runtime
            .block_on(client.query_one(schema::count_destination_sql().as_str(), &[]))
            .map_err(|e| {
                StoreError::QueryFailed(format!("Failed to count books on {target}: {e}"))
            })?;
        let count: i64 = row.get(0);
        Ok(count as u64)
    }
}
