//! One ingestion run: read, map, clean, validate, load.

use std::path::PathBuf;

use log::info;

use crate::{
    clean, columns,
    config::{IngestConfig, StoreConfig},
    io_utils::printable_delimiter,
    reader::{self, ReadError},
    store::{self, BookStore, SqliteStore, StoreError},
    validate,
};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("CSV not found at {0:?}")]
    InputMissing(PathBuf),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counts for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub rows_read: usize,
    pub rows_skipped: usize,
    pub valid: usize,
    pub discarded: usize,
    pub staged: usize,
    pub duplicates_collapsed: usize,
    pub upserted: u64,
    pub destination_rows: u64,
}

pub fn execute(config: &IngestConfig) -> Result<IngestReport, IngestError> {
    ensure_input(config)?;
    let mut store = open_store(&config.store)?;
    info!("Destination backend: {}", store.backend_name());
    run_with_store(config, store.as_mut())
}

pub fn open_store(config: &StoreConfig) -> Result<Box<dyn BookStore>, StoreError> {
    match config {
        StoreConfig::Sqlite { path } => {
            info!("Opening SQLite database {path:?}");
            Ok(Box::new(SqliteStore::open(path)?))
        }
        #[cfg(feature = "postgres")]
        StoreConfig::Postgres(pg) => {
            info!("Connecting to {}", pg.describe());
            Ok(Box::new(store::PostgresStore::connect(pg)?))
        }
        #[cfg(not(feature = "postgres"))]
        StoreConfig::Postgres(pg) => Err(StoreError::ConnectionFailed(format!(
            "{} requested but book-ingest was built without the 'postgres' feature",
            pg.describe()
        ))),
    }
}

fn ensure_input(config: &IngestConfig) -> Result<(), IngestError> {
    if config.csv_path.is_file() {
        Ok(())
    } else {
        Err(IngestError::InputMissing(config.csv_path.clone()))
    }
}

/// Runs the pipeline against an already opened store.
pub fn run_with_store(
    config: &IngestConfig,
    store: &mut dyn BookStore,
) -> Result<IngestReport, IngestError> {
    ensure_input(config)?;
    let path = &config.csv_path;
    info!(
        "Reading '{}' (separator {}, encoding {})",
        path.display(),
        config.separator,
        config.encoding_label
    );
    let table = reader::read_table(path, config.separator, config.encoding)?;
    info!(
        "Parsed with delimiter '{}' and encoding {}",
        printable_delimiter(table.delimiter),
        table.encoding
    );
    info!(
        "Rows read: {} (malformed rows skipped: {})",
        table.row_count(),
        table.skipped
    );

    let raw = columns::map_columns(&table);
    let cleaned = clean::clean_records(&raw);
    let validation = validate::validate(cleaned);
    info!(
        "Valid records: {} (discarded: {})",
        validation.retained_count(),
        validation.discarded()
    );

    let summary = store::load(store, &validation.rows)?;
    let destination_rows = store.count_destination()?;
    info!(
        "Ingest complete: {} row(s) upserted via {}; {} now holds {destination_rows} row(s)",
        summary.upserted,
        summary.staging_table,
        store::schema::DESTINATION_TABLE
    );

    Ok(IngestReport {
        rows_read: table.row_count(),
        rows_skipped: table.skipped,
        valid: validation.retained_count(),
        discarded: validation.discarded(),
        staged: summary.staged,
        duplicates_collapsed: summary.duplicates_collapsed,
        upserted: summary.upserted,
        destination_rows,
    })
}
