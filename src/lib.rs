pub mod clean;
pub mod cli;
pub mod columns;
pub mod config;
pub mod dates;
pub mod io_utils;
pub mod pipeline;
pub mod reader;
pub mod store;
pub mod validate;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{cli::Cli, config::IngestConfig};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("book_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = IngestConfig::from_env(cli).context("Resolving configuration")?;
    debug!("Resolved configuration: {config:?}");
    let report = pipeline::execute(&config)
        .with_context(|| format!("Ingesting {:?}", config.csv_path))?;
    info!(
        "Summary: read {}, skipped {}, valid {}, discarded {}, staged {}, upserted {}",
        report.rows_read,
        report.rows_skipped,
        report.valid,
        report.discarded,
        report.staged,
        report.upserted
    );
    Ok(())
}
