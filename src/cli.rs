use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Ingest a books CSV into the relational store with cleaning and upsert",
    long_about = None
)]
pub struct Cli {
    /// Path to the source CSV (falls back to $CSV_PATH, then data/books.csv)
    #[arg(long = "csv")]
    pub csv: Option<PathBuf>,
    /// Field delimiter: 'auto', ',', 'tab', ';', '|' or any single ASCII character
    #[arg(long = "sep", default_value = "auto", value_parser = parse_separator)]
    pub sep: Separator,
    /// Character encoding of the input file
    #[arg(long = "encoding", default_value = crate::io_utils::DEFAULT_ENCODING_LABEL)]
    pub encoding: String,
    /// Destination store
    #[arg(long = "backend", env = "DB_BACKEND", value_enum, default_value = "postgres")]
    pub backend: Backend,
    /// SQLite database file used with `--backend sqlite`
    #[arg(long = "sqlite-path", env = "SQLITE_PATH", default_value = "books.db")]
    pub sqlite_path: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum Backend {
    Postgres,
    Sqlite,
}

/// Delimiter requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Separator {
    #[default]
    Auto,
    Fixed(u8),
}

impl std::fmt::Display for Separator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Separator::Auto => f.write_str("auto"),
            Separator::Fixed(delim) => f.write_str(&crate::io_utils::printable_delimiter(*delim)),
        }
    }
}

pub fn parse_separator(value: &str) -> Result<Separator, String> {
    match value {
        "auto" => Ok(Separator::Auto),
        "tab" | "\t" | "\\t" => Ok(Separator::Fixed(b'\t')),
        "comma" | "," => Ok(Separator::Fixed(b',')),
        "|" | "pipe" => Ok(Separator::Fixed(b'|')),
        ";" | "semicolon" => Ok(Separator::Fixed(b';')),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character or 'auto'".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(Separator::Fixed(first as u8))
        }
    }
}
