//! I/O utilities for encoding resolution, decoding, and delimiter handling.
//!
//! All file access in book-ingest flows through this module. It provides:
//!
//! - **Encoding**: label resolution via `encoding_rs`, including the
//!   BOM-tolerant `utf-8-sig` label and the `latin1` fallback.
//! - **Decoding**: strict whole-buffer decoding (undecodable input is an
//!   error) and lossy sample decoding for heuristics.
//! - **Delimiter detection**: the tab-vs-comma sample heuristic.
//! - **Reader construction**: a `csv::ReaderBuilder` configured for
//!   permissive, all-text parsing.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use encoding_rs_io::DecodeReaderBytesBuilder;
use log::debug;

use crate::config::ConfigError;

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';
pub const DEFAULT_ENCODING_LABEL: &str = "utf-8-sig";
pub const FALLBACK_ENCODING: &Encoding = WINDOWS_1252;

/// Number of leading bytes inspected by [`detect_delimiter`].
pub const DELIMITER_SAMPLE_BYTES: u64 = 4000;

pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, ConfigError> {
    let trimmed = label.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "utf-8-sig" | "utf8-sig" | "utf_8_sig" => Ok(UTF_8),
        "latin1" | "latin-1" => Ok(WINDOWS_1252),
        _ => Encoding::for_label(trimmed.as_bytes())
            .ok_or_else(|| ConfigError::UnknownEncoding(label.to_string())),
    }
}

/// Decodes `bytes` with `encoding`, stripping a matching BOM.
///
/// Returns `None` when the input holds any sequence the encoding cannot
/// represent.
pub fn decode_strict(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

/// Reads up to [`DELIMITER_SAMPLE_BYTES`] and guesses tab or comma.
///
/// Undecodable bytes are dropped from the sample; a file that cannot be
/// opened or read yields a comma.
pub fn detect_delimiter(path: &Path, encoding: &'static Encoding) -> u8 {
    match read_sample(path, encoding) {
        Ok(sample) => delimiter_for_sample(&sample),
        Err(err) => {
            debug!("Delimiter sample of {path:?} unreadable ({err}); assuming comma");
            DEFAULT_CSV_DELIMITER
        }
    }
}

pub fn delimiter_for_sample(sample: &str) -> u8 {
    let tabs = sample.matches('\t').count();
    let commas = sample.matches(',').count();
    if tabs > commas {
        DEFAULT_TSV_DELIMITER
    } else {
        DEFAULT_CSV_DELIMITER
    }
}

fn read_sample(path: &Path, encoding: &'static Encoding) -> std::io::Result<String> {
    let file = File::open(path)?;
    let limited = BufReader::new(file).take(DELIMITER_SAMPLE_BYTES);
    let mut decoder = DecodeReaderBytesBuilder::new()
        .encoding(Some(encoding))
        .build(limited);
    let mut sample = String::new();
    decoder.read_to_string(&mut sample)?;
    sample.retain(|c| c != char::REPLACEMENT_CHARACTER);
    Ok(sample)
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(delimiter)
        .quote(b'"')
        .double_quote(true)
        .escape(Some(b'\\'))
        .flexible(true);
    builder.from_reader(reader)
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
