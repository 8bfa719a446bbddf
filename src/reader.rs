//! Resilient whole-file CSV reading.
//!
//! A read is an ordered list of [`ReadStrategy`] values tried until one
//! succeeds. Every cell stays text, empty cells stay empty strings, and rows
//! the parser rejects or whose width differs from the header are skipped
//! rather than failing the read. Only when every strategy fails does the
//! caller see a [`ReadError`], carrying the failure of each attempt.

use std::{fmt, fs, path::Path};

use encoding_rs::Encoding;
use log::{debug, info, warn};

use crate::{
    cli::Separator,
    io_utils::{self, FALLBACK_ENCODING, printable_delimiter},
};

/// Delimiters considered when inferring the dialect of a file.
const SNIFF_CANDIDATES: &[u8] = b",\t;|";
/// Lines inspected when inferring the dialect of a file.
const SNIFF_SAMPLE_LINES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterChoice {
    Fixed(u8),
    Infer,
}

#[derive(Debug, Clone, Copy)]
pub struct ReadStrategy {
    pub delimiter: DelimiterChoice,
    pub encoding: &'static Encoding,
}

impl fmt::Display for ReadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.delimiter {
            DelimiterChoice::Fixed(delim) => write!(
                f,
                "delimiter '{}' with {}",
                printable_delimiter(delim),
                self.encoding.name()
            ),
            DelimiterChoice::Infer => write!(f, "inferred delimiter with {}", self.encoding.name()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttemptFailure {
    pub strategy: String,
    pub message: String,
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Unable to read {path}: every strategy failed ({})", join_attempts(.attempts))]
    Exhausted {
        path: String,
        attempts: Vec<AttemptFailure>,
    },
}

fn join_attempts(attempts: &[AttemptFailure]) -> String {
    attempts
        .iter()
        .map(|attempt| attempt.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Text-only table produced by a successful read.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Rows dropped because they were malformed.
    pub skipped: usize,
    pub delimiter: u8,
    pub encoding: &'static str,
}

impl RawTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Builds the fallback chain for a caller-chosen separator.
///
/// `auto` is resolved through [`io_utils::detect_delimiter`] before the chain
/// is built, so the first and last strategies share the same guess.
pub fn strategies_for(
    path: &Path,
    separator: Separator,
    encoding: &'static Encoding,
) -> Vec<ReadStrategy> {
    let chosen = match separator {
        Separator::Fixed(delim) => delim,
        Separator::Auto => io_utils::detect_delimiter(path, encoding),
    };
    vec![
        ReadStrategy {
            delimiter: DelimiterChoice::Fixed(chosen),
            encoding,
        },
        ReadStrategy {
            delimiter: DelimiterChoice::Infer,
            encoding,
        },
        ReadStrategy {
            delimiter: DelimiterChoice::Fixed(chosen),
            encoding: FALLBACK_ENCODING,
        },
    ]
}

pub fn read_table(
    path: &Path,
    separator: Separator,
    encoding: &'static Encoding,
) -> Result<RawTable, ReadError> {
    let strategies = strategies_for(path, separator, encoding);
    read_with_strategies(path, &strategies)
}

pub fn read_with_strategies(
    path: &Path,
    strategies: &[ReadStrategy],
) -> Result<RawTable, ReadError> {
    let mut attempts = Vec::with_capacity(strategies.len());
    for (idx, strategy) in strategies.iter().enumerate() {
        debug!("Read attempt {} for {path:?}: {strategy}", idx + 1);
        match attempt_read(path, strategy) {
            Ok(table) => {
                if idx > 0 {
                    info!("Read {path:?} using fallback strategy {}: {strategy}", idx + 1);
                }
                return Ok(table);
            }
            Err(message) => {
                warn!("Read strategy {} ({strategy}) failed: {message}", idx + 1);
                attempts.push(AttemptFailure {
                    strategy: strategy.to_string(),
                    message,
                });
            }
        }
    }
    Err(ReadError::Exhausted {
        path: path.display().to_string(),
        attempts,
    })
}

fn attempt_read(path: &Path, strategy: &ReadStrategy) -> Result<RawTable, String> {
    let bytes = fs::read(path).map_err(|err| format!("reading file: {err}"))?;
    let text = io_utils::decode_strict(&bytes, strategy.encoding)
        .ok_or_else(|| format!("input is not valid {}", strategy.encoding.name()))?;
    let delimiter = match strategy.delimiter {
        DelimiterChoice::Fixed(delim) => delim,
        DelimiterChoice::Infer => sniff_delimiter(&text)
            .ok_or_else(|| "could not determine delimiter".to_string())?,
    };
    let mut table = parse_text(&text, delimiter)?;
    table.encoding = strategy.encoding.name();
    Ok(table)
}

/// Parses decoded text into a [`RawTable`], skipping malformed rows.
pub fn parse_text(text: &str, delimiter: u8) -> Result<RawTable, String> {
    let mut reader = io_utils::open_csv_reader(text.as_bytes(), delimiter, true);
    let headers = reader
        .headers()
        .map_err(|err| format!("reading header row: {err}"))?
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err("no columns to parse from file".to_string());
    }

    let width = headers.len();
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for (idx, record) in reader.records().enumerate() {
        match record {
            Ok(record) if record.len() == width => {
                rows.push(record.iter().map(|field| field.to_string()).collect());
            }
            Ok(record) => {
                skipped += 1;
                debug!(
                    "Skipping row {}: expected {width} field(s), found {}",
                    idx + 2,
                    record.len()
                );
            }
            Err(err) => {
                skipped += 1;
                debug!("Skipping row {}: {err}", idx + 2);
            }
        }
    }

    Ok(RawTable {
        headers,
        rows,
        skipped,
        delimiter,
        encoding: "",
    })
}

/// Picks the candidate delimiter that splits the first lines most consistently.
///
/// A candidate only qualifies when its most common field count exceeds one.
/// Ties favour more columns, then the candidate order.
pub fn sniff_delimiter(text: &str) -> Option<u8> {
    let sample = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(SNIFF_SAMPLE_LINES)
        .collect::<Vec<_>>()
        .join("\n");
    if sample.is_empty() {
        return None;
    }

    let mut best: Option<(usize, usize, u8)> = None;
    for &candidate in SNIFF_CANDIDATES {
        let mut reader = io_utils::open_csv_reader(sample.as_bytes(), candidate, false);
        let mut widths: Vec<usize> = Vec::new();
        for record in reader.records().flatten() {
            widths.push(record.len());
        }
        let Some((mode, hits)) = most_common(&widths) else {
            continue;
        };
        if mode < 2 {
            continue;
        }
        let better = match best {
            None => true,
            Some((best_hits, best_mode, _)) => {
                hits > best_hits || (hits == best_hits && mode > best_mode)
            }
        };
        if better {
            best = Some((hits, mode, candidate));
        }
    }
    best.map(|(_, _, delim)| delim)
}

fn most_common(widths: &[usize]) -> Option<(usize, usize)> {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for &width in widths {
        match counts.iter_mut().find(|(w, _)| *w == width) {
            Some((_, count)) => *count += 1,
            None => counts.push((width, 1)),
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{UTF_8, WINDOWS_1252};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(bytes).expect("write temp file");
        file
    }

    #[test]
    fn parse_text_keeps_cells_as_text_and_skips_ragged_rows() {
        let text = "bookID,title,num_pages\n1,Dune,0412\n2,Too,Many,Fields\n3,,\n";
        let table = parse_text(text, b',').unwrap();
        assert_eq!(table.headers, vec!["bookID", "title", "num_pages"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][2], "0412");
        assert_eq!(table.rows[1], vec!["3", "", ""]);
        assert_eq!(table.skipped, 1);
    }

    #[test]
    fn parse_text_honours_quotes_and_backslash_escapes() {
        let text = "id,title\n1,\"Hello, \\\"World\\\"\"\n2,\"Say \"\"hi\"\"\"\n";
        let table = parse_text(text, b',').unwrap();
        assert_eq!(table.rows[0][1], "Hello, \"World\"");
        assert_eq!(table.rows[1][1], "Say \"hi\"");
    }

    #[test]
    fn parse_text_rejects_empty_input() {
        assert!(parse_text("", b',').is_err());
    }

    #[test]
    fn sniffer_prefers_consistent_delimiter() {
        let text = "id;title;authors\n1;Dune;Frank Herbert\n2;Emma, Vol. 1;Jane Austen\n";
        assert_eq!(sniff_delimiter(text), Some(b';'));
        assert_eq!(sniff_delimiter("just one column\nanother\n"), None);
    }

    #[test]
    fn latin1_file_falls_back_to_third_strategy() {
        let file = temp_file(b"bookID,title\n1,Les Mis\xe9rables\n");
        let table = read_table(file.path(), Separator::Auto, UTF_8).unwrap();
        assert_eq!(table.encoding, WINDOWS_1252.name());
        assert_eq!(table.rows[0][1], "Les Misérables");
    }

    #[test]
    fn inference_strategy_sniffs_pipe_delimiter() {
        let file = temp_file(b"bookID|title|authors\n1|Dune|Herbert\n2|Emma|Austen\n");
        let strategies = [ReadStrategy {
            delimiter: DelimiterChoice::Infer,
            encoding: UTF_8,
        }];
        let table = read_with_strategies(file.path(), &strategies).unwrap();
        assert_eq!(table.delimiter, b'|');
        assert_eq!(table.headers, vec!["bookID", "title", "authors"]);
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn missing_file_exhausts_every_strategy() {
        let path = Path::new("/no/such/dir/books.csv");
        let err = read_table(path, Separator::Fixed(b','), UTF_8).unwrap_err();
        let ReadError::Exhausted { attempts, .. } = &err;
        assert_eq!(attempts.len(), 3);
        assert!(err.to_string().contains("reading file"));
    }
}
