//! Per-cell coercion and per-record normalization.
//!
//! Every function here is total: a cell that cannot be interpreted becomes
//! `None` and the record carries on. Failures are never surfaced per cell.

use chrono::NaiveDate;
use rust_decimal::{Decimal, prelude::FromPrimitive};

use crate::{
    columns::{Column, RawRecord},
    dates::parse_date_lenient,
};

pub const TITLE_MAX_CHARS: usize = 400;
pub const AUTHORS_MAX_CHARS: usize = 400;
pub const PUBLISHER_MAX_CHARS: usize = 200;
pub const LANGUAGE_CODE_MAX_CHARS: usize = 10;
pub const ISBN_MAX_CHARS: usize = 20;

/// `NUMERIC(4,2)` holds magnitudes strictly below this bound.
const RATING_LIMIT: f64 = 100.0;
const RATING_SCALE: u32 = 2;

/// Typed record built from one [`RawRecord`]; not yet validated.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanedRecord {
    pub book_id: Option<i32>,
    pub title: String,
    pub authors_raw: String,
    pub average_rating: Option<Decimal>,
    pub isbn: Option<String>,
    pub isbn13: Option<String>,
    pub language_code: Option<String>,
    pub num_pages: Option<i32>,
    pub ratings_count: Option<i32>,
    pub text_reviews_count: Option<i32>,
    pub publication_date: Option<NaiveDate>,
    pub publisher: Option<String>,
}

pub fn coerce_float(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Integer coercion through float parsing, so `"12.0"` becomes `12`.
pub fn coerce_int(value: &str) -> Option<i64> {
    let parsed = coerce_float(value)?.trunc();
    if parsed < i64::MIN as f64 || parsed >= i64::MAX as f64 {
        return None;
    }
    Some(parsed as i64)
}

/// [`coerce_int`] narrowed to an `INTEGER` column.
pub fn coerce_i32(value: &str) -> Option<i32> {
    coerce_int(value).and_then(|v| i32::try_from(v).ok())
}

/// Rating coerced into a two-decimal value that fits `NUMERIC(4,2)`.
pub fn coerce_rating(value: &str) -> Option<Decimal> {
    let parsed = coerce_float(value)?;
    let rounded = Decimal::from_f64(parsed)?.round_dp(RATING_SCALE);
    if rounded.abs() >= Decimal::from_f64(RATING_LIMIT)? {
        return None;
    }
    Some(rounded)
}

/// Keeps ASCII digits and `X`/`x`; an empty result is `None`.
pub fn normalize_isbn(value: &str) -> Option<String> {
    let stripped: String = value
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, 'X' | 'x'))
        .collect();
    if stripped.is_empty() {
        None
    } else {
        Some(stripped)
    }
}

/// Moves an ISBN-13 found in the `isbn` slot (or an ISBN-10 found in the
/// `isbn13` slot) to where it belongs.
///
/// The second check sees the result of the first: once an ISBN-13 has been
/// moved out of `isbn`, the ISBN-10 check no longer applies to the pair.
pub fn correct_isbn_swap(
    isbn: Option<String>,
    isbn13: Option<String>,
) -> (Option<String>, Option<String>) {
    let (mut isbn, mut isbn13) = (isbn, isbn13);
    if has_len(&isbn, 13) && !has_len(&isbn13, 13) {
        isbn13 = isbn.take();
    }
    if has_len(&isbn13, 10) && !has_len(&isbn, 10) {
        isbn = isbn13.take();
    }
    (isbn, isbn13)
}

fn has_len(value: &Option<String>, len: usize) -> bool {
    value.as_deref().is_some_and(|v| v.chars().count() == len)
}

/// Trims then truncates to `max_chars` characters.
pub fn trim_truncate(value: &str, max_chars: usize) -> String {
    value.trim().chars().take(max_chars).collect()
}

fn optional_text(value: &str, max_chars: usize) -> Option<String> {
    let cleaned = trim_truncate(value, max_chars);
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

pub fn clean_record(raw: &RawRecord) -> CleanedRecord {
    let isbn = normalize_isbn(raw.get(Column::Isbn)).map(|v| trim_truncate(&v, ISBN_MAX_CHARS));
    let isbn13 =
        normalize_isbn(raw.get(Column::Isbn13)).map(|v| trim_truncate(&v, ISBN_MAX_CHARS));
    let (isbn, isbn13) = correct_isbn_swap(isbn, isbn13);

    CleanedRecord {
        book_id: coerce_i32(raw.get(Column::BookId)),
        title: trim_truncate(raw.get(Column::Title), TITLE_MAX_CHARS),
        authors_raw: trim_truncate(raw.get(Column::Authors), AUTHORS_MAX_CHARS),
        average_rating: coerce_rating(raw.get(Column::AverageRating)),
        isbn,
        isbn13,
        language_code: optional_text(raw.get(Column::LanguageCode), LANGUAGE_CODE_MAX_CHARS),
        num_pages: coerce_i32(raw.get(Column::NumPages)),
        ratings_count: coerce_i32(raw.get(Column::RatingsCount)),
        text_reviews_count: coerce_i32(raw.get(Column::TextReviewsCount)),
        publication_date: parse_date_lenient(raw.get(Column::PublicationDate)),
        publisher: optional_text(raw.get(Column::Publisher), PUBLISHER_MAX_CHARS),
    }
}

pub fn clean_records(raw: &[RawRecord]) -> Vec<CleanedRecord> {
    raw.iter().map(clean_record).collect()
}
