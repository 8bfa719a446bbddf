//! Minimal required-field validation.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::clean::CleanedRecord;

/// A cleaned record with an identifier and a non-empty title; the only shape
/// that reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRow {
    pub book_id: i32,
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

impl BookRow {
    /// Returns `None` when `record` lacks an id or a title.
    pub fn from_cleaned(record: CleanedRecord) -> Option<Self> {
        let book_id = record.book_id?;
        if record.title.is_empty() {
            return None;
        }
        Some(Self {
            book_id,
            title: record.title,
            authors_raw: record.authors_raw,
            average_rating: record.average_rating,
            isbn: record.isbn,
            isbn13: record.isbn13,
            language_code: record.language_code,
            num_pages: record.num_pages,
            ratings_count: record.ratings_count,
            text_reviews_count: record.text_reviews_count,
            publication_date: record.publication_date,
            publisher: record.publisher,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Validation {
    pub rows: Vec<BookRow>,
    pub input_count: usize,
}

impl Validation {
    pub fn retained_count(&self) -> usize {
        self.rows.len()
    }

    pub fn discarded(&self) -> usize {
        self.input_count - self.retained_count()
    }
}

pub fn validate(records: Vec<CleanedRecord>) -> Validation {
    let input_count = records.len();
    let rows = records
        .into_iter()
        .filter_map(BookRow::from_cleaned)
        .collect();
    Validation { rows, input_count }
}
