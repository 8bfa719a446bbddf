//! Canonical column mapping.
//!
//! Input headers drift between exports (`bookID`, `bookId`, `id`, ...). The
//! mapper re-keys every row onto the fixed [`Column`] set so the cleaning
//! stage never sees header spelling.

use log::debug;

use crate::reader::RawTable;

pub const COLUMN_COUNT: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    BookId,
    Title,
    Authors,
    AverageRating,
    Isbn,
    Isbn13,
    LanguageCode,
    NumPages,
    RatingsCount,
    TextReviewsCount,
    PublicationDate,
    Publisher,
}

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::BookId,
        Column::Title,
        Column::Authors,
        Column::AverageRating,
        Column::Isbn,
        Column::Isbn13,
        Column::LanguageCode,
        Column::NumPages,
        Column::RatingsCount,
        Column::TextReviewsCount,
        Column::PublicationDate,
        Column::Publisher,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::BookId => "book_id",
            Column::Title => "title",
            Column::Authors => "authors",
            Column::AverageRating => "average_rating",
            Column::Isbn => "isbn",
            Column::Isbn13 => "isbn13",
            Column::LanguageCode => "language_code",
            Column::NumPages => "num_pages",
            Column::RatingsCount => "ratings_count",
            Column::TextReviewsCount => "text_reviews_count",
            Column::PublicationDate => "publication_date",
            Column::Publisher => "publisher",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Resolves an input header to its canonical column.
    pub fn from_header(header: &str) -> Option<Column> {
        let trimmed = header.trim();
        HEADER_ALIASES
            .iter()
            .find(|(alias, _)| *alias == trimmed)
            .map(|(_, column)| *column)
            .or_else(|| Column::ALL.into_iter().find(|c| c.name() == trimmed))
    }
}

/// Known header spellings that differ from the canonical name.
const HEADER_ALIASES: &[(&str, Column)] = &[
    ("bookID", Column::BookId),
    ("bookId", Column::BookId),
    ("id", Column::BookId),
    ("authors_raw", Column::Authors),
];

/// One input row keyed by canonical column; absent columns hold `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    cells: [String; COLUMN_COUNT],
}

impl RawRecord {
    pub fn get(&self, column: Column) -> &str {
        &self.cells[column.index()]
    }

    pub fn set(&mut self, column: Column, value: impl Into<String>) {
        self.cells[column.index()] = value.into();
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Column, &'a str)>,
    {
        let mut record = RawRecord::default();
        for (column, value) in pairs {
            record.set(column, value);
        }
        record
    }
}

/// Position of each canonical column in the input, if present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    positions: [Option<usize>; COLUMN_COUNT],
}

impl ColumnLayout {
    pub fn from_headers(headers: &[String]) -> Self {
        let mut positions = [None; COLUMN_COUNT];
        for (idx, header) in headers.iter().enumerate() {
            match Column::from_header(header) {
                Some(column) if positions[column.index()].is_none() => {
                    positions[column.index()] = Some(idx);
                }
                Some(column) => {
                    debug!(
                        "Header '{header}' duplicates canonical column '{}'; keeping the first",
                        column.name()
                    );
                }
                None => debug!("Ignoring unmapped header '{header}'"),
            }
        }
        Self { positions }
    }

    pub fn position(&self, column: Column) -> Option<usize> {
        self.positions[column.index()]
    }

    pub fn missing(&self) -> Vec<&'static str> {
        Column::ALL
            .into_iter()
            .filter(|c| self.position(*c).is_none())
            .map(Column::name)
            .collect()
    }

    pub fn project(&self, row: &[String]) -> RawRecord {
        let mut record = RawRecord::default();
        for column in Column::ALL {
            if let Some(value) = self.position(column).and_then(|idx| row.get(idx)) {
                record.set(column, value.as_str());
            }
        }
        record
    }
}

pub fn map_columns(table: &RawTable) -> Vec<RawRecord> {
    let layout = ColumnLayout::from_headers(&table.headers);
    let missing = layout.missing();
    if !missing.is_empty() {
        debug!("Columns absent from input, defaulting to empty: {missing:?}");
    }
    table.rows.iter().map(|row| layout.project(row)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn identifier_synonyms_map_to_book_id() {
        for name in ["bookID", "bookId", "id", "book_id", " bookID "] {
            assert_eq!(Column::from_header(name), Some(Column::BookId), "{name}");
        }
        assert_eq!(Column::from_header("authors"), Some(Column::Authors));
        assert_eq!(Column::from_header("  num_pages"), Some(Column::NumPages));
        assert_eq!(Column::from_header("BOOKID"), None);
    }

    #[test]
    fn absent_columns_default_to_empty() {
        let table = RawTable {
            headers: headers(&["id", "title", "extra"]),
            rows: vec![vec!["7".into(), "Dune".into(), "ignored".into()]],
            ..RawTable::default()
        };
        let records = map_columns(&table);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get(Column::BookId), "7");
        assert_eq!(records[0].get(Column::Title), "Dune");
        assert_eq!(records[0].get(Column::Publisher), "");
    }

    #[test]
    fn first_duplicate_header_wins() {
        let layout = ColumnLayout::from_headers(&headers(&["bookID", "id", "title"]));
        assert_eq!(layout.position(Column::BookId), Some(0));
        assert_eq!(layout.missing().len(), Column::ALL.len() - 2);
    }
}
