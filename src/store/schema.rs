//! SQL text for the destination table, the staging table and the upsert.

pub const DESTINATION_TABLE: &str = "books";
pub const STAGING_PREFIX: &str = "_staging_books_";

/// Columns written by the loader, key first. `created_at` is left to its
/// column default.
pub const DATA_COLUMNS: [&str; 12] = [
    "book_id",
    "title",
    "authors_raw",
    "average_rating",
    "isbn",
    "isbn13",
    "language_code",
    "num_pages",
    "ratings_count",
    "text_reviews_count",
    "publication_date",
    "publisher",
];

const COLUMN_DEFINITIONS: [(&str, &str); 12] = [
    ("book_id", "INTEGER PRIMARY KEY"),
    ("title", "VARCHAR(400) NOT NULL"),
    ("authors_raw", "VARCHAR(400)"),
    ("average_rating", "NUMERIC(4,2)"),
    ("isbn", "VARCHAR(20)"),
    ("isbn13", "VARCHAR(20)"),
    ("language_code", "VARCHAR(10)"),
    ("num_pages", "INTEGER"),
    ("ratings_count", "INTEGER"),
    ("text_reviews_count", "INTEGER"),
    ("publication_date", "DATE"),
    ("publisher", "VARCHAR(200)"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    fn placeholder(self, position: usize) -> String {
        match self {
            Dialect::Postgres => format!("${position}"),
            Dialect::Sqlite => format!("?{position}"),
        }
    }

    fn current_timestamp(self) -> &'static str {
        match self {
            Dialect::Postgres => "now()",
            Dialect::Sqlite => "CURRENT_TIMESTAMP",
        }
    }
}

fn table_body(dialect: Dialect) -> String {
    let mut lines: Vec<String> = COLUMN_DEFINITIONS
        .iter()
        .map(|(name, ty)| format!("  {name:<18} {ty}"))
        .collect();
    lines.push(format!(
        "  {:<18} TIMESTAMP DEFAULT {}",
        "created_at",
        dialect.current_timestamp()
    ));
    lines.join(",\n")
}

pub fn create_destination_sql(dialect: Dialect) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {DESTINATION_TABLE} (\n{}\n)",
        table_body(dialect)
    )
}

/// Session-scoped staging table with the destination's columns and constraints.
pub fn create_staging_sql(dialect: Dialect, staging: &str) -> String {
    match dialect {
        Dialect::Postgres => {
            format!("CREATE TEMP TABLE {staging} (LIKE {DESTINATION_TABLE} INCLUDING ALL)")
        }
        Dialect::Sqlite => format!("CREATE TEMP TABLE {staging} (\n{}\n)", table_body(dialect)),
    }
}

pub fn insert_staging_sql(dialect: Dialect, staging: &str) -> String {
    let placeholders = (1..=DATA_COLUMNS.len())
        .map(|position| dialect.placeholder(position))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {staging} ({}) VALUES ({placeholders})",
        DATA_COLUMNS.join(", ")
    )
}

/// The single write path into the destination.
///
/// `WHERE true` keeps SQLite from reading `ON CONFLICT` as a join clause.
pub fn upsert_sql(staging: &str) -> String {
    let columns = DATA_COLUMNS.join(", ");
    let assignments = DATA_COLUMNS[1..]
        .iter()
        .map(|column| format!("  {column} = EXCLUDED.{column}"))
        .collect::<Vec<_>>()
        .join(",\n");
    format!(
        "INSERT INTO {DESTINATION_TABLE} ({columns})\n\
         SELECT {columns} FROM {staging} WHERE true\n\
         ON CONFLICT (book_id) DO UPDATE SET\n{assignments}"
    )
}

pub fn drop_staging_sql(staging: &str) -> String {
    format!("DROP TABLE IF EXISTS {staging}")
}

pub fn count_destination_sql() -> String {
    format!("SELECT COUNT(*) FROM {DESTINATION_TABLE}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_ddl_is_idempotent_and_keyed() {
        let ddl = create_destination_sql(Dialect::Postgres);
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS books"));
        assert!(ddl.contains("book_id            INTEGER PRIMARY KEY"));
        assert!(ddl.contains("TIMESTAMP DEFAULT now()"));
        assert!(create_destination_sql(Dialect::Sqlite).contains("DEFAULT CURRENT_TIMESTAMP"));
    }

    #[test]
    fn upsert_overwrites_every_non_key_column() {
        let sql = upsert_sql("_staging_books_abc");
        assert!(sql.contains("FROM _staging_books_abc"));
        assert!(sql.contains("ON CONFLICT (book_id) DO UPDATE SET"));
        for column in &DATA_COLUMNS[1..] {
            assert!(sql.contains(&format!("{column} = EXCLUDED.{column}")), "{column}");
        }
        assert!(!sql.contains("book_id = EXCLUDED.book_id"));
    }

    #[test]
    fn staging_insert_uses_dialect_placeholders() {
        let pg = insert_staging_sql(Dialect::Postgres, "s");
        assert!(pg.ends_with("$11, $12)"));
        let lite = insert_staging_sql(Dialect::Sqlite, "s");
        assert!(lite.contains("?1, ?2"));
    }

    #[test]
    fn postgres_staging_copies_destination_structure() {
        assert_eq!(
            create_staging_sql(Dialect::Postgres, "_staging_books_x"),
            "CREATE TEMP TABLE _staging_books_x (LIKE books INCLUDING ALL)"
        );
    }
}
