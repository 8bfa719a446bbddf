#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    /// Writes raw bytes, for inputs that are not UTF-8.
    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }

    /// Path of a SQLite database inside the workspace (not created yet).
    pub fn database(&self) -> PathBuf {
        self.temp_dir.path().join("books.db")
    }
}

/// One destination row, as plain text, ordered by `book_id`.
pub type BookSnapshot = (i64, String, String, Option<f64>, Option<String>, Option<String>, Option<String>);

/// Reads the destination table back in a stable order.
pub fn snapshot(db: &Path) -> Vec<BookSnapshot> {
    let conn = Connection::open(db).expect("open sqlite");
    let mut stmt = conn
        .prepare(
            "SELECT book_id, title, authors_raw, average_rating, isbn, isbn13, publication_date \
             FROM books ORDER BY book_id",
        )
        .expect("prepare snapshot");
    stmt.query_map([], |row| {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
        ))
    })
    .expect("query snapshot")
    .collect::<Result<Vec<_>, _>>()
    .expect("collect snapshot")
}

pub fn row_count(db: &Path) -> i64 {
    let conn = Connection::open(db).expect("open sqlite");
    conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get(0))
        .expect("count rows")
}
