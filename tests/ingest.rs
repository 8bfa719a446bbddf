mod common;

use std::path::{Path, PathBuf};

use book_ingest::{
    cli::Separator,
    config::{IngestConfig, StoreConfig},
    io_utils,
    pipeline::{self, IngestError, IngestReport},
    store::SqliteStore,
};
use common::{TestWorkspace, fixture_path, row_count, snapshot};

fn config(csv_path: PathBuf, db: &Path) -> IngestConfig {
    IngestConfig {
        csv_path,
        separator: Separator::Auto,
        encoding_label: io_utils::DEFAULT_ENCODING_LABEL.to_string(),
        encoding: io_utils::resolve_encoding(io_utils::DEFAULT_ENCODING_LABEL)
            .expect("default encoding"),
        store: StoreConfig::Sqlite {
            path: db.to_path_buf(),
        },
    }
}

fn ingest(csv_path: PathBuf, db: &Path) -> IngestReport {
    pipeline::execute(&config(csv_path, db)).expect("ingest succeeds")
}

#[test]
fn fixture_run_reports_counts_and_stores_clean_rows() {
    let workspace = TestWorkspace::new();
    let db = workspace.database();
    let report = ingest(fixture_path("books.csv"), &db);

    assert_eq!(report.rows_read, 8);
    assert_eq!(report.rows_skipped, 1);
    assert_eq!(report.valid, 6);
    assert_eq!(report.discarded, 2);
    assert_eq!(report.upserted, 6);
    assert_eq!(report.destination_rows, 6);

    let rows = snapshot(&db);
    let ids: Vec<i64> = rows.iter().map(|r| r.0).collect();
    assert_eq!(ids, vec![1, 2, 4, 5, 8, 12]);

    let (_, title, authors, rating, isbn, isbn13, published) = &rows[0];
    assert_eq!(title, "Harry Potter and the Half-Blood Prince (Harry Potter  #6)");
    assert_eq!(authors, "J.K. Rowling/Mary GrandPré");
    assert!((rating.expect("rating") - 4.57).abs() < 1e-9);
    assert_eq!(isbn.as_deref(), Some("0439785960"));
    assert_eq!(isbn13.as_deref(), Some("9780439785969"));
    assert_eq!(published.as_deref(), Some("2006-09-16"));

    // 13-digit value in the isbn column moves to isbn13
    let swapped = &rows[2];
    assert_eq!(swapped.4, None);
    assert_eq!(swapped.5.as_deref(), Some("9780439554893"));

    // punctuation stripped, check character kept
    let hyphenated = &rows[3];
    assert_eq!(hyphenated.4.as_deref(), Some("043965548X"));
    assert_eq!(hyphenated.5.as_deref(), Some("9780439655484"));

    // impossible calendar date
    assert_eq!(rows[5].6, None);
}

#[test]
fn rerunning_the_same_file_is_idempotent() {
    let workspace = TestWorkspace::new();
    let db = workspace.database();
    ingest(fixture_path("books.csv"), &db);
    let first = snapshot(&db);
    let second_report = ingest(fixture_path("books.csv"), &db);
    assert_eq!(snapshot(&db), first);
    assert_eq!(second_report.destination_rows, 6);
}

#[test]
fn changed_title_replaces_existing_row() {
    let workspace = TestWorkspace::new();
    let db = workspace.database();
    let original = workspace.write(
        "v1.csv",
        "bookID,title,authors\n42,Old Title,Someone\n43,Other,Someone Else\n",
    );
    ingest(original, &db);

    let revised = workspace.write("v2.csv", "bookID,title,authors\n42,New Title,Someone\n");
    ingest(revised, &db);

    let rows = snapshot(&db);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].0, 42);
    assert_eq!(rows[0].1, "New Title");
    assert_eq!(rows[1].1, "Other");
}

#[test]
fn discarded_count_matches_missing_destination_rows() {
    let workspace = TestWorkspace::new();
    let db = workspace.database();
    let csv = workspace.write(
        "mixed.csv",
        "id,title\n1,Kept\n,No Id\nabc,Bad Id\n4,   \n5,Also Kept\n",
    );
    let report = ingest(csv, &db);
    assert_eq!(report.rows_read, 5);
    assert_eq!(report.discarded, 3);
    assert_eq!(row_count(&db) as usize, report.rows_read - report.discarded);
}

#[test]
fn tab_separated_latin1_input_is_loaded() {
    let workspace = TestWorkspace::new();
    let db = workspace.database();
    // "Les Misérables" and "Hugo, Victor" in WINDOWS-1252
    let mut bytes = b"bookId\ttitle\tauthors\tpublication_date\n7\tLes Mis".to_vec();
    bytes.push(0xE9);
    bytes.extend_from_slice(b"rables\tHugo, Victor\tMarch 3 1862\n");
    let csv = workspace.write_bytes("latin1.tsv", &bytes);

    let report = ingest(csv, &db);
    assert_eq!(report.valid, 1);
    let rows = snapshot(&db);
    assert_eq!(rows[0].1, "Les Misérables");
    assert_eq!(rows[0].2, "Hugo, Victor");
    assert_eq!(rows[0].6.as_deref(), Some("1862-03-03"));
}

#[test]
fn missing_input_leaves_store_untouched() {
    let workspace = TestWorkspace::new();
    let db = workspace.database();
    let err = pipeline::execute(&config(workspace.path().join("nope.csv"), &db)).unwrap_err();
    assert!(matches!(err, IngestError::InputMissing(_)));

    let mut store = SqliteStore::open(&db).expect("open sqlite");
    let other = workspace.path().join("still-missing.csv");
    let err = pipeline::run_with_store(&config(other, &db), &mut store).unwrap_err();
    assert!(err.to_string().contains("still-missing.csv"));
}

#[test]
fn duplicate_ids_in_one_batch_keep_the_last_row() {
    let workspace = TestWorkspace::new();
    let db = workspace.database();
    let csv = workspace.write(
        "dupes.csv",
        "bookID,title\n3,First Printing\n3,Second Printing\n",
    );
    let report = ingest(csv, &db);
    assert_eq!(report.duplicates_collapsed, 1);
    assert_eq!(report.staged, 1);
    let rows = snapshot(&db);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].1, "Second Printing");
}
