use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;
use crate::models::LoadRecord;

pub const DB_FILE: &str = "expenses.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS summaries (
    id INTEGER PRIMARY KEY,
    bioguide_id TEXT NOT NULL,
    office TEXT NOT NULL,
    program TEXT NOT NULL,
    category TEXT NOT NULL,
    year_to_date TEXT NOT NULL,
    amount TEXT NOT NULL,
    year INTEGER NOT NULL,
    quarter INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS details (
    id INTEGER PRIMARY KEY,
    bioguide_id TEXT NOT NULL,
    office TEXT NOT NULL,
    quarter INTEGER NOT NULL,
    program TEXT NOT NULL,
    category TEXT NOT NULL,
    sort_sequence TEXT NOT NULL,
    date TEXT,
    transcode TEXT NOT NULL,
    record_id INTEGER NOT NULL,
    payee TEXT NOT NULL,
    start_date TEXT,
    end_date TEXT,
    purpose TEXT NOT NULL,
    amount TEXT NOT NULL,
    year INTEGER NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_details_record_id ON details(record_id);

CREATE TABLE IF NOT EXISTS loads (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    checksum TEXT NOT NULL,
    date_format TEXT NOT NULL,
    succeeded INTEGER NOT NULL,
    failed INTEGER NOT NULL,
    rolled_back INTEGER NOT NULL DEFAULT 0,
    loaded_at TEXT DEFAULT (datetime('now'))
);
";

// Object classes used in the House Statement of Disbursements.
const DEFAULT_CATEGORIES: &[&str] = &[
    "EQUIPMENT",
    "FRANKED MAIL",
    "PERSONNEL BENEFITS",
    "PERSONNEL COMPENSATION",
    "PRINTING AND REPRODUCTION",
    "RENT, COMMUNICATION, UTILITIES",
    "OTHER SERVICES",
    "SUPPLIES AND MATERIALS",
    "TRANSPORTATION OF THINGS",
    "TRAVEL",
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for name in DEFAULT_CATEGORIES {
            conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
        }
    }
    Ok(())
}

/// Open the database under `data_dir`, creating the schema if needed.
pub fn open_data_dir(data_dir: &Path) -> Result<Connection> {
    std::fs::create_dir_all(data_dir)?;
    let conn = get_connection(&data_dir.join(DB_FILE))?;
    init_db(&conn)?;
    Ok(conn)
}

pub fn record_load(conn: &Connection, load: &LoadRecord) -> Result<i64> {
    conn.execute(
        "INSERT INTO loads (filename, checksum, date_format, succeeded, failed, rolled_back) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            load.filename,
            load.checksum,
            load.date_format,
            load.succeeded,
            load.failed,
            load.rolled_back,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["categories", "summaries", "details", "loads"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |r| r.get(0)).unwrap();
        assert_eq!(count, DEFAULT_CATEGORIES.len() as i64);
    }

    #[test]
    fn test_open_data_dir_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        open_data_dir(&nested).unwrap();
        assert!(nested.join(DB_FILE).exists());
    }

    #[test]
    fn test_record_load() {
        let (_dir, conn) = test_db();
        let id = record_load(&conn, &LoadRecord {
            id: None,
            filename: "detail.csv".to_string(),
            checksum: "abc".to_string(),
            date_format: "ymd".to_string(),
            succeeded: 3,
            failed: 1,
            rolled_back: false,
            loaded_at: None,
        }).unwrap();
        let (succeeded, rolled_back): (i64, bool) = conn.query_row(
            "SELECT succeeded, rolled_back FROM loads WHERE id = ?1", [id], |r| Ok((r.get(0)?, r.get(1)?)),
        ).unwrap();
        assert_eq!(succeeded, 3);
        assert!(!rolled_back);
    }
}
