use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::error::Result;
use crate::models::DetailRecord;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("record id {0} already exists")]
    DuplicateRecordId(i64),

    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

/// Where validated detail lines end up. The importer only ever creates
/// records; batch scope lets a caller make a whole file atomic.
pub trait DetailStore {
    fn create(&self, record: &DetailRecord) -> std::result::Result<i64, PersistError>;
    fn begin(&self) -> Result<()>;
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;
}

pub struct SqliteStore<'c> {
    conn: &'c Connection,
    unique_record_id: bool,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection, unique_record_id: bool) -> Self {
        Self {
            conn,
            unique_record_id,
        }
    }

    fn record_id_exists(&self, record_id: i64) -> std::result::Result<bool, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM details WHERE record_id = ?1")?;
        stmt.exists([record_id])
    }

    pub fn get(&self, id: i64) -> Result<Option<DetailRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT bioguide_id, office, quarter, program, category, sort_sequence, date, \
                 transcode, record_id, payee, start_date, end_date, purpose, amount, year \
                 FROM details WHERE id = ?1",
                [id],
                detail_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub fn count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT count(*) FROM details", [], |r| r.get(0))?)
    }
}

impl DetailStore for SqliteStore<'_> {
    fn create(&self, record: &DetailRecord) -> std::result::Result<i64, PersistError> {
        if self.unique_record_id && self.record_id_exists(record.record_id)? {
            return Err(PersistError::DuplicateRecordId(record.record_id));
        }
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO details (bioguide_id, office, quarter, program, category, sort_sequence, \
             date, transcode, record_id, payee, start_date, end_date, purpose, amount, year) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )?;
        stmt.execute(rusqlite::params![
            record.bioguide_id,
            record.office,
            record.quarter,
            record.program,
            record.category,
            record.sort_sequence,
            record.date,
            record.transcode,
            record.record_id,
            record.payee,
            record.start_date,
            record.end_date,
            record.purpose,
            record.amount.to_string(),
            record.year,
        ])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        // SQLite may already have aborted the transaction on its own.
        if self.conn.is_autocommit() {
            return Ok(());
        }
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

/// Read a decimal stored as canonical text.
pub(crate) fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn detail_from_row(row: &Row) -> rusqlite::Result<DetailRecord> {
    Ok(DetailRecord {
        bioguide_id: row.get(0)?,
        office: row.get(1)?,
        quarter: row.get(2)?,
        program: row.get(3)?,
        category: row.get(4)?,
        sort_sequence: row.get(5)?,
        date: row.get(6)?,
        transcode: row.get(7)?,
        record_id: row.get(8)?,
        payee: row.get(9)?,
        start_date: row.get(10)?,
        end_date: row.get(11)?,
        purpose: row.get(12)?,
        amount: decimal_column(row, 13)?,
        year: row.get(14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use chrono::NaiveDate;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn sample(record_id: i64) -> DetailRecord {
        DetailRecord {
            bioguide_id: "A000374".to_string(),
            office: "HON. RALPH LEE ABRAHAM".to_string(),
            quarter: 3,
            program: "OFFICIAL EXPENSES OF MEMBERS".to_string(),
            category: "TRAVEL".to_string(),
            sort_sequence: "DETAIL".to_string(),
            date: Some(NaiveDate::from_ymd_opt(2016, 7, 12).unwrap()),
            transcode: "AP".to_string(),
            record_id,
            payee: "AMERICAN EXPRESS".to_string(),
            start_date: Some(NaiveDate::from_ymd_opt(2016, 7, 1).unwrap()),
            end_date: None,
            purpose: "AIRFARE".to_string(),
            amount: Decimal::new(-125050, 2),
            year: 2016,
        }
    }

    #[test]
    fn test_create_and_get_roundtrip() {
        let (_dir, conn) = test_db();
        let store = SqliteStore::new(&conn, true);
        let record = sample(4512);
        let id = store.create(&record).unwrap();
        let loaded = store.get(id).unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.amount.to_string(), "-1250.50");
        assert_eq!(loaded.end_date, None);
    }

    #[test]
    fn test_get_missing_is_none() {
        let (_dir, conn) = test_db();
        let store = SqliteStore::new(&conn, true);
        assert!(store.get(99).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_record_id_rejected_when_unique() {
        let (_dir, conn) = test_db();
        let store = SqliteStore::new(&conn, true);
        store.create(&sample(7)).unwrap();
        let err = store.create(&sample(7)).unwrap_err();
        assert!(matches!(err, PersistError::DuplicateRecordId(7)));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_record_id_allowed_without_constraint() {
        let (_dir, conn) = test_db();
        let store = SqliteStore::new(&conn, false);
        store.create(&sample(7)).unwrap();
        store.create(&sample(7)).unwrap();
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_rollback_discards_batch() {
        let (_dir, conn) = test_db();
        let store = SqliteStore::new(&conn, true);
        store.begin().unwrap();
        store.create(&sample(1)).unwrap();
        store.create(&sample(2)).unwrap();
        store.rollback().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_commit_keeps_batch() {
        let (_dir, conn) = test_db();
        let store = SqliteStore::new(&conn, true);
        store.begin().unwrap();
        store.create(&sample(1)).unwrap();
        store.commit().unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
