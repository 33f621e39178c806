use rusqlite::{Connection, OptionalExtension};
use rust_decimal::Decimal;

use crate::error::{ExpensesError, Result};
use crate::models::{Category, LoadRecord, SummaryRecord};
use crate::store::decimal_column;

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

pub struct Counts {
    pub summaries: i64,
    pub details: i64,
    pub categories: i64,
    pub loads: i64,
}

pub fn get_counts(conn: &Connection) -> Result<Counts> {
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
    };
    Ok(Counts {
        summaries: count("summaries")?,
        details: count("details")?,
        categories: count("categories")?,
        loads: count("loads")?,
    })
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

pub fn get_summary(conn: &Connection, id: i64) -> Result<Option<SummaryRecord>> {
    let summary = conn
        .query_row(
            "SELECT id, bioguide_id, office, program, category, year_to_date, amount, year, quarter \
             FROM summaries WHERE id = ?1",
            [id],
            summary_from_row,
        )
        .optional()?;
    Ok(summary)
}

fn summary_from_row(row: &rusqlite::Row) -> rusqlite::Result<SummaryRecord> {
    Ok(SummaryRecord {
        id: row.get(0)?,
        bioguide_id: row.get(1)?,
        office: row.get(2)?,
        program: row.get(3)?,
        category: row.get(4)?,
        year_to_date: decimal_column(row, 5)?,
        amount: decimal_column(row, 6)?,
        year: row.get(7)?,
        quarter: row.get(8)?,
    })
}

/// Exact-match filters plus a substring search over program.
#[derive(Debug, Default)]
pub struct SummaryFilter {
    pub category: Option<String>,
    pub program: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

fn summary_where(filter: &SummaryFilter) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();
    for (column, value) in [("category", &filter.category), ("program", &filter.program)] {
        if let Some(v) = value {
            params.push(v.clone());
            clauses.push(format!("{column} = ?{}", params.len()));
        }
    }
    if let Some(term) = &filter.search {
        params.push(format!("%{term}%"));
        clauses.push(format!("program LIKE ?{}", params.len()));
    }
    if clauses.is_empty() {
        ("1 = 1".to_string(), params)
    } else {
        (clauses.join(" AND "), params)
    }
}

/// Summaries matching `filter`, plus how many matched before the limit.
pub fn get_summaries(conn: &Connection, filter: &SummaryFilter) -> Result<(Vec<SummaryRecord>, usize)> {
    let (clause, params) = summary_where(filter);
    let mut stmt = conn.prepare(&format!(
        "SELECT id, bioguide_id, office, program, category, year_to_date, amount, year, quarter \
         FROM summaries WHERE {clause} ORDER BY year, quarter, office, id"
    ))?;
    let all = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), summary_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let matched = all.len();
    let rows = match filter.limit {
        Some(limit) => all.into_iter().take(limit).collect(),
        None => all,
    };
    Ok((rows, matched))
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub fn get_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn add_category(conn: &Connection, name: &str) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ExpensesError::Other("Category name cannot be empty".to_string()));
    }
    let mut exists = conn.prepare("SELECT 1 FROM categories WHERE name = ?1")?;
    if exists.exists([name])? {
        return Err(ExpensesError::Other(format!("Category already exists: {name}")));
    }
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Detail listing
// ---------------------------------------------------------------------------

/// Exact-match filters plus a substring search over program and payee.
#[derive(Debug, Default)]
pub struct DetailFilter {
    pub category: Option<String>,
    pub program: Option<String>,
    pub purpose: Option<String>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

pub struct DetailRow {
    pub id: i64,
    pub office: String,
    pub program: String,
    pub category: String,
    pub payee: String,
    pub purpose: String,
    pub amount: Decimal,
}

pub struct DetailListing {
    pub rows: Vec<DetailRow>,
    /// Rows matching the filter, before the limit is applied.
    pub matched: usize,
    pub total: Decimal,
}

fn detail_where(filter: &DetailFilter) -> (String, Vec<String>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();
    for (column, value) in [
        ("category", &filter.category),
        ("program", &filter.program),
        ("purpose", &filter.purpose),
    ] {
        if let Some(v) = value {
            params.push(v.clone());
            clauses.push(format!("{column} = ?{}", params.len()));
        }
    }
    if let Some(term) = &filter.search {
        params.push(format!("%{term}%"));
        let n = params.len();
        clauses.push(format!("(program LIKE ?{n} OR payee LIKE ?{n})"));
    }
    if clauses.is_empty() {
        ("1 = 1".to_string(), params)
    } else {
        (clauses.join(" AND "), params)
    }
}

pub fn get_details(conn: &Connection, filter: &DetailFilter) -> Result<DetailListing> {
    let (clause, params) = detail_where(filter);

    let mut stmt = conn.prepare(&format!(
        "SELECT id, office, program, category, payee, purpose, amount \
         FROM details WHERE {clause} ORDER BY year, quarter, office, id"
    ))?;
    let all = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(DetailRow {
                id: row.get(0)?,
                office: row.get(1)?,
                program: row.get(2)?,
                category: row.get(3)?,
                payee: row.get(4)?,
                purpose: row.get(5)?,
                amount: decimal_column(row, 6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let matched = all.len();
    let total = all.iter().map(|r| r.amount).sum();
    let rows = match filter.limit {
        Some(limit) => all.into_iter().take(limit).collect(),
        None => all,
    };
    Ok(DetailListing {
        rows,
        matched,
        total,
    })
}

// ---------------------------------------------------------------------------
// Load history
// ---------------------------------------------------------------------------

pub fn get_loads(conn: &Connection) -> Result<Vec<LoadRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, filename, checksum, date_format, succeeded, failed, rolled_back, loaded_at \
         FROM loads ORDER BY id DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(LoadRecord {
                id: row.get(0)?,
                filename: row.get(1)?,
                checksum: row.get(2)?,
                date_format: row.get(3)?,
                succeeded: row.get(4)?,
                failed: row.get(5)?,
                rolled_back: row.get(6)?,
                loaded_at: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
