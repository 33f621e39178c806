use chrono::NaiveDate;
use rust_decimal::Decimal;

/// One itemized expense line, as stored in the `details` table.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRecord {
    pub bioguide_id: String,
    pub office: String,
    pub quarter: u8,
    pub program: String,
    pub category: String,
    pub sort_sequence: String,
    pub date: Option<NaiveDate>,
    pub transcode: String,
    pub record_id: i64,
    pub payee: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub purpose: String,
    /// Always carries a scale of 2.
    pub amount: Decimal,
    pub year: i32,
}

/// Per-period aggregate of detail lines. Filled by other tooling; only read here.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub id: i64,
    pub bioguide_id: String,
    pub office: String,
    pub program: String,
    pub category: String,
    pub year_to_date: Decimal,
    pub amount: Decimal,
    pub year: i32,
    pub quarter: u8,
}

#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// One row of the `loads` table: the outcome of a single ingestion run.
#[derive(Debug, Clone)]
pub struct LoadRecord {
    pub id: Option<i64>,
    pub filename: String,
    pub checksum: String,
    pub date_format: String,
    pub succeeded: i64,
    pub failed: i64,
    pub rolled_back: bool,
    pub loaded_at: Option<String>,
}
