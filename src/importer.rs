use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{ExpensesError, Result, RowError};
use crate::models::DetailRecord;
use crate::store::DetailStore;

// ---------------------------------------------------------------------------
// Columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    BioguideId,
    Office,
    Quarter,
    Program,
    Category,
    SortSequence,
    Date,
    StartDate,
    EndDate,
    Transcode,
    RecordId,
    Payee,
    Purpose,
    Amount,
    Year,
}

pub const REQUIRED_COLUMNS: [Column; 15] = [
    Column::BioguideId,
    Column::Office,
    Column::Quarter,
    Column::Program,
    Column::Category,
    Column::SortSequence,
    Column::Date,
    Column::StartDate,
    Column::EndDate,
    Column::Transcode,
    Column::RecordId,
    Column::Payee,
    Column::Purpose,
    Column::Amount,
    Column::Year,
];

/// Free-text columns, copied verbatim subject to a length limit.
pub const TEXT_COLUMNS: [Column; 8] = [
    Column::BioguideId,
    Column::Office,
    Column::Program,
    Column::Category,
    Column::SortSequence,
    Column::Transcode,
    Column::Payee,
    Column::Purpose,
];

impl Column {
    /// Exact header text in the House extracts.
    pub fn header(&self) -> &'static str {
        match self {
            Self::BioguideId => "BIOGUIDE_ID",
            Self::Office => "OFFICE",
            Self::Quarter => "QUARTER",
            Self::Program => "PROGRAM",
            Self::Category => "CATEGORY",
            Self::SortSequence => "SORT SEQUENCE",
            Self::Date => "DATE",
            Self::StartDate => "START DATE",
            Self::EndDate => "END DATE",
            Self::Transcode => "TRANSCODE",
            Self::RecordId => "RECORDID",
            Self::Payee => "PAYEE",
            Self::Purpose => "PURPOSE",
            Self::Amount => "AMOUNT",
            Self::Year => "YEAR",
        }
    }

    /// Human name used in row errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BioguideId => "bioguide id",
            Self::Office => "office",
            Self::Quarter => "quarter",
            Self::Program => "program",
            Self::Category => "category",
            Self::SortSequence => "sort sequence",
            Self::Date => "date",
            Self::StartDate => "start date",
            Self::EndDate => "end date",
            Self::Transcode => "transcode",
            Self::RecordId => "record id",
            Self::Payee => "payee",
            Self::Purpose => "purpose",
            Self::Amount => "amount",
            Self::Year => "year",
        }
    }

    /// Key accepted by `--max-length KEY=N`.
    pub fn key(&self) -> &'static str {
        match self {
            Self::BioguideId => "bioguide_id",
            Self::SortSequence => "sort_sequence",
            Self::StartDate => "start_date",
            Self::EndDate => "end_date",
            Self::RecordId => "record_id",
            other => other.name(),
        }
    }
}

/// Position of every required column in the header row.
struct ColumnIndex(HashMap<Column, usize>);

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let mut positions = HashMap::new();
        let mut missing = Vec::new();
        for column in REQUIRED_COLUMNS {
            match headers.iter().position(|h| h == column.header()) {
                Some(pos) => {
                    positions.insert(column, pos);
                }
                None => missing.push(column.header().to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(ExpensesError::MissingColumns(missing));
        }
        Ok(Self(positions))
    }

    fn field<'r>(&self, record: &'r csv::StringRecord, column: Column, row: usize) -> Result<&'r str> {
        self.0
            .get(&column)
            .and_then(|&pos| record.get(pos))
            .ok_or_else(|| ExpensesError::ShortRow {
                row,
                column: column.header().to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DateFormat {
    /// 2016-07-31
    Ymd,
    /// 31/07/2016
    Dmy,
    /// 07/31/2016
    Mdy,
}

impl DateFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Ymd => "ymd",
            Self::Dmy => "dmy",
            Self::Mdy => "mdy",
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            Self::Ymd => "%Y-%m-%d",
            Self::Dmy => "%d/%m/%Y",
            Self::Mdy => "%m/%d/%Y",
        }
    }
}

/// Maximum stored length, in characters, of each free-text column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLimits(HashMap<Column, usize>);

impl Default for FieldLimits {
    fn default() -> Self {
        let limits = TEXT_COLUMNS
            .iter()
            .map(|&c| {
                let len = match c {
                    Column::BioguideId => 7,
                    Column::Transcode => 15,
                    _ => 500,
                };
                (c, len)
            })
            .collect();
        Self(limits)
    }
}

impl FieldLimits {
    pub fn get(&self, column: Column) -> Option<usize> {
        self.0.get(&column).copied()
    }

    pub fn set(&mut self, key: &str, len: usize) -> Result<()> {
        let column = TEXT_COLUMNS
            .iter()
            .find(|c| c.key() == key)
            .ok_or_else(|| {
                let known: Vec<&str> = TEXT_COLUMNS.iter().map(|c| c.key()).collect();
                ExpensesError::InvalidOption(format!(
                    "unknown text field '{key}' (expected one of: {})",
                    known.join(", ")
                ))
            })?;
        if len == 0 {
            return Err(ExpensesError::InvalidOption(format!(
                "length limit for '{key}' must be positive"
            )));
        }
        self.0.insert(*column, len);
        Ok(())
    }

    /// Apply a `FIELD=N` override.
    pub fn apply(&mut self, spec: &str) -> Result<()> {
        let (key, len) = spec.split_once('=').ok_or_else(|| {
            ExpensesError::InvalidOption(format!("expected FIELD=N, got '{spec}'"))
        })?;
        let len: usize = len.trim().parse().map_err(|_| {
            ExpensesError::InvalidOption(format!("length in '{spec}' is not a number"))
        })?;
        self.set(key.trim(), len)
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub date_format: DateFormat,
    pub all_or_nothing: bool,
    pub strip_currency_symbol: bool,
    pub strip_thousands_separator: bool,
    pub max_field_lengths: FieldLimits,
    /// Checked between rows; once set, no further rows are read.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl LoadOptions {
    pub fn new(date_format: DateFormat) -> Self {
        Self {
            date_format,
            all_or_nothing: false,
            strip_currency_symbol: false,
            strip_thousands_separator: false,
            max_field_lengths: FieldLimits::default(),
            cancel: None,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Relaxed))
    }
}

// ---------------------------------------------------------------------------
// Field parsers
// ---------------------------------------------------------------------------

/// Blank input means no date; anything else must match `format`.
pub fn parse_optional_date(raw: &str, format: DateFormat) -> std::result::Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, format.pattern())
        .map(Some)
        .map_err(|e| format!("not a {} date: {e}", format.key()))
}

pub fn parse_record_id(raw: &str) -> std::result::Result<i64, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("missing record id".to_string());
    }
    let id: i64 = raw.parse().map_err(|_| "not an integer".to_string())?;
    if id <= 0 {
        return Err("must be a positive integer".to_string());
    }
    Ok(id)
}

pub fn parse_quarter(raw: &str) -> std::result::Result<u8, String> {
    let q: i64 = raw.trim().parse().map_err(|_| "not an integer".to_string())?;
    if !(1..=4).contains(&q) {
        return Err(format!("quarter {q} is outside 1-4"));
    }
    Ok(q as u8)
}

pub fn parse_year(raw: &str) -> std::result::Result<i32, String> {
    raw.trim().parse().map_err(|_| "not an integer".to_string())
}

// Matches DecimalField(max_digits=20, decimal_places=2).
const MAX_INTEGER_DIGITS: u32 = 18;

/// Parse a currency amount without rounding. The result always has scale 2.
pub fn parse_amount(
    raw: &str,
    strip_currency_symbol: bool,
    strip_thousands_separator: bool,
) -> std::result::Result<Decimal, String> {
    let mut s = raw.trim().to_string();
    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        s = inner.trim().to_string();
    }
    if strip_currency_symbol {
        if let Some(rest) = s.strip_prefix('$') {
            s = rest.to_string();
        } else if let Some(rest) = s.strip_prefix("-$") {
            s = format!("-{rest}");
        }
    }
    if strip_thousands_separator && s.contains(',') {
        s = remove_thousands_separators(&s)?;
    }
    if s.is_empty() {
        return Err("missing amount".to_string());
    }
    if negative && s.starts_with(['-', '+']) {
        return Err("signed value inside parentheses".to_string());
    }

    let mut value =
        Decimal::from_str_exact(&s).map_err(|e| format!("not a decimal amount: {e}"))?;
    if value.normalize().scale() > 2 {
        return Err("more than two fractional digits".to_string());
    }
    if value.trunc().abs() >= Decimal::from(10i64.pow(MAX_INTEGER_DIGITS)) {
        return Err(format!("more than {MAX_INTEGER_DIGITS} integer digits"));
    }
    if negative {
        value = -value;
    }
    value.rescale(2);
    Ok(value)
}

/// Drop `,` separators from a correctly grouped amount (`1,234,567.89`).
/// Misplaced separators are rejected rather than silently changing the value.
fn remove_thousands_separators(s: &str) -> std::result::Result<String, String> {
    let unsigned = s.trim_start_matches(['-', '+']);
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if frac_part.contains(',') {
        return Err("thousands separator after the decimal point".to_string());
    }
    let mut groups = int_part.split(',');
    let lead_ok = groups
        .next()
        .map_or(false, |g| (1..=3).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_digit()));
    if !lead_ok || !groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit())) {
        return Err("misplaced thousands separator".to_string());
    }
    Ok(s.replace(',', ""))
}

fn truncate_chars(value: &str, limit: usize) -> Option<String> {
    if value.chars().count() > limit {
        Some(value.chars().take(limit).collect())
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RowFailure {
    /// 1-based position among data rows (the header is not counted).
    pub row: usize,
    pub error: RowError,
}

#[derive(Debug, Clone)]
pub enum RowOutcome {
    Stored {
        row: usize,
        id: i64,
        record_id: i64,
        truncated: Vec<Column>,
    },
    Failed(RowFailure),
}

impl RowOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub outcomes: Vec<RowOutcome>,
    /// All-or-nothing batch was discarded.
    pub rolled_back: bool,
    pub cancelled: bool,
}

impl LoadReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failure()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    /// Rows actually left in the store by this run.
    pub fn persisted(&self) -> usize {
        if self.rolled_back {
            0
        } else {
            self.succeeded()
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &RowFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            RowOutcome::Failed(f) => Some(f),
            RowOutcome::Stored { .. } => None,
        })
    }

    pub fn truncated_fields(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                RowOutcome::Stored { truncated, .. } => truncated.len(),
                RowOutcome::Failed(_) => 0,
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Batch scope
// ---------------------------------------------------------------------------

/// Open transaction for an all-or-nothing load. Rolls back on drop unless
/// committed, so fatal errors mid-file leave nothing behind.
struct Batch<'s, S: DetailStore + ?Sized> {
    store: &'s S,
    open: bool,
}

impl<'s, S: DetailStore + ?Sized> Batch<'s, S> {
    fn begin(store: &'s S) -> Result<Self> {
        store.begin()?;
        Ok(Self { store, open: true })
    }

    fn commit(mut self) -> Result<()> {
        self.open = false;
        self.store.commit()
    }

    fn rollback(mut self) -> Result<()> {
        self.open = false;
        self.store.rollback()
    }
}

impl<S: DetailStore + ?Sized> Drop for Batch<'_, S> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.store.rollback() {
                warn!(error = %e, "rollback of abandoned batch failed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

/// Load a detail CSV extract from disk into `store`.
pub fn load_file<S: DetailStore + ?Sized>(
    store: &S,
    file_path: &Path,
    options: &LoadOptions,
) -> Result<LoadReport> {
    let file = std::fs::File::open(file_path).map_err(|source| ExpensesError::Open {
        path: file_path.to_path_buf(),
        source,
    })?;
    info!(path = %file_path.display(), date_format = options.date_format.key(), "loading detail file");
    load_reader(store, std::io::BufReader::new(file), options)
}

pub fn load_reader<R: Read, S: DetailStore + ?Sized>(
    store: &S,
    reader: R,
    options: &LoadOptions,
) -> Result<LoadReport> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let index = ColumnIndex::from_headers(rdr.headers()?)?;

    let batch = if options.all_or_nothing {
        Some(Batch::begin(store)?)
    } else {
        None
    };

    let mut report = LoadReport::default();
    for (i, result) in rdr.records().enumerate() {
        if options.is_cancelled() {
            warn!(row = i + 1, "load cancelled");
            report.cancelled = true;
            break;
        }
        let row = i + 1;
        let outcome = match result {
            Ok(record) => process_row(store, &record, &index, row, options)?,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => RowOutcome::Failed(RowFailure {
                row,
                error: RowError::parse("row", "", e.to_string()),
            }),
        };
        log_outcome(&outcome);
        let failed = outcome.is_failure();
        report.outcomes.push(outcome);
        if failed && batch.is_some() {
            break;
        }
    }

    if let Some(batch) = batch {
        if report.failed() > 0 || report.cancelled {
            batch.rollback()?;
            report.rolled_back = true;
            warn!(rows = report.outcomes.len(), "batch rolled back");
        } else {
            batch.commit()?;
        }
    }

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        persisted = report.persisted(),
        rolled_back = report.rolled_back,
        "load finished"
    );
    Ok(report)
}

fn process_row<S: DetailStore + ?Sized>(
    store: &S,
    record: &csv::StringRecord,
    index: &ColumnIndex,
    row: usize,
    options: &LoadOptions,
) -> Result<RowOutcome> {
    let mut raw = HashMap::with_capacity(REQUIRED_COLUMNS.len());
    for column in REQUIRED_COLUMNS {
        raw.insert(column, index.field(record, column, row)?);
    }

    let (detail, truncated) = match parse_detail(&raw, options) {
        Ok(parsed) => parsed,
        Err(error) => return Ok(RowOutcome::Failed(RowFailure { row, error })),
    };
    for column in &truncated {
        warn!(
            row,
            field = column.name(),
            limit = ?options.max_field_lengths.get(*column),
            "value truncated"
        );
    }

    match store.create(&detail) {
        Ok(id) => Ok(RowOutcome::Stored {
            row,
            id,
            record_id: detail.record_id,
            truncated,
        }),
        Err(e) => Ok(RowOutcome::Failed(RowFailure {
            row,
            error: RowError::Persist {
                reason: e.to_string(),
            },
        })),
    }
}

fn parse_detail(
    raw: &HashMap<Column, &str>,
    options: &LoadOptions,
) -> std::result::Result<(DetailRecord, Vec<Column>), RowError> {
    let get = |c: Column| raw.get(&c).copied().unwrap_or_default();
    let fail = |c: Column, reason: String| RowError::parse(c.name(), get(c), reason);

    let date_of = |c: Column| parse_optional_date(get(c), options.date_format).map_err(|r| fail(c, r));
    let date = date_of(Column::Date)?;
    let start_date = date_of(Column::StartDate)?;
    let end_date = date_of(Column::EndDate)?;

    let record_id = parse_record_id(get(Column::RecordId)).map_err(|r| fail(Column::RecordId, r))?;
    let amount = parse_amount(
        get(Column::Amount),
        options.strip_currency_symbol,
        options.strip_thousands_separator,
    )
    .map_err(|r| fail(Column::Amount, r))?;
    let quarter = parse_quarter(get(Column::Quarter)).map_err(|r| fail(Column::Quarter, r))?;
    let year = parse_year(get(Column::Year)).map_err(|r| fail(Column::Year, r))?;

    let mut truncated = Vec::new();
    let mut text = |c: Column| -> String {
        let value = get(c);
        match options
            .max_field_lengths
            .get(c)
            .and_then(|limit| truncate_chars(value, limit))
        {
            Some(short) => {
                truncated.push(c);
                short
            }
            None => value.to_string(),
        }
    };

    let detail = DetailRecord {
        bioguide_id: text(Column::BioguideId),
        office: text(Column::Office),
        quarter,
        program: text(Column::Program),
        category: text(Column::Category),
        sort_sequence: text(Column::SortSequence),
        date,
        transcode: text(Column::Transcode),
        record_id,
        payee: text(Column::Payee),
        start_date,
        end_date,
        purpose: text(Column::Purpose),
        amount,
        year,
    };
    Ok((detail, truncated))
}

fn log_outcome(outcome: &RowOutcome) {
    match outcome {
        RowOutcome::Stored { row, id, record_id, .. } => {
            info!(row, id, record_id, "stored detail");
        }
        RowOutcome::Failed(RowFailure {
            row,
            error: RowError::Parse { field, raw_value, reason },
        }) => {
            warn!(row, field = %field, raw = %raw_value, reason = %reason, "row rejected");
        }
        RowOutcome::Failed(RowFailure {
            row,
            error: RowError::Persist { reason },
        }) => {
            warn!(row, reason = %reason, "row not stored");
        }
    }
}
