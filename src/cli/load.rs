use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use comfy_table::{Cell, Table};

use super::open_db;
use crate::db::record_load;
use crate::error::{Result, RowError};
use crate::importer::{compute_checksum, load_file, DateFormat, LoadOptions, LoadReport};
use crate::models::LoadRecord;
use crate::store::SqliteStore;

pub const EXIT_ROLLED_BACK: i32 = 2;

#[derive(Args)]
pub struct LoadArgs {
    /// Path to the detail CSV extract
    #[arg(long)]
    pub input: PathBuf,
    /// Date layout used by the DATE, START DATE and END DATE columns
    #[arg(long = "date-format", value_enum)]
    pub date_format: DateFormat,
    /// Discard the whole file if any row fails
    #[arg(long = "all-or-nothing")]
    pub all_or_nothing: bool,
    /// Accept a leading '$' on amounts
    #[arg(long = "strip-currency-symbol")]
    pub strip_currency_symbol: bool,
    /// Accept ',' thousands separators on amounts
    #[arg(long = "strip-thousands-separator")]
    pub strip_thousands_separator: bool,
    /// Override a text field's stored length, e.g. payee=200 (repeatable)
    #[arg(long = "max-length", value_name = "FIELD=N")]
    pub max_length: Vec<String>,
    /// Store rows even when their record id is already present
    #[arg(long = "allow-duplicate-record-ids")]
    pub allow_duplicate_record_ids: bool,
}

/// Returns the process exit code: 0, or [`EXIT_ROLLED_BACK`].
pub fn run(args: LoadArgs) -> Result<i32> {
    let mut options = LoadOptions::new(args.date_format);
    options.all_or_nothing = args.all_or_nothing;
    options.strip_currency_symbol = args.strip_currency_symbol;
    options.strip_thousands_separator = args.strip_thousands_separator;
    for spec in &args.max_length {
        options.max_field_lengths.apply(spec)?;
    }

    let conn = open_db()?;
    let store = SqliteStore::new(&conn, !args.allow_duplicate_record_ids);
    let report = load_file(&store, &args.input, &options)?;

    record_load(
        &conn,
        &LoadRecord {
            id: None,
            filename: args
                .input
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            checksum: compute_checksum(&args.input)?,
            date_format: options.date_format.key().to_string(),
            succeeded: report.persisted() as i64,
            failed: report.failed() as i64,
            rolled_back: report.rolled_back,
            loaded_at: None,
        },
    )?;

    print_report(&report);
    println!("{} detail records in database", store.count()?);
    Ok(if report.rolled_back { EXIT_ROLLED_BACK } else { 0 })
}

fn print_report(report: &LoadReport) {
    println!("{} stored, {} failed", report.persisted(), report.failed());
    let truncated = report.truncated_fields();
    if truncated > 0 {
        println!("{truncated} field value(s) truncated to their maximum length");
    }

    if report.failed() > 0 {
        let mut table = Table::new();
        table.set_header(vec!["Row", "Field", "Value", "Reason"]);
        for failure in report.failures() {
            let (value, reason) = match &failure.error {
                RowError::Parse {
                    raw_value, reason, ..
                } => (raw_value.as_str(), reason.as_str()),
                RowError::Persist { reason } => ("", reason.as_str()),
            };
            table.add_row(vec![
                Cell::new(failure.row),
                Cell::new(failure.error.field().unwrap_or("")),
                Cell::new(value),
                Cell::new(reason),
            ]);
        }
        println!("Failures\n{table}");
    }

    if report.cancelled {
        println!("{}", "Load cancelled before the end of the file.".yellow());
    }
    if report.rolled_back {
        println!(
            "{}",
            "All-or-nothing load rolled back: nothing was stored.".red().bold()
        );
    }
}
