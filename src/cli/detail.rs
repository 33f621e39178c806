use comfy_table::{Cell, Table};

use crate::error::{ExpensesError, Result};
use crate::fmt::money;
use crate::store::SqliteStore;

pub fn run(id: i64) -> Result<()> {
    let conn = super::open_db()?;
    let detail = SqliteStore::new(&conn, true)
        .get(id)?
        .ok_or_else(|| ExpensesError::Other(format!("No detail record with ID {id}")))?;

    let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    let rows = [
        ("Record ID", detail.record_id.to_string()),
        ("Bioguide ID", detail.bioguide_id),
        ("Office", detail.office),
        ("Program", detail.program),
        ("Category", detail.category),
        ("Sort sequence", detail.sort_sequence),
        ("Period", format!("{} Q{}", detail.year, detail.quarter)),
        ("Date", date(detail.date)),
        ("Start date", date(detail.start_date)),
        ("End date", date(detail.end_date)),
        ("Transcode", detail.transcode),
        ("Payee", detail.payee),
        ("Purpose", detail.purpose),
        ("Amount", money(detail.amount)),
    ];

    let mut table = Table::new();
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    println!("Detail {id}\n{table}");
    Ok(())
}
