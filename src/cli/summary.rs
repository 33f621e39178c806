use comfy_table::{Cell, Table};

use crate::error::{ExpensesError, Result};
use crate::fmt::money;
use crate::reports::get_summary;

pub fn run(id: i64) -> Result<()> {
    let conn = super::open_db()?;
    let summary = get_summary(&conn, id)?
        .ok_or_else(|| ExpensesError::Other(format!("No summary with ID {id}")))?;

    let mut table = Table::new();
    let rows = [
        ("Bioguide ID", summary.bioguide_id),
        ("Office", summary.office),
        ("Program", summary.program),
        ("Category", summary.category),
        ("Period", format!("{} Q{}", summary.year, summary.quarter)),
        ("Amount", money(summary.amount)),
        ("Year to date", money(summary.year_to_date)),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    println!("Summary {}\n{table}", summary.id);
    Ok(())
}
