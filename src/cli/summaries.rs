use comfy_table::{Cell, CellAlignment, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::reports::{get_summaries, SummaryFilter};

pub fn run(filter: SummaryFilter) -> Result<()> {
    let conn = super::open_db()?;
    let (rows, matched) = get_summaries(&conn, &filter)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Period", "Office", "Program", "Category", "Amount"]);
    for s in &rows {
        table.add_row(vec![
            Cell::new(s.id),
            Cell::new(format!("{} Q{}", s.year, s.quarter)),
            Cell::new(&s.office),
            Cell::new(&s.program),
            Cell::new(&s.category),
            Cell::new(money(s.amount)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("Summaries\n{table}");
    if rows.len() < matched {
        println!("Showing {} of {matched} matching rows", rows.len());
    }
    Ok(())
}
