use comfy_table::{Cell, CellAlignment, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::reports::{get_details, DetailFilter};

pub fn run(filter: DetailFilter) -> Result<()> {
    let conn = super::open_db()?;
    let listing = get_details(&conn, &filter)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Office", "Program", "Category", "Payee", "Purpose", "Amount"]);
    for row in &listing.rows {
        table.add_row(vec![
            Cell::new(row.id),
            Cell::new(&row.office),
            Cell::new(&row.program),
            Cell::new(&row.category),
            Cell::new(&row.payee),
            Cell::new(&row.purpose),
            Cell::new(money(row.amount)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("Details\n{table}");
    if listing.rows.len() < listing.matched {
        println!("Showing {} of {} matching rows", listing.rows.len(), listing.matched);
    }
    println!("Total: {}", money(listing.total));
    Ok(())
}
