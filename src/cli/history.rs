use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::reports::get_loads;

pub fn run() -> Result<()> {
    let conn = super::open_db()?;
    let loads = get_loads(&conn)?;
    if loads.is_empty() {
        println!("No loads recorded yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "When", "File", "Format", "Stored", "Failed", "Checksum"]);
    for load in loads {
        let stored = if load.rolled_back {
            "rolled back".red().to_string()
        } else {
            load.succeeded.to_string()
        };
        table.add_row(vec![
            Cell::new(load.id.unwrap_or_default()),
            Cell::new(load.loaded_at.unwrap_or_default()),
            Cell::new(load.filename),
            Cell::new(load.date_format),
            Cell::new(stored),
            Cell::new(load.failed),
            Cell::new(&load.checksum[..load.checksum.len().min(12)]),
        ]);
    }
    println!("Loads\n{table}");
    Ok(())
}
