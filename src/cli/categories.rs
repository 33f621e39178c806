use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::reports::{add_category, get_categories};

pub fn add(name: &str) -> Result<()> {
    let conn = super::open_db()?;
    add_category(&conn, name)?;
    println!("Added category: {}", name.trim());
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = super::open_db()?;
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for category in get_categories(&conn)? {
        table.add_row(vec![Cell::new(category.id), Cell::new(category.name)]);
    }
    println!("Categories\n{table}");
    Ok(())
}
