use crate::db::DB_FILE;
use crate::error::Result;
use crate::reports::get_counts;
use crate::settings::get_data_dir;

pub fn run() -> Result<()> {
    let data_dir = get_data_dir();
    let db_path = data_dir.join(DB_FILE);

    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `expenses init` to set up.");
        return Ok(());
    }

    let counts = get_counts(&super::open_db()?)?;
    println!();
    println!("Summaries:   {}", counts.summaries);
    println!("Details:     {}", counts.details);
    println!("Categories:  {}", counts.categories);
    println!("Loads:       {}", counts.loads);
    Ok(())
}
