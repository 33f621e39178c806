pub mod categories;
pub mod detail;
pub mod details;
pub mod history;
pub mod init;
pub mod load;
pub mod status;
pub mod summaries;
pub mod summary;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::db::open_data_dir;
use crate::error::Result;
use crate::settings::get_data_dir;

pub(crate) fn open_db() -> Result<Connection> {
    open_data_dir(&get_data_dir())
}

#[derive(Parser)]
#[command(name = "expenses", about = "Load and browse House office expense extracts.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for expense data (default: ~/.local/share/expenses)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Load an itemized detail CSV into the database.
    ///
    /// Exits 0 when the run completes, even if some rows were rejected (they are
    /// listed in the report), 1 on a fatal error, 2 when --all-or-nothing rolled back.
    Load(load::LoadArgs),
    /// Show record counts for the current database.
    Status,
    /// Show one summary record.
    Summary {
        /// Summary ID
        id: i64,
    },
    /// List summary records.
    Summaries {
        /// Only this category (exact match)
        #[arg(long)]
        category: Option<String>,
        /// Only this program (exact match)
        #[arg(long)]
        program: Option<String>,
        /// Substring to look for in program
        #[arg(long)]
        search: Option<String>,
        /// Maximum rows to print
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Manage expense categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Show every stored field of one detail record.
    Detail {
        /// Detail ID (as shown by `details`)
        id: i64,
    },
    /// List detail records.
    Details {
        /// Only this category (exact match)
        #[arg(long)]
        category: Option<String>,
        /// Only this program (exact match)
        #[arg(long)]
        program: Option<String>,
        /// Only this purpose (exact match)
        #[arg(long)]
        purpose: Option<String>,
        /// Substring to look for in program or payee
        #[arg(long)]
        search: Option<String>,
        /// Maximum rows to print
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Show previous load runs.
    History,
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category.
    Add {
        /// Category name, e.g. 'TRAVEL'
        name: String,
    },
    /// List all categories.
    List,
}
