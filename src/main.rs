mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod logging;
mod models;
mod reports;
mod settings;
mod store;

use clap::Parser;

use cli::{CategoriesCommands, Cli, Commands};
use reports::{DetailFilter, SummaryFilter};

fn main() {
    // Usage errors are fatal like any other: exit 1, keeping 2 for rollbacks.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };
    logging::init_logging();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir).map(|_| 0),
        Commands::Load(args) => cli::load::run(args),
        Commands::Status => cli::status::run().map(|_| 0),
        Commands::Summary { id } => cli::summary::run(id).map(|_| 0),
        Commands::Summaries {
            category,
            program,
            search,
            limit,
        } => cli::summaries::run(SummaryFilter {
            category,
            program,
            search,
            limit: Some(limit),
        })
        .map(|_| 0),
        Commands::Categories { command } => match command {
            CategoriesCommands::Add { name } => cli::categories::add(&name),
            CategoriesCommands::List => cli::categories::list(),
        }
        .map(|_| 0),
        Commands::Detail { id } => cli::detail::run(id).map(|_| 0),
        Commands::Details {
            category,
            program,
            purpose,
            search,
            limit,
        } => cli::details::run(DetailFilter {
            category,
            program,
            purpose,
            search,
            limit: Some(limit),
        })
        .map(|_| 0),
        Commands::History => cli::history::run().map(|_| 0),
    };

    match result {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
