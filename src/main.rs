mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod reports;
mod settings;

use clap::Parser;
use tracing_subscriber::{fmt as log_fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins, then --verbose, then warnings only.
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(
            log_fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let db = cli.db.as_deref();
    let result = match cli.command {
        Commands::Init {
            data_dir,
            input_dir,
        } => cli::init::run(data_dir, input_dir),
        Commands::Build { input } => cli::build::run(db, input.as_deref()),
        Commands::Dashboard { filters, json } => cli::dashboard::run(db, &filters, json),
        Commands::Export { filters, output } => cli::export::run(db, &filters, output),
        Commands::Status => cli::status::run(db),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
