pub mod build;
pub mod dashboard;
pub mod export;
pub mod init;
pub mod status;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, table_counts};
use crate::error::{Result, TallyError};
use crate::reports::FilterSelection;
use crate::settings::load_settings;

#[derive(Parser)]
#[command(name = "tally", about = "Monthly finance CSV ingestion and dashboard.")]
pub struct Cli {
    /// Database file (default: <data_dir>/finance.db from settings)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and default input directory.
    Init {
        /// Path for tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Directory of monthly CSV exports, relative to the data dir unless absolute
        #[arg(long = "input-dir")]
        input_dir: Option<String>,
    },
    /// Rebuild the database from every monthly CSV in the input directory.
    Build {
        /// Directory of monthly CSV exports (default: from settings)
        #[arg(long)]
        input: Option<String>,
    },
    /// Show summary metrics, charts, top expenses and the filtered table.
    Dashboard {
        #[command(flatten)]
        filters: FilterArgs,
        /// Print the dashboard as JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Write the filtered transactions to a CSV file.
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output file (default: <data_dir>/exports/filtered_transactions.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// Show configured paths and database contents.
    Status,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Month bucket YYYY-MM (repeatable; none = all months)
    #[arg(long = "month")]
    pub months: Vec<String>,
    /// Start date: YYYY-MM-DD (default: earliest transaction)
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// End date: YYYY-MM-DD (default: latest transaction)
    #[arg(long = "to")]
    pub to_date: Option<String>,
    /// Category name (repeatable; none = all categories)
    #[arg(long = "category")]
    pub categories: Vec<String>,
    /// Account name (repeatable; none = all accounts)
    #[arg(long = "account")]
    pub accounts: Vec<String>,
}

fn parse_date_arg(raw: &Option<String>) -> Result<Option<NaiveDate>> {
    raw.as_deref()
        .map(|s| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| TallyError::InvalidDate(s.to_string(), "YYYY-MM-DD"))
        })
        .transpose()
}

/// `--month` values must be zero-padded `YYYY-MM` to match `year_month`.
fn parse_month_arg(raw: &str) -> Result<String> {
    let month = raw.trim();
    let padded = month.len() == 7 && month.as_bytes()[4] == b'-';
    if padded && NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").is_ok() {
        Ok(month.to_string())
    } else {
        Err(TallyError::InvalidDate(raw.to_string(), "YYYY-MM"))
    }
}

impl FilterArgs {
    pub fn to_selection(&self) -> Result<FilterSelection> {
        Ok(FilterSelection {
            months: self
                .months
                .iter()
                .map(|m| parse_month_arg(m))
                .collect::<Result<_>>()?,
            from: parse_date_arg(&self.from_date)?,
            to: parse_date_arg(&self.to_date)?,
            categories: self.categories.clone(),
            accounts: self.accounts.clone(),
        })
    }
}

/// `--db` if given, otherwise the settings' database path.
pub(crate) fn resolve_db(db: Option<&str>) -> PathBuf {
    db.map(PathBuf::from)
        .unwrap_or_else(|| load_settings().db_path())
}

/// Open a database that `tally build` has already populated.
pub(crate) fn open_built_db(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        return Err(TallyError::Other(format!(
            "No database found at {}\nRun `tally build` first.",
            db_path.display()
        )));
    }
    let conn = get_connection(db_path)?;
    if table_counts(&conn)?.is_none() {
        return Err(TallyError::Other(format!(
            "{} has not been built yet. Run `tally build` first.",
            db_path.display()
        )));
    }
    Ok(conn)
}
