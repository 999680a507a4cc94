use std::path::PathBuf;

use tracing::info;

use crate::cli::resolve_db;
use crate::db::{get_connection, write_snapshot};
use crate::error::Result;
use crate::importer::build_snapshot;
use crate::settings::load_settings;

pub fn run(db: Option<&str>, input: Option<&str>) -> Result<()> {
    let input_dir = input
        .map(PathBuf::from)
        .unwrap_or_else(|| load_settings().input_path());
    let db_path = resolve_db(db);

    // Every file is validated before the database is touched.
    let snapshot = build_snapshot(&input_dir)?;

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut conn = get_connection(&db_path)?;
    write_snapshot(&mut conn, &snapshot)?;
    info!(db = %db_path.display(), "database rebuilt");

    println!(
        "Built {} from {}: {} transactions, {} accounts, {} categories",
        db_path.display(),
        input_dir.display(),
        snapshot.transactions.len(),
        snapshot.accounts.len(),
        snapshot.categories.len(),
    );
    Ok(())
}
