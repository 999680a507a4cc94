use std::path::PathBuf;

use tracing::debug;

use crate::cli::{open_built_db, resolve_db, FilterArgs};
use crate::db::load_ledger;
use crate::error::Result;
use crate::reports::{apply_filters, export_csv};
use crate::settings::load_settings;

fn default_path(file_name: &str) -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
        .join("exports")
        .join(file_name)
}

pub fn run(db: Option<&str>, filters: &FilterArgs, output: Option<String>) -> Result<()> {
    let selection = filters.to_selection()?;
    let conn = open_built_db(&resolve_db(db))?;
    let ledger = load_ledger(&conn)?;
    let filtered = apply_filters(&ledger, &selection);

    let artifact = export_csv(&filtered.rows)?;
    debug!(mime = artifact.mime_type, bytes = artifact.bytes.len(), "export rendered");

    let path = output
        .map(PathBuf::from)
        .unwrap_or_else(|| default_path(artifact.file_name));
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, &artifact.bytes)?;
    println!("Wrote {} ({} transactions)", path.display(), filtered.rows.len());
    Ok(())
}
