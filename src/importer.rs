use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::error::{Result, TallyError};
use crate::models::{Account, Category, RawRow, Snapshot, Transaction};

/// Column order every monthly export must have, after shape repair.
pub const CANONICAL_HEADER: [&str; 7] = [
    "transaction_id",
    "date",
    "account_name",
    "category_name",
    "type",
    "amount",
    "description",
];

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse a calendar date. Unparsable input yields `None`, never an error.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parse an amount. Empty, non-numeric and non-finite input yields `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn header_matches(header: &csv::StringRecord) -> bool {
    header.len() == CANONICAL_HEADER.len()
        && header
            .iter()
            .enumerate()
            .map(|(i, h)| if i == 0 { h.trim_start_matches('\u{feff}') } else { h })
            .eq(CANONICAL_HEADER.iter().copied())
}

fn raw_row_from_fields(mut fields: Vec<String>) -> RawRow {
    fields.resize(CANONICAL_HEADER.len(), String::new());
    let mut it = fields.into_iter();
    let mut next = || it.next().unwrap_or_default();
    RawRow {
        transaction_id: next(),
        date: next(),
        account_name: next(),
        category_name: next(),
        txn_type: next(),
        amount: next(),
        description: next(),
    }
}

// ---------------------------------------------------------------------------
// Discovery and per-file parsing
// ---------------------------------------------------------------------------

/// List the `.csv` files in `dir`, sorted by name.
pub fn find_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).map_err(|_| TallyError::MissingInput(dir.to_path_buf()))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map_or(false, |e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(TallyError::MissingInput(dir.to_path_buf()));
    }
    Ok(files)
}

fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

/// Read one monthly export.
///
/// A file whose header parses as a single column was exported with every
/// field collapsed into one quoted cell; each record is split on `,` and the
/// canonical header applied. Anything else must carry the canonical header
/// verbatim.
pub fn read_monthly_file(path: &Path) -> Result<Vec<RawRow>> {
    let mismatch = || TallyError::ShapeMismatch {
        file: file_label(path),
    };

    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let header = rdr.headers()?.clone();

    let mut rows: Vec<Vec<String>> = Vec::new();
    if header.len() == 1 {
        let mut width = 0usize;
        for result in rdr.records() {
            let record = result?;
            if is_blank(&record) {
                continue;
            }
            if record.len() > 1 {
                return Err(mismatch());
            }
            let parts: Vec<String> = record
                .get(0)
                .unwrap_or("")
                .split(',')
                .map(str::to_string)
                .collect();
            width = width.max(parts.len());
            rows.push(parts);
        }
        // A header-only export has nothing to split.
        if !rows.is_empty() && width != CANONICAL_HEADER.len() {
            return Err(mismatch());
        }
        debug!(file = %file_label(path), rows = rows.len(), "repaired single-column export");
    } else {
        if !header_matches(&header) {
            return Err(mismatch());
        }
        for result in rdr.records() {
            let record = result?;
            if is_blank(&record) {
                continue;
            }
            if record.len() > CANONICAL_HEADER.len() {
                return Err(mismatch());
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
    }

    Ok(rows.into_iter().map(raw_row_from_fields).collect())
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn intern(ids: &mut HashMap<String, i64>, names: &mut Vec<String>, name: String) -> i64 {
    if let Some(&id) = ids.get(&name) {
        return id;
    }
    names.push(name.clone());
    let id = names.len() as i64;
    ids.insert(name, id);
    id
}

/// Clean fields and split the stacked rows into the three tables.
///
/// Dimension ids are assigned `1..=N` in first-seen order. Row count and
/// row order are preserved; cells that fail to parse become `None`.
pub fn normalize(rows: Vec<RawRow>) -> Snapshot {
    let mut account_ids = HashMap::new();
    let mut account_names = Vec::new();
    let mut category_ids = HashMap::new();
    let mut category_names = Vec::new();

    let transactions = rows
        .into_iter()
        .map(|row| {
            let account_id = intern(
                &mut account_ids,
                &mut account_names,
                row.account_name.trim().to_string(),
            );
            let category_id = intern(
                &mut category_ids,
                &mut category_names,
                row.category_name.trim().to_string(),
            );
            Transaction {
                date: parse_date(&row.date),
                amount: parse_amount(&row.amount),
                txn_type: row.txn_type.trim().to_string(),
                description: row.description.trim().to_string(),
                transaction_id: row.transaction_id,
                account_id,
                category_id,
            }
        })
        .collect();

    Snapshot {
        accounts: account_names
            .into_iter()
            .zip(1..)
            .map(|(account_name, account_id)| Account {
                account_id,
                account_name,
            })
            .collect(),
        categories: category_names
            .into_iter()
            .zip(1..)
            .map(|(category_name, category_id)| Category {
                category_id,
                category_name,
            })
            .collect(),
        transactions,
    }
}

/// Read and validate every file in `dir`, then normalize the stacked rows.
/// Fails on the first missing-input or shape error without returning a
/// partial snapshot.
pub fn build_snapshot(dir: &Path) -> Result<Snapshot> {
    let files = find_input_files(dir)?;

    let mut stacked = Vec::new();
    for file in &files {
        info!("Loading {}", file_label(file));
        let rows = read_monthly_file(file)?;
        debug!(file = %file_label(file), rows = rows.len(), "file accepted");
        stacked.extend(rows);
    }

    let snapshot = normalize(stacked);
    let null_dates = snapshot.transactions.iter().filter(|t| t.date.is_none()).count();
    let null_amounts = snapshot.transactions.iter().filter(|t| t.amount.is_none()).count();
    info!(
        files = files.len(),
        rows = snapshot.transactions.len(),
        accounts = snapshot.accounts.len(),
        categories = snapshot.categories.len(),
        null_dates,
        null_amounts,
        "normalized monthly exports"
    );
    Ok(snapshot)
}
