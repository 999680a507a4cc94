use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Ledger;
use crate::error::Result;
use crate::models::LedgerRow;

pub const TOP_EXPENSES: usize = 5;
pub const EXPORT_FILE_NAME: &str = "filtered_transactions.csv";
pub const EXPORT_MIME_TYPE: &str = "text/csv";

// ---------------------------------------------------------------------------
// Filter pipeline
// ---------------------------------------------------------------------------

/// Resolved filter controls. An empty multi-select means "everything";
/// missing range ends default to the ledger's min/max date.
#[derive(Debug, Clone, Default)]
pub struct FilterSelection {
    pub months: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub categories: Vec<String>,
    pub accounts: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterOptions {
    pub months: Vec<String>,
    pub min_date: Option<NaiveDate>,
    pub max_date: Option<NaiveDate>,
    pub categories: Vec<String>,
    pub accounts: Vec<String>,
}

/// Row counts after each stage, in pipeline order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageCounts {
    pub loaded: usize,
    pub month: usize,
    pub date_range: usize,
    pub category: usize,
    pub account: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Filtered {
    pub rows: Vec<LedgerRow>,
    pub options: FilterOptions,
    pub counts: StageCounts,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn sorted_distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn keep_members(rows: Vec<LedgerRow>, selected: &[String], field: fn(&LedgerRow) -> &str) -> Vec<LedgerRow> {
    if selected.is_empty() {
        return rows;
    }
    rows.into_iter()
        .filter(|r| selected.iter().any(|s| s == field(r)))
        .collect()
}

pub fn apply_filters(ledger: &Ledger, selection: &FilterSelection) -> Filtered {
    let bounds = ledger.date_bounds();
    let mut options = FilterOptions {
        months: sorted_distinct(ledger.rows.iter().filter_map(|r| r.year_month.as_deref())),
        min_date: bounds.map(|b| b.0),
        max_date: bounds.map(|b| b.1),
        ..Default::default()
    };
    let mut counts = StageCounts {
        loaded: ledger.rows.len(),
        ..Default::default()
    };

    let rows = if selection.months.is_empty() {
        ledger.rows.clone()
    } else {
        ledger
            .rows
            .iter()
            .filter(|r| {
                r.year_month
                    .as_ref()
                    .map_or(false, |m| selection.months.contains(m))
            })
            .cloned()
            .collect()
    };
    counts.month = rows.len();

    let from = selection.from.or(options.min_date);
    let to = selection.to.or(options.max_date);
    let rows: Vec<LedgerRow> = rows
        .into_iter()
        .filter(|r| match r.date {
            Some(d) => from.map_or(true, |f| d >= f) && to.map_or(true, |t| d <= t),
            None => false,
        })
        .collect();
    counts.date_range = rows.len();

    options.categories = sorted_distinct(rows.iter().map(|r| r.category_name.as_str()));
    let rows = keep_members(rows, &selection.categories, |r| r.category_name.as_str());
    counts.category = rows.len();

    options.accounts = sorted_distinct(rows.iter().map(|r| r.account_name.as_str()));
    let rows = keep_members(rows, &selection.accounts, |r| r.account_name.as_str());
    counts.account = rows.len();

    Filtered {
        rows,
        options,
        counts,
        from,
        to,
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Summary {
    pub income: f64,
    pub expenses: f64,
    pub net: f64,
    /// Everything filed under a category whose name contains "savings",
    /// whatever its type.
    pub saved: f64,
}

fn total(rows: &[LedgerRow], pred: impl Fn(&LedgerRow) -> bool) -> f64 {
    rows.iter().filter(|r| pred(r)).filter_map(|r| r.amount).sum()
}

pub fn summarize(rows: &[LedgerRow]) -> Summary {
    let income = total(rows, LedgerRow::is_income);
    let expenses = total(rows, LedgerRow::is_expense);
    let saved = total(rows, |r| r.category_name.to_lowercase().contains("savings"));
    Summary {
        income,
        expenses,
        net: income - expenses,
        saved,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category_name: String,
    pub amount: f64,
    /// Fraction of all expenses in the set, 0.0..=1.0.
    pub share: f64,
}

/// Expense totals per category, largest first.
pub fn category_breakdown(rows: &[LedgerRow]) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for r in rows.iter().filter(|r| r.is_expense()) {
        if let Some(amount) = r.amount {
            *totals.entry(r.category_name.as_str()).or_default() += amount;
        }
    }
    let grand: f64 = totals.values().sum();
    let mut items: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(name, amount)| CategoryTotal {
            category_name: name.to_string(),
            amount,
            share: if grand != 0.0 { amount / grand } else { 0.0 },
        })
        .collect();
    // BTreeMap order is by name, so a stable sort leaves ties alphabetical.
    items.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    items
}

/// The `n` largest expenses, descending. Rows without an amount are skipped.
pub fn top_expenses(rows: &[LedgerRow], n: usize) -> Vec<LedgerRow> {
    let mut expenses: Vec<&LedgerRow> = rows
        .iter()
        .filter(|r| r.is_expense() && r.amount.is_some())
        .collect();
    expenses.sort_by(|a, b| {
        let (a, b) = (a.amount.unwrap_or_default(), b.amount.unwrap_or_default());
        b.total_cmp(&a)
    });
    expenses.into_iter().take(n).cloned().collect()
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartMark {
    Bar,
    Arc,
}

/// Renderer-neutral chart description: one mark, category on one channel,
/// summed amount on the other.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: &'static str,
    pub mark: ChartMark,
    pub category_field: &'static str,
    pub value_field: &'static str,
    pub data: Vec<CategoryTotal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseSections {
    pub by_category: ChartSpec,
    pub share: ChartSpec,
    pub top_expenses: Vec<LedgerRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub options: FilterOptions,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub counts: StageCounts,
    pub summary: Summary,
    /// `None` when the filtered set holds no expense with an amount.
    pub expenses: Option<ExpenseSections>,
    pub rows: Vec<LedgerRow>,
}

pub fn build_dashboard(ledger: &Ledger, selection: &FilterSelection) -> Dashboard {
    let filtered = apply_filters(ledger, selection);
    let summary = summarize(&filtered.rows);
    let breakdown = category_breakdown(&filtered.rows);

    let expenses = if breakdown.is_empty() {
        None
    } else {
        Some(ExpenseSections {
            by_category: ChartSpec {
                title: "Spending by Category",
                mark: ChartMark::Bar,
                category_field: "category_name",
                value_field: "amount",
                data: breakdown.clone(),
            },
            share: ChartSpec {
                title: "Category Share",
                mark: ChartMark::Arc,
                category_field: "category_name",
                value_field: "amount",
                data: breakdown,
            },
            top_expenses: top_expenses(&filtered.rows, TOP_EXPENSES),
        })
    };

    Dashboard {
        options: filtered.options,
        from: filtered.from,
        to: filtered.to,
        counts: filtered.counts,
        summary,
        expenses,
        rows: filtered.rows,
    }
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ExportRow<'a> {
    transaction_id: &'a str,
    date: Option<NaiveDate>,
    description: &'a str,
    amount: Option<f64>,
    #[serde(rename = "type")]
    txn_type: &'a str,
    account_name: &'a str,
    category_name: &'a str,
}

impl<'a> From<&'a LedgerRow> for ExportRow<'a> {
    fn from(r: &'a LedgerRow) -> Self {
        Self {
            transaction_id: &r.transaction_id,
            date: r.date,
            description: &r.description,
            amount: r.amount,
            txn_type: &r.txn_type,
            account_name: &r.account_name,
            category_name: &r.category_name,
        }
    }
}

/// A downloadable file: name, MIME type and contents.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

const EXPORT_HEADER: [&str; 7] = [
    "transaction_id",
    "date",
    "description",
    "amount",
    "type",
    "account_name",
    "category_name",
];

pub fn export_csv(rows: &[LedgerRow]) -> Result<ExportArtifact> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    // Written explicitly so an empty selection still gets a header row.
    wtr.write_record(EXPORT_HEADER)?;
    for r in rows {
        wtr.serialize(ExportRow::from(r))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| crate::error::TallyError::Other(e.to_string()))?;
    Ok(ExportArtifact {
        file_name: EXPORT_FILE_NAME,
        mime_type: EXPORT_MIME_TYPE,
        bytes,
    })
}
