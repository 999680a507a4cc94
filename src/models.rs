use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub account_id: i64,
    pub account_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub category_id: i64,
    pub category_name: String,
}

/// Fact row as persisted. `date` and `amount` are `None` when the source
/// cell could not be parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub transaction_id: String,
    pub date: Option<NaiveDate>,
    pub txn_type: String,
    pub amount: Option<f64>,
    pub description: String,
    pub account_id: i64,
    pub category_id: i64,
}

/// One ingestion run's worth of normalized tables.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub transactions: Vec<Transaction>,
}

/// Seven text fields from a monthly file, in canonical column order,
/// before any cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub transaction_id: String,
    pub date: String,
    pub account_name: String,
    pub category_name: String,
    pub txn_type: String,
    pub amount: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnKind {
    Income,
    Expense,
}

impl TxnKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// A row of the reporting join: Transactions joined to both dimensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerRow {
    pub transaction_id: String,
    pub date: Option<NaiveDate>,
    pub description: String,
    pub amount: Option<f64>,
    #[serde(rename = "type")]
    pub txn_type: String,
    pub account_name: String,
    pub category_name: String,
    pub year_month: Option<String>,
}

impl LedgerRow {
    pub fn kind(&self) -> Option<TxnKind> {
        TxnKind::parse(&self.txn_type)
    }

    pub fn is_expense(&self) -> bool {
        self.kind() == Some(TxnKind::Expense)
    }

    pub fn is_income(&self) -> bool {
        self.kind() == Some(TxnKind::Income)
    }
}
