use std::path::Path;

use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::error::Result;
use crate::models::{LedgerRow, Snapshot};

const DROP_TABLES: &str = "
DROP TABLE IF EXISTS Transactions;
DROP TABLE IF EXISTS Categories;
DROP TABLE IF EXISTS Accounts;
";

pub const SCHEMA: &str = "
CREATE TABLE Accounts (
    account_name TEXT NOT NULL UNIQUE,
    account_id INTEGER PRIMARY KEY
);

CREATE TABLE Categories (
    category_name TEXT NOT NULL UNIQUE,
    category_id INTEGER PRIMARY KEY
);

CREATE TABLE Transactions (
    transaction_id TEXT,
    date TEXT,
    type TEXT NOT NULL,
    amount REAL,
    description TEXT NOT NULL,
    account_id INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    FOREIGN KEY (account_id) REFERENCES Accounts(account_id),
    FOREIGN KEY (category_id) REFERENCES Categories(category_id)
);
";

const LEDGER_QUERY: &str = "
SELECT t.transaction_id, t.date, t.description, t.amount, t.type,
       a.account_name, c.category_name
FROM Transactions t
JOIN Accounts a ON t.account_id = a.account_id
JOIN Categories c ON t.category_id = c.category_id
ORDER BY t.date, t.rowid
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

/// Replace all three tables with `snapshot` in a single transaction.
pub fn write_snapshot(conn: &mut Connection, snapshot: &Snapshot) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(DROP_TABLES)?;
    tx.execute_batch(SCHEMA)?;
    {
        let mut stmt =
            tx.prepare("INSERT INTO Accounts (account_name, account_id) VALUES (?1, ?2)")?;
        for a in &snapshot.accounts {
            stmt.execute(params![a.account_name, a.account_id])?;
        }

        let mut stmt =
            tx.prepare("INSERT INTO Categories (category_name, category_id) VALUES (?1, ?2)")?;
        for c in &snapshot.categories {
            stmt.execute(params![c.category_name, c.category_id])?;
        }

        let mut stmt = tx.prepare(
            "INSERT INTO Transactions (transaction_id, date, type, amount, description, account_id, category_id) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        for t in &snapshot.transactions {
            stmt.execute(params![
                t.transaction_id,
                t.date.map(|d| d.format("%Y-%m-%d").to_string()),
                t.txn_type,
                t.amount,
                t.description,
                t.account_id,
                t.category_id,
            ])?;
        }
    }
    tx.commit()?;
    debug!(
        accounts = snapshot.accounts.len(),
        categories = snapshot.categories.len(),
        transactions = snapshot.transactions.len(),
        "snapshot committed"
    );
    Ok(())
}

/// Immutable view of the persisted join, loaded fresh per command.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    pub rows: Vec<LedgerRow>,
}

impl Ledger {
    pub fn new(rows: Vec<LedgerRow>) -> Self {
        Self { rows }
    }

    /// Earliest and latest valid dates, if any row has one.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.rows.iter().filter_map(|r| r.date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }
}

pub fn year_month(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn load_ledger(conn: &Connection) -> Result<Ledger> {
    let mut stmt = conn.prepare(LEDGER_QUERY)?;
    let rows = stmt
        .query_map([], |row| {
            let date: Option<String> = row.get(1)?;
            let date = date.and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok());
            let txn_type: String = row.get(4)?;
            Ok(LedgerRow {
                transaction_id: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                date,
                description: row.get(2)?,
                amount: row.get(3)?,
                txn_type: txn_type.to_lowercase(),
                account_name: row.get(5)?,
                category_name: row.get(6)?,
                year_month: date.map(year_month),
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(Ledger::new(rows))
}

pub struct TableCounts {
    pub accounts: i64,
    pub categories: i64,
    pub transactions: i64,
}

/// Row counts for the three tables, or `None` before the first build.
pub fn table_counts(conn: &Connection) -> Result<Option<TableCounts>> {
    let built: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='Transactions'",
            [],
            |r| r.get(0),
        )
        .optional()?;
    if built.is_none() {
        return Ok(None);
    }
    let count = |table: &str| -> Result<i64> {
        Ok(conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))?)
    };
    Ok(Some(TableCounts {
        accounts: count("Accounts")?,
        categories: count("Categories")?,
        transactions: count("Transactions")?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Account, Category, Transaction};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        (dir, conn)
    }

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            accounts: vec![Account { account_id: 1, account_name: "Checking".into() }],
            categories: vec![
                Category { category_id: 1, category_name: "Groceries".into() },
                Category { category_id: 2, category_name: "Salary".into() },
            ],
            transactions: vec![
                Transaction {
                    transaction_id: "2".into(),
                    date: NaiveDate::from_ymd_opt(2024, 1, 10),
                    txn_type: "Income".into(),
                    amount: Some(2000.0),
                    description: "pay".into(),
                    account_id: 1,
                    category_id: 2,
                },
                Transaction {
                    transaction_id: "1".into(),
                    date: NaiveDate::from_ymd_opt(2024, 1, 5),
                    txn_type: "expense".into(),
                    amount: Some(50.0),
                    description: "milk".into(),
                    account_id: 1,
                    category_id: 1,
                },
                Transaction {
                    transaction_id: "3".into(),
                    date: None,
                    txn_type: "expense".into(),
                    amount: None,
                    description: "???".into(),
                    account_id: 1,
                    category_id: 1,
                },
            ],
        }
    }

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_write_snapshot_creates_tables() {
        let (_dir, mut conn) = test_db();
        write_snapshot(&mut conn, &sample_snapshot()).unwrap();
        assert_eq!(table_names(&conn), vec!["Accounts", "Categories", "Transactions"]);
        let counts = table_counts(&conn).unwrap().unwrap();
        assert_eq!((counts.accounts, counts.categories, counts.transactions), (1, 2, 3));
    }

    #[test]
    fn test_write_snapshot_replaces_previous_build() {
        let (_dir, mut conn) = test_db();
        write_snapshot(&mut conn, &sample_snapshot()).unwrap();
        let mut smaller = sample_snapshot();
        smaller.transactions.truncate(1);
        write_snapshot(&mut conn, &smaller).unwrap();
        let counts = table_counts(&conn).unwrap().unwrap();
        assert_eq!(counts.transactions, 1);
    }

    #[test]
    fn test_write_snapshot_rolls_back_on_bad_reference() {
        let (_dir, mut conn) = test_db();
        write_snapshot(&mut conn, &sample_snapshot()).unwrap();
        let mut broken = sample_snapshot();
        broken.transactions[0].category_id = 99;
        assert!(write_snapshot(&mut conn, &broken).is_err());
        let counts = table_counts(&conn).unwrap().unwrap();
        assert_eq!((counts.categories, counts.transactions), (2, 3));
    }

    #[test]
    fn test_table_counts_before_build() {
        let (_dir, conn) = test_db();
        assert!(table_counts(&conn).unwrap().is_none());
    }

    #[test]
    fn test_load_ledger_orders_by_date_and_lowercases_type() {
        let (_dir, mut conn) = test_db();
        write_snapshot(&mut conn, &sample_snapshot()).unwrap();
        let ledger = load_ledger(&conn).unwrap();
        let ids: Vec<&str> = ledger.rows.iter().map(|r| r.transaction_id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);
        assert_eq!(ledger.rows[2].txn_type, "income");
        assert_eq!(ledger.rows[2].year_month.as_deref(), Some("2024-01"));
        assert_eq!(ledger.rows[0].year_month, None);
        assert_eq!(ledger.rows[0].amount, None);
        assert_eq!(ledger.rows[1].category_name, "Groceries");
    }

    #[test]
    fn test_date_bounds() {
        let (_dir, mut conn) = test_db();
        write_snapshot(&mut conn, &sample_snapshot()).unwrap();
        let ledger = load_ledger(&conn).unwrap();
        assert_eq!(
            ledger.date_bounds(),
            Some((
                NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
            ))
        );
        assert_eq!(Ledger::default().date_bounds(), None);
    }
}
