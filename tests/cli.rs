use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const HEADER: &str = "transaction_id,date,account_name,category_name,type,amount,description\n";

struct Workspace {
    home: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            home: tempfile::tempdir().unwrap(),
        };
        std::fs::create_dir_all(ws.input()).unwrap();
        ws
    }

    fn input(&self) -> PathBuf {
        self.home.path().join("monthly")
    }

    fn db(&self) -> PathBuf {
        self.home.path().join("finance.db")
    }

    fn write(&self, name: &str, content: &str) {
        std::fs::write(self.input().join(name), content).unwrap();
    }

    fn tally(&self) -> Command {
        let mut cmd = Command::cargo_bin("tally").unwrap();
        cmd.env("HOME", self.home.path())
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1")
            .arg("--db")
            .arg(self.db());
        cmd
    }

    fn build(&self) -> assert_cmd::assert::Assert {
        self.tally()
            .arg("build")
            .arg("--input")
            .arg(self.input())
            .assert()
    }

    fn with_two_months() -> Self {
        let ws = Self::new();
        ws.write(
            "Jan.csv",
            &format!(
                "{HEADER}1,2024-01-05,Checking,Groceries,expense,50.00,milk\n\
                 2,2024-01-10,Checking,Salary,income,2000.00,pay\n"
            ),
        );
        ws.write(
            "Feb.csv",
            "\"transaction_id,date,account_name,category_name,type,amount,description\"\n\
             \"3,2024-02-15,Checking,Dining,Expense,22.50,lunch\"\n\
             \"4,2024-02-20,Credit,Savings,expense,300.00,transfer\"\n",
        );
        ws
    }
}

fn count(db: &Path, table: &str) -> i64 {
    let conn = rusqlite::Connection::open(db).unwrap();
    conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))
        .unwrap()
}

#[test]
fn build_writes_three_tables() {
    let ws = Workspace::with_two_months();
    ws.build()
        .success()
        .stdout(predicate::str::contains("4 transactions, 2 accounts, 4 categories"));
    assert_eq!(count(&ws.db(), "Transactions"), 4);
    assert_eq!(count(&ws.db(), "Accounts"), 2);
    assert_eq!(count(&ws.db(), "Categories"), 4);
}

#[test]
fn build_fails_without_input_files() {
    let ws = Workspace::new();
    ws.build()
        .failure()
        .stderr(predicate::str::contains("No input files found"));
    assert!(!ws.db().exists());
}

#[test]
fn build_aborts_whole_batch_on_column_mismatch() {
    let ws = Workspace::with_two_months();
    ws.write(
        "Mar.csv",
        "transaction_id,date,account_name,category_name,type,amount\n5,2024-03-01,Checking,Rent,expense,900.00\n",
    );
    ws.build()
        .failure()
        .stderr(predicate::str::contains("Column mismatch in Mar.csv"));
    assert!(!ws.db().exists());
}

#[test]
fn failed_rebuild_keeps_previous_snapshot() {
    let ws = Workspace::with_two_months();
    ws.build().success();
    ws.write("Mar.csv", &HEADER.replace(",description", ",description,memo"));
    ws.build().failure();
    assert_eq!(count(&ws.db(), "Transactions"), 4);
}

#[test]
fn dashboard_month_filter() {
    let ws = Workspace::with_two_months();
    ws.build().success();
    ws.tally()
        .args(["dashboard", "--month", "2024-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$2,000.00"))
        .stdout(predicate::str::contains("$1,950.00"))
        .stdout(predicate::str::contains("milk"))
        .stdout(predicate::str::contains("lunch").not());
}

#[test]
fn dashboard_json_output() {
    let ws = Workspace::with_two_months();
    ws.build().success();
    let output = ws
        .tally()
        .args(["dashboard", "--json", "--account", "Checking"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["summary"]["income"], 2000.0);
    assert_eq!(value["summary"]["expenses"], 72.5);
    assert_eq!(value["summary"]["net"], 1927.5);
    assert_eq!(value["expenses"]["by_category"]["mark"], "bar");
    assert_eq!(value["rows"].as_array().unwrap().len(), 3);
}

#[test]
fn dashboard_without_expenses_shows_notice() {
    let ws = Workspace::with_two_months();
    ws.build().success();
    ws.tally()
        .args(["dashboard", "--category", "Salary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No expense data for the selected filters."));
}

#[test]
fn dashboard_requires_build() {
    let ws = Workspace::new();
    ws.tally()
        .arg("dashboard")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Run `tally build` first"));
}

#[test]
fn dashboard_rejects_bad_date() {
    let ws = Workspace::with_two_months();
    ws.build().success();
    ws.tally()
        .args(["dashboard", "--from", "Jan 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date"));
}

#[test]
fn dashboard_rejects_unpadded_month() {
    let ws = Workspace::with_two_months();
    ws.build().success();
    ws.tally()
        .args(["dashboard", "--month", "2024-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid date: 2024-1 (expected YYYY-MM)"));
}

#[test]
fn export_writes_filtered_csv() {
    let ws = Workspace::with_two_months();
    ws.build().success();
    let out = ws.home.path().join("out").join("filtered.csv");
    ws.tally()
        .args(["export", "--month", "2024-02", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 transactions"));
    let text = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "transaction_id,date,description,amount,type,account_name,category_name",
            "3,2024-02-15,lunch,22.5,expense,Checking,Dining",
            "4,2024-02-20,transfer,300.0,expense,Credit,Savings",
        ]
    );
}

#[test]
fn export_defaults_to_data_dir() {
    let ws = Workspace::with_two_months();
    ws.build().success();
    ws.tally().arg("export").assert().success();
    let expected = ws
        .home
        .path()
        .join("Documents")
        .join("tally")
        .join("exports")
        .join("filtered_transactions.csv");
    assert!(expected.exists());
}

#[test]
fn status_reports_counts() {
    let ws = Workspace::with_two_months();
    ws.build().success();
    ws.tally()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Transactions:  4"))
        .stdout(predicate::str::contains("2024-01-05 to 2024-02-20"));
}
