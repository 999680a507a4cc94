use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::{open_built_db, resolve_db, FilterArgs};
use crate::db::load_ledger;
use crate::error::Result;
use crate::fmt::{bar, money, money_opt, percent};
use crate::reports::{build_dashboard, ChartSpec, Dashboard};

const BAR_WIDTH: usize = 30;

pub fn run(db: Option<&str>, filters: &FilterArgs, json: bool) -> Result<()> {
    let selection = filters.to_selection()?;
    let conn = open_built_db(&resolve_db(db))?;
    let ledger = load_ledger(&conn)?;
    let dashboard = build_dashboard(&ledger, &selection);

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        println!("{}", render(&dashboard));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pure formatting (dashboard → String)
// ---------------------------------------------------------------------------

pub fn render(d: &Dashboard) -> String {
    let mut out = Vec::new();

    let range = match (d.from, d.to) {
        (Some(from), Some(to)) => format!("{from} to {to}"),
        _ => "no dated transactions".to_string(),
    };
    out.push(format!(
        "{}\n{range} \u{00b7} {} of {} transactions",
        "Monthly Finance Tracker".bold(),
        d.counts.account,
        d.counts.loaded
    ));
    out.push(format_metrics(d));

    out.push(format!("\n{}", "Spending by Category".bold()));
    out.push(match &d.expenses {
        Some(e) => format_bar_chart(&e.by_category),
        None => "No expense data for the selected filters.".to_string(),
    });

    out.push(format!("\n{}", "Category Share".bold()));
    out.push(match &d.expenses {
        Some(e) => format_share_chart(&e.share),
        None => "No expense data to show.".to_string(),
    });

    out.push(format!("\n{}", "Top 5 Biggest Expenses".bold()));
    out.push(match &d.expenses {
        Some(e) => e
            .top_expenses
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let date = r.date.map(|d| d.to_string()).unwrap_or_default();
                format!(
                    "{}. {}  {}  {}  {}",
                    i + 1,
                    r.category_name.bold(),
                    date,
                    r.description,
                    money_opt(r.amount).red()
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
        None => "No expense records to display.".to_string(),
    });

    out.push(format!("\n{}", "Filtered Transactions".bold()));
    out.push(format_rows(d));

    out.join("\n")
}

fn format_metrics(d: &Dashboard) -> String {
    let s = &d.summary;
    let net = if s.net >= 0.0 {
        money(s.net).green().bold()
    } else {
        money(s.net).red().bold()
    };
    let mut table = Table::new();
    table.set_header(vec!["Total Income", "Total Expenses", "Net Balance", "Saved"]);
    table.add_row(vec![
        Cell::new(money(s.income).green()),
        Cell::new(money(s.expenses).red()),
        Cell::new(net),
        Cell::new(money(s.saved)),
    ]);
    table.to_string()
}

fn format_bar_chart(spec: &ChartSpec) -> String {
    let max = spec.data.first().map_or(0.0, |c| c.amount);
    let mut table = Table::new();
    table.set_header(vec!["Category", "Amount", ""]);
    for item in &spec.data {
        table.add_row(vec![
            Cell::new(&item.category_name),
            Cell::new(money(item.amount)),
            Cell::new(bar(item.amount, max, BAR_WIDTH).magenta()),
        ]);
    }
    table.to_string()
}

fn format_share_chart(spec: &ChartSpec) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Category", "Share", ""]);
    for item in &spec.data {
        table.add_row(vec![
            Cell::new(&item.category_name),
            Cell::new(percent(item.share)),
            Cell::new(bar(item.share, 1.0, BAR_WIDTH).cyan()),
        ]);
    }
    table.to_string()
}

fn format_rows(d: &Dashboard) -> String {
    if d.rows.is_empty() {
        return "No transactions match the selected filters.".to_string();
    }
    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Amount", "Type", "Account", "Category"]);
    for r in &d.rows {
        let amt = if r.is_expense() {
            money_opt(r.amount).red().to_string()
        } else if r.is_income() {
            money_opt(r.amount).green().to_string()
        } else {
            money_opt(r.amount)
        };
        table.add_row(vec![
            Cell::new(&r.transaction_id),
            Cell::new(r.date.map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(&r.description),
            Cell::new(amt),
            Cell::new(&r.txn_type),
            Cell::new(&r.account_name),
            Cell::new(&r.category_name),
        ]);
    }
    table.to_string()
}
