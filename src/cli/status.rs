use crate::db::{get_connection, load_ledger, table_counts};
use crate::error::Result;
use crate::settings::load_settings;

pub fn run(db: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let db_path = super::resolve_db(db);

    println!("Data dir:   {}", settings.data_dir);
    println!("Input dir:  {}", settings.input_path().display());
    println!("Database:   {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `tally build` to create it.");
        return Ok(());
    }

    let conn = get_connection(&db_path)?;
    let Some(counts) = table_counts(&conn)? else {
        println!();
        println!("Database is empty. Run `tally build` to populate it.");
        return Ok(());
    };

    println!();
    println!("Accounts:      {}", counts.accounts);
    println!("Categories:    {}", counts.categories);
    println!("Transactions:  {}", counts.transactions);

    let ledger = load_ledger(&conn)?;
    if let Some((first, last)) = ledger.date_bounds() {
        println!("Date range:    {first} to {last}");
    }
    let undated = ledger.rows.iter().filter(|r| r.date.is_none()).count();
    let no_amount = ledger.rows.iter().filter(|r| r.amount.is_none()).count();
    if undated > 0 || no_amount > 0 {
        println!("Unparsed:      {undated} dates, {no_amount} amounts");
    }
    Ok(())
}
