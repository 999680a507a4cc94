/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let cents = format!("{:.2}", val.abs());
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// `money`, or a dash for a cell that failed to parse at ingestion.
pub fn money_opt(val: Option<f64>) -> String {
    val.map(money).unwrap_or_else(|| "\u{2014}".to_string())
}

/// A 0..=1 fraction as a percentage: 0.4567 -> "45.7%"
pub fn percent(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

/// Horizontal bar scaled so `max` fills `width` cells. Non-zero values
/// always get at least one cell.
pub fn bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let cells = ((value / max) * width as f64).round() as usize;
    "\u{2588}".repeat(cells.clamp(1, width))
}
