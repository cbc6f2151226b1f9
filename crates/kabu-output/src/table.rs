//! Fixed-width text tables.

use chrono::NaiveDate;
use kabu_data::store::{AssessmentRow, FiscalSummaryRecord, ListedIssuer};
use std::fmt::Write;

/// Widest company name shown before truncation.
pub const NAME_WIDTH: usize = 30;

const RULE_WIDTH: usize = 112;

/// Issuer code as traders write it: five-digit codes ending in `0` lose
/// the trailing check digit.
pub fn display_code(code: &str) -> &str {
    match code.strip_suffix('0') {
        Some(short) if code.len() == 5 => short,
        _ => code,
    }
}

/// Cut `name` to [`NAME_WIDTH`] characters, ending in `...` when shortened.
pub fn truncate_name(name: &str) -> String {
    if name.chars().count() > NAME_WIDTH {
        let head: String = name.chars().take(NAME_WIDTH - 3).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

fn opt_f64(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.precision$}"))
}

fn opt_i64(value: Option<i64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn opt_date(value: Option<NaiveDate>) -> String {
    value.map_or_else(|| "-".to_string(), |d| d.to_string())
}

/// Numbered screening table, one line per assessment row.
pub fn render_screen(title: &str, rows: &[AssessmentRow]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n=== {title} ===");
    let _ = writeln!(
        out,
        "{:<12} {:<30} {:<15} {:<10} {:<12} {:<10} {:<8} {:<8} {:<8}",
        "Code", "Company", "FY End", "Dividend", "Trade Date", "Close", "Yield%", "FromMin%", "FromMax%"
    );
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');

    for (i, row) in rows.iter().enumerate() {
        let r = &row.record;
        let _ = writeln!(
            out,
            "{:>2}. {:<8} {:<30} {:<15} {:<10} {:<12} {:<10} {:<8} {:<8} {:<8}",
            i + 1,
            display_code(&r.code),
            truncate_name(&row.company_name),
            opt_date(r.last_fiscal_year_end_date),
            opt_f64(r.last_dividend_per_share, 2),
            opt_date(r.last_trade_date),
            opt_f64(r.last_adjustment_close, 0),
            opt_f64(r.dividend_yield, 2),
            opt_f64(r.deviation_from_min, 2),
            opt_f64(r.deviation_from_max, 2),
        );
    }

    out
}

/// Fiscal summaries of one issuer, oldest year first.
pub fn render_summaries(summaries: &[FiscalSummaryRecord]) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{:<12} {:<12} {:<12} {:<18} {:>16} {:>16} {:>16} {:>10} {:>10}",
        "FY Start", "FY End", "Disclosed", "Source", "Net Sales", "Op. Profit", "Profit", "EPS", "Dividend"
    );
    out.push_str(&"-".repeat(RULE_WIDTH + 16));
    out.push('\n');

    for s in summaries {
        let _ = writeln!(
            out,
            "{:<12} {:<12} {:<12} {:<18} {:>16} {:>16} {:>16} {:>10} {:>10}",
            s.fiscal_year_start_date.to_string(),
            opt_date(s.fiscal_year_end_date),
            s.disclosed_date.to_string(),
            s.data_type.to_db_str(),
            opt_i64(s.net_sales),
            opt_i64(s.operating_profit),
            opt_i64(s.profit),
            opt_f64(s.eps, 2),
            opt_f64(s.dividend_per_share, 2),
        );
    }

    out
}

/// Listing rows: code, effective date, market and name.
pub fn render_listings(issuers: &[ListedIssuer]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{:<8} {:<12} {:<6} {:<20} Company", "Code", "Effective", "Market", "Segment");
    for issuer in issuers {
        let _ = writeln!(
            out,
            "{:<8} {:<12} {:<6} {:<20} {}",
            display_code(&issuer.code),
            issuer.effective_date.to_string(),
            issuer.market_code,
            issuer.market_code_name.as_deref().unwrap_or("-"),
            truncate_name(&issuer.company_name),
        );
    }

    out
}
