//! Per-issuer report.

use crate::export::{ExportError, ExportFormat, Exporter};
use crate::table::{display_code, render_summaries};
use chrono::{DateTime, Utc};
use kabu_data::Store;
use kabu_data::store::{AssessmentRecord, DailyQuote, FiscalSummaryRecord, ListedIssuer};
use serde::Serialize;
use std::fmt::Write;

/// Everything the store knows about one issuer.
#[derive(Debug, Clone, Serialize)]
pub struct IssuerReport {
    /// Issuer code
    pub code: String,
    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,
    /// Listing row
    pub listing: Option<ListedIssuer>,
    /// Most recent quotes, newest first
    pub recent_quotes: Vec<DailyQuote>,
    /// Fiscal summaries, oldest year first
    pub summaries: Vec<FiscalSummaryRecord>,
    /// Assessment row
    pub assessment: Option<AssessmentRecord>,
}

impl IssuerReport {
    /// Load the report for `code` with up to `quote_limit` recent quotes.
    pub fn load(store: &Store, code: &str, quote_limit: usize) -> kabu_data::Result<Self> {
        Ok(Self {
            code: code.to_string(),
            generated_at: Utc::now(),
            listing: store.find_listing(code)?,
            recent_quotes: store.latest_quotes(code, quote_limit)?,
            summaries: store.find_summaries_by_issuer(code)?,
            assessment: store.find_assessment(code)?,
        })
    }

    /// Whether the store has no data at all for this issuer.
    pub fn is_empty(&self) -> bool {
        self.listing.is_none()
            && self.recent_quotes.is_empty()
            && self.summaries.is_empty()
            && self.assessment.is_none()
    }

    /// Human-readable rendering.
    pub fn to_ascii_table(&self) -> String {
        let mut out = String::new();
        let dash = |v: Option<f64>, p: usize| v.map_or_else(|| "-".to_string(), |v| format!("{v:.p$}"));

        let name = self
            .listing
            .as_ref()
            .map_or("(not listed)", |l| l.company_name.as_str());
        let _ = writeln!(out, "\n{} {}", display_code(&self.code), name);
        out.push_str(&"=".repeat(80));
        out.push('\n');

        if let Some(l) = &self.listing {
            let _ = writeln!(out, "Effective:  {}", l.effective_date);
            let _ = writeln!(
                out,
                "Market:     {} ({})",
                l.market_code_name.as_deref().unwrap_or("-"),
                l.market_code
            );
            if let Some(sector) = &l.sector33_code_name {
                let _ = writeln!(out, "Sector:     {sector}");
            }
        }

        if let Some(a) = &self.assessment {
            out.push('\n');
            let _ = writeln!(out, "Assessment");
            out.push_str(&"-".repeat(80));
            out.push('\n');
            let _ = writeln!(
                out,
                "Last close:     {} ({})",
                dash(a.last_adjustment_close, 0),
                a.last_trade_date.map_or_else(|| "-".to_string(), |d| d.to_string())
            );
            let _ = writeln!(
                out,
                "Dividend:       {} (FY ending {})",
                dash(a.last_dividend_per_share, 2),
                a.last_fiscal_year_end_date
                    .map_or_else(|| "-".to_string(), |d| d.to_string())
            );
            let _ = writeln!(out, "Yield:          {}%", dash(a.dividend_yield, 2));
            let _ = writeln!(
                out,
                "3M high / low:  {} / {}",
                dash(a.three_month_max, 0),
                dash(a.three_month_min, 0)
            );
            let _ = writeln!(
                out,
                "From high/low:  {}% / {}%",
                dash(a.deviation_from_max, 2),
                dash(a.deviation_from_min, 2)
            );
        }

        if !self.summaries.is_empty() {
            out.push('\n');
            let _ = writeln!(out, "Fiscal years");
            out.push_str(&render_summaries(&self.summaries));
        }

        if !self.recent_quotes.is_empty() {
            out.push('\n');
            let _ = writeln!(out, "Recent prices");
            out.push_str(&"-".repeat(80));
            out.push('\n');
            for q in &self.recent_quotes {
                let _ = writeln!(
                    out,
                    "{}  close {:>10}  adj. close {:>10}  volume {:>12}",
                    q.trade_date,
                    dash(q.close, 1),
                    dash(q.adjustment_close, 1),
                    dash(q.volume, 0)
                );
            }
        }

        out
    }
}

impl Exporter for IssuerReport {
    /// CSV carries the fiscal summaries only; JSON carries the whole report.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => self.summaries.export_to_string(ExportFormat::Csv),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn listing() -> ListedIssuer {
        ListedIssuer {
            code: "72030".to_string(),
            effective_date: NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
            company_name: "トヨタ自動車".to_string(),
            company_name_english: Some("TOYOTA MOTOR CORPORATION".to_string()),
            sector17_code: None,
            sector17_code_name: None,
            sector33_code: Some("3700".to_string()),
            sector33_code_name: Some("輸送用機器".to_string()),
            scale_category: None,
            market_code: "0111".to_string(),
            market_code_name: Some("プライム".to_string()),
            margin_code: None,
            margin_code_name: None,
        }
    }

    #[test]
    fn test_unknown_issuer_is_empty() {
        let store = Store::in_memory().unwrap();
        let report = IssuerReport::load(&store, "99990", 5).unwrap();

        assert!(report.is_empty());
        assert!(report.to_ascii_table().contains("(not listed)"));
    }

    #[test]
    fn test_report_from_store() {
        let store = Store::in_memory().unwrap();
        store.upsert_listings(&[listing()]).unwrap();
        store.insert_assessment_stubs(&["72030".to_string()]).unwrap();

        let report = IssuerReport::load(&store, "72030", 5).unwrap();
        assert!(!report.is_empty());

        let text = report.to_ascii_table();
        assert!(text.contains("7203 トヨタ自動車"));
        assert!(text.contains("プライム (0111)"));
        assert!(text.contains("Yield:          -%"));

        let json = report.export_to_string(ExportFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["listing"]["market_code"], "0111");
        assert!(value["assessment"]["dividend_yield"].is_null());

        // no summaries yet: header-less empty CSV
        assert_eq!(report.export_to_string(ExportFormat::Csv).unwrap(), "");
    }
}
