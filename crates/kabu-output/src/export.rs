//! CSV and JSON export for assessment rows and fiscal summaries.

use chrono::{NaiveDate, NaiveTime};
use kabu_data::store::{AssessmentRow, FiscalSummaryRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pretty-json" | "pretty_json" => Ok(Self::PrettyJson),
            other => Err(ExportError::InvalidFormat(other.to_string())),
        }
    }
}

/// Flat assessment row for CSV output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentExport {
    /// Issuer code
    pub code: String,
    /// Company name
    pub company_name: String,
    /// Market segment code
    pub market_code: Option<String>,
    /// End date of the latest summarised fiscal year
    pub last_fiscal_year_end_date: Option<NaiveDate>,
    /// Dividend per share of that year
    pub last_dividend_per_share: Option<f64>,
    /// Latest trade date
    pub last_trade_date: Option<NaiveDate>,
    /// Latest adjusted close
    pub last_adjustment_close: Option<f64>,
    /// Dividend yield (%)
    pub dividend_yield: Option<f64>,
    /// Three-month high
    pub three_month_max: Option<f64>,
    /// Three-month low
    pub three_month_min: Option<f64>,
    /// Deviation from the three-month high (%)
    pub deviation_from_max: Option<f64>,
    /// Deviation from the three-month low (%)
    pub deviation_from_min: Option<f64>,
}

impl From<&AssessmentRow> for AssessmentExport {
    fn from(row: &AssessmentRow) -> Self {
        let r = &row.record;
        Self {
            code: r.code.clone(),
            company_name: row.company_name.clone(),
            market_code: row.market_code.clone(),
            last_fiscal_year_end_date: r.last_fiscal_year_end_date,
            last_dividend_per_share: r.last_dividend_per_share,
            last_trade_date: r.last_trade_date,
            last_adjustment_close: r.last_adjustment_close,
            dividend_yield: r.dividend_yield,
            three_month_max: r.three_month_max,
            three_month_min: r.three_month_min,
            deviation_from_max: r.deviation_from_max,
            deviation_from_min: r.deviation_from_min,
        }
    }
}

/// Flat summary row for CSV output.
#[derive(Debug, Clone, Serialize)]
struct SummaryExport<'a> {
    code: &'a str,
    fiscal_year_start_date: NaiveDate,
    fiscal_year_end_date: Option<NaiveDate>,
    disclosed_date: NaiveDate,
    disclosed_time: Option<NaiveTime>,
    type_of_current_period: &'a str,
    data_type: &'static str,
    is_forecast: bool,
    net_sales: Option<i64>,
    operating_profit: Option<i64>,
    ordinary_profit: Option<i64>,
    profit: Option<i64>,
    eps: Option<f64>,
    total_assets: Option<i64>,
    equity: Option<i64>,
    equity_to_asset_ratio: Option<f64>,
    dividend_per_share: Option<f64>,
}

impl<'a> From<&'a FiscalSummaryRecord> for SummaryExport<'a> {
    fn from(s: &'a FiscalSummaryRecord) -> Self {
        Self {
            code: &s.code,
            fiscal_year_start_date: s.fiscal_year_start_date,
            fiscal_year_end_date: s.fiscal_year_end_date,
            disclosed_date: s.disclosed_date,
            disclosed_time: s.disclosed_time,
            type_of_current_period: &s.type_of_current_period,
            data_type: s.data_type.to_db_str(),
            is_forecast: s.is_forecast(),
            net_sales: s.net_sales,
            operating_profit: s.operating_profit,
            ordinary_profit: s.ordinary_profit,
            profit: s.profit,
            eps: s.eps,
            total_assets: s.total_assets,
            equity: s.equity,
            equity_to_asset_ratio: s.equity_to_asset_ratio,
            dividend_per_share: s.dividend_per_share,
        }
    }
}

/// Serialize records as CSV with a header row.
pub(crate) fn to_csv<T, I>(records: I) -> Result<String, ExportError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in records {
        wtr.serialize(record)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

impl Exporter for [AssessmentRow] {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(self.iter().map(AssessmentExport::from)),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}

impl Exporter for [FiscalSummaryRecord] {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => to_csv(self.iter().map(SummaryExport::from)),
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
        }
    }
}
