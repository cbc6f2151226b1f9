//! Raw financial-statement disclosures (`statements`).
//!
//! The mapping between [`DisclosureRecord`] and the table is a single static
//! column list, [`DISCLOSURE_COLUMNS`]. Adding a field means adding one entry
//! there and one line in the row reader below.

use super::{Store, now_rfc3339};
use crate::error::{DataError, Result};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::types::Value;
use rusqlite::{Row, params, params_from_iter};
use serde::{Deserialize, Serialize};
use std::iter;
use tracing::warn;

/// One figure set of a disclosure: actual results or one of the forecasts.
///
/// Balance-sheet figures (total assets, equity, equity ratio) are only
/// reported for actual results and stay `None` on forecasts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Financials {
    /// Net sales
    pub net_sales: Option<i64>,
    /// Operating profit
    pub operating_profit: Option<i64>,
    /// Ordinary profit
    pub ordinary_profit: Option<i64>,
    /// Profit attributable to owners of parent
    pub profit: Option<i64>,
    /// Earnings per share
    pub eps: Option<f64>,
    /// Total assets
    pub total_assets: Option<i64>,
    /// Equity
    pub equity: Option<i64>,
    /// Equity-to-asset ratio
    pub equity_to_asset_ratio: Option<f64>,
    /// Annual dividend per share
    pub dividend_per_share: Option<f64>,
}

/// One filing event for one issuer.
///
/// A single disclosure may carry actual results, a forecast for the current
/// fiscal year and a forecast for the next fiscal year at the same time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisclosureRecord {
    /// Issuer code
    pub code: String,
    /// Disclosure date
    pub disclosed_date: NaiveDate,
    /// Disclosure time
    pub disclosed_time: Option<NaiveTime>,
    /// Upstream disclosure number, increasing over time
    pub disclosure_number: String,
    /// Document type, e.g. `FYFinancialStatements_Consolidated_JP`
    pub type_of_document: Option<String>,
    /// Period type: `1Q`, `2Q`, `3Q`, `4Q`, `5Q`, `FY` and similar
    pub type_of_current_period: String,
    /// Start of the reported period
    pub current_period_start_date: Option<NaiveDate>,
    /// End of the reported period
    pub current_period_end_date: Option<NaiveDate>,
    /// Start of the current fiscal year
    pub current_fiscal_year_start_date: Option<NaiveDate>,
    /// End of the current fiscal year
    pub current_fiscal_year_end_date: Option<NaiveDate>,
    /// Start of the next fiscal year
    pub next_fiscal_year_start_date: Option<NaiveDate>,
    /// End of the next fiscal year
    pub next_fiscal_year_end_date: Option<NaiveDate>,
    /// Actual results for the reported period
    pub actual: Financials,
    /// Forecast for the current fiscal year
    pub forecast: Financials,
    /// Forecast for the next fiscal year
    pub next_year_forecast: Financials,
    /// Forecast fiscal-year-end dividend for the next fiscal year
    pub next_year_forecast_dps_fiscal_year_end: Option<f64>,
    /// Diluted earnings per share
    pub diluted_eps: Option<f64>,
    /// Book value per share
    pub book_value_per_share: Option<f64>,
    /// Cash flows from operating activities
    pub cash_flows_from_operating: Option<i64>,
    /// Cash flows from investing activities
    pub cash_flows_from_investing: Option<i64>,
    /// Cash flows from financing activities
    pub cash_flows_from_financing: Option<i64>,
    /// Cash and equivalents
    pub cash_and_equivalents: Option<i64>,
}

type ColumnValue = fn(&DisclosureRecord) -> Value;

fn date(d: Option<NaiveDate>) -> Value {
    d.map(|d| d.to_string()).into()
}

/// Column name and extractor for every stored disclosure field.
pub const DISCLOSURE_COLUMNS: &[(&str, ColumnValue)] = &[
    ("disclosed_date", |r| date(Some(r.disclosed_date))),
    ("disclosed_time", |r| r.disclosed_time.map(|t| t.format("%H:%M:%S").to_string()).into()),
    ("local_code", |r| r.code.clone().into()),
    ("disclosure_number", |r| r.disclosure_number.clone().into()),
    ("type_of_document", |r| r.type_of_document.clone().into()),
    ("type_of_current_period", |r| r.type_of_current_period.clone().into()),
    ("current_period_start_date", |r| date(r.current_period_start_date)),
    ("current_period_end_date", |r| date(r.current_period_end_date)),
    ("current_fiscal_year_start_date", |r| date(r.current_fiscal_year_start_date)),
    ("current_fiscal_year_end_date", |r| date(r.current_fiscal_year_end_date)),
    ("next_fiscal_year_start_date", |r| date(r.next_fiscal_year_start_date)),
    ("next_fiscal_year_end_date", |r| date(r.next_fiscal_year_end_date)),
    ("net_sales", |r| r.actual.net_sales.into()),
    ("operating_profit", |r| r.actual.operating_profit.into()),
    ("ordinary_profit", |r| r.actual.ordinary_profit.into()),
    ("profit", |r| r.actual.profit.into()),
    ("eps", |r| r.actual.eps.into()),
    ("diluted_eps", |r| r.diluted_eps.into()),
    ("total_assets", |r| r.actual.total_assets.into()),
    ("equity", |r| r.actual.equity.into()),
    ("equity_to_asset_ratio", |r| r.actual.equity_to_asset_ratio.into()),
    ("bps", |r| r.book_value_per_share.into()),
    ("cf_operating", |r| r.cash_flows_from_operating.into()),
    ("cf_investing", |r| r.cash_flows_from_investing.into()),
    ("cf_financing", |r| r.cash_flows_from_financing.into()),
    ("cash_and_equivalents", |r| r.cash_and_equivalents.into()),
    ("result_dps_annual", |r| r.actual.dividend_per_share.into()),
    ("fc_net_sales", |r| r.forecast.net_sales.into()),
    ("fc_operating_profit", |r| r.forecast.operating_profit.into()),
    ("fc_ordinary_profit", |r| r.forecast.ordinary_profit.into()),
    ("fc_profit", |r| r.forecast.profit.into()),
    ("fc_eps", |r| r.forecast.eps.into()),
    ("fc_dps_annual", |r| r.forecast.dividend_per_share.into()),
    ("ny_fc_net_sales", |r| r.next_year_forecast.net_sales.into()),
    ("ny_fc_operating_profit", |r| r.next_year_forecast.operating_profit.into()),
    ("ny_fc_ordinary_profit", |r| r.next_year_forecast.ordinary_profit.into()),
    ("ny_fc_profit", |r| r.next_year_forecast.profit.into()),
    ("ny_fc_eps", |r| r.next_year_forecast.eps.into()),
    ("ny_fc_dps_annual", |r| r.next_year_forecast.dividend_per_share.into()),
    ("ny_fc_dps_fy", |r| r.next_year_forecast_dps_fiscal_year_end.into()),
];

fn column_list() -> String {
    DISCLOSURE_COLUMNS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn read_disclosure(row: &Row<'_>) -> rusqlite::Result<DisclosureRecord> {
    let disclosed_time: Option<String> = row.get("disclosed_time")?;
    let disclosed_time = disclosed_time
        .filter(|t| !t.is_empty())
        .map(|t| {
            NaiveTime::parse_from_str(&t, "%H:%M:%S").map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })
        .transpose()?;

    Ok(DisclosureRecord {
        code: row.get("local_code")?,
        disclosed_date: row.get("disclosed_date")?,
        disclosed_time,
        disclosure_number: row.get("disclosure_number")?,
        type_of_document: row.get("type_of_document")?,
        type_of_current_period: row.get("type_of_current_period")?,
        current_period_start_date: row.get("current_period_start_date")?,
        current_period_end_date: row.get("current_period_end_date")?,
        current_fiscal_year_start_date: row.get("current_fiscal_year_start_date")?,
        current_fiscal_year_end_date: row.get("current_fiscal_year_end_date")?,
        next_fiscal_year_start_date: row.get("next_fiscal_year_start_date")?,
        next_fiscal_year_end_date: row.get("next_fiscal_year_end_date")?,
        actual: Financials {
            net_sales: row.get("net_sales")?,
            operating_profit: row.get("operating_profit")?,
            ordinary_profit: row.get("ordinary_profit")?,
            profit: row.get("profit")?,
            eps: row.get("eps")?,
            total_assets: row.get("total_assets")?,
            equity: row.get("equity")?,
            equity_to_asset_ratio: row.get("equity_to_asset_ratio")?,
            dividend_per_share: row.get("result_dps_annual")?,
        },
        forecast: Financials {
            net_sales: row.get("fc_net_sales")?,
            operating_profit: row.get("fc_operating_profit")?,
            ordinary_profit: row.get("fc_ordinary_profit")?,
            profit: row.get("fc_profit")?,
            eps: row.get("fc_eps")?,
            dividend_per_share: row.get("fc_dps_annual")?,
            ..Financials::default()
        },
        next_year_forecast: Financials {
            net_sales: row.get("ny_fc_net_sales")?,
            operating_profit: row.get("ny_fc_operating_profit")?,
            ordinary_profit: row.get("ny_fc_ordinary_profit")?,
            profit: row.get("ny_fc_profit")?,
            eps: row.get("ny_fc_eps")?,
            dividend_per_share: row.get("ny_fc_dps_annual")?,
            ..Financials::default()
        },
        next_year_forecast_dps_fiscal_year_end: row.get("ny_fc_dps_fy")?,
        diluted_eps: row.get("diluted_eps")?,
        book_value_per_share: row.get("bps")?,
        cash_flows_from_operating: row.get("cf_operating")?,
        cash_flows_from_investing: row.get("cf_investing")?,
        cash_flows_from_financing: row.get("cf_financing")?,
        cash_and_equivalents: row.get("cash_and_equivalents")?,
    })
}

impl Store {
    /// Insert or replace disclosures keyed by
    /// (disclosed date, issuer code, period type).
    pub fn upsert_disclosures(&self, records: &[DisclosureRecord]) -> Result<usize> {
        if records.is_empty() {
            return Err(DataError::NoData("statements".to_string()));
        }

        let placeholders = (1..=DISCLOSURE_COLUMNS.len() + 1)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO statements ({}, updated_at) VALUES ({placeholders})",
            column_list()
        );

        let updated_at = now_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                let values = DISCLOSURE_COLUMNS
                    .iter()
                    .map(|(_, value)| value(record))
                    .chain(iter::once(Value::Text(updated_at.clone())));
                written += stmt.execute(params_from_iter(values))?;
            }
        }
        tx.commit()?;

        Ok(written)
    }

    /// All stored disclosures for one issuer, oldest first.
    ///
    /// Rows with a value that cannot be read back as its field's type (a
    /// malformed date or time, text in a numeric column, an integer out of
    /// range) are logged and skipped; other database errors are returned.
    pub fn find_disclosures_by_issuer(&self, code: &str) -> Result<Vec<DisclosureRecord>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM statements
             WHERE local_code = ?1
             ORDER BY disclosed_date ASC, disclosed_time ASC, disclosure_number ASC",
            column_list()
        ))?;

        let mut records = Vec::new();
        for row in stmt.query_map(params![code], read_disclosure)? {
            match row {
                Ok(record) => records.push(record),
                Err(
                    e @ (rusqlite::Error::FromSqlConversionFailure(..)
                    | rusqlite::Error::InvalidColumnType(..)
                    | rusqlite::Error::IntegralValueOutOfRange(..)),
                ) => {
                    warn!(code, error = %e, "skipping unreadable disclosure row");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(records)
    }

    /// Distinct issuer codes that have at least one disclosure.
    pub fn disclosure_issuer_codes(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT local_code FROM statements ORDER BY local_code")?;

        let codes = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(codes)
    }
}
