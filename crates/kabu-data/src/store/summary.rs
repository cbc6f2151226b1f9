//! Per-fiscal-year summaries (`statements_summary`).

use super::{Store, now_rfc3339};
use crate::error::{DataError, Result};
use chrono::{NaiveDate, NaiveTime};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Which figure set of a disclosure a summary row was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Actual full-year results
    Actual,
    /// Forecast for the current fiscal year
    CurrentForecast,
    /// Forecast for the next fiscal year
    NextYearForecast,
}

impl DataType {
    /// Selection priority on a disclosed-date tie; higher wins.
    pub const fn priority(&self) -> u8 {
        match self {
            Self::Actual => 3,
            Self::CurrentForecast => 2,
            Self::NextYearForecast => 1,
        }
    }

    /// Whether rows of this type carry forecast rather than realised figures.
    pub const fn is_forecast(&self) -> bool {
        !matches!(self, Self::Actual)
    }

    /// Convert to database string representation.
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Actual => "current_actual",
            Self::CurrentForecast => "current_forecast",
            Self::NextYearForecast => "next_year_forecast",
        }
    }

    /// Parse from database string representation.
    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "current_actual" => Ok(Self::Actual),
            "current_forecast" => Ok(Self::CurrentForecast),
            "next_year_forecast" => Ok(Self::NextYearForecast),
            _ => Err(DataError::Parse(format!("Invalid data type: {s}"))),
        }
    }
}

impl PartialOrd for DataType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DataType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority().cmp(&other.priority())
    }
}

/// Best known figures for one issuer and one fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiscalSummaryRecord {
    /// Issuer code
    pub code: String,
    /// Fiscal year start date (the fiscal year key)
    pub fiscal_year_start_date: NaiveDate,
    /// Fiscal year end date
    pub fiscal_year_end_date: Option<NaiveDate>,
    /// Disclosure date of the source disclosure
    pub disclosed_date: NaiveDate,
    /// Disclosure time of the source disclosure
    pub disclosed_time: Option<NaiveTime>,
    /// Period type of the source disclosure
    pub type_of_current_period: String,
    /// Net sales
    pub net_sales: Option<i64>,
    /// Operating profit
    pub operating_profit: Option<i64>,
    /// Ordinary profit
    pub ordinary_profit: Option<i64>,
    /// Profit
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
    /// Source figure set
    pub data_type: DataType,
}

impl FiscalSummaryRecord {
    /// False only for rows built from actual results.
    pub const fn is_forecast(&self) -> bool {
        self.data_type.is_forecast()
    }
}

impl Store {
    /// Replace the whole summary table in one transaction.
    ///
    /// The delete and every insert commit together; on any error the
    /// transaction is rolled back when dropped and the previous contents
    /// remain. Returns the number of rows inserted.
    pub fn replace_all_summaries(&self, records: &[FiscalSummaryRecord]) -> Result<usize> {
        let created_at = now_rfc3339();
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM statements_summary", [])?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO statements_summary (
                    local_code, fiscal_year_start_date, fiscal_year_end_date,
                    disclosed_date, disclosed_time, type_of_current_period,
                    net_sales, operating_profit, ordinary_profit, profit, eps,
                    total_assets, equity, equity_to_asset_ratio, dividend_per_share,
                    is_forecast, data_type, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
            )?;

            for r in records {
                inserted += stmt.execute(params![
                    r.code,
                    r.fiscal_year_start_date,
                    r.fiscal_year_end_date,
                    r.disclosed_date,
                    r.disclosed_time.map(|t| t.format("%H:%M:%S").to_string()),
                    r.type_of_current_period,
                    r.net_sales,
                    r.operating_profit,
                    r.ordinary_profit,
                    r.profit,
                    r.eps,
                    r.total_assets,
                    r.equity,
                    r.equity_to_asset_ratio,
                    r.dividend_per_share,
                    r.is_forecast(),
                    r.data_type.to_db_str(),
                    created_at,
                ])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    /// Summary rows for one issuer ordered by fiscal year.
    pub fn find_summaries_by_issuer(&self, code: &str) -> Result<Vec<FiscalSummaryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT local_code, fiscal_year_start_date, fiscal_year_end_date,
                    disclosed_date, disclosed_time, type_of_current_period,
                    net_sales, operating_profit, ordinary_profit, profit, eps,
                    total_assets, equity, equity_to_asset_ratio, dividend_per_share,
                    data_type
             FROM statements_summary
             WHERE local_code = ?1
             ORDER BY fiscal_year_start_date ASC",
        )?;

        let rows = stmt.query_map(params![code], |row| {
            let time: Option<String> = row.get(4)?;
            let data_type: String = row.get(15)?;
            Ok((
                FiscalSummaryRecord {
                    code: row.get(0)?,
                    fiscal_year_start_date: row.get(1)?,
                    fiscal_year_end_date: row.get(2)?,
                    disclosed_date: row.get(3)?,
                    disclosed_time: None,
                    type_of_current_period: row.get(5)?,
                    net_sales: row.get(6)?,
                    operating_profit: row.get(7)?,
                    ordinary_profit: row.get(8)?,
                    profit: row.get(9)?,
                    eps: row.get(10)?,
                    total_assets: row.get(11)?,
                    equity: row.get(12)?,
                    equity_to_asset_ratio: row.get(13)?,
                    dividend_per_share: row.get(14)?,
                    data_type: DataType::Actual,
                },
                time,
                data_type,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (mut record, time, data_type) = row?;
            record.disclosed_time = time
                .map(|t| {
                    NaiveTime::parse_from_str(&t, "%H:%M:%S")
                        .map_err(|e| DataError::parse_field("disclosed_time", &t, e))
                })
                .transpose()?;
            record.data_type = DataType::from_db_str(&data_type)?;
            summaries.push(record);
        }

        Ok(summaries)
    }
}
