//! Daily price quotes (`daily_quotes`).

use super::{DateRange, Store, now_rfc3339};
use crate::error::{DataError, Result};
use chrono::NaiveDate;
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// One day of prices for one issuer.
///
/// Prices are absent on days without trades (suspensions, new listings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyQuote {
    /// Trading date
    pub trade_date: NaiveDate,
    /// Issuer code
    pub code: String,
    /// Open price
    pub open: Option<f64>,
    /// High price
    pub high: Option<f64>,
    /// Low price
    pub low: Option<f64>,
    /// Close price
    pub close: Option<f64>,
    /// Limit-up flag as reported ("0"/"1")
    pub upper_limit: Option<String>,
    /// Limit-down flag as reported ("0"/"1")
    pub lower_limit: Option<String>,
    /// Traded volume
    pub volume: Option<f64>,
    /// Turnover value
    pub turnover_value: Option<f64>,
    /// Split/merge adjustment factor
    pub adjustment_factor: Option<f64>,
    /// Adjusted open
    pub adjustment_open: Option<f64>,
    /// Adjusted high
    pub adjustment_high: Option<f64>,
    /// Adjusted low
    pub adjustment_low: Option<f64>,
    /// Adjusted close
    pub adjustment_close: Option<f64>,
    /// Adjusted volume
    pub adjustment_volume: Option<f64>,
}

/// Trade date and adjusted close, the projection the valuation passes need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    /// Trading date
    pub trade_date: NaiveDate,
    /// Adjusted close, absent when the issuer did not trade
    pub adjustment_close: Option<f64>,
}

impl Store {
    /// Insert or replace quotes keyed by (trade date, code).
    pub fn upsert_quotes(&self, quotes: &[DailyQuote]) -> Result<usize> {
        if quotes.is_empty() {
            return Err(DataError::NoData("daily_quotes".to_string()));
        }

        let updated_at = now_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO daily_quotes (
                    trade_date, code, open, high, low, close, upper_limit, lower_limit,
                    volume, turnover_value, adjustment_factor, adjustment_open,
                    adjustment_high, adjustment_low, adjustment_close, adjustment_volume,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            )?;

            for q in quotes {
                written += stmt.execute(params![
                    q.trade_date,
                    q.code,
                    q.open,
                    q.high,
                    q.low,
                    q.close,
                    q.upper_limit,
                    q.lower_limit,
                    q.volume,
                    q.turnover_value,
                    q.adjustment_factor,
                    q.adjustment_open,
                    q.adjustment_high,
                    q.adjustment_low,
                    q.adjustment_close,
                    q.adjustment_volume,
                    updated_at,
                ])?;
            }
        }
        tx.commit()?;

        Ok(written)
    }

    /// Adjusted closes for one issuer in ascending date order, optionally
    /// bounded to an inclusive date range.
    pub fn find_prices_by_issuer(
        &self,
        code: &str,
        range: Option<DateRange>,
    ) -> Result<Vec<PricePoint>> {
        let (start, end) = range.map_or((None, None), |r| (Some(r.start()), Some(r.end())));
        let mut stmt = self.conn.prepare_cached(
            "SELECT trade_date, adjustment_close
             FROM daily_quotes
             WHERE code = ?1
               AND (?2 IS NULL OR trade_date >= ?2)
               AND (?3 IS NULL OR trade_date <= ?3)
             ORDER BY trade_date ASC",
        )?;

        let prices = stmt
            .query_map(params![code, start, end], |row| {
                Ok(PricePoint {
                    trade_date: row.get(0)?,
                    adjustment_close: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(prices)
    }

    /// The `limit` most recent quotes for one issuer, newest first.
    pub fn latest_quotes(&self, code: &str, limit: usize) -> Result<Vec<DailyQuote>> {
        let mut stmt = self.conn.prepare(
            "SELECT trade_date, code, open, high, low, close, upper_limit, lower_limit,
                    volume, turnover_value, adjustment_factor, adjustment_open,
                    adjustment_high, adjustment_low, adjustment_close, adjustment_volume
             FROM daily_quotes
             WHERE code = ?1
             ORDER BY trade_date DESC
             LIMIT ?2",
        )?;

        let quotes = stmt
            .query_map(params![code, limit as i64], |row| {
                Ok(DailyQuote {
                    trade_date: row.get(0)?,
                    code: row.get(1)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    upper_limit: row.get(6)?,
                    lower_limit: row.get(7)?,
                    volume: row.get(8)?,
                    turnover_value: row.get(9)?,
                    adjustment_factor: row.get(10)?,
                    adjustment_open: row.get(11)?,
                    adjustment_high: row.get(12)?,
                    adjustment_low: row.get(13)?,
                    adjustment_close: row.get(14)?,
                    adjustment_volume: row.get(15)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(quotes)
    }
}
