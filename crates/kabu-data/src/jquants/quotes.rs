//! `/prices/daily_quotes`: daily OHLC prices.

use super::client::{JQuantsClient, Paginated};
use crate::error::{DataError, Result};
use crate::parse;
use crate::store::DailyQuote;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

const ENDPOINT: &str = "/prices/daily_quotes";

/// Price entry as returned by the API. Prices are `null` on non-trading days.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawDailyQuote {
    /// Trade date (`YYYY-MM-DD`)
    pub date: String,
    /// Issuer code
    pub code: String,
    /// Open
    pub open: Option<f64>,
    /// High
    pub high: Option<f64>,
    /// Low
    pub low: Option<f64>,
    /// Close
    pub close: Option<f64>,
    /// Limit-up flag
    pub upper_limit: Option<String>,
    /// Limit-down flag
    pub lower_limit: Option<String>,
    /// Volume
    pub volume: Option<f64>,
    /// Turnover value
    pub turnover_value: Option<f64>,
    /// Adjustment factor
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

#[derive(Debug, Deserialize)]
struct DailyQuotesResponse {
    #[serde(default)]
    daily_quotes: Vec<RawDailyQuote>,
    pagination_key: Option<String>,
}

impl Paginated for DailyQuotesResponse {
    type Item = RawDailyQuote;

    fn into_parts(self) -> (Vec<RawDailyQuote>, Option<String>) {
        (self.daily_quotes, self.pagination_key)
    }
}

impl TryFrom<RawDailyQuote> for DailyQuote {
    type Error = DataError;

    fn try_from(raw: RawDailyQuote) -> Result<Self> {
        if raw.code.trim().is_empty() {
            return Err(DataError::parse_field("Code", &raw.code, "missing"));
        }
        Ok(Self {
            trade_date: parse::date("Date", &raw.date)?,
            code: raw.code.trim().to_string(),
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            upper_limit: raw.upper_limit,
            lower_limit: raw.lower_limit,
            volume: raw.volume,
            turnover_value: raw.turnover_value,
            adjustment_factor: raw.adjustment_factor,
            adjustment_open: raw.adjustment_open,
            adjustment_high: raw.adjustment_high,
            adjustment_low: raw.adjustment_low,
            adjustment_close: raw.adjustment_close,
            adjustment_volume: raw.adjustment_volume,
        })
    }
}

impl JQuantsClient {
    /// Fetch daily quotes for one issuer, one date, or one issuer on one date.
    /// The API rejects requests naming neither.
    pub async fn fetch_daily_quotes(
        &self,
        code: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<DailyQuote>> {
        let mut query = Vec::new();
        if let Some(code) = code {
            query.push(("code", code.to_string()));
        }
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }

        let raw = self.fetch_all::<DailyQuotesResponse>(ENDPOINT, &query).await?;
        let quotes = raw
            .into_iter()
            .filter_map(|r| {
                let code = r.code.clone();
                match DailyQuote::try_from(r) {
                    Ok(quote) => Some(quote),
                    Err(e) => {
                        warn!(code = %code, error = %e, "skipping quote");
                        None
                    }
                }
            })
            .collect();

        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fetch_daily_quotes_paginated() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/prices/daily_quotes")
            .match_query(Matcher::Exact("date=2024-01-04".into()))
            .with_status(200)
            .with_body(
                r#"{
                    "daily_quotes": [
                        {"Date": "2024-01-04", "Code": "72030", "Open": 2500.0, "High": 2550.0,
                         "Low": 2490.0, "Close": 2540.0, "UpperLimit": "0", "LowerLimit": "0",
                         "Volume": 1000000.0, "TurnoverValue": 2540000000.0, "AdjustmentFactor": 1.0,
                         "AdjustmentOpen": 2500.0, "AdjustmentHigh": 2550.0, "AdjustmentLow": 2490.0,
                         "AdjustmentClose": 2540.0, "AdjustmentVolume": 1000000.0}
                    ],
                    "pagination_key": "abc"
                }"#,
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", "/prices/daily_quotes")
            .match_query(Matcher::Exact("date=2024-01-04&pagination_key=abc".into()))
            .with_status(200)
            .with_body(
                r#"{
                    "daily_quotes": [
                        {"Date": "2024-01-04", "Code": "13010", "Open": null, "High": null,
                         "Low": null, "Close": null, "AdjustmentClose": null},
                        {"Date": "bad", "Code": "13050"}
                    ],
                    "pagination_key": ""
                }"#,
            )
            .create_async()
            .await;

        let client = JQuantsClient::with_rate_limit(server.url(), Duration::ZERO)
            .unwrap()
            .with_id_token("token");
        let quotes = client
            .fetch_daily_quotes(None, NaiveDate::from_ymd_opt(2024, 1, 4))
            .await
            .unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].adjustment_close, Some(2540.0));
        assert_eq!(quotes[1].code, "13010");
        assert_eq!(quotes[1].close, None);
        first.assert_async().await;
        second.assert_async().await;
    }
}
