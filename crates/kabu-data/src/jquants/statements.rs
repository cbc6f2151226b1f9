//! `/fins/statements`: financial-statement disclosures.
//!
//! Every value arrives as a string. Empty strings are unreported values;
//! anything else that fails to parse rejects the whole disclosure.

use super::client::{JQuantsClient, Paginated};
use crate::error::{DataError, Result};
use crate::parse::{date, opt_date, opt_f64, opt_i64, opt_time};
use crate::store::{DisclosureRecord, Financials};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

const ENDPOINT: &str = "/fins/statements";

/// Disclosure as returned by the API, restricted to the stored fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
#[allow(missing_docs)]
pub struct RawStatement {
    pub disclosed_date: String,
    pub disclosed_time: String,
    pub local_code: String,
    pub disclosure_number: String,
    pub type_of_document: String,
    pub type_of_current_period: String,
    pub current_period_start_date: String,
    pub current_period_end_date: String,
    pub current_fiscal_year_start_date: String,
    pub current_fiscal_year_end_date: String,
    pub next_fiscal_year_start_date: String,
    pub next_fiscal_year_end_date: String,

    pub net_sales: String,
    pub operating_profit: String,
    pub ordinary_profit: String,
    pub profit: String,
    pub earnings_per_share: String,
    pub diluted_earnings_per_share: String,
    pub total_assets: String,
    pub equity: String,
    pub equity_to_asset_ratio: String,
    pub book_value_per_share: String,
    pub cash_flows_from_operating_activities: String,
    pub cash_flows_from_investing_activities: String,
    pub cash_flows_from_financing_activities: String,
    pub cash_and_equivalents: String,
    pub result_dividend_per_share_annual: String,

    pub forecast_net_sales: String,
    pub forecast_operating_profit: String,
    pub forecast_ordinary_profit: String,
    pub forecast_profit: String,
    pub forecast_earnings_per_share: String,
    pub forecast_dividend_per_share_annual: String,

    pub next_year_forecast_net_sales: String,
    pub next_year_forecast_operating_profit: String,
    pub next_year_forecast_ordinary_profit: String,
    pub next_year_forecast_profit: String,
    pub next_year_forecast_earnings_per_share: String,
    pub next_year_forecast_dividend_per_share_annual: String,
    #[serde(alias = "NextYearForecastDividendPerShareFY")]
    pub next_year_forecast_dividend_per_share_fiscal_year_end: String,
}

#[derive(Debug, Deserialize)]
struct StatementsResponse {
    #[serde(default)]
    statements: Vec<RawStatement>,
    pagination_key: Option<String>,
}

impl Paginated for StatementsResponse {
    type Item = RawStatement;

    fn into_parts(self) -> (Vec<RawStatement>, Option<String>) {
        (self.statements, self.pagination_key)
    }
}

fn opt_text(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl TryFrom<RawStatement> for DisclosureRecord {
    type Error = DataError;

    fn try_from(r: RawStatement) -> Result<Self> {
        let code = r.local_code.trim();
        if code.is_empty() {
            return Err(DataError::parse_field("LocalCode", &r.local_code, "missing"));
        }
        let period = r.type_of_current_period.trim();
        if period.is_empty() {
            return Err(DataError::parse_field(
                "TypeOfCurrentPeriod",
                &r.type_of_current_period,
                "missing",
            ));
        }

        Ok(Self {
            code: code.to_string(),
            disclosed_date: date("DisclosedDate", &r.disclosed_date)?,
            disclosed_time: opt_time("DisclosedTime", &r.disclosed_time)?,
            disclosure_number: r.disclosure_number.trim().to_string(),
            type_of_document: opt_text(&r.type_of_document),
            type_of_current_period: period.to_string(),
            current_period_start_date: opt_date("CurrentPeriodStartDate", &r.current_period_start_date)?,
            current_period_end_date: opt_date("CurrentPeriodEndDate", &r.current_period_end_date)?,
            current_fiscal_year_start_date: opt_date(
                "CurrentFiscalYearStartDate",
                &r.current_fiscal_year_start_date,
            )?,
            current_fiscal_year_end_date: opt_date(
                "CurrentFiscalYearEndDate",
                &r.current_fiscal_year_end_date,
            )?,
            next_fiscal_year_start_date: opt_date(
                "NextFiscalYearStartDate",
                &r.next_fiscal_year_start_date,
            )?,
            next_fiscal_year_end_date: opt_date("NextFiscalYearEndDate", &r.next_fiscal_year_end_date)?,
            actual: Financials {
                net_sales: opt_i64("NetSales", &r.net_sales)?,
                operating_profit: opt_i64("OperatingProfit", &r.operating_profit)?,
                ordinary_profit: opt_i64("OrdinaryProfit", &r.ordinary_profit)?,
                profit: opt_i64("Profit", &r.profit)?,
                eps: opt_f64("EarningsPerShare", &r.earnings_per_share)?,
                total_assets: opt_i64("TotalAssets", &r.total_assets)?,
                equity: opt_i64("Equity", &r.equity)?,
                equity_to_asset_ratio: opt_f64("EquityToAssetRatio", &r.equity_to_asset_ratio)?,
                dividend_per_share: opt_f64(
                    "ResultDividendPerShareAnnual",
                    &r.result_dividend_per_share_annual,
                )?,
            },
            forecast: Financials {
                net_sales: opt_i64("ForecastNetSales", &r.forecast_net_sales)?,
                operating_profit: opt_i64("ForecastOperatingProfit", &r.forecast_operating_profit)?,
                ordinary_profit: opt_i64("ForecastOrdinaryProfit", &r.forecast_ordinary_profit)?,
                profit: opt_i64("ForecastProfit", &r.forecast_profit)?,
                eps: opt_f64("ForecastEarningsPerShare", &r.forecast_earnings_per_share)?,
                dividend_per_share: opt_f64(
                    "ForecastDividendPerShareAnnual",
                    &r.forecast_dividend_per_share_annual,
                )?,
                ..Financials::default()
            },
            next_year_forecast: Financials {
                net_sales: opt_i64("NextYearForecastNetSales", &r.next_year_forecast_net_sales)?,
                operating_profit: opt_i64(
                    "NextYearForecastOperatingProfit",
                    &r.next_year_forecast_operating_profit,
                )?,
                ordinary_profit: opt_i64(
                    "NextYearForecastOrdinaryProfit",
                    &r.next_year_forecast_ordinary_profit,
                )?,
                profit: opt_i64("NextYearForecastProfit", &r.next_year_forecast_profit)?,
                eps: opt_f64(
                    "NextYearForecastEarningsPerShare",
                    &r.next_year_forecast_earnings_per_share,
                )?,
                dividend_per_share: opt_f64(
                    "NextYearForecastDividendPerShareAnnual",
                    &r.next_year_forecast_dividend_per_share_annual,
                )?,
                ..Financials::default()
            },
            next_year_forecast_dps_fiscal_year_end: opt_f64(
                "NextYearForecastDividendPerShareFiscalYearEnd",
                &r.next_year_forecast_dividend_per_share_fiscal_year_end,
            )?,
            diluted_eps: opt_f64("DilutedEarningsPerShare", &r.diluted_earnings_per_share)?,
            book_value_per_share: opt_f64("BookValuePerShare", &r.book_value_per_share)?,
            cash_flows_from_operating: opt_i64(
                "CashFlowsFromOperatingActivities",
                &r.cash_flows_from_operating_activities,
            )?,
            cash_flows_from_investing: opt_i64(
                "CashFlowsFromInvestingActivities",
                &r.cash_flows_from_investing_activities,
            )?,
            cash_flows_from_financing: opt_i64(
                "CashFlowsFromFinancingActivities",
                &r.cash_flows_from_financing_activities,
            )?,
            cash_and_equivalents: opt_i64("CashAndEquivalents", &r.cash_and_equivalents)?,
        })
    }
}

/// Convert raw disclosures, logging and skipping the ones that fail to parse.
pub fn convert_statements(raw: Vec<RawStatement>) -> Vec<DisclosureRecord> {
    raw.into_iter()
        .filter_map(|r| {
            let code = r.local_code.clone();
            let number = r.disclosure_number.clone();
            match DisclosureRecord::try_from(r) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(code = %code, disclosure = %number, error = %e, "skipping disclosure");
                    None
                }
            }
        })
        .collect()
}

impl JQuantsClient {
    /// Fetch disclosures for one issuer or for one disclosure date.
    pub async fn fetch_statements(
        &self,
        code: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<DisclosureRecord>> {
        let mut query = Vec::new();
        if let Some(code) = code {
            query.push(("code", code.to_string()));
        }
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }

        let raw = self.fetch_all::<StatementsResponse>(ENDPOINT, &query).await?;
        Ok(convert_statements(raw))
    }
}
