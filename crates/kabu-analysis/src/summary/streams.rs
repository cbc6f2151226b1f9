//! Candidate extraction: one disclosure yields up to three candidates, one
//! per figure set, each keyed by the fiscal year it describes.

use kabu_data::store::{DataType, DisclosureRecord, FiscalSummaryRecord};

/// Period types that denote a completed annual period.
///
/// `TypeOfCurrentPeriod` takes the values `1Q`, `2Q`, `3Q`, `4Q`, `5Q` and
/// `FY`; `4Q` is how some issuers label the full-year results. There is no
/// `Q4` value upstream.
pub const FULL_YEAR_PERIODS: [&str; 2] = ["FY", "4Q"];

/// Whether `period` marks a completed annual period.
pub fn is_full_year(period: &str) -> bool {
    FULL_YEAR_PERIODS.contains(&period)
}

fn base(
    d: &DisclosureRecord,
    fiscal_year_start_date: chrono::NaiveDate,
    fiscal_year_end_date: Option<chrono::NaiveDate>,
    data_type: DataType,
) -> FiscalSummaryRecord {
    FiscalSummaryRecord {
        code: d.code.clone(),
        fiscal_year_start_date,
        fiscal_year_end_date,
        disclosed_date: d.disclosed_date,
        disclosed_time: d.disclosed_time,
        type_of_current_period: d.type_of_current_period.clone(),
        net_sales: None,
        operating_profit: None,
        ordinary_profit: None,
        profit: None,
        eps: None,
        total_assets: None,
        equity: None,
        equity_to_asset_ratio: None,
        dividend_per_share: None,
        data_type,
    }
}

/// Actual full-year results for the current fiscal year.
pub fn actual(d: &DisclosureRecord) -> Option<FiscalSummaryRecord> {
    let start = d.current_fiscal_year_start_date?;
    let a = &d.actual;
    if !is_full_year(&d.type_of_current_period)
        || (a.net_sales.is_none() && a.operating_profit.is_none())
    {
        return None;
    }

    Some(FiscalSummaryRecord {
        net_sales: a.net_sales,
        operating_profit: a.operating_profit,
        ordinary_profit: a.ordinary_profit,
        profit: a.profit,
        eps: a.eps,
        total_assets: a.total_assets,
        equity: a.equity,
        equity_to_asset_ratio: a.equity_to_asset_ratio,
        dividend_per_share: a.dividend_per_share,
        ..base(d, start, d.current_fiscal_year_end_date, DataType::Actual)
    })
}

/// Current-year forecast. Each figure falls back to the actual value when
/// the forecast is not reported, so a row tagged as a forecast can carry
/// realised figures.
pub fn current_forecast(d: &DisclosureRecord) -> Option<FiscalSummaryRecord> {
    let start = d.current_fiscal_year_start_date?;
    let (f, a) = (&d.forecast, &d.actual);
    let net_sales = f.net_sales.or(a.net_sales);
    let operating_profit = f.operating_profit.or(a.operating_profit);
    if net_sales.is_none() && operating_profit.is_none() {
        return None;
    }

    Some(FiscalSummaryRecord {
        net_sales,
        operating_profit,
        ordinary_profit: f.ordinary_profit.or(a.ordinary_profit),
        profit: f.profit.or(a.profit),
        eps: f.eps.or(a.eps),
        total_assets: a.total_assets,
        equity: a.equity,
        equity_to_asset_ratio: a.equity_to_asset_ratio,
        dividend_per_share: f.dividend_per_share.or(a.dividend_per_share),
        ..base(d, start, d.current_fiscal_year_end_date, DataType::CurrentForecast)
    })
}

/// Next-year forecast, keyed by the next fiscal year's start date.
pub fn next_year_forecast(d: &DisclosureRecord) -> Option<FiscalSummaryRecord> {
    let start = d.next_fiscal_year_start_date?;
    let n = &d.next_year_forecast;
    if n.net_sales.is_none() && n.operating_profit.is_none() {
        return None;
    }

    Some(FiscalSummaryRecord {
        net_sales: n.net_sales,
        operating_profit: n.operating_profit,
        ordinary_profit: n.ordinary_profit,
        profit: n.profit,
        eps: n.eps,
        // `NextYearForecastDividendPerShareAnnual`, falling back to
        // `NextYearForecastDividendPerShareFiscalYearEnd` for issuers that
        // only report the year-end payout.
        dividend_per_share: n
            .dividend_per_share
            .or(d.next_year_forecast_dps_fiscal_year_end),
        ..base(d, start, d.next_fiscal_year_end_date, DataType::NextYearForecast)
    })
}

/// Candidate extractor for one stream.
pub fn extractor(data_type: DataType) -> fn(&DisclosureRecord) -> Option<FiscalSummaryRecord> {
    match data_type {
        DataType::Actual => actual,
        DataType::CurrentForecast => current_forecast,
        DataType::NextYearForecast => next_year_forecast,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use kabu_data::store::Financials;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn disclosure(period: &str) -> DisclosureRecord {
        DisclosureRecord {
            code: "72030".to_string(),
            disclosed_date: date(2024, 5, 10),
            disclosed_time: None,
            disclosure_number: "1".to_string(),
            type_of_document: None,
            type_of_current_period: period.to_string(),
            current_period_start_date: None,
            current_period_end_date: None,
            current_fiscal_year_start_date: Some(date(2023, 4, 1)),
            current_fiscal_year_end_date: Some(date(2024, 3, 31)),
            next_fiscal_year_start_date: Some(date(2024, 4, 1)),
            next_fiscal_year_end_date: Some(date(2025, 3, 31)),
            actual: Financials {
                net_sales: Some(1_000),
                operating_profit: Some(100),
                total_assets: Some(5_000),
                dividend_per_share: Some(20.0),
                ..Financials::default()
            },
            forecast: Financials::default(),
            next_year_forecast: Financials::default(),
            next_year_forecast_dps_fiscal_year_end: None,
            diluted_eps: None,
            book_value_per_share: None,
            cash_flows_from_operating: None,
            cash_flows_from_investing: None,
            cash_flows_from_financing: None,
            cash_and_equivalents: None,
        }
    }

    #[test]
    fn test_actual_requires_full_year() {
        assert!(actual(&disclosure("FY")).is_some());
        assert!(actual(&disclosure("4Q")).is_some());
        assert!(actual(&disclosure("3Q")).is_none());
        assert!(actual(&disclosure("Q4")).is_none());
    }

    #[test]
    fn test_actual_requires_sales_or_operating_profit() {
        let mut d = disclosure("FY");
        d.actual.net_sales = None;
        assert!(actual(&d).is_some());
        d.actual.operating_profit = None;
        assert!(actual(&d).is_none());
    }

    #[test]
    fn test_actual_requires_fiscal_year_start() {
        let mut d = disclosure("FY");
        d.current_fiscal_year_start_date = None;
        assert!(actual(&d).is_none());
        assert!(current_forecast(&d).is_none());
    }

    #[test]
    fn test_actual_fields() {
        let c = actual(&disclosure("FY")).unwrap();
        assert_eq!(c.data_type, DataType::Actual);
        assert!(!c.is_forecast());
        assert_eq!(c.fiscal_year_start_date, date(2023, 4, 1));
        assert_eq!(c.fiscal_year_end_date, Some(date(2024, 3, 31)));
        assert_eq!(c.total_assets, Some(5_000));
        assert_eq!(c.dividend_per_share, Some(20.0));
    }

    #[test]
    fn test_current_forecast_prefers_forecast_and_falls_back() {
        let mut d = disclosure("2Q");
        d.forecast.net_sales = Some(2_000);
        d.forecast.dividend_per_share = Some(30.0);

        let c = current_forecast(&d).unwrap();
        assert_eq!(c.data_type, DataType::CurrentForecast);
        assert_eq!(c.net_sales, Some(2_000));
        // No operating profit forecast: the actual figure is carried
        assert_eq!(c.operating_profit, Some(100));
        assert_eq!(c.dividend_per_share, Some(30.0));
        assert_eq!(c.total_assets, Some(5_000));
    }

    #[test]
    fn test_current_forecast_needs_some_figure() {
        let mut d = disclosure("1Q");
        d.actual = Financials::default();
        assert!(current_forecast(&d).is_none());
        d.forecast.operating_profit = Some(10);
        assert!(current_forecast(&d).is_some());
    }

    #[test]
    fn test_next_year_forecast() {
        let mut d = disclosure("FY");
        assert!(next_year_forecast(&d).is_none());

        d.next_year_forecast.operating_profit = Some(150);
        d.next_year_forecast_dps_fiscal_year_end = Some(12.0);
        let c = next_year_forecast(&d).unwrap();
        assert_eq!(c.data_type, DataType::NextYearForecast);
        assert_eq!(c.fiscal_year_start_date, date(2024, 4, 1));
        assert_eq!(c.fiscal_year_end_date, Some(date(2025, 3, 31)));
        assert_eq!(c.total_assets, None);
        assert_eq!(c.dividend_per_share, Some(12.0));

        d.next_year_forecast.dividend_per_share = Some(25.0);
        assert_eq!(
            next_year_forecast(&d).unwrap().dividend_per_share,
            Some(25.0)
        );
    }
}
