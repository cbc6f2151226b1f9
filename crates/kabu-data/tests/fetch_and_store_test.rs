//! Fetches from a mocked J-Quants API and persists into an in-memory store.

use chrono::NaiveDate;
use kabu_data::Store;
use kabu_data::jquants::JQuantsClient;
use mockito::Matcher;
use std::time::Duration;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn client(server: &mockito::Server) -> JQuantsClient {
    JQuantsClient::with_rate_limit(server.url(), Duration::ZERO)
        .unwrap()
        .with_id_token("id-token")
}

const STATEMENT: &str = r#"{
    "DisclosedDate": "2024-05-08", "DisclosedTime": "13:55:00", "LocalCode": "72030",
    "DisclosureNumber": "20240508512345", "TypeOfDocument": "FYFinancialStatements_Consolidated_IFRS",
    "TypeOfCurrentPeriod": "FY",
    "CurrentPeriodStartDate": "2023-04-01", "CurrentPeriodEndDate": "2024-03-31",
    "CurrentFiscalYearStartDate": "2023-04-01", "CurrentFiscalYearEndDate": "2024-03-31",
    "NextFiscalYearStartDate": "2024-04-01", "NextFiscalYearEndDate": "2025-03-31",
    "NetSales": "45095325000000", "OperatingProfit": "5352934000000", "OrdinaryProfit": "",
    "Profit": "4944933000000", "EarningsPerShare": "365.94", "TotalAssets": "90114296000000",
    "Equity": "35239338000000", "EquityToAssetRatio": "0.383",
    "ResultDividendPerShareAnnual": "75.0",
    "ForecastNetSales": "", "ForecastOperatingProfit": "",
    "NextYearForecastNetSales": "46000000000000", "NextYearForecastOperatingProfit": "4300000000000",
    "NextYearForecastDividendPerShareAnnual": "",
    "NextYearForecastDividendPerShareFiscalYearEnd": "90.0",
    "SomeFieldWeDoNotStore": "ignored"
}"#;

#[tokio::test]
async fn test_statements_fetch_and_store() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/fins/statements")
        .match_query(Matcher::Exact("date=2024-05-08".into()))
        .match_header("authorization", "Bearer id-token")
        .with_status(200)
        .with_body(format!(
            r#"{{"statements": [{STATEMENT}, {{"LocalCode": "", "DisclosedDate": "2024-05-08"}}]}}"#
        ))
        .create_async()
        .await;

    let records = client(&server)
        .fetch_statements(None, Some(date(2024, 5, 8)))
        .await
        .unwrap();
    mock.assert_async().await;

    // the row without a code is dropped
    assert_eq!(records.len(), 1);

    let store = Store::in_memory().unwrap();
    assert_eq!(store.upsert_disclosures(&records).unwrap(), 1);
    // same key again replaces rather than duplicates
    store.upsert_disclosures(&records).unwrap();

    let stored = store.find_disclosures_by_issuer("72030").unwrap();
    assert_eq!(stored.len(), 1);
    let d = &stored[0];
    assert_eq!(d.current_fiscal_year_start_date, Some(date(2023, 4, 1)));
    assert_eq!(d.actual.net_sales, Some(45_095_325_000_000));
    assert_eq!(d.actual.ordinary_profit, None);
    assert_eq!(d.actual.dividend_per_share, Some(75.0));
    assert_eq!(d.next_year_forecast.dividend_per_share, None);
    assert_eq!(d.next_year_forecast_dps_fiscal_year_end, Some(90.0));
    assert_eq!(store.disclosure_issuer_codes().unwrap(), vec!["72030".to_string()]);
}

#[tokio::test]
async fn test_listed_info_keeps_newest_effective_date() {
    let mut server = mockito::Server::new_async().await;
    let newer = server
        .mock("GET", "/listed/info")
        .match_query(Matcher::Exact("date=2024-06-14".into()))
        .with_status(200)
        .with_body(
            r#"{"info": [
                {"Date": "2024-06-14", "Code": "72030", "CompanyName": "トヨタ自動車",
                 "MarketCode": "0111", "MarketCodeName": "プライム"}
            ]}"#,
        )
        .create_async()
        .await;
    let older = server
        .mock("GET", "/listed/info")
        .match_query(Matcher::Exact("date=2022-01-04".into()))
        .with_status(200)
        .with_body(
            r#"{"info": [
                {"Date": "2022-01-04", "Code": "72030", "CompanyName": "トヨタ自動車",
                 "MarketCode": "0101", "MarketCodeName": "市場第一部"}
            ]}"#,
        )
        .create_async()
        .await;

    let client = client(&server);
    let store = Store::in_memory().unwrap();

    let current = client.fetch_listed_info(None, Some(date(2024, 6, 14))).await.unwrap();
    store.upsert_listings(&current).unwrap();
    let stale = client.fetch_listed_info(None, Some(date(2022, 1, 4))).await.unwrap();
    store.upsert_listings(&stale).unwrap();

    newer.assert_async().await;
    older.assert_async().await;

    let listing = store.find_listing("72030").unwrap().unwrap();
    assert_eq!(listing.effective_date, date(2024, 6, 14));
    assert_eq!(listing.market_code, "0111");
}
