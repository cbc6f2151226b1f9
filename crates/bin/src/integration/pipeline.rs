//! Fetch loops and the daily pipeline.
//!
//! Every loop is sequential with a fixed pause between upstream requests.
//! A failure on one issuer or one date is logged and the loop moves on.

use super::config::{AppConfig, ConfigError};
use chrono::{Days, NaiveDate};
use indicatif::{ProgressBar, ProgressStyle};
use kabu_analysis::{AnalysisError, AssessmentDeriver, PipelineContext, SummaryReducer};
use kabu_data::jquants::JQuantsClient;
use kabu_data::{DataError, Store};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from pipeline steps.
#[derive(Debug, Error)]
pub(crate) enum PipelineError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Upstream or store error.
    #[error(transparent)]
    Data(#[from] DataError),
    /// Summary or assessment derivation error.
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// How many requests a loop makes and how long it waits between them.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FetchOptions {
    pub(crate) count: usize,
    pub(crate) interval: Duration,
}

/// Outcome of a fetch loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FetchSummary {
    pub(crate) attempted: usize,
    pub(crate) failed: usize,
    pub(crate) saved: usize,
}

impl FetchSummary {
    fn record(&mut self, outcome: Result<usize, PipelineError>, item: &str) {
        self.attempted += 1;
        match outcome {
            Ok(n) => {
                debug!(item, saved = n, "fetched");
                self.saved += n;
            }
            Err(e) => {
                warn!(item, error = %e, "fetch failed");
                self.failed += 1;
            }
        }
    }
}

/// Authenticated client for the configured base URL.
pub(crate) async fn connect(config: &AppConfig) -> Result<JQuantsClient, PipelineError> {
    let (email, password) = config.credentials()?;
    let mut client = JQuantsClient::new(&config.base_url)?;
    println!("Authenticating with J-Quants...");
    client.authenticate(email, password).await?;
    Ok(client)
}

pub(crate) fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb
}

/// An empty upstream response is not an error for the fetch loops.
fn saved(result: kabu_data::Result<usize>, table: &str) -> Result<usize, PipelineError> {
    match result {
        Err(DataError::NoData(_)) => {
            info!(table, "nothing to save");
            Ok(0)
        }
        other => Ok(other?),
    }
}

fn days_before(date: NaiveDate, days: usize) -> Option<NaiveDate> {
    date.checked_sub_days(Days::new(days as u64))
}

pub(crate) async fn update_listed_info(
    client: &JQuantsClient,
    store: &Store,
    date: Option<NaiveDate>,
) -> Result<usize, PipelineError> {
    let issuers = client.fetch_listed_info(None, date).await?;
    saved(store.upsert_listings(&issuers), "listed_info")
}

pub(crate) async fn update_daily_quotes(
    client: &JQuantsClient,
    store: &Store,
    code: Option<&str>,
    date: Option<NaiveDate>,
) -> Result<usize, PipelineError> {
    let quotes = client.fetch_daily_quotes(code, date).await?;
    saved(store.upsert_quotes(&quotes), "daily_quotes")
}

pub(crate) async fn update_statements(
    client: &JQuantsClient,
    store: &Store,
    code: Option<&str>,
    date: Option<NaiveDate>,
) -> Result<usize, PipelineError> {
    let records = client.fetch_statements(code, date).await?;
    saved(store.upsert_disclosures(&records), "statements")
}

/// Fetch statements per issuer for up to `opts.count` listed codes from
/// `start_code` upward, skipping the excluded market.
pub(crate) async fn update_statements_for_codes(
    client: &JQuantsClient,
    store: &Store,
    start_code: &str,
    excluded_market_code: &str,
    opts: FetchOptions,
) -> Result<FetchSummary, PipelineError> {
    let codes = store.listed_codes_from(start_code, excluded_market_code, opts.count)?;
    info!(issuers = codes.len(), from = start_code, "fetching statements by issuer");

    let pb = progress_bar(codes.len());
    let mut summary = FetchSummary::default();
    for (i, code) in codes.iter().enumerate() {
        pb.set_message(code.clone());
        let outcome = update_statements(client, store, Some(code), None).await;
        summary.record(outcome, code);
        pb.inc(1);

        if i + 1 < codes.len() {
            tokio::time::sleep(opts.interval).await;
        }
    }
    pb.finish_with_message(format!("{} statements saved", summary.saved));

    Ok(summary)
}

/// Fetch statements for `opts.count` disclosure dates walking back from `start`.
pub(crate) async fn update_statements_for_dates(
    client: &JQuantsClient,
    store: &Store,
    start: NaiveDate,
    opts: FetchOptions,
) -> Result<FetchSummary, PipelineError> {
    info!(days = opts.count, %start, "fetching statements by date");

    let pb = progress_bar(opts.count);
    let mut summary = FetchSummary::default();
    for i in 0..opts.count {
        let Some(day) = days_before(start, i) else {
            break;
        };
        let label = day.to_string();
        pb.set_message(label.clone());
        let outcome = update_statements(client, store, None, Some(day)).await;
        summary.record(outcome, &label);
        pb.inc(1);

        if i + 1 < opts.count {
            tokio::time::sleep(opts.interval).await;
        }
    }
    pb.finish_with_message(format!("{} statements saved", summary.saved));

    Ok(summary)
}

/// Rebuild fiscal summaries, printing the outcome.
pub(crate) fn rebuild_summaries(store: &Store, ctx: &PipelineContext) -> Result<(), PipelineError> {
    println!("Rebuilding fiscal summaries...");
    let stats = SummaryReducer::new(ctx.clone()).rebuild(store)?;
    println!(
        "  {} issuers processed, {} skipped, {} fiscal-year rows written",
        stats.processed, stats.skipped, stats.summaries
    );
    Ok(())
}

/// Run the six assessment passes, printing each count as it completes.
pub(crate) fn update_assessment(store: &Store, ctx: &PipelineContext) -> Result<(), PipelineError> {
    println!("Updating assessments (as of {})...", ctx.today());
    let report = AssessmentDeriver::new(ctx.clone()).run_each(store, |r| {
        println!("  [{}/6] {:<18} {} rows", r.pass.number(), r.pass.name(), r.affected);
    })?;
    println!("  {} passes complete", report.passes.len());
    Ok(())
}

/// Listing (first day only), quotes and statements for each of
/// `opts.count` days walking back from `start`, then summaries and
/// assessments.
pub(crate) async fn run_daily(
    client: &JQuantsClient,
    store: &Store,
    ctx: &PipelineContext,
    start: NaiveDate,
    opts: FetchOptions,
) -> Result<(), PipelineError> {
    println!("Daily update: {} day(s) from {}", opts.count, start);

    for i in 0..opts.count {
        let Some(day) = days_before(start, i) else {
            break;
        };
        println!("\n[{}/{}] {}", i + 1, opts.count, day);

        if i == 0 {
            report_step("listed_info", update_listed_info(client, store, Some(day)).await);
        }
        report_step("daily_quotes", update_daily_quotes(client, store, None, Some(day)).await);
        report_step("statements", update_statements(client, store, None, Some(day)).await);

        if i + 1 < opts.count {
            tokio::time::sleep(opts.interval).await;
        }
    }

    println!();
    rebuild_summaries(store, ctx)?;
    update_assessment(store, ctx)
}

fn report_step(table: &str, outcome: Result<usize, PipelineError>) {
    match outcome {
        Ok(n) => println!("  {table}: {n} rows"),
        Err(e) => {
            warn!(table, error = %e, "daily step failed");
            println!("  {table}: failed ({e})");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kabu_data::store::ListedIssuer;

    fn listing(code: &str, market: &str) -> ListedIssuer {
        ListedIssuer {
            code: code.to_string(),
            effective_date: NaiveDate::from_ymd_opt(2024, 6, 14).unwrap(),
            company_name: format!("Company {code}"),
            company_name_english: None,
            sector17_code: None,
            sector17_code_name: None,
            sector33_code: None,
            sector33_code_name: None,
            scale_category: None,
            market_code: market.to_string(),
            market_code_name: None,
            margin_code: None,
            margin_code_name: None,
        }
    }

    #[test]
    fn test_empty_upstream_saves_nothing() {
        let store = Store::in_memory().unwrap();
        assert_eq!(saved(store.upsert_listings(&[]), "listed_info").unwrap(), 0);
        assert_eq!(
            saved(store.upsert_listings(&[listing("13010", "0111")]), "listed_info").unwrap(),
            1
        );
    }

    #[test]
    fn test_days_before() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(days_before(d, 0), Some(d));
        assert_eq!(days_before(d, 1), NaiveDate::from_ymd_opt(2024, 2, 29));
    }

    #[test]
    fn test_fetch_summary() {
        let mut summary = FetchSummary::default();
        summary.record(Ok(3), "13010");
        summary.record(Err(DataError::Auth("expired".to_string()).into()), "72030");
        summary.record(Ok(0), "83060");

        assert_eq!(
            summary,
            FetchSummary {
                attempted: 3,
                failed: 1,
                saved: 3
            }
        );
    }

    #[tokio::test]
    async fn test_statement_loop_continues_after_failures() {
        let store = Store::in_memory().unwrap();
        store
            .upsert_listings(&[
                listing("13010", "0111"),
                listing("72030", "0111"),
                listing("99990", "0109"),
            ])
            .unwrap();

        // nothing listens here, so every request fails
        let client = JQuantsClient::with_rate_limit("http://127.0.0.1:9", Duration::ZERO)
            .unwrap()
            .with_id_token("token");
        let opts = FetchOptions {
            count: 10,
            interval: Duration::ZERO,
        };

        let summary = update_statements_for_codes(&client, &store, "0000", "0109", opts)
            .await
            .unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.saved, 0);
    }
}
