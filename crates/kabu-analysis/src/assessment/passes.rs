//! The six assessment passes.
//!
//! Passes 3 to 5 are single set-based UPDATE statements. Pass 6 needs a
//! calendar-month window and runs per issuer inside one transaction.

use super::valuation::{deviation_pct, price_extremes, register_functions};
use crate::context::PipelineContext;
use chrono::{Months, Utc};
use kabu_data::store::{AssessmentField, DateRange, EffectiveDateFilter, ListingRef};
use kabu_data::{DataError, Result, Store};
use rusqlite::params;
use tracing::debug;

/// Trailing window of the price-range pass, in calendar months.
pub const PRICE_RANGE_MONTHS: u32 = 3;

fn codes(refs: Vec<ListingRef>) -> Vec<String> {
    refs.into_iter().map(|r| r.code).collect()
}

/// Delete rows of issuers whose listing predates today.
pub fn prune(store: &Store, ctx: &PipelineContext) -> Result<usize> {
    let stale = store.find_latest_listing_per_issuer(EffectiveDateFilter::Before(ctx.today()), None)?;
    debug!(candidates = stale.len(), "prune candidates");
    store.delete_assessments_for_issuers(&codes(stale))
}

/// Insert bare rows for issuers listed on or after today outside the
/// excluded market.
pub fn seed(store: &Store, ctx: &PipelineContext) -> Result<usize> {
    let current = store.find_latest_listing_per_issuer(
        EffectiveDateFilter::OnOrAfter(ctx.today()),
        Some(ctx.excluded_market_code()),
    )?;
    debug!(candidates = current.len(), "seed candidates");
    store.insert_assessment_stubs(&codes(current))
}

/// Copy the fiscal year end and dividend of the latest summarised year.
pub fn fiscal_summary(store: &Store) -> Result<usize> {
    let updated = store.connection().execute(
        "UPDATE assessment SET
            last_fiscal_year_end_date = (
                SELECT s.fiscal_year_end_date FROM statements_summary s
                WHERE s.local_code = assessment.code AND s.fiscal_year_end_date IS NOT NULL
                ORDER BY s.fiscal_year_end_date DESC, s.fiscal_year_start_date DESC
                LIMIT 1),
            last_dividend_per_share = (
                SELECT s.dividend_per_share FROM statements_summary s
                WHERE s.local_code = assessment.code AND s.fiscal_year_end_date IS NOT NULL
                ORDER BY s.fiscal_year_end_date DESC, s.fiscal_year_start_date DESC
                LIMIT 1),
            updated_at = ?1",
        params![Utc::now().to_rfc3339()],
    )?;
    Ok(updated)
}

/// Copy the latest trade date and adjusted close.
pub fn latest_price(store: &Store) -> Result<usize> {
    let updated = store.connection().execute(
        "UPDATE assessment SET
            last_trade_date = (
                SELECT q.trade_date FROM daily_quotes q
                WHERE q.code = assessment.code
                ORDER BY q.trade_date DESC
                LIMIT 1),
            last_adjustment_close = (
                SELECT q.adjustment_close FROM daily_quotes q
                WHERE q.code = assessment.code
                ORDER BY q.trade_date DESC
                LIMIT 1),
            updated_at = ?1",
        params![Utc::now().to_rfc3339()],
    )?;
    Ok(updated)
}

/// Recompute the dividend yield. Rows missing both inputs are not touched.
pub fn dividend_yield(store: &Store) -> Result<usize> {
    let conn = store.connection();
    register_functions(conn)?;
    let updated = conn.execute(
        "UPDATE assessment SET
            dividend_yield = dividend_yield(last_dividend_per_share, last_adjustment_close),
            updated_at = ?1
         WHERE last_dividend_per_share IS NOT NULL OR last_adjustment_close IS NOT NULL",
        params![Utc::now().to_rfc3339()],
    )?;
    Ok(updated)
}

/// Trailing price window ending at `today`, both ends inclusive.
pub fn price_window(today: chrono::NaiveDate) -> Result<DateRange> {
    let start = today
        .checked_sub_months(Months::new(PRICE_RANGE_MONTHS))
        .ok_or_else(|| DataError::InvalidDateRange {
            start: format!("{today} - {PRICE_RANGE_MONTHS} months"),
            end: today.to_string(),
        })?;
    DateRange::new(start, today)
}

/// Set the three-month extremes and the latest close's deviation from each.
///
/// Issuers without a close in the window get all four columns set to NULL;
/// values from an earlier run are not kept.
pub fn price_range(store: &Store, ctx: &PipelineContext) -> Result<usize> {
    let window = price_window(ctx.today())?;
    let records = store.list_assessment_records()?;

    let tx = store.connection().unchecked_transaction()?;
    let mut updated = 0;
    for record in &records {
        let prices = store.find_prices_by_issuer(&record.code, Some(window))?;
        let (max, min) = price_extremes(&prices).unzip();
        let last = record.last_adjustment_close;

        updated += store.update_assessment_fields(
            &record.code,
            &[
                AssessmentField::ThreeMonthMax(max),
                AssessmentField::ThreeMonthMin(min),
                AssessmentField::DeviationFromMax(deviation_pct(last, max)),
                AssessmentField::DeviationFromMin(deviation_pct(last, min)),
            ],
        )?;
    }
    tx.commit()?;

    Ok(updated)
}
