//! Valuation arithmetic shared by the SQL and in-process passes.

use kabu_data::store::PricePoint;
use rusqlite::Connection;
use rusqlite::functions::FunctionFlags;

/// Dividend yield in percent.
///
/// `None` unless both inputs are present and strictly positive; a zero
/// dividend is an absent yield, not a zero one.
pub fn dividend_yield(dividend_per_share: Option<f64>, close: Option<f64>) -> Option<f64> {
    match (dividend_per_share, close) {
        (Some(dps), Some(close)) if dps > 0.0 && close > 0.0 => Some(dps / close * 100.0),
        _ => None,
    }
}

/// Percent distance of `last` from `extreme`.
pub fn deviation_pct(last: Option<f64>, extreme: Option<f64>) -> Option<f64> {
    match (last, extreme) {
        (Some(last), Some(extreme)) if extreme > 0.0 => Some((last - extreme) / extreme * 100.0),
        _ => None,
    }
}

/// Highest and lowest non-null close in `prices`.
pub fn price_extremes(prices: &[PricePoint]) -> Option<(f64, f64)> {
    prices
        .iter()
        .filter_map(|p| p.adjustment_close)
        .filter(|c| !c.is_nan())
        .fold(None, |acc, close| match acc {
            None => Some((close, close)),
            Some((max, min)) => Some((max.max(close), min.min(close))),
        })
}

/// Register `dividend_yield(dps, close)` on `conn` so the yield pass can run
/// as a single UPDATE with the same arithmetic as [`dividend_yield`].
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "dividend_yield",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let dps = ctx.get::<Option<f64>>(0)?;
            let close = ctx.get::<Option<f64>>(1)?;
            Ok(dividend_yield(dps, close))
        },
    )
}
