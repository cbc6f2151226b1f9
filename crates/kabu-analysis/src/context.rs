//! Per-run settings shared by the reducer and the deriver.

use chrono::{Local, NaiveDate};
use kabu_data::MarketCode;

/// Settings for one pipeline run.
///
/// `today` is fixed when the context is built so that every pass of a run
/// compares against the same date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    today: NaiveDate,
    excluded_market_code: String,
}

impl PipelineContext {
    /// Context for a run on `today`, excluding the default market.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            excluded_market_code: MarketCode::EXCLUDED_DEFAULT.code().to_string(),
        }
    }

    /// Context for a run on the local calendar date.
    pub fn for_today() -> Self {
        Self::new(Local::now().date_naive())
    }

    /// Exclude a different market code from seeding.
    #[must_use]
    pub fn with_excluded_market_code(mut self, code: impl Into<String>) -> Self {
        self.excluded_market_code = code.into();
        self
    }

    /// Reference date of the run.
    pub const fn today(&self) -> NaiveDate {
        self.today
    }

    /// Market code never seeded into the assessment table.
    pub fn excluded_market_code(&self) -> &str {
        &self.excluded_market_code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let ctx = PipelineContext::new(today);
        assert_eq!(ctx.today(), today);
        assert_eq!(ctx.excluded_market_code(), "0109");

        let ctx = ctx.with_excluded_market_code("0105");
        assert_eq!(ctx.excluded_market_code(), "0105");
    }
}
