//! Assessment deriver.
//!
//! Keeps one `assessment` row per currently listed issuer and fills it with
//! the latest fundamentals and price signals. The work is split into six
//! ordered passes. Each pass commits on its own and is safe to re-run, so a
//! run that stops part way leaves every completed pass in place.

pub mod passes;
pub mod valuation;

use crate::context::PipelineContext;
use crate::error::{AnalysisError, Result};
use kabu_data::Store;
use serde::Serialize;
use std::fmt;
use tracing::info;

/// One step of the assessment sequence, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    /// Delete rows of issuers whose listing predates today
    Prune,
    /// Insert rows for newly effective issuers
    Seed,
    /// Latest fiscal year end and dividend
    FiscalSummary,
    /// Latest trade date and close
    LatestPrice,
    /// Dividend yield
    DividendYield,
    /// Three-month extremes and deviations
    PriceRange,
}

impl Pass {
    /// All passes in execution order.
    pub const ALL: [Self; 6] = [
        Self::Prune,
        Self::Seed,
        Self::FiscalSummary,
        Self::LatestPrice,
        Self::DividendYield,
        Self::PriceRange,
    ];

    /// One-based position in the sequence.
    pub const fn number(&self) -> usize {
        match self {
            Self::Prune => 1,
            Self::Seed => 2,
            Self::FiscalSummary => 3,
            Self::LatestPrice => 4,
            Self::DividendYield => 5,
            Self::PriceRange => 6,
        }
    }

    /// Short name used in logs and reports.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Prune => "prune",
            Self::Seed => "seed",
            Self::FiscalSummary => "fiscal summary",
            Self::LatestPrice => "latest price",
            Self::DividendYield => "dividend yield",
            Self::PriceRange => "three-month range",
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Rows affected by one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassReport {
    /// The pass
    pub pass: Pass,
    /// Rows deleted, inserted or updated
    pub affected: usize,
}

/// Per-pass counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssessmentReport {
    /// Completed passes in order
    pub passes: Vec<PassReport>,
}

impl AssessmentReport {
    /// Count reported by `pass`, if it ran.
    pub fn affected(&self, pass: Pass) -> Option<usize> {
        self.passes.iter().find(|r| r.pass == pass).map(|r| r.affected)
    }
}

/// Runs the assessment passes against a store.
#[derive(Debug, Clone)]
pub struct AssessmentDeriver {
    ctx: PipelineContext,
}

impl AssessmentDeriver {
    /// Create a deriver for one run.
    pub const fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// The run's context.
    pub const fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Run a single pass.
    pub fn run_pass(&self, store: &Store, pass: Pass) -> Result<PassReport> {
        let outcome = match pass {
            Pass::Prune => passes::prune(store, &self.ctx),
            Pass::Seed => passes::seed(store, &self.ctx),
            Pass::FiscalSummary => passes::fiscal_summary(store),
            Pass::LatestPrice => passes::latest_price(store),
            Pass::DividendYield => passes::dividend_yield(store),
            Pass::PriceRange => passes::price_range(store, &self.ctx),
        };
        let affected = outcome.map_err(|source| AnalysisError::Pass { pass, source })?;

        info!(pass = pass.number(), name = %pass, affected, "assessment pass complete");
        Ok(PassReport { pass, affected })
    }

    /// Run all six passes in order, stopping at the first failure.
    pub fn run(&self, store: &Store) -> Result<AssessmentReport> {
        self.run_each(store, |_| {})
    }

    /// Like [`run`](Self::run), calling `on_pass` after every completed pass.
    pub fn run_each<F>(&self, store: &Store, mut on_pass: F) -> Result<AssessmentReport>
    where
        F: FnMut(&PassReport),
    {
        info!(as_of = %self.ctx.today(), excluded = self.ctx.excluded_market_code(), "updating assessments");

        let mut report = AssessmentReport::default();
        for pass in Pass::ALL {
            let done = self.run_pass(store, pass)?;
            on_pass(&done);
            report.passes.push(done);
        }
        Ok(report)
    }
}
