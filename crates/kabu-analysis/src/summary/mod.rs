//! Fiscal summary reducer.
//!
//! Collapses every issuer's disclosures into at most one record per fiscal
//! year and replaces the summary table with the result. Every rebuild starts
//! from the raw disclosures; nothing is carried over from the previous table.

pub mod select;
pub mod streams;

pub use select::{is_better, latest_per_fiscal_year, reduce_issuer};

use crate::context::PipelineContext;
use crate::error::{AnalysisError, Result};
use kabu_data::Store;
use kabu_data::store::FiscalSummaryRecord;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Outcome of one summary rebuild.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RebuildStats {
    /// Issuers with at least one disclosure
    pub issuers: usize,
    /// Issuers reduced successfully
    pub processed: usize,
    /// Issuers skipped after an error
    pub skipped: usize,
    /// Summary rows written
    pub summaries: usize,
    /// Wall time
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RebuildStats {
    /// Log the outcome at info level.
    pub fn log_summary(&self) {
        info!(
            issuers = self.issuers,
            processed = self.processed,
            skipped = self.skipped,
            summaries = self.summaries,
            elapsed_ms = self.elapsed.as_millis() as u64,
            "summary rebuild finished"
        );
    }
}

/// Rebuilds `statements_summary` from `statements`.
#[derive(Debug, Clone)]
pub struct SummaryReducer {
    ctx: PipelineContext,
}

impl SummaryReducer {
    /// Create a reducer for one run.
    pub const fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Reduce one issuer from the store.
    pub fn reduce(&self, store: &Store, code: &str) -> Result<Vec<FiscalSummaryRecord>> {
        let disclosures = store.find_disclosures_by_issuer(code)?;
        reduce_issuer(code, &disclosures)
    }

    /// Reduce every issuer and replace the summary table.
    ///
    /// An issuer that fails is logged and left out; the rebuild continues.
    /// Only a failure of the final replace transaction is returned, in which
    /// case the previous summary table is left intact.
    pub fn rebuild(&self, store: &Store) -> Result<RebuildStats> {
        self.rebuild_with(store, |code| self.reduce(store, code))
    }

    fn rebuild_with<F>(&self, store: &Store, mut reduce: F) -> Result<RebuildStats>
    where
        F: FnMut(&str) -> Result<Vec<FiscalSummaryRecord>>,
    {
        let started = Instant::now();
        let codes = store.disclosure_issuer_codes()?;
        info!(
            issuers = codes.len(),
            as_of = %self.ctx.today(),
            "rebuilding fiscal summaries"
        );

        let mut stats = RebuildStats {
            issuers: codes.len(),
            ..RebuildStats::default()
        };
        let mut summaries = Vec::new();

        for code in &codes {
            match reduce(code) {
                Ok(mut records) => {
                    debug!(code = %code, fiscal_years = records.len(), "reduced issuer");
                    summaries.append(&mut records);
                    stats.processed += 1;
                }
                Err(e) => {
                    warn!(code = %code, error = %e, "skipping issuer");
                    stats.skipped += 1;
                }
            }
            if (stats.processed + stats.skipped) % 100 == 0 {
                debug!(
                    done = stats.processed + stats.skipped,
                    total = codes.len(),
                    "summary progress"
                );
            }
        }

        stats.summaries = store
            .replace_all_summaries(&summaries)
            .map_err(AnalysisError::Transaction)?;
        stats.elapsed = started.elapsed();
        stats.log_summary();

        Ok(stats)
    }
}
