//! SQLite store for listings, prices, disclosures and derived tables.
//!
//! One [`Store`] owns one [`Connection`]. Every table is created on open with
//! `CREATE TABLE IF NOT EXISTS`, so opening an existing database is a no-op
//! for the schema. Dates are stored as ISO `YYYY-MM-DD` text and times as
//! `HH:MM:SS`, which keeps lexicographic and chronological order identical.

pub mod assessment;
pub mod disclosure;
pub mod listing;
pub mod quotes;
pub mod summary;

pub use assessment::{
    AssessmentField, AssessmentFilter, AssessmentOrder, AssessmentRecord, AssessmentRow,
};
pub use disclosure::{DisclosureRecord, Financials};
pub use listing::{EffectiveDateFilter, ListedIssuer, ListingRef};
pub use quotes::{DailyQuote, PricePoint};
pub use summary::{DataType, FiscalSummaryRecord};

use crate::error::{DataError, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::path::Path;

/// SQLite-backed store.
#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

/// Inclusive date range used to bound price lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// First day of the range.
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the range.
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` falls within the range.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Store {
    /// Open (or create) a store at `path`.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Borrow the underlying connection for set-based statements.
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS listed_info (
                code TEXT PRIMARY KEY,
                effective_date TEXT NOT NULL,
                company_name TEXT NOT NULL,
                company_name_english TEXT,
                sector17_code TEXT,
                sector17_code_name TEXT,
                sector33_code TEXT,
                sector33_code_name TEXT,
                scale_category TEXT,
                market_code TEXT NOT NULL,
                market_code_name TEXT,
                margin_code TEXT,
                margin_code_name TEXT,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_listed_info_effective ON listed_info(effective_date);

            CREATE TABLE IF NOT EXISTS daily_quotes (
                trade_date TEXT NOT NULL,
                code TEXT NOT NULL,
                open REAL,
                high REAL,
                low REAL,
                close REAL,
                upper_limit TEXT,
                lower_limit TEXT,
                volume REAL,
                turnover_value REAL,
                adjustment_factor REAL,
                adjustment_open REAL,
                adjustment_high REAL,
                adjustment_low REAL,
                adjustment_close REAL,
                adjustment_volume REAL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (trade_date, code)
            );
            CREATE INDEX IF NOT EXISTS idx_daily_quotes_code_date ON daily_quotes(code, trade_date);

            CREATE TABLE IF NOT EXISTS statements (
                disclosed_date TEXT NOT NULL,
                disclosed_time TEXT,
                local_code TEXT NOT NULL,
                disclosure_number TEXT NOT NULL,
                type_of_document TEXT,
                type_of_current_period TEXT NOT NULL,
                current_period_start_date TEXT,
                current_period_end_date TEXT,
                current_fiscal_year_start_date TEXT,
                current_fiscal_year_end_date TEXT,
                next_fiscal_year_start_date TEXT,
                next_fiscal_year_end_date TEXT,
                net_sales INTEGER,
                operating_profit INTEGER,
                ordinary_profit INTEGER,
                profit INTEGER,
                eps REAL,
                diluted_eps REAL,
                total_assets INTEGER,
                equity INTEGER,
                equity_to_asset_ratio REAL,
                bps REAL,
                cf_operating INTEGER,
                cf_investing INTEGER,
                cf_financing INTEGER,
                cash_and_equivalents INTEGER,
                result_dps_annual REAL,
                fc_net_sales INTEGER,
                fc_operating_profit INTEGER,
                fc_ordinary_profit INTEGER,
                fc_profit INTEGER,
                fc_eps REAL,
                fc_dps_annual REAL,
                ny_fc_net_sales INTEGER,
                ny_fc_operating_profit INTEGER,
                ny_fc_ordinary_profit INTEGER,
                ny_fc_profit INTEGER,
                ny_fc_eps REAL,
                ny_fc_dps_annual REAL,
                ny_fc_dps_fy REAL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (disclosed_date, local_code, type_of_current_period)
            );
            CREATE INDEX IF NOT EXISTS idx_statements_code ON statements(local_code);

            CREATE TABLE IF NOT EXISTS statements_summary (
                local_code TEXT NOT NULL,
                fiscal_year_start_date TEXT NOT NULL,
                fiscal_year_end_date TEXT,
                disclosed_date TEXT NOT NULL,
                disclosed_time TEXT,
                type_of_current_period TEXT NOT NULL,
                net_sales INTEGER,
                operating_profit INTEGER,
                ordinary_profit INTEGER,
                profit INTEGER,
                eps REAL,
                total_assets INTEGER,
                equity INTEGER,
                equity_to_asset_ratio REAL,
                dividend_per_share REAL,
                is_forecast INTEGER NOT NULL,
                data_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (local_code, fiscal_year_start_date)
            );

            CREATE TABLE IF NOT EXISTS assessment (
                code TEXT PRIMARY KEY,
                last_fiscal_year_end_date TEXT,
                last_dividend_per_share REAL,
                last_trade_date TEXT,
                last_adjustment_close REAL,
                dividend_yield REAL,
                three_month_max REAL,
                three_month_min REAL,
                deviation_from_max REAL,
                deviation_from_min REAL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );",
        )?;

        Ok(())
    }

    /// Row counts per table.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
            Ok(n as usize)
        };

        let issuers_with_quotes: i64 =
            self.conn
                .query_row("SELECT COUNT(DISTINCT code) FROM daily_quotes", [], |row| {
                    row.get(0)
                })?;

        Ok(StoreStats {
            listed_issuers: count("listed_info")?,
            daily_quotes: count("daily_quotes")?,
            issuers_with_quotes: issuers_with_quotes as usize,
            statements: count("statements")?,
            summaries: count("statements_summary")?,
            assessments: count("assessment")?,
        })
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of listed issuers
    pub listed_issuers: usize,
    /// Total number of daily quote rows
    pub daily_quotes: usize,
    /// Number of issuers with at least one quote
    pub issuers_with_quotes: usize,
    /// Number of raw disclosure rows
    pub statements: usize,
    /// Number of fiscal summary rows
    pub summaries: usize,
    /// Number of assessment rows
    pub assessments: usize,
}

/// Current UTC time as RFC 3339, used for `created_at`/`updated_at` columns.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
