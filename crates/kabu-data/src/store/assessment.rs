//! Per-issuer valuation signals (`assessment`).

use super::{Store, now_rfc3339};
use crate::error::Result;
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};
use serde::{Deserialize, Serialize};
use std::iter;

/// Assessment row for one issuer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    /// Issuer code
    pub code: String,
    /// End date of the latest summarised fiscal year
    pub last_fiscal_year_end_date: Option<NaiveDate>,
    /// Dividend per share of that fiscal year
    pub last_dividend_per_share: Option<f64>,
    /// Latest trade date
    pub last_trade_date: Option<NaiveDate>,
    /// Adjusted close on the latest trade date
    pub last_adjustment_close: Option<f64>,
    /// Dividend yield in percent
    pub dividend_yield: Option<f64>,
    /// Highest adjusted close over the trailing three months
    pub three_month_max: Option<f64>,
    /// Lowest adjusted close over the trailing three months
    pub three_month_min: Option<f64>,
    /// Percent distance of the latest close from the three-month high
    pub deviation_from_max: Option<f64>,
    /// Percent distance of the latest close from the three-month low
    pub deviation_from_min: Option<f64>,
}

/// Assessment row joined with the issuer's listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRow {
    /// The assessment itself
    #[serde(flatten)]
    pub record: AssessmentRecord,
    /// Company name, empty when the issuer has no listing row
    pub company_name: String,
    /// Market segment code
    pub market_code: Option<String>,
}

/// One assignable assessment column with its new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssessmentField {
    /// `last_fiscal_year_end_date`
    LastFiscalYearEndDate(Option<NaiveDate>),
    /// `last_dividend_per_share`
    LastDividendPerShare(Option<f64>),
    /// `last_trade_date`
    LastTradeDate(Option<NaiveDate>),
    /// `last_adjustment_close`
    LastAdjustmentClose(Option<f64>),
    /// `dividend_yield`
    DividendYield(Option<f64>),
    /// `three_month_max`
    ThreeMonthMax(Option<f64>),
    /// `three_month_min`
    ThreeMonthMin(Option<f64>),
    /// `deviation_from_max`
    DeviationFromMax(Option<f64>),
    /// `deviation_from_min`
    DeviationFromMin(Option<f64>),
}

impl AssessmentField {
    /// Column this field writes.
    pub const fn column(&self) -> &'static str {
        match self {
            Self::LastFiscalYearEndDate(_) => "last_fiscal_year_end_date",
            Self::LastDividendPerShare(_) => "last_dividend_per_share",
            Self::LastTradeDate(_) => "last_trade_date",
            Self::LastAdjustmentClose(_) => "last_adjustment_close",
            Self::DividendYield(_) => "dividend_yield",
            Self::ThreeMonthMax(_) => "three_month_max",
            Self::ThreeMonthMin(_) => "three_month_min",
            Self::DeviationFromMax(_) => "deviation_from_max",
            Self::DeviationFromMin(_) => "deviation_from_min",
        }
    }

    fn value(&self) -> Value {
        match *self {
            Self::LastFiscalYearEndDate(d) | Self::LastTradeDate(d) => {
                d.map(|d| d.to_string()).into()
            }
            Self::LastDividendPerShare(v)
            | Self::LastAdjustmentClose(v)
            | Self::DividendYield(v)
            | Self::ThreeMonthMax(v)
            | Self::ThreeMonthMin(v)
            | Self::DeviationFromMax(v)
            | Self::DeviationFromMin(v) => v.into(),
        }
    }
}

/// Sort order for assessment listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssessmentOrder {
    /// Issuer code ascending
    #[default]
    Code,
    /// Highest dividend yield first
    DividendYieldDesc,
    /// Closest to the three-month low first
    DeviationFromMinAsc,
    /// Furthest below the three-month high first
    DeviationFromMaxAsc,
}

impl AssessmentOrder {
    const fn order_by(&self) -> &'static str {
        match self {
            Self::Code => "a.code ASC",
            Self::DividendYieldDesc => "a.dividend_yield IS NULL, a.dividend_yield DESC, a.code ASC",
            Self::DeviationFromMinAsc => {
                "a.deviation_from_min IS NULL, a.deviation_from_min ASC, a.code ASC"
            }
            Self::DeviationFromMaxAsc => {
                "a.deviation_from_max IS NULL, a.deviation_from_max ASC, a.code ASC"
            }
        }
    }
}

/// Screening criteria evaluated in SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AssessmentFilter {
    /// Minimum dividend yield (percent, inclusive)
    pub min_dividend_yield: Option<f64>,
    /// Maximum deviation from the three-month high (percent, inclusive)
    pub max_deviation_from_max: Option<f64>,
    /// Drop rows missing either deviation
    pub require_deviations: bool,
    /// Sort order
    pub order: AssessmentOrder,
    /// Maximum number of rows
    pub limit: Option<usize>,
}

impl AssessmentFilter {
    /// High-yield issuers trading well below their three-month high, closest
    /// to their three-month low first.
    pub const fn screen() -> Self {
        Self {
            min_dividend_yield: Some(4.0),
            max_deviation_from_max: Some(-10.0),
            require_deviations: true,
            order: AssessmentOrder::DeviationFromMinAsc,
            limit: Some(20),
        }
    }
}

const ASSESSMENT_COLUMNS: &str = "a.code, a.last_fiscal_year_end_date, a.last_dividend_per_share,
    a.last_trade_date, a.last_adjustment_close, a.dividend_yield,
    a.three_month_max, a.three_month_min, a.deviation_from_max, a.deviation_from_min";

fn map_assessment(row: &Row<'_>) -> rusqlite::Result<AssessmentRecord> {
    Ok(AssessmentRecord {
        code: row.get(0)?,
        last_fiscal_year_end_date: row.get(1)?,
        last_dividend_per_share: row.get(2)?,
        last_trade_date: row.get(3)?,
        last_adjustment_close: row.get(4)?,
        dividend_yield: row.get(5)?,
        three_month_max: row.get(6)?,
        three_month_min: row.get(7)?,
        deviation_from_max: row.get(8)?,
        deviation_from_min: row.get(9)?,
    })
}

impl Store {
    /// Delete the assessment rows of the given issuers.
    pub fn delete_assessments_for_issuers(&self, codes: &[String]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut deleted = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM assessment WHERE code = ?1")?;
            for code in codes {
                deleted += stmt.execute(params![code])?;
            }
        }
        tx.commit()?;
        Ok(deleted)
    }

    /// Insert bare rows for issuers without one. Existing rows are untouched.
    /// Returns the number of rows actually inserted.
    pub fn insert_assessment_stubs(&self, codes: &[String]) -> Result<usize> {
        let now = now_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO assessment (code, created_at, updated_at)
                 VALUES (?1, ?2, ?2)",
            )?;
            for code in codes {
                inserted += stmt.execute(params![code, now])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// Assign the given columns of one issuer's row.
    ///
    /// Returns 0 when the issuer has no row or `fields` is empty.
    pub fn update_assessment_fields(&self, code: &str, fields: &[AssessmentField]) -> Result<usize> {
        if fields.is_empty() {
            return Ok(0);
        }

        let assignments = fields
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ?{}", f.column(), i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let n = fields.len();
        let sql = format!(
            "UPDATE assessment SET {assignments}, updated_at = ?{} WHERE code = ?{}",
            n + 1,
            n + 2
        );

        let values = fields
            .iter()
            .map(AssessmentField::value)
            .chain(iter::once(Value::Text(now_rfc3339())))
            .chain(iter::once(Value::Text(code.to_string())));

        let updated = self.conn.prepare_cached(&sql)?.execute(params_from_iter(values))?;
        Ok(updated)
    }

    /// Get the assessment row of one issuer.
    pub fn find_assessment(&self, code: &str) -> Result<Option<AssessmentRecord>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {ASSESSMENT_COLUMNS} FROM assessment a WHERE a.code = ?1"),
                params![code],
                map_assessment,
            )
            .optional()?;

        Ok(result)
    }

    /// All assessment rows ordered by code.
    pub fn list_assessment_records(&self) -> Result<Vec<AssessmentRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessment a ORDER BY a.code"
        ))?;

        let records = stmt
            .query_map([], map_assessment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Assessment rows matching `filter`, joined with company names.
    pub fn list_assessments(&self, filter: &AssessmentFilter) -> Result<Vec<AssessmentRow>> {
        let mut conditions = vec!["1 = 1"];
        if filter.min_dividend_yield.is_some() {
            conditions.push("a.dividend_yield >= ?1");
        }
        if filter.max_deviation_from_max.is_some() {
            conditions.push("a.deviation_from_max <= ?2");
        }
        if filter.require_deviations {
            conditions.push("a.deviation_from_max IS NOT NULL AND a.deviation_from_min IS NOT NULL");
        }

        let sql = format!(
            "SELECT {ASSESSMENT_COLUMNS}, COALESCE(li.company_name, ''), li.market_code
             FROM assessment a
             LEFT JOIN listed_info li ON li.code = a.code
             WHERE {}
             ORDER BY {}
             LIMIT ?3",
            conditions.join(" AND "),
            filter.order.order_by()
        );
        let limit = filter.limit.map_or(-1, |n| n as i64);

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![
                    filter.min_dividend_yield,
                    filter.max_deviation_from_max,
                    limit
                ],
                |row| {
                    Ok(AssessmentRow {
                        record: map_assessment(row)?,
                        company_name: row.get(10)?,
                        market_code: row.get(11)?,
                    })
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ListedIssuer;

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    fn listing(code: &str, name: &str) -> ListedIssuer {
        ListedIssuer {
            code: code.to_string(),
            effective_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
            company_name: name.to_string(),
            company_name_english: None,
            sector17_code: None,
            sector17_code_name: None,
            sector33_code: None,
            sector33_code_name: None,
            scale_category: None,
            market_code: "0111".to_string(),
            market_code_name: Some("Prime".to_string()),
            margin_code: None,
            margin_code_name: None,
        }
    }

    #[test]
    fn test_stub_insert_is_idempotent() {
        let store = Store::in_memory().unwrap();
        assert_eq!(
            store.insert_assessment_stubs(&codes(&["72030", "67580"])).unwrap(),
            2
        );
        assert_eq!(
            store.insert_assessment_stubs(&codes(&["72030", "99840"])).unwrap(),
            1
        );
        assert_eq!(store.list_assessment_records().unwrap().len(), 3);

        let stub = store.find_assessment("72030").unwrap().unwrap();
        assert_eq!(stub.dividend_yield, None);
        assert_eq!(stub.last_trade_date, None);
    }

    #[test]
    fn test_update_fields_does_not_overwrite_on_reseed() {
        let store = Store::in_memory().unwrap();
        store.insert_assessment_stubs(&codes(&["72030"])).unwrap();
        let updated = store
            .update_assessment_fields(
                "72030",
                &[
                    AssessmentField::LastTradeDate(NaiveDate::from_ymd_opt(2024, 6, 7)),
                    AssessmentField::LastAdjustmentClose(Some(3_500.0)),
                ],
            )
            .unwrap();
        assert_eq!(updated, 1);

        store.insert_assessment_stubs(&codes(&["72030"])).unwrap();
        let row = store.find_assessment("72030").unwrap().unwrap();
        assert_eq!(row.last_adjustment_close, Some(3_500.0));
        assert_eq!(row.last_trade_date, NaiveDate::from_ymd_opt(2024, 6, 7));

        // Clearing a field writes NULL
        store
            .update_assessment_fields("72030", &[AssessmentField::LastAdjustmentClose(None)])
            .unwrap();
        let row = store.find_assessment("72030").unwrap().unwrap();
        assert_eq!(row.last_adjustment_close, None);
    }

    #[test]
    fn test_update_missing_or_empty() {
        let store = Store::in_memory().unwrap();
        assert_eq!(
            store
                .update_assessment_fields("00000", &[AssessmentField::DividendYield(Some(1.0))])
                .unwrap(),
            0
        );
        assert_eq!(store.update_assessment_fields("00000", &[]).unwrap(), 0);
    }

    #[test]
    fn test_delete_for_issuers() {
        let store = Store::in_memory().unwrap();
        store
            .insert_assessment_stubs(&codes(&["72030", "67580", "99840"]))
            .unwrap();
        let deleted = store
            .delete_assessments_for_issuers(&codes(&["72030", "11110"]))
            .unwrap();
        assert_eq!(deleted, 1);
        assert!(store.find_assessment("72030").unwrap().is_none());
        assert_eq!(store.list_assessment_records().unwrap().len(), 2);
    }

    #[test]
    fn test_screen_filter() {
        let store = Store::in_memory().unwrap();
        store
            .upsert_listings(&[listing("10000", "High yield dip"), listing("20000", "Low yield")])
            .unwrap();
        store
            .insert_assessment_stubs(&codes(&["10000", "20000", "30000", "40000"]))
            .unwrap();

        let set = |code: &str, y: f64, dmax: Option<f64>, dmin: Option<f64>| {
            store
                .update_assessment_fields(
                    code,
                    &[
                        AssessmentField::DividendYield(Some(y)),
                        AssessmentField::DeviationFromMax(dmax),
                        AssessmentField::DeviationFromMin(dmin),
                    ],
                )
                .unwrap();
        };
        set("10000", 4.5, Some(-15.0), Some(3.0));
        set("20000", 2.0, Some(-20.0), Some(1.0));
        set("30000", 5.0, Some(-12.0), Some(1.5));
        set("40000", 6.0, Some(-30.0), None);

        let rows = store.list_assessments(&AssessmentFilter::screen()).unwrap();
        let got: Vec<_> = rows.iter().map(|r| r.record.code.as_str()).collect();
        assert_eq!(got, vec!["30000", "10000"]);
        assert_eq!(rows[0].company_name, "");
        assert_eq!(rows[1].company_name, "High yield dip");
        assert_eq!(rows[1].market_code.as_deref(), Some("0111"));

        let all = store.list_assessments(&AssessmentFilter::default()).unwrap();
        assert_eq!(all.len(), 4);

        let top = store
            .list_assessments(&AssessmentFilter {
                order: AssessmentOrder::DividendYieldDesc,
                limit: Some(1),
                ..AssessmentFilter::default()
            })
            .unwrap();
        assert_eq!(top[0].record.code, "40000");
    }
}
