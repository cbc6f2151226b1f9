//! Listed-company records (`listed_info`).

use super::{Store, now_rfc3339};
use crate::error::{DataError, Result};
use chrono::NaiveDate;
use rusqlite::{OptionalExtension, params};
use serde::{Deserialize, Serialize};

/// One issuer as published by the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedIssuer {
    /// Five-digit issuer code
    pub code: String,
    /// Date the listing information applies from
    pub effective_date: NaiveDate,
    /// Company name
    pub company_name: String,
    /// Company name (English)
    pub company_name_english: Option<String>,
    /// 17-sector classification code
    pub sector17_code: Option<String>,
    /// 17-sector classification name
    pub sector17_code_name: Option<String>,
    /// 33-sector classification code
    pub sector33_code: Option<String>,
    /// 33-sector classification name
    pub sector33_code_name: Option<String>,
    /// TOPIX scale category
    pub scale_category: Option<String>,
    /// Market segment code
    pub market_code: String,
    /// Market segment name
    pub market_code_name: Option<String>,
    /// Margin trading classification code
    pub margin_code: Option<String>,
    /// Margin trading classification name
    pub margin_code_name: Option<String>,
}

/// Identifying projection of a listing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRef {
    /// Issuer code
    pub code: String,
    /// Effective date of the latest listing record
    pub effective_date: NaiveDate,
    /// Market segment code
    pub market_code: String,
}

/// Which side of a reference date a listing's effective date must fall on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveDateFilter {
    /// `effective_date < date`
    Before(NaiveDate),
    /// `effective_date >= date`
    OnOrAfter(NaiveDate),
}

impl EffectiveDateFilter {
    const fn operator(&self) -> &'static str {
        match self {
            Self::Before(_) => "<",
            Self::OnOrAfter(_) => ">=",
        }
    }

    const fn date(&self) -> NaiveDate {
        match self {
            Self::Before(d) | Self::OnOrAfter(d) => *d,
        }
    }
}

const LISTING_COLUMNS: &str = "code, effective_date, company_name, company_name_english,
    sector17_code, sector17_code_name, sector33_code, sector33_code_name,
    scale_category, market_code, market_code_name, margin_code, margin_code_name";

fn map_listing(row: &rusqlite::Row<'_>) -> rusqlite::Result<ListedIssuer> {
    Ok(ListedIssuer {
        code: row.get(0)?,
        effective_date: row.get(1)?,
        company_name: row.get(2)?,
        company_name_english: row.get(3)?,
        sector17_code: row.get(4)?,
        sector17_code_name: row.get(5)?,
        sector33_code: row.get(6)?,
        sector33_code_name: row.get(7)?,
        scale_category: row.get(8)?,
        market_code: row.get(9)?,
        market_code_name: row.get(10)?,
        margin_code: row.get(11)?,
        margin_code_name: row.get(12)?,
    })
}

impl Store {
    /// Upsert listing rows.
    ///
    /// An existing row is only overwritten when the incoming effective date
    /// is strictly newer, so replaying an old snapshot never regresses the
    /// table. Returns the number of rows inserted or updated.
    pub fn upsert_listings(&self, issuers: &[ListedIssuer]) -> Result<usize> {
        if issuers.is_empty() {
            return Err(DataError::NoData("listed_info".to_string()));
        }

        let updated_at = now_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        let mut changed = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO listed_info (
                    code, effective_date, company_name, company_name_english,
                    sector17_code, sector17_code_name, sector33_code, sector33_code_name,
                    scale_category, market_code, market_code_name, margin_code,
                    margin_code_name, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ON CONFLICT(code) DO UPDATE SET
                    effective_date = excluded.effective_date,
                    company_name = excluded.company_name,
                    company_name_english = excluded.company_name_english,
                    sector17_code = excluded.sector17_code,
                    sector17_code_name = excluded.sector17_code_name,
                    sector33_code = excluded.sector33_code,
                    sector33_code_name = excluded.sector33_code_name,
                    scale_category = excluded.scale_category,
                    market_code = excluded.market_code,
                    market_code_name = excluded.market_code_name,
                    margin_code = excluded.margin_code,
                    margin_code_name = excluded.margin_code_name,
                    updated_at = excluded.updated_at
                WHERE excluded.effective_date > listed_info.effective_date",
            )?;

            for issuer in issuers {
                changed += stmt.execute(params![
                    issuer.code,
                    issuer.effective_date,
                    issuer.company_name,
                    issuer.company_name_english,
                    issuer.sector17_code,
                    issuer.sector17_code_name,
                    issuer.sector33_code,
                    issuer.sector33_code_name,
                    issuer.scale_category,
                    issuer.market_code,
                    issuer.market_code_name,
                    issuer.margin_code,
                    issuer.margin_code_name,
                    updated_at,
                ])?;
            }
        }
        tx.commit()?;

        Ok(changed)
    }

    /// Get the listing row for one issuer.
    pub fn find_listing(&self, code: &str) -> Result<Option<ListedIssuer>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {LISTING_COLUMNS} FROM listed_info WHERE code = ?1"),
                params![code],
                map_listing,
            )
            .optional()?;

        Ok(result)
    }

    /// List listing rows ordered by code, optionally capped at `limit` rows.
    pub fn list_listings(&self, limit: Option<usize>) -> Result<Vec<ListedIssuer>> {
        let limit = limit.map_or(-1, |n| n as i64);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LISTING_COLUMNS} FROM listed_info ORDER BY code LIMIT ?1"
        ))?;

        let issuers = stmt
            .query_map(params![limit], map_listing)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(issuers)
    }

    /// Latest listing per issuer whose effective date satisfies `filter`,
    /// optionally dropping one market segment.
    pub fn find_latest_listing_per_issuer(
        &self,
        filter: EffectiveDateFilter,
        excluded_market_code: Option<&str>,
    ) -> Result<Vec<ListingRef>> {
        let sql = format!(
            "SELECT code, MAX(effective_date), market_code
             FROM listed_info
             WHERE effective_date {} ?1
               AND (?2 IS NULL OR market_code <> ?2)
             GROUP BY code
             ORDER BY code",
            filter.operator()
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let refs = stmt
            .query_map(params![filter.date(), excluded_market_code], |row| {
                Ok(ListingRef {
                    code: row.get(0)?,
                    effective_date: row.get(1)?,
                    market_code: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(refs)
    }

    /// Issuer codes `>= start_code` outside the excluded market, ascending.
    pub fn listed_codes_from(
        &self,
        start_code: &str,
        excluded_market_code: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT code FROM listed_info
             WHERE market_code <> ?1 AND code >= ?2
             ORDER BY code
             LIMIT ?3",
        )?;

        let codes = stmt
            .query_map(
                params![excluded_market_code, start_code, limit as i64],
                |row| row.get(0),
            )?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(codes)
    }

    /// Distinct market codes present in `listed_info` with their issuer counts.
    pub fn market_code_counts(&self) -> Result<Vec<(String, Option<String>, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT market_code, MAX(market_code_name), COUNT(*)
             FROM listed_info
             GROUP BY market_code
             ORDER BY market_code",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(code: &str, date: NaiveDate, market: &str, name: &str) -> ListedIssuer {
        ListedIssuer {
            code: code.to_string(),
            effective_date: date,
            company_name: name.to_string(),
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

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[test]
    fn test_upsert_newer_wins() {
        let store = Store::in_memory().unwrap();
        store
            .upsert_listings(&[issuer("72030", day(10), "0111", "Toyota")])
            .unwrap();

        // Older snapshot does not overwrite
        let changed = store
            .upsert_listings(&[issuer("72030", day(5), "0112", "Stale")])
            .unwrap();
        assert_eq!(changed, 0);
        let row = store.find_listing("72030").unwrap().unwrap();
        assert_eq!(row.company_name, "Toyota");
        assert_eq!(row.effective_date, day(10));

        // Same date does not overwrite either
        store
            .upsert_listings(&[issuer("72030", day(10), "0112", "Same day")])
            .unwrap();
        assert_eq!(
            store.find_listing("72030").unwrap().unwrap().company_name,
            "Toyota"
        );

        // Newer snapshot overwrites
        let changed = store
            .upsert_listings(&[issuer("72030", day(11), "0111", "Toyota Motor")])
            .unwrap();
        assert_eq!(changed, 1);
        let row = store.find_listing("72030").unwrap().unwrap();
        assert_eq!(row.company_name, "Toyota Motor");
        assert_eq!(row.effective_date, day(11));
    }

    #[test]
    fn test_upsert_empty_is_no_data() {
        let store = Store::in_memory().unwrap();
        assert!(matches!(
            store.upsert_listings(&[]),
            Err(DataError::NoData(_))
        ));
    }

    #[test]
    fn test_find_latest_listing_per_issuer() {
        let store = Store::in_memory().unwrap();
        store
            .upsert_listings(&[
                issuer("10000", day(9), "0111", "Stale"),
                issuer("20000", day(10), "0111", "Today"),
                issuer("30000", day(10), "0109", "Other market"),
                issuer("40000", day(11), "0113", "Future"),
            ])
            .unwrap();

        let stale = store
            .find_latest_listing_per_issuer(EffectiveDateFilter::Before(day(10)), None)
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].code, "10000");

        let current = store
            .find_latest_listing_per_issuer(EffectiveDateFilter::OnOrAfter(day(10)), Some("0109"))
            .unwrap();
        let codes: Vec<_> = current.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["20000", "40000"]);

        let all_current = store
            .find_latest_listing_per_issuer(EffectiveDateFilter::OnOrAfter(day(10)), None)
            .unwrap();
        assert_eq!(all_current.len(), 3);
    }

    #[test]
    fn test_listed_codes_from() {
        let store = Store::in_memory().unwrap();
        store
            .upsert_listings(&[
                issuer("13010", day(1), "0111", "A"),
                issuer("13050", day(1), "0109", "ETF"),
                issuer("13320", day(1), "0111", "B"),
                issuer("13330", day(1), "0112", "C"),
            ])
            .unwrap();

        let codes = store.listed_codes_from("1302", "0109", 10).unwrap();
        assert_eq!(codes, vec!["13320", "13330"]);

        let codes = store.listed_codes_from("0", "0109", 1).unwrap();
        assert_eq!(codes, vec!["13010"]);
    }

    #[test]
    fn test_list_and_market_counts() {
        let store = Store::in_memory().unwrap();
        store
            .upsert_listings(&[
                issuer("13010", day(1), "0111", "A"),
                issuer("13320", day(1), "0111", "B"),
                issuer("13050", day(1), "0109", "ETF"),
            ])
            .unwrap();

        assert_eq!(store.list_listings(None).unwrap().len(), 3);
        assert_eq!(store.list_listings(Some(2)).unwrap().len(), 2);

        let counts = store.market_code_counts().unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].0, "0109");
        assert_eq!(counts[0].2, 1);
        assert_eq!(counts[1].2, 2);
    }
}
