//! Per-issuer reduction of disclosures to one record per fiscal year.

use super::streams;
use crate::error::{AnalysisError, Result};
use chrono::NaiveDate;
use kabu_data::store::{DataType, DisclosureRecord, FiscalSummaryRecord};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Streams in merge order.
const STREAMS: [DataType; 3] = [
    DataType::Actual,
    DataType::CurrentForecast,
    DataType::NextYearForecast,
];

/// Within one stream: later disclosure date wins. Same-day disclosures are
/// ordered by disclosure time, then by disclosure number, so that the
/// outcome does not depend on input order.
fn is_newer_disclosure(new: &DisclosureRecord, existing: &DisclosureRecord) -> bool {
    (
        new.disclosed_date,
        new.disclosed_time,
        new.disclosure_number.as_str(),
    ) > (
        existing.disclosed_date,
        existing.disclosed_time,
        existing.disclosure_number.as_str(),
    )
}

/// Across streams: later disclosure date wins; on the same date the higher
/// data-type priority wins.
pub fn is_better(new: &FiscalSummaryRecord, existing: &FiscalSummaryRecord) -> bool {
    match new.disclosed_date.cmp(&existing.disclosed_date) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => new.data_type > existing.data_type,
    }
}

/// The newest candidate of one stream for every fiscal year key.
pub fn latest_per_fiscal_year(
    disclosures: &[DisclosureRecord],
    data_type: DataType,
) -> BTreeMap<NaiveDate, FiscalSummaryRecord> {
    let extract = streams::extractor(data_type);
    let mut latest: BTreeMap<NaiveDate, (&DisclosureRecord, FiscalSummaryRecord)> =
        BTreeMap::new();

    for disclosure in disclosures {
        let Some(candidate) = extract(disclosure) else {
            continue;
        };
        match latest.entry(candidate.fiscal_year_start_date) {
            Entry::Vacant(slot) => {
                slot.insert((disclosure, candidate));
            }
            Entry::Occupied(mut slot) => {
                if is_newer_disclosure(disclosure, slot.get().0) {
                    slot.insert((disclosure, candidate));
                }
            }
        }
    }

    latest
        .into_iter()
        .map(|(key, (_, candidate))| (key, candidate))
        .collect()
}

/// Reduce all disclosures of one issuer to at most one summary per fiscal
/// year, ordered by fiscal year start.
pub fn reduce_issuer(
    code: &str,
    disclosures: &[DisclosureRecord],
) -> Result<Vec<FiscalSummaryRecord>> {
    if let Some(stray) = disclosures.iter().find(|d| d.code != code) {
        return Err(AnalysisError::InvalidDisclosure {
            code: code.to_string(),
            reason: format!(
                "disclosure {} belongs to issuer {}",
                stray.disclosure_number, stray.code
            ),
        });
    }

    let mut best: BTreeMap<NaiveDate, FiscalSummaryRecord> = BTreeMap::new();
    for data_type in STREAMS {
        for (key, candidate) in latest_per_fiscal_year(disclosures, data_type) {
            match best.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(candidate);
                }
                Entry::Occupied(mut slot) => {
                    if is_better(&candidate, slot.get()) {
                        slot.insert(candidate);
                    }
                }
            }
        }
    }

    Ok(best.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use kabu_data::store::Financials;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn disclosure(disclosed: NaiveDate, period: &str, number: &str) -> DisclosureRecord {
        DisclosureRecord {
            code: "72030".to_string(),
            disclosed_date: disclosed,
            disclosed_time: None,
            disclosure_number: number.to_string(),
            type_of_document: None,
            type_of_current_period: period.to_string(),
            current_period_start_date: None,
            current_period_end_date: None,
            current_fiscal_year_start_date: Some(date(2023, 4, 1)),
            current_fiscal_year_end_date: Some(date(2024, 3, 31)),
            next_fiscal_year_start_date: None,
            next_fiscal_year_end_date: None,
            actual: Financials::default(),
            forecast: Financials::default(),
            next_year_forecast: Financials::default(),
            next_year_forecast_dps_fiscal_year_end: None,
            diluted_eps: None,
            book_value_per_share: None,
            cash_flows_from_operating: None,
            cash_flows_from_investing: None,
            cash_flows_from_financing: None,
            cash_and_equivalents: None,
        }
    }

    #[test]
    fn test_latest_disclosure_wins_within_stream() {
        let mut old = disclosure(date(2023, 8, 1), "1Q", "1");
        old.forecast.net_sales = Some(100);
        let mut new = disclosure(date(2024, 2, 1), "3Q", "2");
        new.forecast.net_sales = Some(200);

        for input in [vec![old.clone(), new.clone()], vec![new, old]] {
            let latest = latest_per_fiscal_year(&input, DataType::CurrentForecast);
            assert_eq!(latest.len(), 1);
            assert_eq!(latest[&date(2023, 4, 1)].net_sales, Some(200));
        }
    }

    #[test]
    fn test_same_day_tie_is_deterministic() {
        let day = date(2024, 2, 1);
        let mut a = disclosure(day, "3Q", "20240201400100");
        a.forecast.net_sales = Some(1);
        let mut b = disclosure(day, "3Q", "20240201400200");
        b.forecast.net_sales = Some(2);

        for input in [vec![a.clone(), b.clone()], vec![b.clone(), a.clone()]] {
            let latest = latest_per_fiscal_year(&input, DataType::CurrentForecast);
            assert_eq!(latest[&date(2023, 4, 1)].net_sales, Some(2));
        }

        // A later disclosure time beats a higher disclosure number
        a.disclosed_time = NaiveTime::from_hms_opt(16, 0, 0);
        b.disclosed_time = NaiveTime::from_hms_opt(15, 0, 0);
        let latest = latest_per_fiscal_year(&[a, b], DataType::CurrentForecast);
        assert_eq!(latest[&date(2023, 4, 1)].net_sales, Some(1));
    }

    #[test]
    fn test_is_better() {
        let mut actual = disclosure(date(2024, 5, 10), "FY", "1");
        actual.actual.net_sales = Some(1);
        let a = streams::actual(&actual).unwrap();

        let mut later = a.clone();
        later.disclosed_date = date(2024, 5, 11);
        later.data_type = DataType::NextYearForecast;

        assert!(is_better(&later, &a));
        assert!(!is_better(&a, &later));

        let mut same_day_forecast = a.clone();
        same_day_forecast.data_type = DataType::CurrentForecast;
        assert!(is_better(&a, &same_day_forecast));
        assert!(!is_better(&same_day_forecast, &a));
    }

    #[test]
    fn test_stray_issuer_is_rejected() {
        let mut d = disclosure(date(2024, 5, 10), "FY", "1");
        d.code = "67580".to_string();
        let err = reduce_issuer("72030", &[d]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidDisclosure { .. }));
    }

    #[test]
    fn test_empty_input() {
        assert!(reduce_issuer("72030", &[]).unwrap().is_empty());
    }
}
