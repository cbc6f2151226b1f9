//! `/listed/info`: issuer master data.

use super::client::{JQuantsClient, Paginated};
use crate::error::{DataError, Result};
use crate::parse;
use crate::store::ListedIssuer;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::warn;

const ENDPOINT: &str = "/listed/info";

/// Listing entry as returned by the API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RawListedInfo {
    /// Effective date (`YYYY-MM-DD`)
    pub date: String,
    /// Issuer code
    pub code: String,
    /// Company name
    pub company_name: String,
    /// Company name (English)
    pub company_name_english: String,
    /// 17-sector code
    pub sector17_code: String,
    /// 17-sector name
    pub sector17_code_name: String,
    /// 33-sector code
    pub sector33_code: String,
    /// 33-sector name
    pub sector33_code_name: String,
    /// Scale category
    pub scale_category: String,
    /// Market code
    pub market_code: String,
    /// Market name
    pub market_code_name: String,
    /// Margin code
    pub margin_code: String,
    /// Margin name
    pub margin_code_name: String,
}

#[derive(Debug, Deserialize)]
struct ListedInfoResponse {
    #[serde(default)]
    info: Vec<RawListedInfo>,
    pagination_key: Option<String>,
}

impl Paginated for ListedInfoResponse {
    type Item = RawListedInfo;

    fn into_parts(self) -> (Vec<RawListedInfo>, Option<String>) {
        (self.info, self.pagination_key)
    }
}

fn opt(s: String) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl TryFrom<RawListedInfo> for ListedIssuer {
    type Error = DataError;

    fn try_from(raw: RawListedInfo) -> Result<Self> {
        if raw.code.trim().is_empty() {
            return Err(DataError::parse_field("Code", &raw.code, "missing"));
        }
        Ok(Self {
            effective_date: parse::date("Date", &raw.date)?,
            code: raw.code.trim().to_string(),
            company_name: raw.company_name,
            company_name_english: opt(raw.company_name_english),
            sector17_code: opt(raw.sector17_code),
            sector17_code_name: opt(raw.sector17_code_name),
            sector33_code: opt(raw.sector33_code),
            sector33_code_name: opt(raw.sector33_code_name),
            scale_category: opt(raw.scale_category),
            market_code: raw.market_code,
            market_code_name: opt(raw.market_code_name),
            margin_code: opt(raw.margin_code),
            margin_code_name: opt(raw.margin_code_name),
        })
    }
}

/// Convert raw entries, logging and skipping the ones that fail to parse.
pub fn convert_listings(raw: Vec<RawListedInfo>) -> Vec<ListedIssuer> {
    raw.into_iter()
        .filter_map(|r| {
            let code = r.code.clone();
            match ListedIssuer::try_from(r) {
                Ok(issuer) => Some(issuer),
                Err(e) => {
                    warn!(code = %code, error = %e, "skipping listing");
                    None
                }
            }
        })
        .collect()
}

impl JQuantsClient {
    /// Fetch listing information, optionally for one issuer and/or as of a date.
    pub async fn fetch_listed_info(
        &self,
        code: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ListedIssuer>> {
        let mut query = Vec::new();
        if let Some(code) = code {
            query.push(("code", code.to_string()));
        }
        if let Some(date) = date {
            query.push(("date", date.to_string()));
        }

        let raw = self.fetch_all::<ListedInfoResponse>(ENDPOINT, &query).await?;
        Ok(convert_listings(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use std::time::Duration;

    const PAGE: &str = r#"{
        "info": [
            {
                "Date": "2024-01-04",
                "Code": "72030",
                "CompanyName": "トヨタ自動車",
                "CompanyNameEnglish": "TOYOTA MOTOR CORPORATION",
                "Sector17Code": "6",
                "Sector17CodeName": "自動車・輸送機",
                "Sector33Code": "3700",
                "Sector33CodeName": "輸送用機器",
                "ScaleCategory": "TOPIX Core30",
                "MarketCode": "0111",
                "MarketCodeName": "プライム",
                "MarginCode": "2",
                "MarginCodeName": "貸借"
            },
            {
                "Date": "",
                "Code": "13010",
                "CompanyName": "broken",
                "MarketCode": "0111"
            }
        ]
    }"#;

    #[test]
    fn test_convert_skips_bad_rows() {
        let parsed: ListedInfoResponse = serde_json::from_str(PAGE).unwrap();
        let (raw, key) = parsed.into_parts();
        assert!(key.is_none());

        let issuers = convert_listings(raw);
        assert_eq!(issuers.len(), 1);
        let toyota = &issuers[0];
        assert_eq!(toyota.code, "72030");
        assert_eq!(
            toyota.effective_date,
            NaiveDate::from_ymd_opt(2024, 1, 4).unwrap()
        );
        assert_eq!(toyota.market_code, "0111");
        assert_eq!(toyota.scale_category.as_deref(), Some("TOPIX Core30"));
    }

    #[tokio::test]
    async fn test_fetch_listed_info() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/listed/info")
            .match_query(Matcher::Exact("date=2024-01-04".into()))
            .with_status(200)
            .with_body(PAGE)
            .create_async()
            .await;

        let client = JQuantsClient::with_rate_limit(server.url(), Duration::ZERO)
            .unwrap()
            .with_id_token("token");
        let issuers = client
            .fetch_listed_info(None, NaiveDate::from_ymd_opt(2024, 1, 4))
            .await
            .unwrap();

        assert_eq!(issuers.len(), 1);
        mock.assert_async().await;
    }
}
