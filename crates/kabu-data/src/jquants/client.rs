//! HTTP client with authentication, rate limiting and pagination.

use crate::error::{DataError, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

/// Production API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.jquants.com/v1";

/// Default minimum spacing between requests
const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(200);

const USER_AGENT: &str = concat!("kabu/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthUserResponse {
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdTokenResponse {
    id_token: String,
}

/// A response body that carries one page of items and a continuation key.
pub(crate) trait Paginated: DeserializeOwned {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

/// Enforces a minimum interval between requests
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// J-Quants API client
pub struct JQuantsClient {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    base_url: String,
    id_token: Option<String>,
}

impl JQuantsClient {
    /// Create a client for `base_url` with the default request spacing.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_rate_limit(base_url, DEFAULT_RATE_LIMIT)
    }

    /// Create a client with a custom minimum interval between requests.
    ///
    /// # Example
    /// ```no_run
    /// use kabu_data::jquants::{DEFAULT_BASE_URL, JQuantsClient};
    /// use std::time::Duration;
    ///
    /// # async fn example() -> kabu_data::Result<()> {
    /// let mut client = JQuantsClient::with_rate_limit(DEFAULT_BASE_URL, Duration::from_secs(1))?;
    /// client.authenticate("user@example.com", "password").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_rate_limit(base_url: impl Into<String>, min_interval: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(DataError::Network)?;

        Ok(Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(min_interval))),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            id_token: None,
        })
    }

    /// Use an already issued ID token instead of authenticating.
    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// Whether an ID token is held.
    pub const fn is_authenticated(&self) -> bool {
        self.id_token.is_some()
    }

    /// Exchange credentials for a refresh token, then the refresh token for
    /// an ID token used on every data request.
    pub async fn authenticate(&mut self, email: &str, password: &str) -> Result<()> {
        self.rate_limiter.lock().await.wait().await;
        let response = self
            .client
            .post(format!("{}/token/auth_user", self.base_url))
            .json(&json!({ "mailaddress": email, "password": password }))
            .send()
            .await?;
        let auth: AuthUserResponse = Self::read_json("/token/auth_user", response)
            .await
            .map_err(|e| DataError::Auth(format!("refresh token request failed: {e}")))?;

        self.rate_limiter.lock().await.wait().await;
        let response = self
            .client
            .post(format!("{}/token/auth_refresh", self.base_url))
            .query(&[("refreshtoken", auth.refresh_token.as_str())])
            .send()
            .await?;
        let token: IdTokenResponse = Self::read_json("/token/auth_refresh", response)
            .await
            .map_err(|e| DataError::Auth(format!("ID token request failed: {e}")))?;

        info!("authenticated against J-Quants API");
        self.id_token = Some(token.id_token);
        Ok(())
    }

    async fn read_json<T: DeserializeOwned>(endpoint: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DataError::Http {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// GET one page from `endpoint`.
    async fn get_page<P: Paginated>(&self, endpoint: &str, query: &[(&str, String)]) -> Result<P> {
        let token = self
            .id_token
            .as_deref()
            .ok_or_else(|| DataError::Auth("not authenticated".to_string()))?;

        self.rate_limiter.lock().await.wait().await;
        let response = self
            .client
            .get(format!("{}{endpoint}", self.base_url))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        Self::read_json(endpoint, response).await
    }

    /// GET every page of `endpoint`, following `pagination_key` until the
    /// upstream stops returning one.
    pub(crate) async fn fetch_all<P: Paginated>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<P::Item>> {
        let mut items = Vec::new();
        let mut pagination_key: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let mut params = query.to_vec();
            if let Some(key) = &pagination_key {
                params.push(("pagination_key", key.clone()));
            }

            let page: P = self.get_page(endpoint, &params).await?;
            let (mut batch, next) = page.into_parts();
            pages += 1;
            debug!(endpoint, page = pages, items = batch.len(), "fetched page");
            items.append(&mut batch);

            match next.filter(|k| !k.is_empty()) {
                Some(key) => pagination_key = Some(key),
                None => break,
            }
        }

        Ok(items)
    }
}

impl std::fmt::Debug for JQuantsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JQuantsClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}
