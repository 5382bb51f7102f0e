use super::{AccountStore, StoreError};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;
use tripledice_types::Account;
use url::Url;

/// Timeout for connections and requests
const TIMEOUT: Duration = Duration::from_secs(10);

/// Collection holding account documents
const COLLECTION: &str = "users";

/// Retry policy for transient HTTP failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request (including the first attempt).
    pub max_attempts: usize,
    /// Initial backoff delay after the first retryable failure.
    pub initial_backoff: Duration,
    /// Maximum backoff delay between attempts.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        }
    }
}

#[derive(Serialize)]
struct Increment<'a> {
    field: &'a str,
    by: i64,
}

/// Account store backed by a remote JSON document service.
///
/// Documents live at `{base}/users/{uid}`. Reads and full writes use GET and PUT, partial
/// updates use PATCH (merge), and balance changes go through the service's atomic
/// `POST {base}/users/{uid}/increment` so concurrent writers never lose an update.
#[derive(Clone)]
pub struct Remote {
    base_url: Url,
    http_client: HttpClient,
    retry_policy: RetryPolicy,
}

impl Remote {
    pub fn new(base_url: &str) -> Result<Self, StoreError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(StoreError::InvalidBaseUrl(base_url.to_string()));
        }
        let http_client = HttpClient::builder()
            .timeout(TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(60))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            base_url,
            http_client,
            retry_policy: RetryPolicy::default(),
        })
    }

    /// Returns a new store with the provided retry policy.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push(COLLECTION)
            .extend(segments);
        Ok(url)
    }

    async fn send_with_retry(
        &self,
        method: Method,
        make_request: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        // Only reads are safe to repeat; an increment must never be applied twice.
        let max_attempts = if method == Method::GET {
            self.retry_policy.max_attempts.max(1)
        } else {
            1
        };

        let mut attempt = 0usize;
        let mut backoff = self.retry_policy.initial_backoff;
        loop {
            attempt += 1;
            match make_request().send().await {
                Ok(response) => {
                    if !response.status().is_server_error() || attempt >= max_attempts {
                        return Ok(response);
                    }
                }
                Err(err) => {
                    if attempt >= max_attempts || !(err.is_timeout() || err.is_connect()) {
                        return Err(StoreError::Reqwest(err));
                    }
                }
            }
            debug!(attempt, ?backoff, "retrying account store request");
            if backoff > Duration::ZERO {
                sleep(backoff).await;
                backoff = std::cmp::min(backoff.saturating_mul(2), self.retry_policy.max_backoff);
            }
        }
    }

    async fn fetch(&self, uid: &str) -> Result<Option<Account>, StoreError> {
        let url = self.url(&[uid])?;
        let response = self
            .send_with_retry(Method::GET, || self.http_client.get(url.clone()))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let mut account: Account = response.json().await?;
                account.uid = uid.to_string();
                Ok(Some(account))
            }
            status => Err(StoreError::Failed(status)),
        }
    }

    async fn put(&self, account: &Account) -> Result<(), StoreError> {
        let url = self.url(&[account.uid.as_str()])?;
        let response = self
            .send_with_retry(Method::PUT, || self.http_client.put(url.clone()).json(account))
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Failed(response.status()));
        }
        Ok(())
    }

    async fn patch(&self, uid: &str, fields: serde_json::Value) -> Result<(), StoreError> {
        let url = self.url(&[uid])?;
        let response = self
            .send_with_retry(Method::PATCH, || {
                self.http_client.patch(url.clone()).json(&fields)
            })
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Failed(response.status()));
        }
        Ok(())
    }

    async fn ensure(&self, uid: &str) -> Result<Account, StoreError> {
        if let Some(account) = self.fetch(uid).await? {
            return Ok(account);
        }
        let account = Account::new(uid);
        self.put(&account).await?;
        Ok(account)
    }

    /// Atomically add `by` to a numeric field, creating the document first if it is missing.
    async fn increment(&self, uid: &str, field: &str, by: i64) -> Result<Account, StoreError> {
        let url = self.url(&[uid, "increment"])?;
        let body = Increment { field, by };
        let mut created = false;
        loop {
            let response = self
                .send_with_retry(Method::POST, || {
                    self.http_client.post(url.clone()).json(&body)
                })
                .await?;
            match response.status() {
                StatusCode::NOT_FOUND if !created => {
                    self.ensure(uid).await?;
                    created = true;
                }
                status if status.is_success() => {
                    let mut account: Account = response.json().await?;
                    account.uid = uid.to_string();
                    return Ok(account);
                }
                status => return Err(StoreError::Failed(status)),
            }
        }
    }
}

impl AccountStore for Remote {
    async fn get(&self, uid: &str) -> Result<Option<Account>, StoreError> {
        self.fetch(uid).await
    }

    async fn get_or_create(&mut self, uid: &str) -> Result<Account, StoreError> {
        self.ensure(uid).await
    }

    async fn debit(&mut self, uid: &str, amount: i64) -> Result<(), StoreError> {
        self.increment(uid, "score", -amount).await.map(|_| ())
    }

    async fn credit(&mut self, uid: &str, amount: i64) -> Result<(), StoreError> {
        self.increment(uid, "score", amount).await.map(|_| ())
    }

    async fn apply_round_result(
        &mut self,
        uid: &str,
        gained: i64,
        is_win: bool,
    ) -> Result<(), StoreError> {
        let account = self.increment(uid, "plays", 1).await?;
        if !is_win {
            return Ok(());
        }
        self.increment(uid, "score", gained).await?;
        if gained > account.max_record {
            self.patch(uid, json!({ "max_record": gained })).await?;
        }
        Ok(())
    }

    async fn claim_bonus(
        &mut self,
        uid: &str,
        round_id: u64,
        amount: i64,
    ) -> Result<Account, StoreError> {
        self.ensure(uid).await?;

        // Mark the round before crediting: a failure in between loses the bonus, never repeats it
        self.patch(uid, json!({ "last_claim_round": round_id }))
            .await?;
        let mut account = self.increment(uid, "score", amount).await?;
        account.last_claim_round = round_id;
        Ok(account)
    }

    async fn set_nickname(&mut self, uid: &str, nickname: &str) -> Result<(), StoreError> {
        match self.fetch(uid).await? {
            Some(_) => self.patch(uid, json!({ "nickname": nickname })).await,
            None => self.put(&Account::with_nickname(uid, nickname)).await,
        }
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let url = self.url(&[])?;
        let response = self
            .send_with_retry(Method::GET, || self.http_client.get(url.clone()))
            .await?;
        if !response.status().is_success() {
            return Err(StoreError::Failed(response.status()));
        }
        Ok(response.json().await?)
    }
}
