//! Rate-limit aware GitHub REST client.
//!
//! [`GitHubClient::get_json`] is the single fetch primitive every endpoint goes
//! through. It paces requests, retries transient failures with backoff and,
//! when GitHub reports the quota exhausted, sleeps until the reset time plus
//! a margin and re-issues the identical request without spending a retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use url::Url;

use super::error::{FetchError, Result};
use super::rate_limit::{
    ApiRateLimiter, RateLimitInfo, parse_rate_limit_headers, rate_limit_reset, wait_until_reset,
};
use super::repo::RepoName;
use super::types::{RateLimitResponse, RepoInfo};
use crate::http::{HttpHeaders, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
use crate::retry::{RetryConfig, retry_transient};

/// Public GitHub API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = "repowatch";
const API_VERSION: &str = "2022-11-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GitHub API client. Cheap to clone; clones share the transport and pacing.
#[derive(Clone)]
pub struct GitHubClient {
    transport: Arc<dyn HttpTransport>,
    token: Arc<String>,
    base_url: Arc<String>,
    retry: RetryConfig,
    rate_limiter: Option<ApiRateLimiter>,
}

impl GitHubClient {
    /// Create a client for api.github.com over a pooled reqwest transport.
    pub fn new(token: &str) -> Result<Self> {
        let transport = ReqwestTransport::with_timeout(REQUEST_TIMEOUT)
            .map_err(|e| FetchError::InvalidRequest(format!("cannot build HTTP client: {e}")))?;
        Ok(Self::with_transport(Arc::new(transport), token))
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>, token: &str) -> Self {
        Self {
            transport,
            token: Arc::new(token.to_string()),
            base_url: Arc::new(DEFAULT_API_URL.to_string()),
            retry: RetryConfig::default(),
            rate_limiter: None,
        }
    }

    /// Point the client at another API root (GitHub Enterprise).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = Arc::new(base_url.trim_end_matches('/').to_string());
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Option<ApiRateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Absolute URL for `path` with `query` appended in order.
    pub fn endpoint_url(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| FetchError::InvalidRequest(format!("bad URL for {path}: {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.into())
    }

    fn headers(&self) -> HttpHeaders {
        vec![
            ("Accept".into(), "application/vnd.github+json".into()),
            ("User-Agent".into(), USER_AGENT.into()),
            ("X-GitHub-Api-Version".into(), API_VERSION.into()),
            ("Authorization".into(), format!("Bearer {}", self.token)),
        ]
    }

    /// Issue one GET and classify the response. No retries, no waiting.
    async fn send_once(&self, url: &str) -> Result<HttpResponse> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.wait().await;
        }

        let response = self
            .transport
            .send(HttpRequest {
                url: url.to_string(),
                headers: self.headers(),
            })
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if let Some(info) = parse_rate_limit_headers(&response.headers) {
            tracing::trace!(remaining = info.remaining, limit = info.limit, "Rate limit headers");
        }

        if let Some(reset_at) = rate_limit_reset(&response, Utc::now()) {
            return Err(FetchError::RateLimited { reset_at });
        }

        if !response.is_success() {
            return Err(FetchError::Status {
                status: response.status,
                url: url.to_string(),
            });
        }

        Ok(response)
    }

    async fn get_decoded<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.send_once(url).await?;
        serde_json::from_slice(&response.body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// Fetch and decode `path?query`.
    ///
    /// Transient failures are retried per the client's [`RetryConfig`]; once
    /// the budget is spent the last error is returned. A rate-limit response
    /// suspends until reset + margin and then repeats the same request.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint_url(path, query)?;

        loop {
            let result = retry_transient(
                || self.get_decoded::<T>(&url),
                &self.retry,
                FetchError::is_transient,
                &url,
            )
            .await;

            match result {
                Err(FetchError::RateLimited { reset_at }) => {
                    let wait = wait_until_reset(reset_at, Utc::now());
                    tracing::warn!(
                        url = %url,
                        reset_at = %reset_at,
                        wait_secs = wait.as_secs(),
                        "Rate limit exhausted, waiting for reset"
                    );
                    tokio::time::sleep(wait).await;
                }
                other => return other,
            }
        }
    }

    /// Current core quota from `GET /rate_limit` (single attempt).
    pub async fn rate_limit(&self) -> Result<RateLimitInfo> {
        let url = self.endpoint_url("/rate_limit", &[])?;
        let body: RateLimitResponse = self.get_decoded(&url).await?;
        let core = body.resources.core;
        Ok(RateLimitInfo {
            limit: core.limit,
            remaining: core.remaining,
            used: core.used,
            reset_at: core.reset_at(),
        })
    }

    /// Sleep until the quota window resets if fewer than the low-water mark
    /// of requests remain.
    ///
    /// Failure to read the quota is logged and ignored: the fetcher still
    /// reacts to definitive rate-limit responses.
    pub async fn wait_for_quota(&self) -> Option<RateLimitInfo> {
        match self.rate_limit().await {
            Ok(info) => {
                if info.is_below_low_water() {
                    let wait = wait_until_reset(info.reset_at, Utc::now());
                    tracing::warn!(
                        remaining = info.remaining,
                        reset_at = %info.reset_at,
                        wait_secs = wait.as_secs(),
                        "Rate limit low, pausing until reset"
                    );
                    tokio::time::sleep(wait).await;
                } else {
                    tracing::debug!(remaining = info.remaining, "Rate limit OK");
                }
                Some(info)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not read rate limit, continuing");
                None
            }
        }
    }

    /// Look a repository up once. `Ok(None)` means it does not exist (or is
    /// not visible to the token).
    pub async fn get_repository(&self, repo: &RepoName) -> Result<Option<RepoInfo>> {
        let url = self.endpoint_url(&repo.path(""), &[])?;
        match self.get_decoded::<RepoInfo>(&url).await {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::Branch;
    use crate::http::MockTransport;
    use crate::retry::MAX_FETCH_RETRIES;
    use serde_json::json;

    const BASE: &str = "https://api.test";

    fn client(transport: &MockTransport) -> GitHubClient {
        GitHubClient::with_transport(Arc::new(transport.clone()), "t0ken").with_base_url(BASE)
    }

    fn exhausted_headers(reset: i64) -> HttpHeaders {
        vec![
            ("x-ratelimit-limit".into(), "5000".into()),
            ("x-ratelimit-remaining".into(), "0".into()),
            ("x-ratelimit-reset".into(), reset.to_string()),
        ]
    }

    #[test]
    fn endpoint_url_appends_query_in_order() {
        let transport = MockTransport::new();
        let url = client(&transport)
            .endpoint_url(
                "/repos/o/r/commits",
                &[("sha", "feature/x".into()), ("page", "2".into())],
            )
            .expect("url");
        assert_eq!(url, "https://api.test/repos/o/r/commits?sha=feature%2Fx&page=2");
    }

    #[tokio::test]
    async fn get_json_sends_auth_headers() {
        let transport = MockTransport::new();
        let gh = client(&transport);
        transport.push_json(format!("{BASE}/repos/o/r"), json!({"id": 1, "full_name": "o/r"}));

        let info: RepoInfo = gh.get_json("/repos/o/r", &[]).await.expect("repo");
        assert_eq!(info.full_name, "o/r");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let headers = &requests[0].headers;
        assert_eq!(
            crate::http::header_get(headers, "authorization"),
            Some("Bearer t0ken")
        );
        assert_eq!(
            crate::http::header_get(headers, "accept"),
            Some("application/vnd.github+json")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_response_waits_until_reset_plus_margin() {
        let transport = MockTransport::new();
        let gh = client(&transport);
        let url = format!("{BASE}/repos/o/r/branches");
        let reset = Utc::now().timestamp() + 60;
        transport.push_status(&url, 403, exhausted_headers(reset));
        transport.push_json(&url, json!([{"name": "main"}]));

        let started = tokio::time::Instant::now();
        let branches: Vec<Branch> =
            gh.get_json("/repos/o/r/branches", &[]).await.expect("branches");
        let waited = started.elapsed();

        assert_eq!(branches.len(), 1);
        assert_eq!(transport.request_count(&url), 2);
        // reset is whole seconds from "now", so the wait lands within a second of 65s
        assert!(waited >= Duration::from_secs(64), "waited {waited:?}");
        assert!(waited <= Duration::from_secs(66), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_waits_do_not_spend_the_retry_budget() {
        let transport = MockTransport::new();
        let gh = client(&transport);
        let url = format!("{BASE}/repos/o/r/branches");
        let reset = Utc::now().timestamp();
        for _ in 0..(MAX_FETCH_RETRIES + 2) {
            transport.push_status(&url, 403, exhausted_headers(reset));
        }
        transport.push_json(&url, json!([]));

        let branches: Vec<Branch> =
            gh.get_json("/repos/o/r/branches", &[]).await.expect("eventually succeeds");
        assert!(branches.is_empty());
        assert_eq!(transport.request_count(&url), MAX_FETCH_RETRIES + 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_then_surface() {
        let transport = MockTransport::new();
        let gh = client(&transport);
        let url = format!("{BASE}/repos/o/r/branches");
        transport.push_transport_error(&url, "connection reset");
        for _ in 0..MAX_FETCH_RETRIES {
            transport.push_status(&url, 502, Vec::new());
        }

        let started = tokio::time::Instant::now();
        let err = gh
            .get_json::<Vec<Branch>>("/repos/o/r/branches", &[])
            .await
            .expect_err("budget exhausted");

        assert!(matches!(err, FetchError::Status { status: 502, .. }));
        assert_eq!(transport.request_count(&url), 1 + MAX_FETCH_RETRIES);
        // 5 + 10 + 20 + 40 + 80
        assert!(started.elapsed() >= Duration::from_secs(155));
    }

    #[tokio::test(start_paused = true)]
    async fn forbidden_with_quota_left_is_retried_like_any_failure() {
        let transport = MockTransport::new();
        let gh = client(&transport);
        let url = format!("{BASE}/repos/o/r/branches");
        transport.push_status(&url, 403, vec![("x-ratelimit-remaining".into(), "4000".into())]);
        transport.push_json(&url, json!([{"name": "main"}]));

        let branches: Vec<Branch> =
            gh.get_json("/repos/o/r/branches", &[]).await.expect("branches");
        assert_eq!(branches.len(), 1);
        assert_eq!(transport.request_count(&url), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_quota_sleeps_below_low_water_mark() {
        let transport = MockTransport::new();
        let gh = client(&transport);
        let reset = Utc::now().timestamp() + 30;
        transport.push_json(
            format!("{BASE}/rate_limit"),
            json!({"resources": {"core": {"limit": 5000, "used": 4990, "remaining": 10, "reset": reset}}}),
        );

        let started = tokio::time::Instant::now();
        let info = gh.wait_for_quota().await.expect("quota read");
        assert_eq!(info.remaining, 10);
        assert!(started.elapsed() >= Duration::from_secs(34));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_quota_returns_immediately_with_headroom() {
        let transport = MockTransport::new();
        let gh = client(&transport);
        transport.push_json(
            format!("{BASE}/rate_limit"),
            json!({"resources": {"core": {"limit": 5000, "used": 0, "remaining": 5000, "reset": 0}}}),
        );

        let started = tokio::time::Instant::now();
        gh.wait_for_quota().await.expect("quota read");
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn wait_for_quota_tolerates_failure() {
        let transport = MockTransport::new();
        let gh = client(&transport);
        assert!(gh.wait_for_quota().await.is_none());
    }

    #[tokio::test]
    async fn get_repository_maps_404_to_none() {
        let transport = MockTransport::new();
        let gh = client(&transport);
        transport.push_status(format!("{BASE}/repos/o/missing"), 404, Vec::new());
        transport.push_json(format!("{BASE}/repos/o/r"), json!({"id": 7, "full_name": "o/r"}));

        let missing = RepoName::parse("o/missing").expect("name");
        let present = RepoName::parse("o/r").expect("name");
        assert!(gh.get_repository(&missing).await.expect("lookup").is_none());
        assert_eq!(
            gh.get_repository(&present).await.expect("lookup").map(|r| r.id),
            Some(7)
        );
    }
}
