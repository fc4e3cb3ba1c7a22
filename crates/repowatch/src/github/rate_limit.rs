//! Rate limit telemetry and pacing.
//!
//! Two mechanisms cooperate here. Reactive: the quota reported by GitHub
//! (headers or `/rate_limit`) is checked against a low-water mark and the
//! caller sleeps until the window resets. Proactive: an optional `governor`
//! token bucket spaces requests out so a burst of concurrent branch or review
//! fetches does not trip the secondary rate limit.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::http::{HttpHeaders, HttpResponse, header_get};

/// Below this many remaining requests, wait for the window to reset.
pub const LOW_WATER_MARK: usize = 20;

/// Extra wait after the advertised reset time.
pub const RESET_MARGIN: Duration = Duration::from_secs(5);

/// Default proactive pacing for GitHub (requests per second).
pub const GITHUB_DEFAULT_RPS: u32 = 10;

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Quota snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub limit: usize,
    pub remaining: usize,
    pub used: usize,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitInfo {
    pub fn is_below_low_water(&self) -> bool {
        self.remaining < LOW_WATER_MARK
    }
}

/// Token-bucket limiter shared by clones of the client.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl ApiRateLimiter {
    /// Create a limiter allowing `requests_per_second` (0 is treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
        }
    }

    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}

/// Read `x-ratelimit-*` headers, if all three are present.
pub fn parse_rate_limit_headers(headers: &HttpHeaders) -> Option<RateLimitInfo> {
    let limit: usize = header_get(headers, "x-ratelimit-limit")?.parse().ok()?;
    let remaining = header_get(headers, "x-ratelimit-remaining")?.parse().ok()?;
    let reset_epoch: i64 = header_get(headers, "x-ratelimit-reset")?.parse().ok()?;
    let used = header_get(headers, "x-ratelimit-used")
        .and_then(|v| v.parse().ok())
        .unwrap_or_else(|| limit.saturating_sub(remaining));
    Some(RateLimitInfo {
        limit,
        remaining,
        used,
        reset_at: DateTime::from_timestamp(reset_epoch, 0).unwrap_or_else(Utc::now),
    })
}

/// If `resp` is a definitive rate-limit response, return when it lifts.
///
/// That is a 403 or 429 which either reports zero remaining quota (reset from
/// `x-ratelimit-reset`) or carries `retry-after` (secondary limit).
pub fn rate_limit_reset(resp: &HttpResponse, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if resp.status != 403 && resp.status != 429 {
        return None;
    }

    if resp.header("x-ratelimit-remaining").map(str::trim) == Some("0") {
        let reset_at = resp
            .header("x-ratelimit-reset")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
            .unwrap_or(now);
        return Some(reset_at);
    }

    resp.header("retry-after")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|secs| now + chrono::Duration::seconds(secs.max(0)))
}

/// How long to sleep so that we wake `RESET_MARGIN` after `reset_at`.
pub fn wait_until_reset(reset_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let margin = chrono::Duration::from_std(RESET_MARGIN).unwrap_or_default();
    (reset_at + margin - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn response(status: u16, headers: &[(&str, &str)]) -> HttpResponse {
        HttpResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: Vec::new(),
        }
    }

    #[test]
    fn headers_parse_into_info() {
        let resp = response(
            200,
            &[
                ("X-RateLimit-Limit", "5000"),
                ("X-RateLimit-Remaining", "19"),
                ("X-RateLimit-Reset", "1700000000"),
            ],
        );
        let info = parse_rate_limit_headers(&resp.headers).expect("info");
        assert_eq!(info.limit, 5000);
        assert_eq!(info.remaining, 19);
        assert_eq!(info.used, 4981);
        assert!(info.is_below_low_water());
        assert_eq!(info.reset_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn missing_headers_yield_none() {
        let resp = response(200, &[("x-ratelimit-limit", "5000")]);
        assert!(parse_rate_limit_headers(&resp.headers).is_none());
    }

    #[test]
    fn exhausted_403_is_a_rate_limit() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let resp = response(
            403,
            &[
                ("x-ratelimit-remaining", "0"),
                ("x-ratelimit-reset", "1704067260"),
            ],
        );
        assert_eq!(
            rate_limit_reset(&resp, now),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 1, 0).unwrap())
        );
    }

    #[test]
    fn forbidden_with_quota_left_is_not_a_rate_limit() {
        let now = Utc::now();
        let resp = response(403, &[("x-ratelimit-remaining", "12")]);
        assert_eq!(rate_limit_reset(&resp, now), None);

        let ok = response(200, &[("x-ratelimit-remaining", "0")]);
        assert_eq!(rate_limit_reset(&ok, now), None);
    }

    #[test]
    fn retry_after_counts_from_now() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let resp = response(429, &[("Retry-After", "30")]);
        assert_eq!(
            rate_limit_reset(&resp, now),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 30).unwrap())
        );
    }

    #[test]
    fn wait_adds_margin_and_never_goes_negative() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let reset = now + chrono::Duration::seconds(60);
        assert_eq!(wait_until_reset(reset, now), Duration::from_secs(65));

        let long_past = now - chrono::Duration::seconds(60);
        assert_eq!(wait_until_reset(long_past, now), Duration::ZERO);
    }

    #[tokio::test]
    async fn limiter_allows_first_request_immediately() {
        let limiter = ApiRateLimiter::new(0);
        limiter.wait().await;
    }
}
