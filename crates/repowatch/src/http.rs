//! Transport boundary for all upstream HTTP I/O.
//!
//! The GitHub client only ever issues authenticated GETs, so the seam is a
//! single `send` over a minimal request/response pair. Production code uses
//! [`ReqwestTransport`]; tests register canned responses on a mock.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// HTTP headers represented as key/value pairs.
///
/// Header names are treated case-insensitively by [`header_get`].
pub type HttpHeaders = Vec<(String, String)>;

/// A GET request against the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HttpHeaders,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for GET {url}")]
    NoMockResponse { url: String },
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Get the first header value matching `name` (case-insensitive).
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Real transport backed by a pooled reqwest client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a transport whose requests give up after `timeout`.
    ///
    /// A request that times out surfaces as [`HttpError::Transport`] and is
    /// retried by the fetcher like any other transient failure.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = self.client.get(&request.url);
        for (k, v) in request.headers {
            builder = builder.header(&k, &v);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let headers: HttpHeaders = resp
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();

        let body = resp
            .bytes()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

// ---------- Test-only mock transport ----------

#[cfg(test)]
pub(crate) use mock::MockTransport;


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_get_is_case_insensitive_and_returns_first_match() {
        let headers: HttpHeaders = vec![
            ("X-RateLimit-Remaining".to_string(), "10".to_string()),
            ("x-ratelimit-remaining".to_string(), "0".to_string()),
        ];
        assert_eq!(header_get(&headers, "x-ratelimit-remaining"), Some("10"));
        assert_eq!(header_get(&headers, "missing"), None);
    }

    #[test]
    fn success_covers_the_2xx_range_only() {
        let mut resp = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: Vec::new(),
        };
        assert!(resp.is_success());
        resp.status = 304;
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn mock_transport_replays_in_fifo_order_and_records_requests() {
        let transport = MockTransport::new();
        let url = "https://api.example.test/repos/a/b";
        transport.push_status(url, 502, Vec::new());
        transport.push_json(url, serde_json::json!({"ok": true}));

        let req = HttpRequest {
            url: url.to_string(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
        };
        let first = transport.send(req.clone()).await.expect("first response");
        let second = transport.send(req.clone()).await.expect("second response");
        assert_eq!(first.status, 502);
        assert_eq!(second.status, 200);
        assert_eq!(transport.requests(), vec![req.clone(), req]);

        let err = transport
            .send(HttpRequest {
                url: url.to_string(),
                headers: Vec::new(),
            })
            .await
            .expect_err("queue is drained");
        assert!(matches!(err, HttpError::NoMockResponse { .. }));
    }

    #[tokio::test]
    async fn mock_transport_falls_back_after_queue_drains() {
        let transport = MockTransport::new();
        let url = "https://api.example.test/rate_limit";
        transport.push_status(url, 500, Vec::new());
        transport.set_fallback_json(url, serde_json::json!({"ok": true}));

        let req = HttpRequest {
            url: url.to_string(),
            headers: Vec::new(),
        };
        let statuses: Vec<u16> = [
            transport.send(req.clone()).await.expect("queued"),
            transport.send(req.clone()).await.expect("fallback"),
            transport.send(req).await.expect("fallback again"),
        ]
        .iter()
        .map(|r| r.status)
        .collect();
        assert_eq!(statuses, [500, 200, 200]);
        assert_eq!(transport.request_count(url), 3);
    }

    #[tokio::test]
    async fn reqwest_transport_reports_invalid_url_as_transport_error() {
        let transport = ReqwestTransport::with_timeout(Duration::from_secs(1))
            .expect("reqwest transport should build");
        let err = transport
            .send(HttpRequest {
                url: "not a url".to_string(),
                headers: Vec::new(),
            })
            .await
            .expect_err("expected error");
        assert!(matches!(err, HttpError::Transport(_)));
    }
}
