//! Shared HTTP plumbing for the remote service clients
//!
//! Every remote call site (dense embeddings, sparse embeddings, index queries,
//! chat completions) goes through [`RemoteClient`], which owns:
//!
//! - a `reqwest::Client` with a bounded request timeout
//! - status-code classification into [`RetrievalError`] variants
//! - bounded retry with exponential backoff for idempotent reads
//! - an optional `governor` rate limiter (`rate-limit` feature)

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

#[cfg(feature = "rate-limit")]
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
#[cfg(feature = "rate-limit")]
use std::num::NonZeroU32;
#[cfg(feature = "rate-limit")]
use std::sync::Arc;

use crate::error::{Result, RetrievalError};

/// Default timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default max retries for idempotent reads
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Base delay for exponential backoff (milliseconds)
const RETRY_BASE_DELAY_MS: u64 = 250;

/// Default requests per second limit
#[cfg(feature = "rate-limit")]
const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

#[cfg(feature = "rate-limit")]
type ServiceRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Timeout and retry policy for one remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpPolicy {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum retry attempts for transient failures (0 = single attempt)
    pub max_retries: u32,
    /// Requests per second limit (when rate-limit feature enabled)
    #[cfg(feature = "rate-limit")]
    pub requests_per_second: u32,
}

impl Default for HttpPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            #[cfg(feature = "rate-limit")]
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

impl HttpPolicy {
    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set requests per second limit (when rate-limit feature enabled)
    #[cfg(feature = "rate-limit")]
    pub fn with_requests_per_second(mut self, rps: u32) -> Self {
        self.requests_per_second = rps;
        self
    }
}

/// HTTP client bound to a single named remote service
#[derive(Clone)]
pub(crate) struct RemoteClient {
    service: &'static str,
    client: Client,
    policy: HttpPolicy,
    #[cfg(feature = "rate-limit")]
    rate_limiter: Arc<ServiceRateLimiter>,
}

impl RemoteClient {
    /// Build a client for `service` with the given policy
    pub(crate) fn new(service: &'static str, policy: HttpPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(policy.timeout_secs))
            .build()
            .map_err(|e| {
                RetrievalError::unavailable(service, format!("HTTP client error: {}", e))
            })?;

        #[cfg(feature = "rate-limit")]
        let rate_limiter = {
            let rps = NonZeroU32::new(policy.requests_per_second).unwrap_or(NonZeroU32::MIN);
            Arc::new(RateLimiter::direct(Quota::per_second(rps)))
        };

        Ok(Self {
            service,
            client,
            policy,
            #[cfg(feature = "rate-limit")]
            rate_limiter,
        })
    }

    pub(crate) fn service(&self) -> &'static str {
        self.service
    }

    #[cfg(feature = "rate-limit")]
    async fn wait_for_permit(&self) {
        self.rate_limiter.until_ready().await;
    }

    #[cfg(not(feature = "rate-limit"))]
    async fn wait_for_permit(&self) {}

    /// POST a JSON body once and decode the JSON reply
    pub(crate) async fn post_json<B, R>(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &B,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.wait_for_permit().await;
        let request = with_headers(self.client.post(url).json(body), headers);
        self.execute(request).await
    }

    /// POST a JSON body, retrying transient failures up to `max_retries` times
    ///
    /// Only for idempotent reads (embedding and index queries).
    pub(crate) async fn post_json_with_retry<B, R>(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
        body: &B,
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut retry_delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 0..=self.policy.max_retries {
            match self.post_json(url, headers, body).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    warn!(
                        service = self.service,
                        attempt = attempt + 1,
                        "Retrying after transient failure: {}",
                        e
                    );
                    tokio::time::sleep(retry_delay).await;
                    retry_delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }

        Err(RetrievalError::unavailable(
            self.service,
            "Request failed after retries",
        ))
    }

    /// GET a JSON document, retrying transient failures
    pub(crate) async fn get_json_with_retry<R>(
        &self,
        url: &str,
        headers: &[(&'static str, String)],
    ) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let mut retry_delay = Duration::from_millis(RETRY_BASE_DELAY_MS);

        for attempt in 0..=self.policy.max_retries {
            self.wait_for_permit().await;
            let request = with_headers(self.client.get(url), headers);
            match self.execute(request).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    tokio::time::sleep(retry_delay).await;
                    retry_delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }

        Err(RetrievalError::unavailable(
            self.service,
            "Request failed after retries",
        ))
    }

    async fn execute<R: DeserializeOwned>(&self, request: RequestBuilder) -> Result<R> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RetrievalError::unavailable(self.service, "Request timed out")
            } else if e.is_connect() {
                RetrievalError::unavailable(self.service, format!("Connection failed: {}", e))
            } else {
                RetrievalError::unavailable(self.service, format!("Request failed: {}", e))
            }
        })?;

        let response = self.check_status(response).await?;
        debug!(service = self.service, "Request succeeded");

        response.json::<R>().await.map_err(|e| {
            RetrievalError::malformed(self.service, format!("Invalid response body: {}", e))
        })
    }

    async fn check_status(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let body = response.text().await.unwrap_or_default();
                Err(RetrievalError::Auth {
                    service: self.service,
                    message: body,
                })
            }
            StatusCode::NOT_FOUND => {
                let body = response.text().await.unwrap_or_default();
                Err(RetrievalError::NotFound {
                    service: self.service,
                    message: body,
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());

                Err(RetrievalError::RateLimit {
                    service: self.service,
                    retry_after,
                })
            }
            s if s.is_server_error() => {
                let body = response.text().await.unwrap_or_default();
                Err(RetrievalError::unavailable(
                    self.service,
                    format!("Service returned {}: {}", s, body),
                ))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(RetrievalError::malformed(
                    self.service,
                    format!("Request rejected with status {}: {}", status, body),
                ))
            }
        }
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("service", &self.service)
            .field("policy", &self.policy)
            .finish()
    }
}

fn with_headers(mut request: RequestBuilder, headers: &[(&'static str, String)]) -> RequestBuilder {
    for (name, value) in headers {
        request = request.header(*name, value.as_str());
    }
    request
}

/// Join a base URL and an endpoint path, tolerating a trailing slash
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_policy(max_retries: u32) -> HttpPolicy {
        HttpPolicy::default()
            .with_timeout(5)
            .with_max_retries(max_retries)
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://a/v1/", "/embed"), "http://a/v1/embed");
        assert_eq!(join_url("http://a", "query"), "http://a/query");
    }

    #[test]
    fn test_policy_defaults() {
        let policy = HttpPolicy::default();
        assert_eq!(policy.timeout_secs, 30);
        assert_eq!(policy.max_retries, 1);
    }

    #[tokio::test]
    async fn test_post_json_sends_headers() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/echo"))
            .and(header("Api-Key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = RemoteClient::new("Test", test_policy(0)).unwrap();
        let reply: Value = client
            .post_json(
                &join_url(&server.uri(), "echo"),
                &[("Api-Key", "secret".to_string())],
                &json!({}),
            )
            .await
            .unwrap();

        assert_eq!(reply["ok"], true);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = RemoteClient::new("Test", test_policy(1)).unwrap();
        let reply: Value = client
            .post_json_with_retry(&join_url(&server.uri(), "flaky"), &[], &json!({}))
            .await
            .unwrap();

        assert_eq!(reply["ok"], true);
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/secure"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .expect(1)
            .mount(&server)
            .await;

        let client = RemoteClient::new("Test", test_policy(3)).unwrap();
        let result: Result<Value> = client
            .post_json_with_retry(&join_url(&server.uri(), "secure"), &[], &json!({}))
            .await;

        assert!(matches!(result, Err(RetrievalError::Auth { .. })));
    }

    #[tokio::test]
    async fn test_rate_limit_reports_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/busy"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "60"))
            .mount(&server)
            .await;

        let client = RemoteClient::new("Test", test_policy(0)).unwrap();
        let result: Result<Value> = client
            .post_json(&join_url(&server.uri(), "busy"), &[], &json!({}))
            .await;

        match result {
            Err(RetrievalError::RateLimit { retry_after, .. }) => {
                assert_eq!(retry_after, Some(60));
            }
            other => panic!("Expected RateLimit error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_body_is_malformed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = RemoteClient::new("Test", test_policy(0)).unwrap();
        let result: Result<Value> = client
            .post_json(&join_url(&server.uri(), "garbage"), &[], &json!({}))
            .await;

        assert!(matches!(
            result,
            Err(RetrievalError::MalformedResponse { .. })
        ));
    }
}
