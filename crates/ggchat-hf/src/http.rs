//! HTTP backend abstraction for the Hugging Face API.
//!
//! The production backend uses reqwest with automatic retry for transient
//! errors. Tests inject [`testing::FakeBackend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode, header};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::HfClientConfig;
use crate::error::{HfError, HfResult};

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Trait for HTTP backends used by the client.
///
/// This is an implementation detail - external code should use the
/// `HfClientPort` trait.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Fetch JSON from a URL and deserialize it.
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> HfResult<T>;

    /// Size advertised by a metadata (HEAD) request, if any.
    async fn head_size(&self, url: &Url) -> HfResult<Option<u64>>;
}

// ============================================================================
// Retry policy
// ============================================================================

/// Delay before retry number `attempt` (1-based).
pub fn backoff_delay(base_ms: u64, attempt: u8) -> Duration {
    let exponent = u32::from(attempt.saturating_sub(1));
    Duration::from_millis(base_ms.saturating_mul(2u64.saturating_pow(exponent)))
}

/// Server errors and throttling are worth another attempt.
pub fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest with retry logic.
pub struct ReqwestBackend {
    client: reqwest::Client,
    max_retries: u8,
    retry_base_delay_ms: u64,
    auth_token: Option<String>,
}

impl ReqwestBackend {
    pub fn new(config: &HfClientConfig) -> HfResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_base_delay_ms: u64::try_from(config.retry_base_delay.as_millis())
                .unwrap_or(u64::MAX),
            auth_token: config.token.clone(),
        })
    }

    /// Build a request with optional authentication.
    fn build_request(&self, method: Method, url: &Url) -> reqwest::RequestBuilder {
        let mut request = self.client.request(method, url.as_str());
        if let Some(ref token) = self.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// Send a request with automatic retry for transient errors.
    async fn send_with_retry(&self, method: Method, url: &Url) -> HfResult<reqwest::Response> {
        let mut last_error: Option<HfError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = backoff_delay(self.retry_base_delay_ms, attempt);
                debug!(url = %url, attempt, delay_ms = delay.as_millis(), "Retrying hub request");
                tokio::time::sleep(delay).await;
            }

            match self.build_request(method.clone(), url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let error = HfError::ApiRequestFailed {
                        status: status.as_u16(),
                        url: url.to_string(),
                    };
                    if is_retryable(status) && attempt < self.max_retries {
                        last_error = Some(error);
                        continue;
                    }
                    // 4xx errors or final attempt - fail immediately
                    return Err(error);
                }
                Err(e) => {
                    // Network errors are retryable
                    if attempt < self.max_retries {
                        last_error = Some(e.into());
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| HfError::InvalidResponse {
            message: "Unknown error during fetch".to_string(),
        }))
    }
}

fn header_u64(headers: &header::HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> HfResult<T> {
        let response = self.send_with_retry(Method::GET, url).await?;
        let data: T = response.json().await?;
        Ok(data)
    }

    async fn head_size(&self, url: &Url) -> HfResult<Option<u64>> {
        let response = self.send_with_retry(Method::HEAD, url).await?;
        let headers = response.headers();
        // LFS files report their real size here; content-length may be the
        // redirect body.
        Ok(header_u64(headers, "x-linked-size")
            .or_else(|| header_u64(headers, header::CONTENT_LENGTH.as_str())))
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Canned response for the fake backend.
    #[derive(Clone)]
    pub enum CannedResponse {
        Json(serde_json::Value),
        Size(Option<u64>),
        Status(u16),
    }

    /// A fake HTTP backend returning canned responses by URL substring.
    #[derive(Default)]
    pub struct FakeBackend {
        responses: Mutex<Vec<(String, CannedResponse)>>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Add a canned response for URLs containing `url_contains`.
        /// Earlier registrations win.
        pub fn with_response(self, url_contains: &str, response: CannedResponse) -> Self {
            self.responses
                .lock()
                .unwrap()
                .push((url_contains.to_string(), response));
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }

        fn find(&self, url: &Url) -> HfResult<CannedResponse> {
            self.requests.lock().unwrap().push(url.to_string());
            let responses = self.responses.lock().unwrap();
            let found = responses
                .iter()
                .find(|(pattern, _)| url.as_str().contains(pattern.as_str()))
                .map(|(_, r)| r.clone());
            match found {
                Some(CannedResponse::Status(status)) => Err(HfError::ApiRequestFailed {
                    status,
                    url: url.to_string(),
                }),
                Some(other) => Ok(other),
                None => Err(HfError::ApiRequestFailed {
                    status: 404,
                    url: url.to_string(),
                }),
            }
        }
    }

    #[async_trait]
    impl HttpBackend for FakeBackend {
        async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> HfResult<T> {
            match self.find(url)? {
                CannedResponse::Json(json) => Ok(serde_json::from_value(json)?),
                _ => Err(HfError::InvalidResponse {
                    message: "expected JSON".to_string(),
                }),
            }
        }

        async fn head_size(&self, url: &Url) -> HfResult<Option<u64>> {
            match self.find(url)? {
                CannedResponse::Size(size) => Ok(size),
                _ => Ok(None),
            }
        }
    }
}
