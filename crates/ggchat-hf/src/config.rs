//! Public configuration for the Hugging Face client.

use std::time::Duration;

/// Default API root for model queries.
pub const DEFAULT_API_URL: &str = "https://huggingface.co/api/models";

/// Default root for file downloads and metadata probes.
pub const DEFAULT_RESOLVE_URL: &str = "https://huggingface.co";

/// Configuration for the Hugging Face client.
///
/// # Example
///
/// ```
/// use ggchat_hf::HfClientConfig;
/// use std::time::Duration;
///
/// let config = HfClientConfig::new()
///     .with_timeout(Duration::from_secs(60))
///     .with_optional_token(std::env::var("HF_TOKEN").ok());
/// ```
#[derive(Debug, Clone)]
pub struct HfClientConfig {
    /// Base URL for the model API
    pub(crate) base_url: String,
    /// Base URL for `resolve` requests
    pub(crate) resolve_url: String,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Request timeout
    pub(crate) timeout: Duration,
    /// Optional bearer token
    pub(crate) token: Option<String>,
    /// Maximum number of retry attempts for transient errors
    pub(crate) max_retries: u8,
    /// Base delay for exponential backoff
    pub(crate) retry_base_delay: Duration,
}

impl Default for HfClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            resolve_url: DEFAULT_RESOLVE_URL.to_string(),
            user_agent: concat!("ggchat-hf/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            token: None,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl HfClientConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL for the model API.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the root used for file size probes.
    #[must_use]
    pub fn with_resolve_url(mut self, url: impl Into<String>) -> Self {
        self.resolve_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout. Defaults to 30 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set an optional token. Blank tokens are ignored.
    #[must_use]
    pub fn with_optional_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Set the maximum number of retry attempts. Defaults to 3.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay for exponential backoff. Defaults to 500ms.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}
