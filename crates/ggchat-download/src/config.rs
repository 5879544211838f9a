//! Fetcher configuration.

use std::time::Duration;

/// Default root that repository files are resolved against.
pub const DEFAULT_RESOLVE_URL: &str = "https://huggingface.co";

/// Configuration for [`HttpModelFetcher`](crate::HttpModelFetcher).
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    pub(crate) resolve_url: String,
    pub(crate) user_agent: String,
    pub(crate) connect_timeout: Duration,
    pub(crate) token: Option<String>,
    /// Extra attempts after the first one fails transiently.
    pub(crate) max_retries: u8,
    pub(crate) retry_base_delay: Duration,
    /// Interval between progress log lines.
    pub(crate) progress_interval: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            resolve_url: DEFAULT_RESOLVE_URL.to_string(),
            user_agent: concat!("ggchat-download/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout: Duration::from_secs(30),
            token: None,
            max_retries: 5,
            retry_base_delay: Duration::from_secs(1),
            progress_interval: Duration::from_secs(5),
        }
    }
}

impl FetcherConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

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

    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bearer token sent with every request. Blank tokens are ignored.
    #[must_use]
    pub fn with_optional_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    #[must_use]
    pub const fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }
}
