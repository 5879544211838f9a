//! Resumable HTTP fetcher.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use ggchat_core::ports::model_fetcher::{FetchError, ModelFetcherPort, partial_path};
use reqwest::{StatusCode, header};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::FetcherConfig;
use crate::disk::available_space;
use crate::progress::{ProgressThrottle, percent};

/// Outcome of a single failed transfer attempt.
struct AttemptFailure {
    error: FetchError,
    retryable: bool,
}

impl AttemptFailure {
    const fn transient(error: FetchError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    const fn fatal(error: FetchError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

impl From<std::io::Error> for AttemptFailure {
    fn from(err: std::io::Error) -> Self {
        Self::fatal(err.into())
    }
}

/// Downloads repository files over HTTP(S) with range resume.
pub struct HttpModelFetcher {
    client: reqwest::Client,
    resolve_root: Url,
    token: Option<String>,
    max_retries: u8,
    retry_base_delay: Duration,
    progress_interval: Duration,
}

impl HttpModelFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        // Connect timeout only; bodies are multi-gigabyte.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let root = if config.resolve_url.ends_with('/') {
            config.resolve_url.clone()
        } else {
            format!("{}/", config.resolve_url)
        };
        let resolve_root =
            Url::parse(&root).map_err(|e| FetchError::Network(format!("invalid URL: {e}")))?;

        Ok(Self {
            client,
            resolve_root,
            token: config.token.clone(),
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
            progress_interval: config.progress_interval,
        })
    }

    fn file_url(&self, repo_id: &str, file_name: &str) -> Result<Url, FetchError> {
        self.resolve_root
            .join(&format!("{repo_id}/resolve/main/{file_name}"))
            .map_err(|e| FetchError::Network(format!("invalid URL: {e}")))
    }

    fn backoff(&self, attempt: u8) -> Duration {
        self.retry_base_delay
            .saturating_mul(2u32.saturating_pow(u32::from(attempt.saturating_sub(1))))
    }

    /// One request, appending to `part` from its current length.
    async fn attempt(&self, url: &Url, part: &Path) -> Result<(), AttemptFailure> {
        let offset = match fs::metadata(part).await {
            Ok(meta) => meta.len(),
            Err(_) => 0,
        };

        let mut request = self.client.get(url.as_str());
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        if offset > 0 {
            request = request.header(header::RANGE, format!("bytes={offset}-"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AttemptFailure::transient(FetchError::Network(e.to_string())))?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(AttemptFailure::fatal(FetchError::NotFound(url.to_string())));
        }
        if status == StatusCode::RANGE_NOT_SATISFIABLE {
            // The partial file no longer matches the remote; start over.
            fs::remove_file(part).await?;
            return Err(AttemptFailure::transient(FetchError::Network(
                "range not satisfiable, restarting".to_string(),
            )));
        }
        if !status.is_success() {
            let error = FetchError::Network(format!("server returned {status}"));
            return Err(if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                AttemptFailure::transient(error)
            } else {
                AttemptFailure::fatal(error)
            });
        }

        let resumed = offset > 0 && status == StatusCode::PARTIAL_CONTENT;
        let start = if resumed { offset } else { 0 };
        let remaining = response.content_length();

        if let Some(required) = remaining {
            check_space(part, required).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(resumed)
            .truncate(!resumed)
            .open(part)
            .await?;

        if resumed {
            info!(url = %url, offset, "Resuming download");
        }

        let total = remaining.map(|r| start + r);
        let mut written = start;
        let mut throttle = ProgressThrottle::new(self.progress_interval);
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                debug!(error = %e, "Body stream failed");
                AttemptFailure::transient(FetchError::Interrupted {
                    bytes_downloaded: written,
                })
            })?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;

            if throttle.should_emit() {
                match total {
                    Some(total) => debug!(
                        written,
                        total,
                        percent = percent(written, total),
                        "Download progress"
                    ),
                    None => debug!(written, "Download progress"),
                }
            }
        }
        file.flush().await?;

        if total.is_some_and(|total| written < total) {
            return Err(AttemptFailure::transient(FetchError::Interrupted {
                bytes_downloaded: written,
            }));
        }
        Ok(())
    }
}

/// Fails when the volume holding `part` cannot fit `required` more bytes.
async fn check_space(part: &Path, required: u64) -> Result<(), AttemptFailure> {
    let Some(dir) = part.parent().map(Path::to_path_buf) else {
        return Ok(());
    };
    let available = tokio::task::spawn_blocking(move || available_space(&dir))
        .await
        .ok()
        .flatten();
    match available {
        Some(available) if available < required => {
            Err(AttemptFailure::fatal(FetchError::InsufficientSpace {
                required,
                available,
            }))
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl ModelFetcherPort for HttpModelFetcher {
    async fn fetch_file(
        &self,
        repo_id: &str,
        file_name: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, FetchError> {
        let url = self.file_url(repo_id, file_name)?;
        let final_path = dest_dir.join(file_name);
        let part = partial_path(&final_path);
        fs::create_dir_all(dest_dir).await?;

        let mut attempt: u8 = 0;
        loop {
            match self.attempt(&url, &part).await {
                Ok(()) => break,
                Err(failure) if failure.retryable && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        repo = %repo_id,
                        file = %file_name,
                        attempt,
                        delay_ms = delay.as_millis(),
                        error = %failure.error,
                        "Download attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => return Err(failure.error),
            }
        }

        fs::rename(&part, &final_path).await?;
        info!(repo = %repo_id, file = %file_name, "Download finished");
        Ok(final_path)
    }
}
