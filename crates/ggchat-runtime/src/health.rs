//! Readiness polling for llama-server.

use std::time::{Duration, Instant};

use tokio::process::Child;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::error::RuntimeError;

/// Poll `{base_url}/health` until it answers 200.
///
/// llama-server answers 503 while the model is still loading. Fails early
/// when `child` exits, and with [`RuntimeError::StartupTimeout`] after
/// `timeout`.
pub async fn wait_for_http_health(
    client: &reqwest::Client,
    base_url: &str,
    mut child: Option<&mut Child>,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), RuntimeError> {
    let health_url = format!("{base_url}/health");
    info!(url = %health_url, "Waiting for llama-server to be ready");
    let started = Instant::now();

    loop {
        if let Some(child) = child.as_deref_mut() {
            if let Ok(Some(status)) = child.try_wait() {
                return Err(RuntimeError::Exited {
                    status: status.to_string(),
                });
            }
        }

        match client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => {
                info!(
                    url = %health_url,
                    elapsed_ms = started.elapsed().as_millis(),
                    "llama-server is ready"
                );
                return Ok(());
            }
            Ok(response) => {
                debug!(status = %response.status(), "Health check not ready, retrying");
            }
            Err(e) => {
                debug!(error = %e, "Health check failed, retrying");
            }
        }

        if started.elapsed() >= timeout {
            return Err(RuntimeError::StartupTimeout {
                secs: timeout.as_secs(),
            });
        }
        sleep(poll_interval).await;
    }
}
