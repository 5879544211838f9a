//! Spawns llama-server children.

use std::process::Stdio;

use async_trait::async_trait;
use ggchat_core::{EngineConfig, EngineError, EngineFactory, InferenceEngine};
use tokio::process::Command;
use tracing::{info, warn};

use super::LlamaServerConfig;
use super::engine::LlamaServerEngine;
use crate::error::RuntimeError;
use crate::health::wait_for_http_health;
use crate::process::{forward_output, free_port, shutdown_child};

/// [`EngineFactory`] that runs one llama-server per engine.
pub struct LlamaServerFactory {
    config: LlamaServerConfig,
    client: reqwest::Client,
}

impl LlamaServerFactory {
    pub fn new(config: LlamaServerConfig) -> Result<Self, RuntimeError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { config, client })
    }

    async fn spawn(&self, config: &EngineConfig) -> Result<LlamaServerEngine, RuntimeError> {
        if !tokio::fs::try_exists(&config.model_path)
            .await
            .unwrap_or(false)
        {
            return Err(RuntimeError::ModelMissing {
                path: config.model_path.clone(),
            });
        }

        let port = free_port().map_err(RuntimeError::PortUnavailable)?;
        let mut child = Command::new(&self.config.binary)
            .args(server_args(config, port))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(RuntimeError::Spawn)?;
        forward_output(&mut child, port);

        info!(
            model = %config.model_path.display(),
            port,
            pid = child.id(),
            gpu_layers = config.gpu_layers,
            "Spawned llama-server"
        );

        let base_url = format!("http://127.0.0.1:{port}");
        let ready = wait_for_http_health(
            &self.client,
            &base_url,
            Some(&mut child),
            self.config.startup_timeout,
            self.config.health_poll_interval,
        )
        .await;

        if let Err(e) = ready {
            warn!(port, error = %e, "llama-server failed to become ready");
            if let Err(shutdown) = shutdown_child(child).await {
                warn!(port, error = %shutdown, "Failed to stop llama-server");
            }
            return Err(e);
        }

        Ok(LlamaServerEngine::new(self.client.clone(), base_url, Some(child)))
    }
}

/// Command line for serving `config` on `port`.
pub fn server_args(config: &EngineConfig, port: u16) -> Vec<String> {
    vec![
        "-m".to_string(),
        config.model_path.to_string_lossy().into_owned(),
        "-c".to_string(),
        config.context_length.to_string(),
        "-t".to_string(),
        config.threads.to_string(),
        "-ngl".to_string(),
        config.gpu_layers.to_string(),
        "--host".to_string(),
        "127.0.0.1".to_string(),
        "--port".to_string(),
        port.to_string(),
    ]
}

#[async_trait]
impl EngineFactory for LlamaServerFactory {
    async fn construct(
        &self,
        config: &EngineConfig,
    ) -> Result<Box<dyn InferenceEngine>, EngineError> {
        match self.spawn(config).await {
            Ok(engine) => Ok(Box::new(engine)),
            Err(e) => Err(e.into_construct()),
        }
    }
}
