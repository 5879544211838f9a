//! Model runtime manager - owns the single loaded inference engine.
//!
//! One async mutex guards the engine slot. Loading, swapping and generating
//! all hold it, so generations queue behind each other and behind swaps.
//! The previous engine is released before the next one is constructed; a
//! construction that fails, times out or is cancelled leaves the slot empty.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use super::model_catalog::ModelCatalog;
use crate::domain::{
    GeneratedText, GenerationSettings, REPEAT_PENALTY, STOP_SEQUENCES, truncate_at_stop,
};
use crate::ports::{
    AcceleratorProbe, CompletionRequest, CoreError, EngineConfig, EngineError, EngineFactory,
    InferenceEngine,
};

/// Layer count llama.cpp treats as "offload everything".
pub const FULL_OFFLOAD_LAYERS: u32 = 99;

const GIB: u64 = 1024 * 1024 * 1024;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub context_length: u32,
    /// Explicit thread count; `None` uses half the logical cores.
    pub threads: Option<usize>,
    pub load_timeout: Duration,
    pub generate_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            context_length: 2048,
            threads: None,
            load_timeout: Duration::from_secs(300),
            generate_timeout: Duration::from_secs(600),
        }
    }
}

impl RuntimeConfig {
    fn thread_count(&self) -> usize {
        self.threads
            .filter(|t| *t > 0)
            .unwrap_or_else(|| default_thread_count(num_cpus::get()))
    }
}

/// Snapshot of the runtime session for status reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuntimeStatus {
    pub loaded_model: Option<String>,
    pub model_path: Option<PathBuf>,
    pub context_length: Option<u32>,
    pub gpu_layers: Option<u32>,
    pub threads: Option<usize>,
}

struct LoadedEngine {
    model_name: String,
    path: PathBuf,
    config: EngineConfig,
    engine: Box<dyn InferenceEngine>,
}

pub struct ModelRuntimeManager {
    catalog: Arc<ModelCatalog>,
    factory: Arc<dyn EngineFactory>,
    accelerator: Arc<dyn AcceleratorProbe>,
    config: RuntimeConfig,
    session: Mutex<Option<LoadedEngine>>,
    status: RwLock<RuntimeStatus>,
}

impl ModelRuntimeManager {
    pub fn new(
        catalog: Arc<ModelCatalog>,
        factory: Arc<dyn EngineFactory>,
        accelerator: Arc<dyn AcceleratorProbe>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            catalog,
            factory,
            accelerator,
            config,
            session: Mutex::new(None),
            status: RwLock::new(RuntimeStatus::default()),
        }
    }

    /// Make `name` the loaded model.
    ///
    /// A no-op when the resolved path is already loaded.
    pub async fn ensure_loaded(&self, name: &str) -> Result<(), CoreError> {
        let path = self.catalog.resolve_path(name).await?;
        let mut session = self.session.lock().await;
        self.load_locked(&mut session, name, path).await
    }

    /// Generate with whatever model is loaded.
    pub async fn generate(
        &self,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<GeneratedText, CoreError> {
        let mut session = self.session.lock().await;
        self.generate_locked(&mut session, prompt, settings).await
    }

    /// Generate with `name`, loading it first if another model took its place.
    ///
    /// The check and the generation share one critical section, so a swap
    /// requested by a concurrent query cannot slip in between.
    pub async fn generate_with(
        &self,
        name: &str,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<GeneratedText, CoreError> {
        let path = self.catalog.resolve_path(name).await?;
        let mut session = self.session.lock().await;
        self.load_locked(&mut session, name, path).await?;
        self.generate_locked(&mut session, prompt, settings).await
    }

    pub async fn status(&self) -> RuntimeStatus {
        self.status.read().await.clone()
    }

    /// Release the loaded engine, if any.
    pub async fn unload(&self) {
        let mut session = self.session.lock().await;
        self.discard_locked(&mut session).await;
    }

    async fn load_locked(
        &self,
        session: &mut Option<LoadedEngine>,
        name: &str,
        path: PathBuf,
    ) -> Result<(), CoreError> {
        if let Some(current) = session.as_mut() {
            if current.path == path {
                if current.engine.is_alive() {
                    debug!(model = %name, "Model already loaded");
                    return Ok(());
                }
                warn!(model = %name, "Loaded engine is no longer running, reloading");
            }
        }

        self.discard_locked(session).await;

        let config = EngineConfig {
            model_path: path.clone(),
            context_length: self.config.context_length,
            threads: self.config.thread_count(),
            gpu_layers: self.detect_gpu_layers().await,
        };
        info!(
            model = %name,
            gpu_layers = config.gpu_layers,
            threads = config.threads,
            context_length = config.context_length,
            "Loading model"
        );

        let engine = match tokio::time::timeout(
            self.config.load_timeout,
            self.factory.construct(&config),
        )
        .await
        {
            Ok(Ok(engine)) => engine,
            Ok(Err(e)) => {
                error!(model = %name, path = %path.display(), error = %e, "Model load failed");
                return Err(CoreError::LoadFailure {
                    model: name.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                error!(model = %name, timeout = ?self.config.load_timeout, "Model load timed out");
                return Err(CoreError::LoadFailure {
                    model: name.to_string(),
                    reason: format!("timed out after {:?}", self.config.load_timeout),
                });
            }
        };

        *self.status.write().await = RuntimeStatus {
            loaded_model: Some(name.to_string()),
            model_path: Some(path.clone()),
            context_length: Some(config.context_length),
            gpu_layers: Some(config.gpu_layers),
            threads: Some(config.threads),
        };
        *session = Some(LoadedEngine {
            model_name: name.to_string(),
            path,
            config,
            engine,
        });
        info!(model = %name, "Model loaded");
        Ok(())
    }

    async fn generate_locked(
        &self,
        session: &mut Option<LoadedEngine>,
        prompt: &str,
        settings: &GenerationSettings,
    ) -> Result<GeneratedText, CoreError> {
        let loaded = session.as_mut().ok_or(CoreError::EngineNotReady)?;
        let request = CompletionRequest {
            prompt: prompt.to_string(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            stop: STOP_SEQUENCES.iter().map(ToString::to_string).collect(),
            repeat_penalty: REPEAT_PENALTY,
        };

        let completion = match tokio::time::timeout(
            self.config.generate_timeout,
            loaded.engine.generate(&request),
        )
        .await
        {
            Ok(Ok(completion)) => completion,
            Ok(Err(e @ EngineError::Dead(_))) => {
                error!(model = %loaded.model_name, error = %e, "Engine died during generation");
                self.discard_locked(session).await;
                return Err(CoreError::Generation(e.to_string()));
            }
            Ok(Err(e)) => {
                error!(model = %loaded.model_name, error = %e, "Generation failed");
                return Err(CoreError::Generation(e.to_string()));
            }
            Err(_) => {
                error!(
                    model = %loaded.model_name,
                    timeout = ?self.config.generate_timeout,
                    "Generation timed out"
                );
                return Err(CoreError::Generation(format!(
                    "timed out after {:?}",
                    self.config.generate_timeout
                )));
            }
        };

        let text = truncate_at_stop(&completion.text, STOP_SEQUENCES)
            .trim()
            .to_string();
        if completion.usage.is_none() {
            debug!(model = %loaded.model_name, "Engine reported no token usage");
        }
        Ok(GeneratedText {
            text,
            usage: completion.usage.unwrap_or_default(),
        })
    }

    /// Release whatever is in the slot and clear the reported status.
    async fn discard_locked(&self, session: &mut Option<LoadedEngine>) {
        if let Some(previous) = session.take() {
            self.release(previous).await;
            *self.status.write().await = RuntimeStatus::default();
        }
    }

    async fn release(&self, mut previous: LoadedEngine) {
        info!(
            model = %previous.model_name,
            gpu_layers = previous.config.gpu_layers,
            "Releasing model"
        );
        if let Err(e) = previous.engine.release().await {
            warn!(model = %previous.model_name, error = %e, "Engine release reported an error");
        }
    }

    async fn detect_gpu_layers(&self) -> u32 {
        let probe = Arc::clone(&self.accelerator);
        let detected = tokio::task::spawn_blocking(move || {
            if !probe.is_available() {
                return Ok(None);
            }
            probe.total_memory_bytes().map(Some)
        })
        .await;

        match detected {
            Ok(Ok(memory)) => gpu_layers_for_memory(memory),
            Ok(Err(e)) => {
                warn!(error = %e, "Accelerator detection failed, running on CPU");
                0
            }
            Err(e) => {
                warn!(error = %e, "Accelerator probe panicked, running on CPU");
                0
            }
        }
    }
}

/// Offloaded layer count for the given accelerator memory.
///
/// Monotonic step function: no accelerator means 0, anything at or above
/// 16 GiB offloads every layer.
pub const fn gpu_layers_for_memory(memory_bytes: Option<u64>) -> u32 {
    let Some(bytes) = memory_bytes else {
        return 0;
    };
    if bytes >= 16 * GIB {
        FULL_OFFLOAD_LAYERS
    } else if bytes >= 12 * GIB {
        40
    } else if bytes >= 8 * GIB {
        32
    } else if bytes >= 6 * GIB {
        24
    } else if bytes >= 4 * GIB {
        16
    } else if bytes >= 2 * GIB {
        8
    } else {
        0
    }
}

/// Half the logical cores, at least one.
pub const fn default_thread_count(logical_cores: usize) -> usize {
    let half = logical_cores / 2;
    if half == 0 { 1 } else { half }
}
