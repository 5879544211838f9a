//! `AppCore` - the primary application facade.
//!
//! This is the composition root for core services. Adapters receive an
//! `Arc<AppCore>` and reach every service through it; all mutable state
//! (catalog cache, engine slot, current settings) lives inside.

use std::sync::Arc;

use crate::ports::{AcceleratorProbe, EngineFactory, HfClientPort, ModelFetcherPort, Repos};

use super::model_catalog::CatalogConfig;
use super::prompt::{DEFAULT_MAX_HISTORY_PAIRS, DEFAULT_SYSTEM_PROMPT, PromptAssembler};
use super::runtime_manager::RuntimeConfig;
use super::{
    ConversationStore, GenerationSettingsService, ModelCatalog, ModelRuntimeManager,
    QueryOrchestrator,
};

/// Infrastructure implementations handed to the core.
#[derive(Clone)]
pub struct CoreDeps {
    pub repos: Repos,
    pub hub: Arc<dyn HfClientPort>,
    pub fetcher: Arc<dyn ModelFetcherPort>,
    pub engines: Arc<dyn EngineFactory>,
    pub accelerator: Arc<dyn AcceleratorProbe>,
}

/// Tunables for the core services.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub catalog: CatalogConfig,
    pub runtime: RuntimeConfig,
    pub system_prompt: String,
    pub max_history_pairs: usize,
}

impl CoreConfig {
    /// Defaults for everything except the models directory.
    pub fn new(catalog: CatalogConfig) -> Self {
        Self {
            catalog,
            runtime: RuntimeConfig::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_history_pairs: DEFAULT_MAX_HISTORY_PAIRS,
        }
    }
}

/// The core application facade.
///
/// # Example
///
/// ```ignore
/// let core = Arc::new(AppCore::new(deps, CoreConfig::new(CatalogConfig::new(models_dir))));
/// core.settings().reload().await?;
///
/// let chat = core.conversations().create_chat(None, None).await?;
/// let answer = core.queries().query(request).await?;
/// ```
pub struct AppCore {
    catalog: Arc<ModelCatalog>,
    runtime: Arc<ModelRuntimeManager>,
    conversations: Arc<ConversationStore>,
    settings: Arc<GenerationSettingsService>,
    queries: QueryOrchestrator,
}

impl AppCore {
    pub fn new(deps: CoreDeps, config: CoreConfig) -> Self {
        let catalog = Arc::new(ModelCatalog::new(config.catalog, deps.hub, deps.fetcher));
        let runtime = Arc::new(ModelRuntimeManager::new(
            Arc::clone(&catalog),
            deps.engines,
            deps.accelerator,
            config.runtime,
        ));
        let conversations = Arc::new(ConversationStore::new(deps.repos.chat_history));
        let settings = Arc::new(GenerationSettingsService::new(deps.repos.settings));
        let queries = QueryOrchestrator::new(
            Arc::clone(&conversations),
            Arc::clone(&runtime),
            Arc::clone(&settings),
            PromptAssembler::new(config.system_prompt, config.max_history_pairs),
        );

        Self {
            catalog,
            runtime,
            conversations,
            settings,
            queries,
        }
    }

    /// Access the model catalog.
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Access the runtime manager.
    pub fn runtime(&self) -> &ModelRuntimeManager {
        &self.runtime
    }

    /// Access the conversation store.
    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    /// Access the generation settings service.
    pub fn settings(&self) -> &GenerationSettingsService {
        &self.settings
    }

    /// Access the query orchestrator.
    pub const fn queries(&self) -> &QueryOrchestrator {
        &self.queries
    }

    /// Release the loaded engine. Called once on server shutdown.
    pub async fn shutdown(&self) {
        self.runtime.unload().await;
    }
}
