//! Core of the ggchat inference server.
//!
//! Holds the domain model (chats, messages, model descriptors, generation
//! settings), the port traits adapters implement, and the services that
//! orchestrate them: model catalog, runtime manager, conversation store,
//! prompt assembly and the per-query orchestrator.

pub mod domain;
pub mod paths;
pub mod ports;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types for convenience
pub use domain::{
    CURATED_MODELS, Chat, CuratedModel, GeneratedText, GenerationParams, GenerationSettings,
    Message, Modality, ModelDescriptor, NewChat, NewMessage, Sender, SettingsError, TokenUsage,
};
pub use ports::{
    AcceleratorError, AcceleratorProbe, ChatHistoryError, ChatHistoryRepository, Completion,
    CompletionRequest, CoreError, EngineConfig, EngineError, EngineFactory, FetchError,
    HfCandidate, HfClientPort, HfFileInfo, HfPortError, InferenceEngine, ModelFetcherPort, Repos,
    RepositoryError, SettingsRepository,
};
pub use services::{
    AppCore, CatalogConfig, ConversationStore, CoreConfig, CoreDeps, GenerationSettingsService,
    ModelCatalog, ModelRuntimeManager, PromptAssembler, QueryOrchestrator, QueryRequest,
    QueryResponse, RuntimeConfig, RuntimeStatus,
};

// Path utilities
pub use paths::{
    DataDirResolution, DirSource, ModelsDirResolution, PathError, data_root, database_path,
    ensure_directory, resolve_data_dir, resolve_models_dir,
};
