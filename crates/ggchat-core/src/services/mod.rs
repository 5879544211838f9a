//! Core services - the application's business logic layer.
//!
//! Services orchestrate between ports (trait interfaces) and domain logic.
//! They never see concrete adapters.

mod app_core;
mod conversation;
pub mod model_catalog;
pub mod prompt;
mod query;
pub mod runtime_manager;
mod settings_service;

pub use app_core::{AppCore, CoreConfig, CoreDeps};
pub use conversation::ConversationStore;
pub use model_catalog::{CatalogConfig, ModelCatalog};
pub use prompt::{PromptAssembler, build_prompt};
pub use query::{QueryOrchestrator, QueryRequest, QueryResponse};
pub use runtime_manager::{ModelRuntimeManager, RuntimeConfig, RuntimeStatus, gpu_layers_for_memory};
pub use settings_service::GenerationSettingsService;
