//! Axum server bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the HTTP adapter. All concrete implementations are instantiated here.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ggchat_core::paths::{database_path, ensure_directory, resolve_data_dir, resolve_models_dir};
use ggchat_core::{AppCore, CatalogConfig, CoreConfig, CoreDeps, RuntimeConfig};
use ggchat_db::{CoreFactory, setup_database};
use ggchat_download::{FetcherConfig, HttpModelFetcher};
use ggchat_hf::{DefaultHfClient, HfClientConfig};
use ggchat_runtime::{DefaultAcceleratorProbe, LlamaServerConfig, LlamaServerFactory};
use tokio::net::TcpListener;
use tracing::info;

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

/// Server configuration, read from flags and the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "ggchat-server", version, about = "Local GGUF chat inference server")]
pub struct ServerConfig {
    /// Port for the HTTP server.
    #[arg(long, env = "GGCHAT_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Directory holding the database. Falls back to `GGCHAT_DATA_DIR`, then
    /// the platform data directory.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory holding model weights. Falls back to `GGCHAT_MODELS_DIR`,
    /// then `<data dir>/models`.
    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    /// Path to the llama-server binary.
    #[arg(long, env = "GGCHAT_LLAMA_SERVER", default_value = "llama-server")]
    pub llama_server_path: PathBuf,

    /// Context window passed to the engine.
    #[arg(long, default_value_t = 2048)]
    pub context_length: u32,

    /// Inference threads; defaults to half the logical cores.
    #[arg(long)]
    pub threads: Option<usize>,

    #[arg(long, default_value_t = 1800)]
    pub catalog_ttl_secs: u64,

    /// Remote repositories considered per catalog refresh.
    #[arg(long, default_value_t = 20)]
    pub remote_limit: u32,

    #[arg(long, default_value_t = 300)]
    pub load_timeout_secs: u64,

    #[arg(long, default_value_t = 600)]
    pub generate_timeout_secs: u64,

    /// Hugging Face access token for gated repositories.
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Origins allowed by CORS; all origins when empty.
    #[arg(long = "allowed-origin")]
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn cors(&self) -> CorsConfig {
        if self.allowed_origins.is_empty() {
            CorsConfig::AllowAll
        } else {
            CorsConfig::AllowOrigins(self.allowed_origins.clone())
        }
    }

    fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            context_length: self.context_length,
            threads: self.threads,
            load_timeout: Duration::from_secs(self.load_timeout_secs),
            generate_timeout: Duration::from_secs(self.generate_timeout_secs),
        }
    }
}

/// Bootstrap the core with all infrastructure adapters.
pub async fn bootstrap(config: &ServerConfig) -> Result<Arc<AppCore>> {
    let data_dir = resolve_data_dir(config.data_dir.as_deref())?;
    let models_dir = resolve_models_dir(config.models_dir.as_deref(), &data_dir.path)?;
    ensure_directory(&data_dir.path)?;
    ensure_directory(&models_dir.path)?;
    let db_path = database_path(&data_dir.path);

    info!(
        target: "ggchat.paths",
        database_path = %db_path.display(),
        data_dir = %data_dir.path.display(),
        data_source = ?data_dir.source,
        models_dir = %models_dir.path.display(),
        models_source = ?models_dir.source,
        llama_server_path = %config.llama_server_path.display(),
        "Bootstrap resolved paths"
    );

    // 1. Database pool with full schema setup
    let pool = setup_database(&db_path).await?;
    let repos = CoreFactory::build_repos(pool);

    // 2. Hub discovery and artifact fetching
    let hub = DefaultHfClient::new(
        &HfClientConfig::new().with_optional_token(config.hf_token.clone()),
    )
    .context("Failed to build Hugging Face client")?;
    let fetcher = HttpModelFetcher::new(
        &FetcherConfig::new().with_optional_token(config.hf_token.clone()),
    )
    .context("Failed to build model fetcher")?;

    // 3. Inference engine
    let engines = LlamaServerFactory::new(
        LlamaServerConfig::new(&config.llama_server_path)
            .with_startup_timeout(Duration::from_secs(config.load_timeout_secs)),
    )
    .context("Failed to build llama-server factory")?;

    let deps = CoreDeps {
        repos,
        hub: Arc::new(hub),
        fetcher: Arc::new(fetcher),
        engines: Arc::new(engines),
        accelerator: Arc::new(DefaultAcceleratorProbe::new()),
    };

    let catalog = CatalogConfig::new(models_dir.path)
        .with_ttl(Duration::from_secs(config.catalog_ttl_secs))
        .with_remote_limit(config.remote_limit);
    let mut core_config = CoreConfig::new(catalog);
    core_config.runtime = config.runtime_config();

    let core = Arc::new(AppCore::new(deps, core_config));

    // 4. Load persisted generation settings
    let settings = core.settings().reload().await?;
    info!(?settings, "Generation settings loaded");

    Ok(core)
}

/// Start the web server and serve until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let core = bootstrap(&config).await?;
    let app = crate::routes::create_router(Arc::clone(&core), &config.cors());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("ggchat server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, releasing loaded model");
    core.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
    }
}
