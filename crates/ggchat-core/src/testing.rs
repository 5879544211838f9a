//! In-memory fakes for every port.
//!
//! Available to this crate's tests and, behind the `test-utils` feature, to
//! adapter crates that want to exercise core services without a network,
//! a model file or an inference binary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::chat::{Chat, Message, NewChat, NewMessage, Sender};
use crate::domain::chat::{derive_title, is_placeholder_title};
use crate::domain::{GenerationSettings, TokenUsage};
use crate::ports::{
    AcceleratorError, AcceleratorProbe, ChatHistoryError, ChatHistoryRepository, Completion,
    CompletionRequest, EngineConfig, EngineError, EngineFactory, FetchError, HfCandidate,
    HfClientPort, HfFileInfo, HfPortError, InferenceEngine, ModelFetcherPort, RepositoryError,
    SettingsRepository, partial_path,
};

// ============================================================================
// Hub
// ============================================================================

/// Hub returning canned repositories in insertion order.
#[derive(Default)]
pub struct FakeHub {
    repos: Vec<(String, Vec<HfFileInfo>)>,
    probe_sizes: Mutex<HashMap<String, u64>>,
    failing: AtomicBool,
    candidate_calls: AtomicUsize,
}

impl FakeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a repository with `(path, listed size)` files.
    #[must_use]
    pub fn with_repo(mut self, repo_id: &str, files: &[(&str, Option<u64>)]) -> Self {
        let files = files
            .iter()
            .map(|(path, size)| HfFileInfo {
                path: (*path).to_string(),
                size: *size,
            })
            .collect();
        self.repos.push((repo_id.to_string(), files));
        self
    }

    pub fn set_probe_size(&self, file_name: &str, size: u64) {
        self.probe_sizes
            .lock()
            .unwrap()
            .insert(file_name.to_string(), size);
    }

    /// Make `list_candidates` fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn candidate_calls(&self) -> usize {
        self.candidate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HfClientPort for FakeHub {
    async fn list_candidates(
        &self,
        _tag: &str,
        limit: u32,
    ) -> Result<Vec<HfCandidate>, HfPortError> {
        self.candidate_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(HfPortError::Network("connection refused".to_string()));
        }
        Ok(self
            .repos
            .iter()
            .take(limit as usize)
            .map(|(id, _)| HfCandidate {
                id: id.clone(),
                downloads: 0,
            })
            .collect())
    }

    async fn list_files(&self, repo_id: &str) -> Result<Vec<HfFileInfo>, HfPortError> {
        self.repos
            .iter()
            .find(|(id, _)| id == repo_id)
            .map(|(_, files)| files.clone())
            .ok_or_else(|| HfPortError::NotFound(repo_id.to_string()))
    }

    async fn probe_file_size(&self, _repo_id: &str, file_name: &str) -> Option<u64> {
        self.probe_sizes.lock().unwrap().get(file_name).copied()
    }
}

// ============================================================================
// Fetcher
// ============================================================================

/// Fetcher that writes a small placeholder artifact.
#[derive(Default)]
pub struct FakeFetcher {
    fetches: AtomicUsize,
    failing: AtomicBool,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make fetches leave a partial file behind and fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelFetcherPort for FakeFetcher {
    async fn fetch_file(
        &self,
        _repo_id: &str,
        file_name: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let dest = dest_dir.join(file_name);
        if self.failing.load(Ordering::SeqCst) {
            tokio::fs::write(partial_path(&dest), b"GGUF-partial").await?;
            return Err(FetchError::Interrupted {
                bytes_downloaded: 12,
            });
        }
        tokio::fs::write(&dest, b"GGUF-fake-weights").await?;
        Ok(dest)
    }
}

// ============================================================================
// Accelerator
// ============================================================================

/// Probe reporting a fixed amount of accelerator memory.
pub struct FakeAccelerator {
    memory: Option<u64>,
    fail_detection: bool,
}

impl FakeAccelerator {
    /// No accelerator present.
    pub const fn none() -> Self {
        Self {
            memory: None,
            fail_detection: false,
        }
    }

    pub const fn with_memory(bytes: u64) -> Self {
        Self {
            memory: Some(bytes),
            fail_detection: false,
        }
    }

    /// Present, but memory detection errors.
    pub const fn broken() -> Self {
        Self {
            memory: Some(0),
            fail_detection: true,
        }
    }
}

impl AcceleratorProbe for FakeAccelerator {
    fn is_available(&self) -> bool {
        self.memory.is_some()
    }

    fn total_memory_bytes(&self) -> Result<u64, AcceleratorError> {
        if self.fail_detection {
            return Err(AcceleratorError::Detection("driver query failed".to_string()));
        }
        self.memory
            .ok_or_else(|| AcceleratorError::Detection("no accelerator".to_string()))
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Shared counters observed by tests.
#[derive(Default)]
pub struct EngineStats {
    constructs: AtomicUsize,
    releases: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
    generations: AtomicUsize,
    events: Mutex<Vec<String>>,
    last_config: Mutex<Option<EngineConfig>>,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl EngineStats {
    pub fn constructs(&self) -> usize {
        self.constructs.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Engines constructed and not yet dropped.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously live engines ever observed.
    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub fn generations(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }

    /// Ordered `construct:<file>` / `release:<file>` log.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_config(&self) -> Option<EngineConfig> {
        self.last_config.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned())
}

/// Factory producing [`FakeEngine`]s that share one [`EngineStats`].
pub struct FakeEngineFactory {
    stats: Arc<EngineStats>,
    reply: Mutex<String>,
    usage: Mutex<Option<TokenUsage>>,
    fail_construct: AtomicBool,
    fail_generate: Arc<AtomicBool>,
    construct_delay_ms: AtomicU64,
    latest_alive: Mutex<Option<Arc<AtomicBool>>>,
}

impl Default for FakeEngineFactory {
    fn default() -> Self {
        Self {
            stats: Arc::new(EngineStats::default()),
            reply: Mutex::new("4".to_string()),
            usage: Mutex::new(Some(TokenUsage {
                prompt_tokens: 12,
                completion_tokens: 1,
            })),
            fail_construct: AtomicBool::new(false),
            fail_generate: Arc::new(AtomicBool::new(false)),
            construct_delay_ms: AtomicU64::new(0),
            latest_alive: Mutex::new(None),
        }
    }
}

impl FakeEngineFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    /// Text every engine returns (before stop-sequence trimming).
    pub fn set_reply(&self, reply: &str) {
        *self.reply.lock().unwrap() = reply.to_string();
    }

    pub fn set_usage(&self, usage: Option<TokenUsage>) {
        *self.usage.lock().unwrap() = usage;
    }

    pub fn set_fail_construct(&self, fail: bool) {
        self.fail_construct.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_generate(&self, fail: bool) {
        self.fail_generate.store(fail, Ordering::SeqCst);
    }

    /// Make the most recently constructed engine behave as if its process exited.
    pub fn kill_latest(&self) {
        if let Some(alive) = self.latest_alive.lock().unwrap().as_ref() {
            alive.store(false, Ordering::SeqCst);
        }
    }

    pub fn set_construct_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.construct_delay_ms.store(millis, Ordering::SeqCst);
    }
}

#[async_trait]
impl EngineFactory for FakeEngineFactory {
    async fn construct(
        &self,
        config: &EngineConfig,
    ) -> Result<Box<dyn InferenceEngine>, EngineError> {
        let delay = self.construct_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_construct.load(Ordering::SeqCst) {
            return Err(EngineError::Construct("not a valid GGUF file".to_string()));
        }

        let label = file_label(&config.model_path);
        let now_live = self.stats.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_live.fetch_max(now_live, Ordering::SeqCst);
        self.stats.constructs.fetch_add(1, Ordering::SeqCst);
        self.stats.record(format!("construct:{label}"));
        *self.stats.last_config.lock().unwrap() = Some(config.clone());

        let alive = Arc::new(AtomicBool::new(true));
        *self.latest_alive.lock().unwrap() = Some(Arc::clone(&alive));

        Ok(Box::new(FakeEngine {
            label,
            stats: Arc::clone(&self.stats),
            reply: self.reply.lock().unwrap().clone(),
            usage: *self.usage.lock().unwrap(),
            fail_generate: Arc::clone(&self.fail_generate),
            alive,
        }))
    }
}

/// Engine handle produced by [`FakeEngineFactory`].
pub struct FakeEngine {
    label: String,
    stats: Arc<EngineStats>,
    reply: String,
    usage: Option<TokenUsage>,
    fail_generate: Arc<AtomicBool>,
    alive: Arc<AtomicBool>,
}

#[async_trait]
impl InferenceEngine for FakeEngine {
    async fn generate(&mut self, request: &CompletionRequest) -> Result<Completion, EngineError> {
        self.stats.generations.fetch_add(1, Ordering::SeqCst);
        *self.stats.last_request.lock().unwrap() = Some(request.clone());
        if !self.alive.load(Ordering::SeqCst) {
            return Err(EngineError::Dead("process exited".to_string()));
        }
        if self.fail_generate.load(Ordering::SeqCst) {
            return Err(EngineError::Generate("engine crashed".to_string()));
        }
        Ok(Completion {
            text: self.reply.clone(),
            usage: self.usage,
        })
    }

    async fn release(&mut self) -> Result<(), EngineError> {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
        self.stats.record(format!("release:{}", self.label));
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

impl Drop for FakeEngine {
    fn drop(&mut self) {
        self.stats.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Chat history
// ============================================================================

#[derive(Default)]
struct ChatTables {
    chats: Vec<Chat>,
    messages: Vec<Message>,
    next_message_id: i64,
    tick: u64,
}

impl ChatTables {
    fn stamp(&mut self) -> String {
        self.tick += 1;
        format!("2024-01-01 00:00:00.{:06}", self.tick)
    }
}

/// Chat history kept in memory, mirroring the `SQLite` repository's rules.
#[derive(Default)]
pub struct InMemoryChatHistory {
    tables: Mutex<ChatTables>,
    fail_assistant_appends: AtomicBool,
    fail_user_appends: AtomicBool,
}

impl InMemoryChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make appends of assistant messages fail with a database error.
    pub fn set_fail_assistant_appends(&self, fail: bool) {
        self.fail_assistant_appends.store(fail, Ordering::SeqCst);
    }

    /// Make appends of user messages fail with a database error.
    pub fn set_fail_user_appends(&self, fail: bool) {
        self.fail_user_appends.store(fail, Ordering::SeqCst);
    }

    pub fn message_count(&self) -> usize {
        self.tables.lock().unwrap().messages.len()
    }
}

#[async_trait]
impl ChatHistoryRepository for InMemoryChatHistory {
    async fn create_chat(&self, chat: NewChat) -> Result<Chat, ChatHistoryError> {
        let mut tables = self.tables.lock().unwrap();
        let stamp = tables.stamp();
        let created = Chat {
            id: chat.id,
            title: chat.title,
            model_used: chat.model_used,
            created_at: stamp.clone(),
            last_modified_at: stamp,
        };
        tables.chats.push(created.clone());
        Ok(created)
    }

    async fn get_chat(&self, id: &str) -> Result<Option<Chat>, ChatHistoryError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.chats.iter().find(|c| c.id == id).cloned())
    }

    async fn list_chats(&self) -> Result<Vec<Chat>, ChatHistoryError> {
        let tables = self.tables.lock().unwrap();
        let mut chats = tables.chats.clone();
        chats.sort_by(|a, b| b.last_modified_at.cmp(&a.last_modified_at));
        Ok(chats)
    }

    async fn append_message(&self, msg: NewMessage) -> Result<Message, ChatHistoryError> {
        let failing = match msg.sender {
            Sender::User => &self.fail_user_appends,
            Sender::Assistant => &self.fail_assistant_appends,
        };
        if failing.load(Ordering::SeqCst) {
            return Err(ChatHistoryError::Database("disk I/O error".to_string()));
        }
        if msg.content.trim().is_empty() {
            return Err(ChatHistoryError::EmptyContent);
        }

        let mut tables = self.tables.lock().unwrap();
        if !tables.chats.iter().any(|c| c.id == msg.chat_id) {
            return Err(ChatHistoryError::ChatNotFound(msg.chat_id));
        }

        let first_user = msg.sender == Sender::User
            && !tables
                .messages
                .iter()
                .any(|m| m.chat_id == msg.chat_id && m.sender == Sender::User);

        let stamp = tables.stamp();
        tables.next_message_id += 1;
        let message = Message {
            id: tables.next_message_id,
            chat_id: msg.chat_id.clone(),
            sender: msg.sender,
            content: msg.content,
            created_at: stamp.clone(),
        };
        tables.messages.push(message.clone());

        if let Some(chat) = tables.chats.iter_mut().find(|c| c.id == msg.chat_id) {
            chat.last_modified_at = stamp;
            if first_user && is_placeholder_title(&chat.title) {
                chat.title = derive_title(&message.content);
            }
        }
        Ok(message)
    }

    async fn list_messages(&self, chat_id: &str) -> Result<Vec<Message>, ChatHistoryError> {
        let tables = self.tables.lock().unwrap();
        if !tables.chats.iter().any(|c| c.id == chat_id) {
            return Err(ChatHistoryError::ChatNotFound(chat_id.to_string()));
        }
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect())
    }

    async fn delete_chat(&self, id: &str) -> Result<bool, ChatHistoryError> {
        let mut tables = self.tables.lock().unwrap();
        let before = tables.chats.len();
        tables.chats.retain(|c| c.id != id);
        if tables.chats.len() == before {
            return Ok(false);
        }
        tables.messages.retain(|m| m.chat_id != id);
        Ok(true)
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Default)]
pub struct InMemorySettings {
    stored: Mutex<Option<GenerationSettings>>,
    fail_saves: AtomicBool,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stored(settings: GenerationSettings) -> Self {
        Self {
            stored: Mutex::new(Some(settings)),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn stored(&self) -> Option<GenerationSettings> {
        *self.stored.lock().unwrap()
    }
}

#[async_trait]
impl SettingsRepository for InMemorySettings {
    async fn load_generation(&self) -> Result<Option<GenerationSettings>, RepositoryError> {
        Ok(*self.stored.lock().unwrap())
    }

    async fn save_generation(&self, settings: &GenerationSettings) -> Result<(), RepositoryError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage("database is locked".to_string()));
        }
        *self.stored.lock().unwrap() = Some(*settings);
        Ok(())
    }
}
