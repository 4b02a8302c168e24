//! Engine façade (spec §6 "Engine-facing API"): the single entry point
//! consumed by CLIs/servers, composing every other module over the
//! four collaborator traits.

use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::bounds::Bounds;
use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::contradiction::Contradiction;
use crate::decay;
use crate::error::{Error, Result};
use crate::graph::TemporalFilter;
use crate::inference::{self, ConnectionCandidate, InferOptions, Pattern};
use crate::llm::{EmbeddingStore, LlmEmbeddingGenerator, LlmTextGenerator, SearchProvider};
use crate::memory::{IngestInput, LifecycleState, Memory, MemorySource};
use crate::search::{self, ScoredResult, SearchOptions};
use crate::store::{ListOptions, MemoryStore, PaginatedResult};
use crate::trace::Trace;
use crate::worker::{self, EnrichmentCallback, Job, WorkerPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    NotStarted,
    Running,
    ShuttingDown,
}

/// Input to [`Engine::store`] (spec §6: "validates non-empty").
#[derive(Debug, Clone, Default)]
pub struct StoreRequest {
    pub content: String,
    pub domain: String,
    pub source: MemorySource,
    pub created_by: Option<String>,
    pub session_id: Option<String>,
    pub tags: Vec<String>,
}

/// Composes the store, LLM, embedding, and (optional) search
/// collaborators into the operations spec §6 describes.
pub struct Engine<S, T, E> {
    config: Config,
    store: Arc<S>,
    text_gen: Arc<T>,
    embedding_gen: Arc<E>,
    search_provider: Option<Arc<dyn SearchProvider>>,
    embedding_store: Option<Arc<dyn EmbeddingStore>>,
    state: RwLock<EngineState>,
    pool: RwLock<Option<WorkerPool>>,
    /// The token passed to [`Engine::start`], cloned into every job
    /// enqueued while running (spec §5: "enrichment uses the *original*
    /// caller token for pipeline cancellation").
    run_token: RwLock<CancellationToken>,
    on_memory_created: RwLock<Option<EnrichmentCallback>>,
    on_enrichment_started: RwLock<Option<EnrichmentCallback>>,
    on_enrichment_complete: RwLock<Option<EnrichmentCallback>>,
}

impl<S, T, E> Engine<S, T, E>
where
    S: MemoryStore + 'static,
    T: LlmTextGenerator + 'static,
    E: LlmEmbeddingGenerator + 'static,
{
    /// Validates `config` at construction (spec §6: "Invalid values
    /// fail at construction").
    pub fn new(config: Config, store: Arc<S>, text_gen: Arc<T>, embedding_gen: Arc<E>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            text_gen,
            embedding_gen,
            search_provider: None,
            embedding_store: None,
            state: RwLock::new(EngineState::NotStarted),
            pool: RwLock::new(None),
            run_token: RwLock::new(CancellationToken::new()),
            on_memory_created: RwLock::new(None),
            on_enrichment_started: RwLock::new(None),
            on_enrichment_complete: RwLock::new(None),
        })
    }

    pub fn with_search_provider(mut self, provider: Arc<dyn SearchProvider>) -> Self {
        self.search_provider = Some(provider);
        self
    }

    pub fn with_embedding_store(mut self, embedding_store: Arc<dyn EmbeddingStore>) -> Self {
        self.embedding_store = Some(embedding_store);
        self
    }

    pub fn on_memory_created(&self, callback: EnrichmentCallback) {
        *self.on_memory_created.write().unwrap() = Some(callback);
    }

    pub fn on_enrichment_started(&self, callback: EnrichmentCallback) {
        *self.on_enrichment_started.write().unwrap() = Some(callback);
    }

    pub fn on_enrichment_complete(&self, callback: EnrichmentCallback) {
        *self.on_enrichment_complete.write().unwrap() = Some(callback);
    }

    /// Starts the worker pool and kicks off background recovery (spec
    /// §4.6, §5). Fails if already started or if `token` is already
    /// cancelled/expired.
    pub fn start(&self, token: &CancellationToken) -> Result<()> {
        token.check()?;
        let mut state = self.state.write().unwrap();
        if *state != EngineState::NotStarted {
            return Err(Error::AlreadyStarted);
        }

        let inner_callback = self.on_enrichment_complete.read().unwrap().clone();
        let worker_pool = WorkerPool::start(
            &self.config,
            self.store.clone(),
            self.text_gen.clone(),
            self.embedding_gen.clone(),
            self.embedding_store.clone(),
            inner_callback,
        );

        let batch_size = self.config.recovery_batch_size;
        *self.pool.write().unwrap() = Some(worker_pool);
        *self.run_token.write().unwrap() = token.clone();
        *state = EngineState::Running;
        drop(state);

        if let Some(pool) = self.pool.read().unwrap().as_ref() {
            worker::recover(&*self.store, pool, batch_size);
        }
        tracing::info!(num_workers = self.config.num_workers, "engine started");
        Ok(())
    }

    /// Closes the queue, waits up to `shutdown_timeout`, abandons the
    /// rest (spec §5). `token` cancelling or expiring mid-drain cuts the
    /// wait short, same as the timeout elapsing.
    pub fn shutdown(&self, token: &CancellationToken) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if *state == EngineState::NotStarted {
            return Err(Error::NotStarted);
        }
        *state = EngineState::ShuttingDown;
        if let Some(pool) = self.pool.write().unwrap().take() {
            pool.shutdown(self.config.shutdown_timeout, token);
        }
        *self.run_token.write().unwrap() = CancellationToken::new();
        *state = EngineState::NotStarted;
        tracing::info!("engine shut down");
        Ok(())
    }

    pub fn queue_size(&self) -> usize {
        self.pool.read().unwrap().as_ref().map(|p| p.queue_size()).unwrap_or(0)
    }

    fn require_pool(&self) -> Result<()> {
        if *self.state.read().unwrap() != EngineState::Running {
            return Err(Error::NotStarted);
        }
        Ok(())
    }

    /// `Store(content) -> memory` (spec §6).
    pub fn store(&self, request: StoreRequest) -> Result<Memory> {
        if request.content.trim().is_empty() {
            return Err(Error::InvalidArgument("content must not be empty".to_string()));
        }
        if request.domain.trim().is_empty() {
            return Err(Error::InvalidArgument("domain must not be empty".to_string()));
        }

        let now = Utc::now();
        let domain = request.domain;
        let mut memory = Memory::new(
            IngestInput {
                content: request.content,
                domain: domain.clone(),
                source: request.source,
                timestamp: None,
                created_by: request.created_by,
                session_id: request.session_id,
                source_context: None,
                tags: request.tags,
                context_labels: Vec::new(),
            },
            now,
        );

        // Same domain, same content: the new ingest supersedes the old
        // one rather than duplicating it (spec §3).
        let superseded = self
            .store
            .find_by_content_hash(&domain, &memory.content_hash)
            .map_err(|e| Error::ExternalUnavailable(e.0))?;
        if let Some(existing) = &superseded {
            memory.supersedes_id = Some(existing.id.clone());
        }

        self.store.store(memory.clone()).map_err(|e| Error::ExternalUnavailable(e.0))?;

        if let Some(existing) = superseded {
            let _ = self.store.update_state(&existing.id, LifecycleState::Superseded, now);
        }

        if let Some(callback) = self.on_memory_created.read().unwrap().as_ref() {
            callback(&memory.id);
        }
        let _ = self.queue_enrichment_for_memory(&memory.id, &memory.content);
        Ok(memory)
    }

    pub fn get(&self, id: &str) -> Result<Option<Memory>> {
        self.store.get(id).map_err(|e| Error::ExternalUnavailable(e.0))
    }

    pub fn list(&self, options: &ListOptions) -> Result<PaginatedResult<Memory>> {
        self.store.list(options).map_err(|e| Error::ExternalUnavailable(e.0))
    }

    pub fn search(&self, options: SearchOptions) -> Result<Vec<ScoredResult>> {
        let mut trace = Trace::disabled();
        self.search_traced(options, &mut trace)
    }

    /// Traced variant (spec §4.12): events accumulate in `trace` only
    /// when it was constructed with [`Trace::enabled`].
    pub fn search_traced(&self, options: SearchOptions, trace: &mut Trace) -> Result<Vec<ScoredResult>> {
        search::search(&*self.store, self.search_provider.as_deref(), options, trace)
    }

    pub fn search_similar(&self, memory_id: &str, limit: usize) -> Result<Vec<ScoredResult>> {
        let mut trace = Trace::disabled();
        search::search_similar(&*self.store, self.search_provider.as_deref(), memory_id, limit, &mut trace)
    }

    pub fn infer_connections(&self, source_id: &str, options: InferOptions) -> Result<Vec<ConnectionCandidate>> {
        inference::infer_connections(&*self.store, source_id, options)
    }

    pub fn find_patterns(&self, domain: &str) -> Result<Vec<Pattern>> {
        inference::find_patterns(&*self.store, domain)
    }

    /// `UpdateConfidence(id)` (spec §6) — recomputes and writes back
    /// `importance` from the confidence scorer (spec §4.3).
    pub fn update_confidence(&self, id: &str) -> Result<f32> {
        let Some(mut memory) = self.get(id)? else {
            return Err(Error::NotFound(id.to_string()));
        };
        let score = crate::confidence::memory_confidence(&memory, Utc::now());
        memory.importance = score;
        self.store.update(&memory).map_err(|e| Error::ExternalUnavailable(e.0))?;
        Ok(score)
    }

    /// `ApplyDecay()` (spec §6) — delegates to the store's bulk decay
    /// sweep (spec §4.2, §6 `UpdateDecayScores`).
    pub fn apply_decay(&self) -> Result<usize> {
        self.store.update_decay_scores(Utc::now()).map_err(|e| Error::ExternalUnavailable(e.0))
    }

    /// `BoostMemory(id)` (spec §6) — applies the access boost and bumps
    /// the access counter.
    pub fn boost_memory(&self, id: &str) -> Result<f32> {
        let Some(mut memory) = self.get(id)? else {
            return Err(Error::NotFound(id.to_string()));
        };
        let now = Utc::now();
        memory.decay_score = decay::boost(memory.decay_score);
        self.store.update(&memory).map_err(|e| Error::ExternalUnavailable(e.0))?;
        self.store.increment_access_count(id, now).map_err(|e| Error::ExternalUnavailable(e.0))?;
        Ok(memory.decay_score)
    }

    pub fn detect_contradictions(&self, domain: &str, memory_id: Option<&str>) -> Result<Vec<Contradiction>> {
        crate::contradiction::detect_contradictions(&*self.store, domain, memory_id)
    }

    pub fn find_related(&self, source_id: &str, filter: TemporalFilter, bounds: Bounds, token: CancellationToken) -> (Vec<String>, bool) {
        crate::graph::find_related_bounded(&*self.store, source_id, filter, bounds, token)
    }

    /// `QueueEnrichmentForMemory(id, content) -> bool` (spec §6).
    pub fn queue_enrichment_for_memory(&self, id: &str, content: &str) -> Result<bool> {
        self.require_pool()?;
        if let Some(callback) = self.on_enrichment_started.read().unwrap().as_ref() {
            callback(id);
        }
        let token = self.run_token.read().unwrap().clone();
        let job = Job { memory_id: id.to_string(), content: content.to_string(), attempt: 0, embedding_only: false, token };
        match self.pool.read().unwrap().as_ref().unwrap().enqueue(job) {
            Ok(()) => Ok(true),
            Err(Error::QueueFull) => {
                let _ = self.store.update_status(id, crate::memory::MemoryStatus::Failed);
                Ok(false)
            }
            Err(other) => Err(other),
        }
    }

    /// `QueueEmbeddingForMemory(id, content) -> bool` (spec §6).
    pub fn queue_embedding_for_memory(&self, id: &str, content: &str) -> Result<bool> {
        self.require_pool()?;
        let token = self.run_token.read().unwrap().clone();
        let job = Job { memory_id: id.to_string(), content: content.to_string(), attempt: 0, embedding_only: true, token };
        match self.pool.read().unwrap().as_ref().unwrap().enqueue(job) {
            Ok(()) => Ok(true),
            Err(Error::QueueFull) => Ok(false),
            Err(other) => Err(other),
        }
    }

    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedding_gen.embed(text).map_err(|e| Error::ExternalUnavailable(e.0))
    }

    pub fn summarize(&self, prompt: &str) -> Result<String> {
        self.text_gen.complete(prompt).map_err(|e| Error::ExternalUnavailable(e.0))
    }

    pub fn update_lifecycle(&self, id: &str, next: LifecycleState) -> Result<()> {
        let Some(memory) = self.get(id)? else {
            return Err(Error::NotFound(id.to_string()));
        };
        if !memory.state.can_transition_to(next) {
            return Err(Error::InvalidArgument(format!("cannot transition from {} to {next}", memory.state)));
        }
        self.store.update_state(id, next, Utc::now()).map_err(|e| Error::ExternalUnavailable(e.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DeterministicEmbeddingGenerator, InMemoryStore, ScriptedTextGenerator};

    fn engine() -> Engine<InMemoryStore, ScriptedTextGenerator, DeterministicEmbeddingGenerator> {
        Engine::new(
            Config::default(),
            Arc::new(InMemoryStore::new()),
            Arc::new(ScriptedTextGenerator::new(Vec::new())),
            Arc::new(DeterministicEmbeddingGenerator::new(8)),
        )
        .unwrap()
    }

    #[test]
    fn store_rejects_empty_content() {
        let engine = engine();
        let err = engine.store(StoreRequest { content: "  ".to_string(), domain: "work".to_string(), ..Default::default() });
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn operations_before_start_report_not_started() {
        let engine = engine();
        let memory = engine.store(StoreRequest { content: "hello".to_string(), domain: "work".to_string(), ..Default::default() }).unwrap();
        assert_eq!(memory.status, crate::memory::MemoryStatus::Pending);
        assert!(matches!(engine.queue_enrichment_for_memory(&memory.id, "hello"), Err(Error::NotStarted)));
    }

    #[test]
    fn double_start_fails() {
        let engine = engine();
        let token = CancellationToken::background();
        engine.start(&token).unwrap();
        assert!(matches!(engine.start(&token), Err(Error::AlreadyStarted)));
        engine.shutdown(&token).unwrap();
    }

    #[test]
    fn same_domain_same_content_supersedes_prior_memory() {
        let engine = engine();
        let first = engine.store(StoreRequest { content: "hello".to_string(), domain: "work".to_string(), ..Default::default() }).unwrap();
        let second = engine.store(StoreRequest { content: "hello".to_string(), domain: "work".to_string(), ..Default::default() }).unwrap();

        assert_eq!(second.supersedes_id.as_deref(), Some(first.id.as_str()));
        let prior = engine.get(&first.id).unwrap().unwrap();
        assert_eq!(prior.state, LifecycleState::Superseded);
    }

    #[test]
    fn same_content_in_different_domains_does_not_supersede() {
        let engine = engine();
        let first = engine.store(StoreRequest { content: "hello".to_string(), domain: "work".to_string(), ..Default::default() }).unwrap();
        let second = engine.store(StoreRequest { content: "hello".to_string(), domain: "home".to_string(), ..Default::default() }).unwrap();

        assert!(second.supersedes_id.is_none());
        let prior = engine.get(&first.id).unwrap().unwrap();
        assert_ne!(prior.state, LifecycleState::Superseded);
    }

    #[test]
    fn invalid_lifecycle_transition_is_rejected() {
        let engine = engine();
        let memory = engine.store(StoreRequest { content: "hello".to_string(), domain: "work".to_string(), ..Default::default() }).unwrap();
        let err = engine.update_lifecycle(&memory.id, LifecycleState::Completed);
        assert!(matches!(err, Err(Error::InvalidArgument(_))));
    }
}
