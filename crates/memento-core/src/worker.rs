//! Enrichment worker pool (spec §4.5): a bounded queue drained by a
//! fixed number of OS threads, with recovery of stuck jobs on start
//! (spec §4.6).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::cancel::CancellationToken;
use crate::config::Config;
use crate::enrichment;
use crate::error::{Error, Result};
use crate::llm::{EmbeddingStore, LlmEmbeddingGenerator, LlmTextGenerator};
use crate::memory::MemoryStatus;
use crate::store::{EnrichmentUpdate, ListFilter, ListOptions, MemoryStore, Pagination};

/// One unit of enrichment work (spec §4.5).
#[derive(Clone)]
pub struct Job {
    pub memory_id: String,
    pub content: String,
    pub attempt: u32,
    pub embedding_only: bool,
    /// The caller's token at enqueue time (spec §5: "enrichment uses
    /// the *original* caller token for pipeline cancellation").
    pub token: CancellationToken,
}

/// Called once per job after the worker finishes it, from a worker
/// thread (spec §5: "callbacks must be safe to invoke from worker
/// threads").
pub type EnrichmentCallback = Arc<dyn Fn(&str) + Send + Sync>;

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis((attempt as u64).pow(2) * 100)
}

/// Owns the bounded job channel and the worker thread handles.
pub struct WorkerPool {
    sender: Sender<Job>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    shutting_down: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Starts `config.num_workers` threads draining the queue.
    pub fn start<S, T, E>(
        config: &Config,
        store: Arc<S>,
        text_gen: Arc<T>,
        embedding_gen: Arc<E>,
        embedding_store: Option<Arc<dyn EmbeddingStore>>,
        on_enrichment_complete: Option<EnrichmentCallback>,
    ) -> Self
    where
        S: MemoryStore + 'static,
        T: LlmTextGenerator + 'static,
        E: LlmEmbeddingGenerator + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded(config.queue_size);
        let shutting_down = Arc::new(AtomicBool::new(false));
        let max_retries = config.max_retries;

        let handles = (0..config.num_workers)
            .map(|_| {
                let receiver: Receiver<Job> = receiver.clone();
                let sender = sender.clone();
                let store = store.clone();
                let text_gen = text_gen.clone();
                let embedding_gen = embedding_gen.clone();
                let embedding_store = embedding_store.clone();
                let callback = on_enrichment_complete.clone();
                let shutting_down = shutting_down.clone();

                std::thread::spawn(move || {
                    for job in receiver.iter() {
                        run_job(&job, &*store, &*text_gen, &*embedding_gen, embedding_store.as_deref(), max_retries, &sender, &shutting_down);
                        if let Some(callback) = &callback {
                            callback(&job.memory_id);
                        }
                    }
                })
            })
            .collect();

        Self { sender, handles: Mutex::new(handles), shutting_down }
    }

    /// Non-blocking enqueue (spec §4.5: "fails fast on full").
    pub fn enqueue(&self, job: Job) -> Result<()> {
        match self.sender.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Error::QueueFull),
            Err(TrySendError::Disconnected(_)) => Err(Error::NotStarted),
        }
    }

    pub fn queue_size(&self) -> usize {
        self.sender.len()
    }

    /// Closes the queue, waits up to `timeout` for workers to drain,
    /// then abandons anything left (spec §5: recovered on next start).
    /// `token` lets a caller cut the drain short; a cancelled/expired
    /// token stops waiting immediately, same as the timeout elapsing.
    pub fn shutdown(self, timeout: Duration, token: &CancellationToken) {
        self.shutting_down.store(true, Ordering::SeqCst);
        drop(self.sender);

        let deadline = std::time::Instant::now() + timeout;
        let mut handles = self.handles.into_inner().unwrap();
        handles.retain(|h| !h.is_finished());
        for handle in handles {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() || token.is_cancelled() || token.is_expired() {
                break;
            }
            let _ = handle.join();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_job<S, T, E>(
    job: &Job,
    store: &S,
    text_gen: &T,
    embedding_gen: &E,
    embedding_store: Option<&dyn EmbeddingStore>,
    max_retries: u32,
    sender: &Sender<Job>,
    shutting_down: &AtomicBool,
) where
    S: MemoryStore,
    T: LlmTextGenerator,
    E: LlmEmbeddingGenerator,
{
    let now = Utc::now();

    if job.token.is_cancelled() || job.token.is_expired() {
        tracing::warn!(memory_id = %job.memory_id, "enrichment job cancelled before running");
        mark_failed(store, &job.memory_id, job.attempt, "cancelled");
        return;
    }

    let _ = store.update_status(&job.memory_id, MemoryStatus::Processing);

    if job.embedding_only {
        // The cancellation check above already decided whether to run at
        // all; this write always completes once started (spec §5: the
        // final status write is never itself subject to cancellation).
        finish_embedding_only(job, store, embedding_gen, embedding_store, now);
        return;
    }

    let Ok(Some(mut memory)) = store.get(&job.memory_id) else { return };
    let settings = store.get_connection_settings(&memory.domain).unwrap_or_else(|_| crate::memory::ConnectionSettings::new(&memory.domain));

    match enrichment::run(&mut memory, store, text_gen, &settings, now) {
        Ok(result) => {
            finish_success(job, store, embedding_gen, embedding_store, &mut memory, &result, now);
        }
        Err(err)
            if job.attempt < max_retries
                && !shutting_down.load(Ordering::SeqCst)
                && !job.token.is_cancelled()
                && !job.token.is_expired() =>
        {
            tracing::warn!(memory_id = %job.memory_id, attempt = job.attempt + 1, %err, "enrichment stage failed, retrying");
            std::thread::sleep(backoff(job.attempt + 1));
            let retry = Job { attempt: job.attempt + 1, ..job.clone() };
            if sender.try_send(retry).is_err() {
                mark_failed(store, &job.memory_id, job.attempt + 1, &err.to_string());
            }
        }
        Err(err) => mark_failed(store, &job.memory_id, job.attempt + 1, &err.to_string()),
    }
}

fn mark_failed<S: MemoryStore>(store: &S, memory_id: &str, attempts: u32, error: &str) {
    tracing::warn!(memory_id, attempts, error, "enrichment job failed permanently");
    let update = EnrichmentUpdate {
        status: Some(MemoryStatus::Failed),
        error: Some(Some(error.to_string())),
        attempts: Some(attempts),
        ..Default::default()
    };
    let _ = store.update_enrichment(memory_id, &update);
}

fn finish_embedding_only<S, E>(job: &Job, store: &S, embedding_gen: &E, embedding_store: Option<&dyn EmbeddingStore>, now: chrono::DateTime<Utc>)
where
    S: MemoryStore,
    E: LlmEmbeddingGenerator,
{
    let embedding = match embedding_gen.embed(&job.content) {
        Ok(vector) => {
            let dimension = vector.len();
            let model = embedding_gen.model().to_string();
            if let Some(embedding_store) = embedding_store {
                let _ = embedding_store.store_embedding(&job.memory_id, &vector, dimension, &model);
            }
            Some(crate::memory::EmbeddingMeta { vector, dimension, model })
        }
        Err(_) => None,
    };
    let update = EnrichmentUpdate {
        status: Some(MemoryStatus::Enriched),
        embedding: Some(embedding),
        enriched_at: Some(now),
        ..Default::default()
    };
    let _ = store.update_enrichment(&job.memory_id, &update);
}

fn finish_success<S, E>(
    job: &Job,
    store: &S,
    embedding_gen: &E,
    embedding_store: Option<&dyn EmbeddingStore>,
    memory: &mut crate::memory::Memory,
    result: &enrichment::PipelineResult,
    now: chrono::DateTime<Utc>,
) where
    S: MemoryStore,
    E: LlmEmbeddingGenerator,
{
    memory.enrichment.embedding = crate::memory::SubStatus::Processing;
    let embedding = match embedding_gen.embed(&memory.content) {
        Ok(vector) => {
            let dimension = vector.len();
            let model = embedding_gen.model().to_string();
            if let Some(embedding_store) = embedding_store {
                let _ = embedding_store.store_embedding(&memory.id, &vector, dimension, &model);
            }
            memory.enrichment.embedding = crate::memory::SubStatus::Completed;
            Some(crate::memory::EmbeddingMeta { vector, dimension, model })
        }
        Err(_) => {
            memory.enrichment.embedding = crate::memory::SubStatus::Failed;
            None
        }
    };

    let error_text = [&result.entity, &result.relationship, &result.classification, &result.summary]
        .into_iter()
        .find_map(|stage| stage.error.clone());

    let update = EnrichmentUpdate {
        status: Some(MemoryStatus::Enriched),
        enrichment: Some(memory.enrichment),
        attempts: Some(job.attempt + 1),
        error: Some(error_text),
        enriched_at: Some(now),
        embedding: Some(embedding),
    };
    let _ = store.update_enrichment(&job.memory_id, &update);
}

/// Scans for `status = pending` memories in batches and re-enqueues
/// them; anything that can't be enqueued is marked `failed` (spec
/// §4.6). Intended to run on a background thread so `start()` returns
/// promptly.
pub fn recover<S: MemoryStore>(store: &S, pool: &WorkerPool, batch_size: usize) {
    let options = ListOptions {
        filter: ListFilter { status: Some(MemoryStatus::Pending), ..Default::default() },
        pagination: Pagination { page: 1, limit: batch_size },
        ..Default::default()
    };
    let Ok(page) = store.list(&options) else { return };
    tracing::info!(count = page.items.len(), "recovering pending memories");
    for memory in page.items {
        let job = Job { memory_id: memory.id.clone(), content: memory.content.clone(), attempt: 0, embedding_only: false, token: CancellationToken::new() };
        if pool.enqueue(job).is_err() {
            let _ = store.update_status(&memory.id, MemoryStatus::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_quadratically() {
        assert_eq!(backoff(1), Duration::from_millis(100));
        assert_eq!(backoff(2), Duration::from_millis(400));
        assert_eq!(backoff(3), Duration::from_millis(900));
    }
}
