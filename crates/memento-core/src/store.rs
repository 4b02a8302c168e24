//! The memory store collaborator (spec §6).
//!
//! The concrete relational backend is explicitly out of scope; this
//! module only defines the trait the engine depends on, following the
//! `Send + Sync` trait + `Arc<T>` blanket-impl convention the pack uses
//! for its storage ports (e.g. `IDriftReader`, `IWorkspaceStorage`).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::{ConnectionSettings, Entity, Memory, MemoryStatus, Relationship};

/// Error surfaced by a `MemoryStore` implementation. The engine maps
/// this to `Error::ExternalUnavailable` at the boundary.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Sort key for `List` (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    CreatedAt,
    UpdatedAt,
    Importance,
    DecayScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SortOptions {
    pub by: SortBy,
    pub order: SortOrder,
}

/// `{page, limit}` pagination (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

/// Typed replacement for the observed status/domain/date-range filter
/// map (Open Question #1, resolved in SPEC_FULL.md §E.1): an unknown
/// status string is a construction-time error, not a silently-dropped
/// filter.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub status: Option<MemoryStatus>,
    pub domain: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    /// Soft-deleted rows are hidden from default listings (spec §3); set
    /// to include them anyway (e.g. for restore/purge tooling).
    pub include_deleted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub filter: ListFilter,
    pub sort: SortOptions,
    pub pagination: Pagination,
}

/// A page of results plus enough metadata to compute further pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// Fields written back after a worker finishes a job (spec §4.5 step 5).
#[derive(Debug, Clone, Default)]
pub struct EnrichmentUpdate {
    pub status: Option<MemoryStatus>,
    pub enrichment: Option<crate::memory::EnrichmentStatuses>,
    pub attempts: Option<u32>,
    pub error: Option<Option<String>>,
    pub enriched_at: Option<DateTime<Utc>>,
    pub embedding: Option<Option<crate::memory::EmbeddingMeta>>,
}

/// The relational store collaborator (spec §6).
pub trait MemoryStore: Send + Sync {
    fn store(&self, memory: Memory) -> StoreResult<()>;
    fn get(&self, id: &str) -> StoreResult<Option<Memory>>;
    fn list(&self, options: &ListOptions) -> StoreResult<PaginatedResult<Memory>>;
    /// The live (non-deleted) memory in `domain` with this `content_hash`,
    /// if any (spec §3: same-domain, same-content ingests supersede one
    /// another rather than duplicating).
    fn find_by_content_hash(&self, domain: &str, content_hash: &str) -> StoreResult<Option<Memory>>;
    fn update(&self, memory: &Memory) -> StoreResult<()>;
    /// Soft delete: sets `deleted_at`, hides the row from default listings.
    fn delete(&self, id: &str, now: DateTime<Utc>) -> StoreResult<()>;
    /// Hard delete, irrecoverable.
    fn purge(&self, id: &str) -> StoreResult<()>;
    fn restore(&self, id: &str) -> StoreResult<()>;
    fn update_status(&self, id: &str, status: MemoryStatus) -> StoreResult<()>;
    fn update_enrichment(&self, id: &str, update: &EnrichmentUpdate) -> StoreResult<()>;
    fn update_state(&self, id: &str, state: crate::memory::LifecycleState, now: DateTime<Utc>) -> StoreResult<()>;
    fn increment_access_count(&self, id: &str, now: DateTime<Utc>) -> StoreResult<()>;

    /// Memory-to-memory neighbors: shared-entity co-occurrence plus,
    /// when present, relationship evidence (spec §4.7).
    fn get_related_memories(&self, id: &str) -> StoreResult<Vec<String>>;
    fn get_memory_entities(&self, id: &str) -> StoreResult<Vec<Entity>>;
    /// Follows the `supersedes_id` chain from newest to oldest.
    fn get_evolution_chain(&self, id: &str) -> StoreResult<Vec<Memory>>;
    fn get_memories_by_relation_type(&self, id: &str, rel_type: &str) -> StoreResult<Vec<String>>;
    /// Recompute and persist `decay_score` for every live memory (C2);
    /// returns the number actually changed (skip-threshold applies).
    fn update_decay_scores(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    /// Upsert `(name, type)`; on conflict, update description/timestamp
    /// and return the authoritative ID (spec §4.4 stage 1).
    fn upsert_entity(&self, entity_type: &str, name: &str, description: Option<String>, now: DateTime<Utc>) -> StoreResult<Entity>;
    fn get_entity(&self, id: &str) -> StoreResult<Option<Entity>>;
    /// Link a memory to an entity; on conflict, increment frequency and
    /// take the max confidence (spec §3, §4.4 stage 1).
    fn link_memory_entity(&self, memory_id: &str, entity_id: &str, confidence: f32, now: DateTime<Utc>) -> StoreResult<()>;
    /// Upsert on `(source_id, target_id, type)`, storing confidence as `weight`.
    fn upsert_relationship(&self, relationship: Relationship) -> StoreResult<Relationship>;
    fn relationships_for_entity(&self, entity_id: &str) -> StoreResult<Vec<Relationship>>;
    fn relationships_for_domain(&self, domain: &str) -> StoreResult<Vec<Relationship>>;
    fn memory_ids_for_entity(&self, entity_id: &str) -> StoreResult<Vec<String>>;

    /// `unknown_type_stats(domain, type_name, count, first_seen, last_seen)` (spec §6).
    fn record_unknown_type(&self, domain: &str, type_name: &str, now: DateTime<Utc>) -> StoreResult<()>;
    fn get_connection_settings(&self, domain: &str) -> StoreResult<ConnectionSettings>;

    fn close(&self) -> StoreResult<()>;
}

impl<T: MemoryStore + ?Sized> MemoryStore for Arc<T> {
    fn store(&self, memory: Memory) -> StoreResult<()> {
        (**self).store(memory)
    }
    fn get(&self, id: &str) -> StoreResult<Option<Memory>> {
        (**self).get(id)
    }
    fn list(&self, options: &ListOptions) -> StoreResult<PaginatedResult<Memory>> {
        (**self).list(options)
    }
    fn find_by_content_hash(&self, domain: &str, content_hash: &str) -> StoreResult<Option<Memory>> {
        (**self).find_by_content_hash(domain, content_hash)
    }
    fn update(&self, memory: &Memory) -> StoreResult<()> {
        (**self).update(memory)
    }
    fn delete(&self, id: &str, now: DateTime<Utc>) -> StoreResult<()> {
        (**self).delete(id, now)
    }
    fn purge(&self, id: &str) -> StoreResult<()> {
        (**self).purge(id)
    }
    fn restore(&self, id: &str) -> StoreResult<()> {
        (**self).restore(id)
    }
    fn update_status(&self, id: &str, status: MemoryStatus) -> StoreResult<()> {
        (**self).update_status(id, status)
    }
    fn update_enrichment(&self, id: &str, update: &EnrichmentUpdate) -> StoreResult<()> {
        (**self).update_enrichment(id, update)
    }
    fn update_state(&self, id: &str, state: crate::memory::LifecycleState, now: DateTime<Utc>) -> StoreResult<()> {
        (**self).update_state(id, state, now)
    }
    fn increment_access_count(&self, id: &str, now: DateTime<Utc>) -> StoreResult<()> {
        (**self).increment_access_count(id, now)
    }
    fn get_related_memories(&self, id: &str) -> StoreResult<Vec<String>> {
        (**self).get_related_memories(id)
    }
    fn get_memory_entities(&self, id: &str) -> StoreResult<Vec<Entity>> {
        (**self).get_memory_entities(id)
    }
    fn get_evolution_chain(&self, id: &str) -> StoreResult<Vec<Memory>> {
        (**self).get_evolution_chain(id)
    }
    fn get_memories_by_relation_type(&self, id: &str, rel_type: &str) -> StoreResult<Vec<String>> {
        (**self).get_memories_by_relation_type(id, rel_type)
    }
    fn update_decay_scores(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        (**self).update_decay_scores(now)
    }
    fn upsert_entity(&self, entity_type: &str, name: &str, description: Option<String>, now: DateTime<Utc>) -> StoreResult<Entity> {
        (**self).upsert_entity(entity_type, name, description, now)
    }
    fn get_entity(&self, id: &str) -> StoreResult<Option<Entity>> {
        (**self).get_entity(id)
    }
    fn link_memory_entity(&self, memory_id: &str, entity_id: &str, confidence: f32, now: DateTime<Utc>) -> StoreResult<()> {
        (**self).link_memory_entity(memory_id, entity_id, confidence, now)
    }
    fn upsert_relationship(&self, relationship: Relationship) -> StoreResult<Relationship> {
        (**self).upsert_relationship(relationship)
    }
    fn relationships_for_entity(&self, entity_id: &str) -> StoreResult<Vec<Relationship>> {
        (**self).relationships_for_entity(entity_id)
    }
    fn relationships_for_domain(&self, domain: &str) -> StoreResult<Vec<Relationship>> {
        (**self).relationships_for_domain(domain)
    }
    fn memory_ids_for_entity(&self, entity_id: &str) -> StoreResult<Vec<String>> {
        (**self).memory_ids_for_entity(entity_id)
    }
    fn record_unknown_type(&self, domain: &str, type_name: &str, now: DateTime<Utc>) -> StoreResult<()> {
        (**self).record_unknown_type(domain, type_name, now)
    }
    fn get_connection_settings(&self, domain: &str) -> StoreResult<ConnectionSettings> {
        (**self).get_connection_settings(domain)
    }
    fn close(&self) -> StoreResult<()> {
        (**self).close()
    }
}
