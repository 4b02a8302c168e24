//! In-memory fakes for every collaborator trait.
//!
//! Gated on `test-support` for downstream consumers, but always built
//! for this crate's own `#[cfg(test)]` modules regardless of which
//! features are enabled.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::llm::{CollaboratorError, CollaboratorResult, LlmEmbeddingGenerator, LlmTextGenerator};
use crate::memory::{ConnectionSettings, Entity, LifecycleState, Memory, MemoryStatus, Relationship};
use crate::store::{EnrichmentUpdate, ListFilter, ListOptions, MemoryStore, PaginatedResult, SortBy, SortOrder, StoreError, StoreResult};

/// A `MemoryStore` backed by a handful of `Mutex`-guarded maps. Good
/// enough to exercise the enrichment pipeline, graph traversal, and
/// search orchestrator without a real relational backend.
#[derive(Default)]
pub struct InMemoryStore {
    memories: Mutex<HashMap<String, Memory>>,
    entities: Mutex<HashMap<String, Entity>>,
    links: Mutex<HashMap<(String, String), crate::memory::MemoryEntityLink>>,
    relationships: Mutex<HashMap<String, Relationship>>,
    connection_settings: Mutex<HashMap<String, ConnectionSettings>>,
    unknown_types: Mutex<HashMap<(String, String), (u32, DateTime<Utc>, DateTime<Utc>)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection_settings(self, settings: ConnectionSettings) -> Self {
        self.connection_settings.lock().unwrap().insert(settings.domain.clone(), settings);
        self
    }
}

fn matches_filter(memory: &Memory, filter: &ListFilter) -> bool {
    if !filter.include_deleted && memory.is_deleted() {
        return false;
    }
    if let Some(status) = filter.status {
        if memory.status != status {
            return false;
        }
    }
    if let Some(domain) = &filter.domain {
        if &memory.domain != domain {
            return false;
        }
    }
    if let Some(after) = filter.created_after {
        if memory.created_at < after {
            return false;
        }
    }
    if let Some(before) = filter.created_before {
        if memory.created_at > before {
            return false;
        }
    }
    true
}

impl MemoryStore for InMemoryStore {
    fn store(&self, memory: Memory) -> StoreResult<()> {
        self.memories.lock().unwrap().insert(memory.id.clone(), memory);
        Ok(())
    }

    fn get(&self, id: &str) -> StoreResult<Option<Memory>> {
        Ok(self.memories.lock().unwrap().get(id).cloned())
    }

    fn list(&self, options: &ListOptions) -> StoreResult<PaginatedResult<Memory>> {
        let memories = self.memories.lock().unwrap();
        let mut matching: Vec<Memory> = memories.values().filter(|m| matches_filter(m, &options.filter)).cloned().collect();

        matching.sort_by(|a, b| {
            let ordering = match options.sort.by {
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                SortBy::UpdatedAt => a.updated_at.cmp(&b.updated_at),
                SortBy::Importance => a.importance.partial_cmp(&b.importance).unwrap_or(std::cmp::Ordering::Equal),
                SortBy::DecayScore => a.decay_score.partial_cmp(&b.decay_score).unwrap_or(std::cmp::Ordering::Equal),
            };
            match options.sort.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = matching.len();
        let page = options.pagination.page.max(1);
        let limit = options.pagination.limit.max(1);
        let start = (page - 1) * limit;
        let items = matching.into_iter().skip(start).take(limit).collect();

        Ok(PaginatedResult { items, total, page, limit })
    }

    fn find_by_content_hash(&self, domain: &str, content_hash: &str) -> StoreResult<Option<Memory>> {
        Ok(self
            .memories
            .lock()
            .unwrap()
            .values()
            .find(|m| !m.is_deleted() && m.domain == domain && m.content_hash == content_hash)
            .cloned())
    }

    fn update(&self, memory: &Memory) -> StoreResult<()> {
        self.memories.lock().unwrap().insert(memory.id.clone(), memory.clone());
        Ok(())
    }

    fn delete(&self, id: &str, now: DateTime<Utc>) -> StoreResult<()> {
        let mut memories = self.memories.lock().unwrap();
        let memory = memories.get_mut(id).ok_or_else(|| StoreError::new(format!("no memory {id}")))?;
        memory.deleted_at = Some(now);
        Ok(())
    }

    fn purge(&self, id: &str) -> StoreResult<()> {
        self.memories.lock().unwrap().remove(id);
        Ok(())
    }

    fn restore(&self, id: &str) -> StoreResult<()> {
        let mut memories = self.memories.lock().unwrap();
        let memory = memories.get_mut(id).ok_or_else(|| StoreError::new(format!("no memory {id}")))?;
        memory.deleted_at = None;
        Ok(())
    }

    fn update_status(&self, id: &str, status: MemoryStatus) -> StoreResult<()> {
        let mut memories = self.memories.lock().unwrap();
        let memory = memories.get_mut(id).ok_or_else(|| StoreError::new(format!("no memory {id}")))?;
        memory.status = status;
        Ok(())
    }

    fn update_enrichment(&self, id: &str, update: &EnrichmentUpdate) -> StoreResult<()> {
        let mut memories = self.memories.lock().unwrap();
        let memory = memories.get_mut(id).ok_or_else(|| StoreError::new(format!("no memory {id}")))?;
        if let Some(status) = update.status {
            memory.status = status;
        }
        if let Some(enrichment) = update.enrichment {
            memory.enrichment = enrichment;
        }
        if let Some(attempts) = update.attempts {
            memory.enrichment_attempts = attempts;
        }
        if let Some(error) = update.error.clone() {
            memory.enrichment_error = error;
        }
        if let Some(enriched_at) = update.enriched_at {
            memory.enriched_at = Some(enriched_at);
        }
        if let Some(embedding) = update.embedding.clone() {
            memory.embedding = embedding;
        }
        Ok(())
    }

    fn update_state(&self, id: &str, state: LifecycleState, now: DateTime<Utc>) -> StoreResult<()> {
        let mut memories = self.memories.lock().unwrap();
        let memory = memories.get_mut(id).ok_or_else(|| StoreError::new(format!("no memory {id}")))?;
        memory.state = state;
        memory.state_updated_at = now;
        Ok(())
    }

    fn increment_access_count(&self, id: &str, now: DateTime<Utc>) -> StoreResult<()> {
        let mut memories = self.memories.lock().unwrap();
        let memory = memories.get_mut(id).ok_or_else(|| StoreError::new(format!("no memory {id}")))?;
        memory.access_count += 1;
        memory.last_accessed_at = Some(now);
        Ok(())
    }

    fn get_related_memories(&self, id: &str) -> StoreResult<Vec<String>> {
        let memories = self.memories.lock().unwrap();
        let Some(memory) = memories.get(id) else { return Ok(Vec::new()) };
        let links = self.links.lock().unwrap();
        let relationships = self.relationships.lock().unwrap();

        let mut neighbors: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        for entity_id in &memory.entities {
            for ((mem_id, ent_id), _) in links.iter() {
                if ent_id == entity_id && mem_id != id {
                    neighbors.insert(mem_id.clone());
                }
            }
            for relationship in relationships.values() {
                if &relationship.source_id == entity_id || &relationship.target_id == entity_id {
                    for evidence_id in &relationship.evidence {
                        if evidence_id != id {
                            neighbors.insert(evidence_id.clone());
                        }
                    }
                }
            }
        }
        Ok(neighbors.into_iter().collect())
    }

    fn get_memory_entities(&self, id: &str) -> StoreResult<Vec<Entity>> {
        let memories = self.memories.lock().unwrap();
        let Some(memory) = memories.get(id) else { return Ok(Vec::new()) };
        let entities = self.entities.lock().unwrap();
        Ok(memory.entities.iter().filter_map(|eid| entities.get(eid).cloned()).collect())
    }

    fn get_evolution_chain(&self, id: &str) -> StoreResult<Vec<Memory>> {
        let memories = self.memories.lock().unwrap();
        let mut chain = Vec::new();
        let mut cursor = memories.get(id).cloned();
        while let Some(memory) = cursor {
            let next = memory.supersedes_id.clone();
            chain.push(memory);
            cursor = next.and_then(|nid| memories.get(&nid).cloned());
        }
        Ok(chain)
    }

    fn get_memories_by_relation_type(&self, id: &str, rel_type: &str) -> StoreResult<Vec<String>> {
        let memories = self.memories.lock().unwrap();
        let Some(memory) = memories.get(id) else { return Ok(Vec::new()) };
        let relationships = self.relationships.lock().unwrap();
        let mut result = std::collections::BTreeSet::new();
        for entity_id in &memory.entities {
            for relationship in relationships.values() {
                if relationship.rel_type == rel_type && (&relationship.source_id == entity_id || &relationship.target_id == entity_id) {
                    result.extend(relationship.evidence.iter().filter(|e| e.as_str() != id).cloned());
                }
            }
        }
        Ok(result.into_iter().collect())
    }

    fn update_decay_scores(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut memories = self.memories.lock().unwrap();
        let mut updated = 0;
        for memory in memories.values_mut() {
            if memory.is_deleted() {
                continue;
            }
            if let Some(score) = crate::decay::recompute(memory.importance, memory.decay_reference_time(), now, memory.decay_score) {
                memory.decay_score = score;
                memory.decay_updated_at = Some(now);
                updated += 1;
            }
        }
        Ok(updated)
    }

    fn upsert_entity(&self, entity_type: &str, name: &str, description: Option<String>, now: DateTime<Utc>) -> StoreResult<Entity> {
        let id = crate::ids::entity_id(entity_type, name);
        let mut entities = self.entities.lock().unwrap();
        let entity = entities
            .entry(id.clone())
            .and_modify(|existing| {
                if description.is_some() {
                    existing.description = description.clone();
                }
                existing.updated_at = now;
            })
            .or_insert_with(|| Entity::new(entity_type, name, description.clone(), now));
        Ok(entity.clone())
    }

    fn get_entity(&self, id: &str) -> StoreResult<Option<Entity>> {
        Ok(self.entities.lock().unwrap().get(id).cloned())
    }

    fn link_memory_entity(&self, memory_id: &str, entity_id: &str, confidence: f32, _now: DateTime<Utc>) -> StoreResult<()> {
        let mut links = self.links.lock().unwrap();
        links
            .entry((memory_id.to_string(), entity_id.to_string()))
            .and_modify(|link| link.observe(confidence))
            .or_insert_with(|| crate::memory::MemoryEntityLink::first_observation(confidence));
        Ok(())
    }

    fn upsert_relationship(&self, relationship: Relationship) -> StoreResult<Relationship> {
        let mut relationships = self.relationships.lock().unwrap();
        let entry = relationships.entry(relationship.id.clone()).or_insert_with(|| relationship.clone());
        entry.weight = relationship.weight;
        entry.updated_at = relationship.updated_at;
        entry.evidence.extend(relationship.evidence.iter().cloned());
        entry.metadata = relationship.metadata.clone();
        Ok(entry.clone())
    }

    fn relationships_for_entity(&self, entity_id: &str) -> StoreResult<Vec<Relationship>> {
        Ok(self
            .relationships
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.source_id == entity_id || r.target_id == entity_id)
            .cloned()
            .collect())
    }

    fn relationships_for_domain(&self, _domain: &str) -> StoreResult<Vec<Relationship>> {
        Ok(self.relationships.lock().unwrap().values().cloned().collect())
    }

    fn memory_ids_for_entity(&self, entity_id: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .keys()
            .filter(|(_, eid)| eid == entity_id)
            .map(|(mid, _)| mid.clone())
            .collect())
    }

    fn record_unknown_type(&self, domain: &str, type_name: &str, now: DateTime<Utc>) -> StoreResult<()> {
        let mut stats = self.unknown_types.lock().unwrap();
        stats
            .entry((domain.to_string(), type_name.to_string()))
            .and_modify(|(count, _, last_seen)| {
                *count += 1;
                *last_seen = now;
            })
            .or_insert((1, now, now));
        Ok(())
    }

    fn get_connection_settings(&self, domain: &str) -> StoreResult<ConnectionSettings> {
        Ok(self
            .connection_settings
            .lock()
            .unwrap()
            .get(domain)
            .cloned()
            .unwrap_or_else(|| ConnectionSettings::new(domain)))
    }

    fn close(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Replays a fixed sequence of responses, one per call, panicking if
/// exhausted — deliberately strict so enrichment-stage tests fail loud
/// on an unexpected extra call.
pub struct ScriptedTextGenerator {
    responses: Mutex<std::collections::VecDeque<CollaboratorResult<String>>>,
    model: String,
}

impl ScriptedTextGenerator {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            model: "scripted-model".to_string(),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(std::collections::VecDeque::from([Err(CollaboratorError::new(message.into()))])),
            model: "scripted-model".to_string(),
        }
    }
}

impl LlmTextGenerator for ScriptedTextGenerator {
    fn complete(&self, _prompt: &str) -> CollaboratorResult<String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CollaboratorError::new("scripted generator exhausted")))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Deterministic stand-in for a real embedding model: returns a vector
/// derived from the text's length so tests can assert on dimension and
/// stability without a real backend.
pub struct DeterministicEmbeddingGenerator {
    pub dimension: usize,
    model: String,
}

impl DeterministicEmbeddingGenerator {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, model: "deterministic-embedding".to_string() }
    }
}

impl LlmEmbeddingGenerator for DeterministicEmbeddingGenerator {
    fn embed(&self, text: &str) -> CollaboratorResult<Vec<f32>> {
        let seed = text.len() as f32;
        Ok((0..self.dimension).map(|i| ((seed + i as f32).sin())).collect())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// A type to satisfy `Option<&P: SearchProvider>` generic parameters in
/// tests that exercise the no-search-provider fallback path; never
/// actually invoked.
pub struct NullSearchProvider;

impl crate::llm::SearchProvider for NullSearchProvider {
    fn full_text_search(&self, _query: &str, _options: &ListOptions) -> CollaboratorResult<PaginatedResult<Memory>> {
        unimplemented!("NullSearchProvider is never called")
    }
    fn vector_search(&self, _vector: &[f32], _options: &ListOptions) -> CollaboratorResult<PaginatedResult<Memory>> {
        unimplemented!("NullSearchProvider is never called")
    }
    fn hybrid_search(&self, _text: &str, _vector: &[f32], _options: &ListOptions) -> CollaboratorResult<PaginatedResult<Memory>> {
        unimplemented!("NullSearchProvider is never called")
    }
}
