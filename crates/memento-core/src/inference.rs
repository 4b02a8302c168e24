//! Inference engine (spec §4.8): connection candidates and recurring
//! patterns derived from shared entities and tags.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::store::MemoryStore;

const TRANSITIVE_HOP_DECAY: f32 = 0.7;
const CLUSTER_MIN_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub struct InferOptions {
    pub max_depth: usize,
    pub max_results: usize,
    pub min_confidence: f32,
    pub include_reason: bool,
}

impl InferOptions {
    pub fn new() -> Self {
        Self { max_depth: 2, max_results: 20, min_confidence: 0.0, include_reason: false }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionCandidate {
    pub target_id: String,
    pub confidence: f32,
    pub depth: usize,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Pattern {
    pub kind: String,
    pub label: String,
    pub memory_ids: Vec<String>,
    pub confidence: f32,
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// Second-hop candidates reachable from `mid` (excluding `source_id`
/// and `mid` itself), scored by Jaccard similarity to `mid`'s entities.
fn second_hop_candidates<S: MemoryStore + ?Sized>(store: &S, mid: &str, source_id: &str) -> HashMap<String, f32> {
    let mut hop2 = HashMap::new();
    let Ok(Some(memory)) = store.get(mid) else { return hop2 };
    let entities: HashSet<String> = memory.entities.iter().cloned().collect();
    for entity_id in &entities {
        for memory_id in store.memory_ids_for_entity(entity_id).unwrap_or_default() {
            if memory_id == source_id || memory_id == mid {
                continue;
            }
            if let Ok(Some(candidate_memory)) = store.get(&memory_id) {
                let candidate_entities: HashSet<String> = candidate_memory.entities.iter().cloned().collect();
                hop2.entry(memory_id).or_insert_with(|| jaccard(&entities, &candidate_entities));
            }
        }
    }
    hop2
}

/// Direct candidates share >=1 entity with `source`; confidence is the
/// Jaccard similarity of the two entity sets. Transitive candidates
/// (depth > 1) compose two direct hops with a flat per-hop decay (spec
/// §4.8).
pub fn infer_connections<S: MemoryStore + ?Sized>(store: &S, source_id: &str, options: InferOptions) -> Result<Vec<ConnectionCandidate>> {
    let Some(source) = store.get(source_id).map_err(|e| crate::error::Error::ExternalUnavailable(e.0))? else {
        return Ok(Vec::new());
    };
    let source_entities: HashSet<String> = source.entities.iter().cloned().collect();

    let mut direct: HashMap<String, f32> = HashMap::new();
    for entity_id in &source_entities {
        for memory_id in store.memory_ids_for_entity(entity_id).unwrap_or_default() {
            if memory_id == source_id {
                continue;
            }
            if let Ok(Some(candidate_memory)) = store.get(&memory_id) {
                let candidate_entities: HashSet<String> = candidate_memory.entities.iter().cloned().collect();
                let confidence = jaccard(&source_entities, &candidate_entities);
                direct.entry(memory_id).or_insert(confidence);
            }
        }
    }

    let mut candidates: Vec<ConnectionCandidate> = direct
        .iter()
        .map(|(id, confidence)| ConnectionCandidate {
            target_id: id.clone(),
            confidence: *confidence,
            depth: 1,
            reason: options.include_reason.then(|| "shares an entity with the source".to_string()),
        })
        .collect();

    if options.max_depth > 1 {
        for (mid, confidence) in direct.iter() {
            let hop2 = second_hop_candidates(store, mid, source_id);
            for (second_id, second_confidence) in hop2 {
                if direct.contains_key(&second_id) {
                    continue;
                }
                let transitive_confidence = confidence * second_confidence * TRANSITIVE_HOP_DECAY;
                candidates.push(ConnectionCandidate {
                    target_id: second_id,
                    confidence: transitive_confidence,
                    depth: 2,
                    reason: options.include_reason.then(|| format!("connected via {mid}")),
                });
            }
        }
    }

    let mut best: HashMap<String, ConnectionCandidate> = HashMap::new();
    for candidate in candidates {
        best.entry(candidate.target_id.clone())
            .and_modify(|existing| {
                if candidate.confidence > existing.confidence {
                    *existing = candidate.clone();
                }
            })
            .or_insert(candidate);
    }

    let mut results: Vec<ConnectionCandidate> = best.into_values().filter(|c| c.confidence >= options.min_confidence).collect();
    results.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(options.max_results.max(1));
    Ok(results)
}

/// Groups memories in `domain` by shared entity or shared tag; a group
/// of size >= 3 becomes a `cluster` pattern with confidence
/// `min(1.0, size / 10)` (spec §4.8).
pub fn find_patterns<S: MemoryStore + ?Sized>(store: &S, domain: &str) -> Result<Vec<Pattern>> {
    let options = crate::store::ListOptions {
        filter: crate::store::ListFilter { domain: Some(domain.to_string()), ..Default::default() },
        pagination: crate::store::Pagination { page: 1, limit: 10_000 },
        ..Default::default()
    };
    let page = store.list(&options).map_err(|e| crate::error::Error::ExternalUnavailable(e.0))?;

    let mut by_entity: HashMap<String, Vec<String>> = HashMap::new();
    let mut by_tag: HashMap<String, Vec<String>> = HashMap::new();
    for memory in &page.items {
        for entity_id in &memory.entities {
            by_entity.entry(entity_id.clone()).or_default().push(memory.id.clone());
        }
        for tag in &memory.tags {
            by_tag.entry(tag.clone()).or_default().push(memory.id.clone());
        }
    }

    let mut patterns = Vec::new();
    for (entity_id, memory_ids) in by_entity {
        if memory_ids.len() >= CLUSTER_MIN_SIZE {
            let confidence = (memory_ids.len() as f32 / 10.0).min(1.0);
            patterns.push(Pattern { kind: "cluster".to_string(), label: format!("entity:{entity_id}"), memory_ids, confidence });
        }
    }
    for (tag, memory_ids) in by_tag {
        if memory_ids.len() >= CLUSTER_MIN_SIZE {
            let confidence = (memory_ids.len() as f32 / 10.0).min(1.0);
            patterns.push(Pattern { kind: "cluster".to_string(), label: format!("tag:{tag}"), memory_ids, confidence });
        }
    }
    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{IngestInput, MemorySource};
    use crate::testing::InMemoryStore;

    fn memory_with_entities(store: &InMemoryStore, domain: &str, entity_ids: &[String]) -> String {
        let now = chrono::Utc::now();
        let mut memory = crate::memory::Memory::new(
            IngestInput { content: "x".to_string(), domain: domain.to_string(), source: MemorySource::Manual, ..Default::default() },
            now,
        );
        for entity_id in entity_ids {
            memory.entities.insert(entity_id.clone());
            store.link_memory_entity(&memory.id, entity_id, 0.9, now).unwrap();
        }
        store.store(memory.clone()).unwrap();
        memory.id
    }

    #[test]
    fn direct_candidates_share_an_entity_and_score_by_jaccard() {
        let store = InMemoryStore::new();
        let now = chrono::Utc::now();
        let shared = store.upsert_entity("topic", "rust", None, now).unwrap().id;
        let a = memory_with_entities(&store, "work", &[shared.clone()]);
        let b = memory_with_entities(&store, "work", &[shared.clone()]);

        let candidates = infer_connections(&store, &a, InferOptions { max_depth: 1, max_results: 10, min_confidence: 0.0, include_reason: false }).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].target_id, b);
        assert!((candidates[0].confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn patterns_require_at_least_three_members() {
        let store = InMemoryStore::new();
        let now = chrono::Utc::now();
        let entity = store.upsert_entity("topic", "rust", None, now).unwrap().id;
        memory_with_entities(&store, "work", &[entity.clone()]);
        memory_with_entities(&store, "work", &[entity.clone()]);
        let patterns = find_patterns(&store, "work").unwrap();
        assert!(patterns.is_empty());

        memory_with_entities(&store, "work", &[entity.clone()]);
        let patterns = find_patterns(&store, "work").unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].kind, "cluster");
    }
}
