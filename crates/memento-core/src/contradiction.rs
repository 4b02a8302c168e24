//! Contradiction detector (spec §4.10): three deterministic checks
//! over an index from `(from_entity, type)` to the relationships
//! sharing that key.

use std::collections::{BTreeSet, HashMap};

use crate::error::Result;
use crate::memory::{Relationship, SINGLE_VALUED_RELATIONSHIP_TYPES};
use crate::store::MemoryStore;

#[derive(Debug, Clone)]
pub struct Contradiction {
    pub kind: &'static str,
    pub confidence: f32,
    pub memory_ids: Vec<String>,
}

type RelationshipIndex = HashMap<(String, String), Vec<Relationship>>;

fn build_index(relationships: &[Relationship]) -> RelationshipIndex {
    let mut index: RelationshipIndex = HashMap::new();
    for relationship in relationships {
        index.entry((relationship.source_id.clone(), relationship.rel_type.clone())).or_default().push(relationship.clone());
    }
    index
}

/// Check 1: a single-valued relationship type may have only one
/// distinct target per source entity (spec §4.10 item 1).
fn conflicting_single_valued(index: &RelationshipIndex) -> Vec<Contradiction> {
    let mut contradictions = Vec::new();
    for ((_, rel_type), group) in index {
        if !SINGLE_VALUED_RELATIONSHIP_TYPES.contains(&rel_type.as_str()) {
            continue;
        }
        let distinct_targets: BTreeSet<&str> = group.iter().map(|r| r.target_id.as_str()).collect();
        if distinct_targets.len() > 1 {
            let mut memory_ids: BTreeSet<String> = BTreeSet::new();
            for relationship in group {
                memory_ids.extend(relationship.evidence.iter().cloned());
            }
            contradictions.push(Contradiction { kind: "conflicting_single_valued", confidence: 0.95, memory_ids: memory_ids.into_iter().collect() });
        }
    }
    contradictions
}

/// Check 2: a `supersedes(A, B)` relationship contradicts any other
/// relationship still referencing `B` (spec §4.10 item 2).
fn superseded_but_active(relationships: &[Relationship]) -> Vec<Contradiction> {
    let mut contradictions = Vec::new();
    for relationship in relationships.iter().filter(|r| r.rel_type == "supersedes") {
        let superseded_id = &relationship.target_id;
        for other in relationships {
            if other.rel_type == "supersedes" {
                continue;
            }
            if &other.source_id == superseded_id || &other.target_id == superseded_id {
                let mut memory_ids: BTreeSet<String> = relationship.evidence.iter().cloned().collect();
                memory_ids.extend(other.evidence.iter().cloned());
                contradictions.push(Contradiction { kind: "superseded_but_active", confidence: 0.85, memory_ids: memory_ids.into_iter().collect() });
            }
        }
    }
    contradictions
}

/// Check 3: a `temporal_order` hint (`before`/`after`) compared against
/// the endpoint memories' `timestamp` fields (spec §4.10 item 3).
fn temporal_impossibility<S: MemoryStore + ?Sized>(store: &S, relationships: &[Relationship]) -> Vec<Contradiction> {
    let mut contradictions = Vec::new();
    for relationship in relationships {
        let Some(order) = relationship.temporal_order() else { continue };
        let (Ok(Some(source)), Ok(Some(target))) = (store.get(&relationship.source_id), store.get(&relationship.target_id)) else { continue };

        let violated = match order {
            "before" => source.timestamp >= target.timestamp,
            "after" => source.timestamp <= target.timestamp,
            _ => false,
        };
        if violated {
            let mut memory_ids: BTreeSet<String> = relationship.evidence.iter().cloned().collect();
            memory_ids.insert(source.id.clone());
            memory_ids.insert(target.id.clone());
            contradictions.push(Contradiction { kind: "temporal_impossibility", confidence: 0.9, memory_ids: memory_ids.into_iter().collect() });
        }
    }
    contradictions
}

/// Runs all three checks over `domain`. If `memory_id` is given, only
/// contradictions involving it are returned, with deduplicated memory
/// ID lists (spec §4.10).
pub fn detect_contradictions<S: MemoryStore + ?Sized>(store: &S, domain: &str, memory_id: Option<&str>) -> Result<Vec<Contradiction>> {
    let relationships = store.relationships_for_domain(domain).map_err(|e| crate::error::Error::ExternalUnavailable(e.0))?;
    let index = build_index(&relationships);

    let mut contradictions = Vec::new();
    contradictions.extend(conflicting_single_valued(&index));
    contradictions.extend(superseded_but_active(&relationships));
    contradictions.extend(temporal_impossibility(store, &relationships));

    if let Some(memory_id) = memory_id {
        contradictions.retain(|c| c.memory_ids.iter().any(|id| id == memory_id));
    }
    Ok(contradictions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Relationship;
    use crate::testing::InMemoryStore;
    use chrono::Utc;

    #[test]
    fn conflicting_single_valued_detects_two_distinct_targets() {
        let now = Utc::now();
        let mut a = Relationship::new("ent:person:a", "ent:person:b", "married_to", 0.9, now);
        a.evidence.insert("mem:work:aaaaaaaaaaaaaaaa".to_string());
        let mut c = Relationship::new("ent:person:a", "ent:person:c", "married_to", 0.9, now);
        c.evidence.insert("mem:work:bbbbbbbbbbbbbbbb".to_string());

        let contradictions = conflicting_single_valued(&build_index(&[a, c]));
        assert_eq!(contradictions.len(), 1);
        assert_eq!(contradictions[0].confidence, 0.95);
        assert_eq!(contradictions[0].memory_ids.len(), 2);
    }

    #[test]
    fn single_target_is_not_a_contradiction() {
        let now = Utc::now();
        let a = Relationship::new("ent:person:a", "ent:person:b", "married_to", 0.9, now);
        let a2 = Relationship::new("ent:person:a", "ent:person:b", "married_to", 0.8, now);
        assert!(conflicting_single_valued(&build_index(&[a, a2])).is_empty());
    }

    #[test]
    fn superseded_but_active_flags_lingering_references() {
        let now = Utc::now();
        let supersedes = Relationship::new("ent:doc:a", "ent:doc:b", "supersedes", 0.9, now);
        let still_used = Relationship::new("ent:doc:b", "ent:doc:c", "depends_on", 0.8, now);
        let contradictions = superseded_but_active(&[supersedes, still_used]);
        assert_eq!(contradictions.len(), 1);
        assert_eq!(contradictions[0].confidence, 0.85);
    }

    #[test]
    fn temporal_impossibility_detects_violated_before_order() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut earlier = crate::memory::Memory::new(
            crate::memory::IngestInput { content: "a".to_string(), domain: "work".to_string(), ..Default::default() },
            now,
        );
        earlier.timestamp = now;
        let mut later = crate::memory::Memory::new(
            crate::memory::IngestInput { content: "b".to_string(), domain: "work".to_string(), ..Default::default() },
            now,
        );
        later.timestamp = now - chrono::Duration::days(1);
        store.store(earlier.clone()).unwrap();
        store.store(later.clone()).unwrap();

        let mut relationship = Relationship::new(&earlier.id, &later.id, "precedes", 0.9, now);
        relationship.metadata.insert("temporal_order".to_string(), serde_json::Value::String("before".to_string()));

        let contradictions = temporal_impossibility(&store, &[relationship]);
        assert_eq!(contradictions.len(), 1);
        assert_eq!(contradictions[0].confidence, 0.9);
    }

    #[test]
    fn memory_id_filter_narrows_results() {
        let now = Utc::now();
        let mut a = Relationship::new("ent:person:a", "ent:person:b", "married_to", 0.9, now);
        a.evidence.insert("mem:work:aaaaaaaaaaaaaaaa".to_string());
        let mut c = Relationship::new("ent:person:a", "ent:person:c", "married_to", 0.9, now);
        c.evidence.insert("mem:work:bbbbbbbbbbbbbbbb".to_string());
        let store = InMemoryStore::new().with_connection_settings(crate::memory::ConnectionSettings::new("work"));
        store.upsert_relationship(a).unwrap();
        store.upsert_relationship(c).unwrap();

        let found = detect_contradictions(&store, "work", Some("mem:work:aaaaaaaaaaaaaaaa")).unwrap();
        assert_eq!(found.len(), 1);
        let none = detect_contradictions(&store, "work", Some("mem:work:cccccccccccccccc")).unwrap();
        assert!(none.is_empty());
    }
}
