//! Graph traversal (spec §4.7): BFS/DFS over memory-to-memory edges
//! derived from shared entities and, where present, relationship
//! evidence. Every expansion checks the bounds checker.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};

use crate::bounds::{Bounds, BoundsChecker};
use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::store::MemoryStore;

/// One hop on a discovered path (spec §4.7: `find_paths_bounded`).
#[derive(Debug, Clone)]
pub struct PathResult {
    pub nodes: Vec<String>,
    pub distance: usize,
    pub confidence: f32,
    pub truncated: bool,
}

/// Optional temporal filter applied by `find_related_bounded`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemporalFilter {
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl TemporalFilter {
    fn accepts(&self, created_at: DateTime<Utc>) -> bool {
        self.created_after.is_none_or(|after| created_at >= after) && self.created_before.is_none_or(|before| created_at <= before)
    }
}

fn neighbors<S: MemoryStore + ?Sized>(store: &S, id: &str) -> Vec<String> {
    store.get_related_memories(id).unwrap_or_default()
}

/// BFS from `start`, invoking `visit(id, depth)` once per node;
/// `visit` returning `false` stops expansion from that node (but not
/// the overall walk). Returns `Ok(())` normally, `Err(BoundsExceeded)`
/// or `Err(Cancelled)` if the walk was cut short — callers should
/// treat whatever `visit` already saw as the partial result (spec
/// §4.7).
pub fn bfs<S, F>(store: &S, start: &str, bounds: Bounds, token: CancellationToken, mut visit: F) -> Result<()>
where
    S: MemoryStore + ?Sized,
    F: FnMut(&str, usize) -> bool,
{
    let mut checker = BoundsChecker::new(bounds, token);
    let mut seen = HashSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start.to_string());
    queue.push_back((start.to_string(), 0usize));

    while let Some((node, depth)) = queue.pop_front() {
        checker.can_continue(depth)?;
        checker.record_node();
        if !visit(&node, depth) {
            continue;
        }
        if depth >= checker.max_hops() {
            continue;
        }
        for neighbor in neighbors(store, &node) {
            checker.record_edge();
            if seen.insert(neighbor.clone()) {
                queue.push_back((neighbor, depth + 1));
            }
        }
    }
    Ok(())
}

/// DFS with path tracking; unmarks nodes on backtrack so alternate
/// paths through a shared ancestor remain discoverable (spec §4.7).
pub fn find_paths_bounded<S: MemoryStore + ?Sized>(store: &S, source: &str, target: &str, bounds: Bounds, token: CancellationToken) -> (Vec<PathResult>, bool) {
    let mut checker = BoundsChecker::new(bounds, token);
    let mut path = vec![source.to_string()];
    let mut on_path = HashSet::new();
    on_path.insert(source.to_string());
    let mut results = Vec::new();
    let mut truncated = false;

    dfs_visit(store, target, &mut path, &mut on_path, &mut checker, &mut results, &mut truncated);
    (results, truncated)
}

fn dfs_visit<S: MemoryStore + ?Sized>(
    store: &S,
    target: &str,
    path: &mut Vec<String>,
    on_path: &mut HashSet<String>,
    checker: &mut BoundsChecker,
    results: &mut Vec<PathResult>,
    truncated: &mut bool,
) {
    let depth = path.len() - 1;
    if let Err(err) = checker.can_continue(depth) {
        *truncated = matches!(err, Error::BoundsExceeded(_));
        return;
    }
    checker.record_node();

    let current = path.last().unwrap().clone();
    if current == target && path.len() > 1 {
        let distance = path.len() - 1;
        results.push(PathResult {
            nodes: path.clone(),
            distance,
            confidence: 1.0 / (distance as f32 + 1.0),
            truncated: false,
        });
        return;
    }
    if depth >= checker.max_hops() {
        return;
    }

    for neighbor in neighbors(store, &current) {
        checker.record_edge();
        if on_path.contains(&neighbor) {
            continue;
        }
        on_path.insert(neighbor.clone());
        path.push(neighbor.clone());
        dfs_visit(store, target, path, on_path, checker, results, truncated);
        path.pop();
        on_path.remove(&neighbor);
    }
}

/// BFS accumulating every reachable node `!= src`, applying an optional
/// temporal filter. Out-of-window nodes are excluded from the results
/// but traversal continues through them (spec §4.7).
pub fn find_related_bounded<S: MemoryStore + ?Sized>(store: &S, source: &str, filter: TemporalFilter, bounds: Bounds, token: CancellationToken) -> (Vec<String>, bool) {
    let mut related = Vec::new();
    let mut truncated = false;

    let result = bfs(store, source, bounds, token, |id, _depth| {
        if id != source {
            let accepted = match store.get(id) {
                Ok(Some(memory)) => filter.accepts(memory.created_at),
                _ => true,
            };
            if accepted {
                related.push(id.to_string());
            }
        }
        true
    });
    if let Err(Error::BoundsExceeded(_)) = result {
        truncated = true;
    }

    (related, truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{IngestInput, MemorySource};
    use crate::testing::InMemoryStore;
    use std::time::Duration;

    fn seed_chain(store: &InMemoryStore, len: usize) -> Vec<String> {
        let now = Utc::now();
        let mut ids = Vec::new();
        let entity = store.upsert_entity("topic", "shared", None, now).unwrap();
        for i in 0..len {
            let mut memory = crate::memory::Memory::new(
                IngestInput {
                    content: format!("memory {i}"),
                    domain: "work".to_string(),
                    source: MemorySource::Manual,
                    ..Default::default()
                },
                now,
            );
            memory.entities.insert(entity.id.clone());
            store.store(memory.clone()).unwrap();
            store.link_memory_entity(&memory.id, &entity.id, 0.9, now).unwrap();
            ids.push(memory.id);
        }
        ids
    }

    #[test]
    fn bfs_visits_every_node_sharing_an_entity() {
        let store = InMemoryStore::new();
        let ids = seed_chain(&store, 4);
        let mut visited = Vec::new();
        bfs(&store, &ids[0], Bounds::default(), CancellationToken::background(), |id, depth| {
            visited.push((id.to_string(), depth));
            true
        })
        .unwrap();
        assert_eq!(visited.len(), 4);
    }

    #[test]
    fn bfs_stops_at_max_nodes() {
        let store = InMemoryStore::new();
        let ids = seed_chain(&store, 10);
        let bounds = Bounds::new(3, 3, 500, Duration::from_secs(30));
        let mut visited = 0;
        let result = bfs(&store, &ids[0], bounds, CancellationToken::background(), |_, _| {
            visited += 1;
            true
        });
        assert!(matches!(result, Err(Error::BoundsExceeded(_))));
        assert_eq!(visited, 3);
    }

    #[test]
    fn find_related_bounded_excludes_source() {
        let store = InMemoryStore::new();
        let ids = seed_chain(&store, 3);
        let (related, truncated) = find_related_bounded(&store, &ids[0], TemporalFilter::default(), Bounds::default(), CancellationToken::background());
        assert!(!truncated);
        assert!(!related.contains(&ids[0]));
        assert_eq!(related.len(), 2);
    }
}
