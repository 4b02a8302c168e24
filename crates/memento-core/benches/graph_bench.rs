//! Memento Graph Benchmarks
//!
//! Benchmarks for bounded traversal and the pure scoring functions.
//! Run with: cargo bench -p memento-core --features test-support

use std::time::Duration;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use memento_core::bounds::Bounds;
use memento_core::cancel::CancellationToken;
use memento_core::graph::{bfs, find_related_bounded, TemporalFilter};
use memento_core::inference::{infer_connections, InferOptions};
use memento_core::memory::{IngestInput, Memory, MemorySource};
use memento_core::store::MemoryStore;
use memento_core::testing::InMemoryStore;
use memento_core::{confidence, decay};

fn seed_entity_chain(store: &InMemoryStore, len: usize) -> Vec<String> {
    let now = Utc::now();
    let entity = store.upsert_entity("topic", "shared", None, now).unwrap();
    let mut ids = Vec::with_capacity(len);
    for i in 0..len {
        let mut memory = Memory::new(
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

fn bench_bfs(c: &mut Criterion) {
    let store = InMemoryStore::new();
    let ids = seed_entity_chain(&store, 200);

    c.bench_function("bfs_200_nodes", |b| {
        b.iter(|| {
            let mut visited = 0usize;
            bfs(&store, &ids[0], Bounds::default(), CancellationToken::background(), |_, _| {
                visited += 1;
                true
            })
            .unwrap();
            black_box(visited);
        })
    });
}

fn bench_find_related_bounded(c: &mut Criterion) {
    let store = InMemoryStore::new();
    let ids = seed_entity_chain(&store, 200);

    c.bench_function("find_related_bounded_200_nodes", |b| {
        b.iter(|| {
            let (related, truncated) =
                find_related_bounded(&store, &ids[0], TemporalFilter::default(), Bounds::default(), CancellationToken::background());
            black_box((related, truncated));
        })
    });
}

fn bench_infer_connections(c: &mut Criterion) {
    let store = InMemoryStore::new();
    let ids = seed_entity_chain(&store, 200);

    c.bench_function("infer_connections_200_nodes", |b| {
        b.iter(|| {
            let candidates = infer_connections(&store, &ids[0], InferOptions::new()).unwrap();
            black_box(candidates);
        })
    });
}

fn bench_decay_recompute(c: &mut Criterion) {
    let now = Utc::now();
    let reference = now - chrono::Duration::hours(72);

    c.bench_function("decay_recompute", |b| {
        b.iter(|| {
            black_box(decay::recompute(0.6, reference, now, 0.5));
        })
    });
}

fn bench_memory_confidence(c: &mut Criterion) {
    let now = Utc::now();
    let memory = Memory::new(
        IngestInput {
            content: "a benchmark memory".to_string(),
            domain: "work".to_string(),
            source: MemorySource::Manual,
            ..Default::default()
        },
        now,
    );

    c.bench_function("memory_confidence", |b| {
        b.iter(|| {
            black_box(confidence::memory_confidence(&memory, now));
        })
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_bfs, bench_find_related_bounded, bench_infer_connections, bench_decay_recompute, bench_memory_confidence
}
criterion_main!(benches);
