//! Search orchestrator (spec §4.9). Delegates to a `SearchProvider`
//! when one is available; otherwise falls back to a plain domain
//! listing and scores candidates itself.

use crate::error::Result;
use crate::llm::SearchProvider;
use crate::memory::Memory;
use crate::store::{ListFilter, ListOptions, MemoryStore, Pagination, SortBy, SortOrder};
use crate::trace::Trace;

const WEIGHT_TEXT: f32 = 0.4;
const WEIGHT_RECENCY: f32 = 0.2;
const WEIGHT_IMPORTANCE: f32 = 0.3;
const WEIGHT_CONFIDENCE: f32 = 0.1;
const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub query: String,
    pub domain: Option<String>,
    pub limit: usize,
    pub offset: i64,
    pub min_score: f32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { query: String::new(), domain: None, limit: DEFAULT_LIMIT, offset: 0, min_score: 0.0 }
    }
}

#[derive(Debug, Clone)]
pub struct ScoredResult {
    pub memory: Memory,
    pub score: f32,
}

fn text_match(query: &str, memory: &Memory) -> f32 {
    if query.is_empty() {
        return 0.0;
    }
    let content = memory.content.to_lowercase();
    let query_lower = query.to_lowercase();

    let mut score = if content.contains(&query_lower) {
        1.0
    } else {
        let words: Vec<&str> = query_lower.split_whitespace().collect();
        if words.is_empty() {
            0.0
        } else {
            let matched = words.iter().filter(|w| content.contains(*w)).count();
            matched as f32 / words.len() as f32
        }
    };

    if memory.tags.iter().any(|t| t.to_lowercase().contains(&query_lower)) {
        score += 0.2;
    }
    if memory.entities.iter().any(|e| e.to_lowercase().contains(&query_lower)) {
        score += 0.1;
    }
    score.min(1.0)
}

fn recency_score(memory: &Memory) -> f32 {
    if memory.status == crate::memory::MemoryStatus::Enriched {
        0.8
    } else {
        0.5
    }
}

fn confidence_score(memory: &Memory) -> f32 {
    if memory.status == crate::memory::MemoryStatus::Enriched {
        0.8
    } else {
        0.5
    }
}

fn score_candidate(query: &str, memory: &Memory) -> f32 {
    WEIGHT_TEXT * text_match(query, memory) + WEIGHT_RECENCY * recency_score(memory) + WEIGHT_IMPORTANCE * memory.importance + WEIGHT_CONFIDENCE * confidence_score(memory)
}

fn normalize_options(mut options: SearchOptions) -> SearchOptions {
    options.limit = if options.limit == 0 { DEFAULT_LIMIT } else { options.limit.clamp(1, MAX_LIMIT) };
    options.offset = options.offset.max(0);
    options
}

/// Accepts `{query, domain, limit, offset, min_score}` and returns
/// results sorted by score descending, paginated (spec §4.9).
pub fn search<S, P>(store: &S, provider: Option<&P>, options: SearchOptions, trace: &mut Trace) -> Result<Vec<ScoredResult>>
where
    S: MemoryStore + ?Sized,
    P: SearchProvider + ?Sized,
{
    let options = normalize_options(options);
    trace.search_started(&options.query);

    let fetch_count = options.limit + options.offset as usize;
    let candidates: Vec<Memory> = if let (Some(provider), false) = (provider, options.query.is_empty()) {
        let list_options = ListOptions {
            pagination: Pagination { page: 1, limit: fetch_count.max(1) },
            ..Default::default()
        };
        let page = provider
            .full_text_search(&options.query, &list_options)
            .map_err(|e| crate::error::Error::ExternalUnavailable(e.0))?;
        trace.candidates_found(page.items.len(), "full_text_search");
        page.items
            .into_iter()
            .filter(|m| options.domain.as_ref().is_none_or(|d| &m.domain == d))
            .collect()
    } else {
        let list_options = ListOptions {
            filter: ListFilter { domain: options.domain.clone(), ..Default::default() },
            sort: crate::store::SortOptions { by: SortBy::CreatedAt, order: SortOrder::Desc },
            pagination: Pagination { page: 1, limit: fetch_count.max(100).max(2 * fetch_count) },
        };
        let page = store.list(&list_options).map_err(|e| crate::error::Error::ExternalUnavailable(e.0))?;
        trace.candidates_found(page.items.len(), "domain_listing");
        page.items
    };

    let mut scored: Vec<ScoredResult> = candidates
        .into_iter()
        .filter_map(|memory| {
            let score = score_candidate(&options.query, &memory);
            trace.scored_candidate(&memory.id, score);
            if score < options.min_score {
                trace.filtered_out(&memory.id, "below min_score");
                None
            } else {
                Some(ScoredResult { memory, score })
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    let paginated: Vec<ScoredResult> = scored.into_iter().skip(options.offset as usize).take(options.limit).collect();
    trace.results_returned(paginated.iter().map(|r| r.memory.id.clone()));
    Ok(paginated)
}

/// Builds a query string from `memory_id`'s tags and entity suffixes,
/// searches, and filters out the source itself (spec §4.9).
pub fn search_similar<S, P>(store: &S, provider: Option<&P>, memory_id: &str, limit: usize, trace: &mut Trace) -> Result<Vec<ScoredResult>>
where
    S: MemoryStore + ?Sized,
    P: SearchProvider + ?Sized,
{
    let Some(source) = store.get(memory_id).map_err(|e| crate::error::Error::ExternalUnavailable(e.0))? else {
        return Ok(Vec::new());
    };
    let entity_suffixes = source.entities.iter().filter_map(|id| id.rsplit(':').next()).map(str::to_string);
    let query = source.tags.iter().cloned().chain(entity_suffixes).collect::<Vec<_>>().join(" ");

    let results = search(
        store,
        provider,
        SearchOptions { query, domain: Some(source.domain.clone()), limit: limit + 1, offset: 0, min_score: 0.0 },
        trace,
    )?;
    Ok(results.into_iter().filter(|r| r.memory.id != memory_id).take(limit).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{IngestInput, MemorySource};
    use crate::testing::{InMemoryStore, NullSearchProvider};
    use chrono::Utc;

    fn store_memory(store: &InMemoryStore, content: &str, importance: f32) -> String {
        let mut memory = crate::memory::Memory::new(
            IngestInput { content: content.to_string(), domain: "work".to_string(), source: MemorySource::Manual, ..Default::default() },
            Utc::now(),
        );
        memory.importance = importance;
        store.store(memory.clone()).unwrap();
        memory.id
    }

    #[test]
    fn full_phrase_match_scores_higher_than_partial() {
        let store = InMemoryStore::new();
        store_memory(&store, "the rust compiler is fast", 0.5);
        store_memory(&store, "a slow afternoon", 0.5);

        let mut trace = Trace::disabled();
        let results = search(
            &store,
            None::<&NullSearchProvider>,
            SearchOptions { query: "rust compiler".to_string(), ..Default::default() },
            &mut trace,
        )
        .unwrap();

        assert!(!results.is_empty());
        assert!(results[0].memory.content.contains("rust compiler"));
    }

    #[test]
    fn min_score_filters_low_relevance_candidates() {
        let store = InMemoryStore::new();
        store_memory(&store, "completely unrelated text", 0.0);

        let mut trace = Trace::disabled();
        let results = search(
            &store,
            None::<&NullSearchProvider>,
            SearchOptions { query: "rust".to_string(), min_score: 0.5, ..Default::default() },
            &mut trace,
        )
        .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn search_similar_excludes_the_source_memory() {
        let store = InMemoryStore::new();
        let id = store_memory(&store, "rust programming notes", 0.5);

        let mut trace = Trace::disabled();
        let results = search_similar(&store, None::<&NullSearchProvider>, &id, 5, &mut trace).unwrap();
        assert!(results.iter().all(|r| r.memory.id != id));
    }
}
