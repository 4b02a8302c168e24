//! # Memento Core
//!
//! Personal-knowledge memory engine: ingest free-text memories, enrich
//! them in the background (entities, relationships, classification,
//! summary, embedding), and serve graph-aware recall over the result.
//!
//! - **Bounded traversal**: every graph walk is policed by a hop/node/
//!   edge/time budget (`bounds`), never an unbounded fixpoint.
//! - **Confidence and decay**: two independent, pure scoring functions
//!   (`confidence`, `decay`) feed ranking without touching collaborators.
//! - **Background enrichment**: a bounded worker pool (`worker`) drains
//!   a four-stage pipeline (`enrichment`) per memory, committing after
//!   each stage so a crash mid-pipeline loses no completed work.
//! - **Ports and adapters**: the store, LLM text/embedding generators,
//!   optional embedding store, and optional search provider are all
//!   traits (`store`, `llm`); this crate ships none of the concrete
//!   backends.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use memento_core::{Config, Engine, StoreRequest};
//! use std::sync::Arc;
//!
//! let engine = Engine::new(Config::default(), store, text_gen, embedding_gen)?;
//! engine.start(&CancellationToken::new())?;
//!
//! let memory = engine.store(StoreRequest {
//!     content: "Ada met Charles at the Royal Society.".to_string(),
//!     domain: "work".to_string(),
//!     ..Default::default()
//! })?;
//!
//! let results = engine.search(SearchOptions { query: "Ada".to_string(), ..Default::default() })?;
//! ```
//!
//! ## Feature Flags
//!
//! - `test-support`: exposes the in-memory fakes in [`testing`] to
//!   downstream crates that want to exercise this engine without a real
//!   store or LLM backend.

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod bounds;
pub mod cancel;
pub mod config;
pub mod confidence;
pub mod contradiction;
pub mod decay;
pub mod engine;
pub mod enrichment;
pub mod error;
pub mod graph;
pub mod ids;
pub mod inference;
pub mod llm;
pub mod memory;
pub mod search;
pub mod store;
pub mod trace;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

pub use bounds::{BoundKind, Bounds, BoundsChecker, BoundsStats};
pub use cancel::CancellationToken;
pub use config::Config;
pub use contradiction::Contradiction;
pub use engine::{Engine, StoreRequest};
pub use enrichment::{PipelineResult, StageReport};
pub use error::{Error, Result};
pub use graph::{PathResult, TemporalFilter};
pub use inference::{ConnectionCandidate, InferOptions, Pattern};
pub use llm::{CollaboratorError, EmbeddingStore, LlmEmbeddingGenerator, LlmTextGenerator, SearchProvider};
pub use memory::{
    ConnectionSettings, CustomEntityType, CustomRelationshipType, EmbeddingMeta, Entity,
    EnrichmentStatuses, IngestInput, LifecycleState, Memory, MemoryEntityLink, MemorySource,
    MemoryStatus, Relationship, RelationshipSymmetry, SubStatus, SystemEntityType,
    SystemRelationshipType,
};
pub use search::{ScoredResult, SearchOptions};
pub use store::{
    EnrichmentUpdate, ListFilter, ListOptions, MemoryStore, PaginatedResult, Pagination, SortBy,
    SortOptions, SortOrder, StoreError,
};
pub use trace::{Trace, TraceEvent};

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage.
pub mod prelude {
    pub use crate::{
        CancellationToken, Config, Engine, Error, IngestInput, Memory, MemoryStatus, MemoryStore,
        Result, ScoredResult, SearchOptions, StoreRequest,
    };

    #[cfg(any(test, feature = "test-support"))]
    pub use crate::testing::{DeterministicEmbeddingGenerator, InMemoryStore, ScriptedTextGenerator};
}
