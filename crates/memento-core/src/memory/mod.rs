//! Core data model (spec §3).
//!
//! `Memory` is the unit of user input; entities and relationships live
//! in [`entity`], connection settings in [`connection`].

mod connection;
mod entity;
mod lifecycle;

pub use connection::{ConnectionSettings, CustomEntityType, CustomRelationshipType};
pub use entity::{Entity, MemoryEntityLink, Relationship, RelationshipSymmetry, SystemEntityType, SystemRelationshipType};
pub use lifecycle::LifecycleState;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall processing status of a memory (spec §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MemoryStatus {
    Pending,
    Processing,
    Enriched,
    Failed,
}

impl std::fmt::Display for MemoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MemoryStatus::Pending => "pending",
            MemoryStatus::Processing => "processing",
            MemoryStatus::Enriched => "enriched",
            MemoryStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MemoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "enriched" => Ok(Self::Enriched),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown memory status: {other}")),
        }
    }
}

/// Per-stage enrichment sub-status (spec §3, §4.4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl SubStatus {
    /// `status = enriched` requires every non-skipped sub-status to be
    /// terminal (spec §3 invariant).
    pub fn is_terminal(self) -> bool {
        matches!(self, SubStatus::Completed | SubStatus::Failed | SubStatus::Skipped)
    }
}

impl std::fmt::Display for SubStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubStatus::Pending => "pending",
            SubStatus::Processing => "processing",
            SubStatus::Completed => "completed",
            SubStatus::Failed => "failed",
            SubStatus::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SubStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown sub-status: {other}")),
        }
    }
}

/// The four independent enrichment sub-statuses, plus embedding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentStatuses {
    pub entity: SubStatus,
    pub relationship: SubStatus,
    pub classification: SubStatus,
    pub summarization: SubStatus,
    pub embedding: SubStatus,
}

impl EnrichmentStatuses {
    /// `status = enriched` implies every non-skipped sub-status is terminal.
    pub fn all_terminal(&self) -> bool {
        [
            self.entity,
            self.relationship,
            self.classification,
            self.summarization,
            self.embedding,
        ]
        .into_iter()
        .all(SubStatus::is_terminal)
    }
}

/// Provenance of a memory, used by the confidence scorer's source table (spec §4.3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemorySource {
    Manual,
    Note,
    Document,
    Email,
    Message,
    Imported,
    Auto,
    AiSummary,
    #[default]
    Unknown,
}

impl std::fmt::Display for MemorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MemorySource::Manual => "manual",
            MemorySource::Note => "note",
            MemorySource::Document => "document",
            MemorySource::Email => "email",
            MemorySource::Message => "message",
            MemorySource::Imported => "imported",
            MemorySource::Auto => "auto",
            MemorySource::AiSummary => "ai_summary",
            MemorySource::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MemorySource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(Self::Manual),
            "note" => Ok(Self::Note),
            "document" => Ok(Self::Document),
            "email" => Ok(Self::Email),
            "message" => Ok(Self::Message),
            "imported" => Ok(Self::Imported),
            "auto" => Ok(Self::Auto),
            "ai_summary" => Ok(Self::AiSummary),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown memory source: {other}")),
        }
    }
}

/// A dense semantic embedding plus the metadata needed to interpret it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingMeta {
    pub vector: Vec<f32>,
    pub dimension: usize,
    pub model: String,
}

/// The unit of user input, plus every derived annotation (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    // Identity
    pub id: String,
    pub content_hash: String,

    // Content
    pub content: String,
    pub summary: Option<String>,
    pub key_points: Vec<String>,

    // Classification
    pub domain: String,
    pub memory_type: Option<String>,
    pub category: Option<String>,
    pub classification: Option<String>,
    pub priority: Option<String>,
    pub context_labels: Vec<String>,
    pub tags: Vec<String>,

    // Temporal
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub enriched_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub state_updated_at: DateTime<Utc>,
    pub decay_updated_at: Option<DateTime<Utc>>,

    // Lifecycle
    pub state: LifecycleState,

    // Processing status
    pub status: MemoryStatus,
    pub enrichment: EnrichmentStatuses,
    pub enrichment_attempts: u32,
    pub enrichment_error: Option<String>,

    // Derived
    pub entities: BTreeSet<String>,
    pub importance: f32,
    pub decay_score: f32,
    pub access_count: i64,
    pub embedding: Option<EmbeddingMeta>,
    pub supersedes_id: Option<String>,

    // Provenance
    pub source: MemorySource,
    pub created_by: Option<String>,
    pub session_id: Option<String>,
    pub source_context: Option<String>,
}

/// Input to `Engine::store` / `MemoryStore::store` (spec §6).
#[derive(Debug, Clone, Default)]
pub struct IngestInput {
    pub content: String,
    pub domain: String,
    pub source: MemorySource,
    pub timestamp: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub session_id: Option<String>,
    pub source_context: Option<String>,
    pub tags: Vec<String>,
    pub context_labels: Vec<String>,
}

impl Memory {
    /// Construct a fresh, unenriched memory from ingest input, the way
    /// `Engine::store` does before persisting it (spec §6: "validates
    /// non-empty; assigns `mem:<domain>:<random-slug>`").
    pub fn new(input: IngestInput, now: DateTime<Utc>) -> Self {
        let id = crate::ids::memory_id(&input.domain);
        let content_hash = crate::ids::content_hash(&input.content);
        Self {
            id,
            content_hash,
            content: input.content,
            summary: None,
            key_points: Vec::new(),
            domain: input.domain,
            memory_type: None,
            category: None,
            classification: None,
            priority: None,
            context_labels: input.context_labels,
            tags: input.tags,
            timestamp: input.timestamp.unwrap_or(now),
            created_at: now,
            updated_at: now,
            last_accessed_at: None,
            enriched_at: None,
            deleted_at: None,
            state_updated_at: now,
            decay_updated_at: None,
            state: LifecycleState::Planning,
            status: MemoryStatus::Pending,
            enrichment: EnrichmentStatuses::default(),
            enrichment_attempts: 0,
            enrichment_error: None,
            entities: BTreeSet::new(),
            importance: 0.5,
            decay_score: 1.0,
            access_count: 0,
            embedding: None,
            supersedes_id: None,
            source: input.source,
            created_by: input.created_by,
            session_id: input.session_id,
            source_context: input.source_context,
        }
    }

    /// Reference time for decay/age calculations: `last_accessed_at`
    /// if set, else `created_at` (spec §4.2, §4.3).
    pub fn decay_reference_time(&self) -> DateTime<Utc> {
        self.last_accessed_at.unwrap_or(self.created_at)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> IngestInput {
        IngestInput {
            content: "hello world".to_string(),
            domain: "work".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn new_memory_is_pending_with_pending_substatuses() {
        let memory = Memory::new(input(), Utc::now());
        assert_eq!(memory.status, MemoryStatus::Pending);
        assert!(!memory.enrichment.all_terminal());
        assert_eq!(memory.state, LifecycleState::Planning);
        assert!(memory.id.starts_with("mem:work:"));
    }

    #[test]
    fn decay_reference_prefers_last_accessed() {
        let mut memory = Memory::new(input(), Utc::now());
        let created = memory.created_at;
        assert_eq!(memory.decay_reference_time(), created);
        let accessed = created + chrono::Duration::hours(1);
        memory.last_accessed_at = Some(accessed);
        assert_eq!(memory.decay_reference_time(), accessed);
    }

    #[test]
    fn enrichment_all_terminal_requires_every_field() {
        let mut statuses = EnrichmentStatuses {
            entity: SubStatus::Completed,
            relationship: SubStatus::Skipped,
            classification: SubStatus::Completed,
            summarization: SubStatus::Completed,
            embedding: SubStatus::Completed,
        };
        assert!(statuses.all_terminal());
        statuses.embedding = SubStatus::Processing;
        assert!(!statuses.all_terminal());
    }
}
