//! Enrichment pipeline (spec §4.4): four sequential stages sharing one
//! write context. Stage 1 failure aborts the pipeline; stages 2-4
//! failures are recorded but never abort (spec §7).

pub mod prompts;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::llm::LlmTextGenerator;
use crate::memory::{ConnectionSettings, Entity, Memory, SubStatus};
use crate::store::MemoryStore;

#[derive(Debug, Clone, Deserialize)]
struct RawEntity {
    name: String,
    #[serde(rename = "type")]
    entity_type: String,
    description: Option<String>,
    confidence: f32,
}

#[derive(Debug, Clone, Deserialize)]
struct RawRelationship {
    from: String,
    to: String,
    #[serde(rename = "type")]
    rel_type: String,
    confidence: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawClassification {
    memory_type: String,
    category: Option<String>,
    classification: Option<String>,
    priority: Option<String>,
    #[serde(default)]
    context_labels: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawSummary {
    summary: String,
    #[serde(default)]
    key_points: Vec<String>,
}

/// Status and, on failure, the reason for a single stage (spec §4.4:
/// "pipeline_result ... carries each stage's status ... and error").
#[derive(Debug, Clone)]
pub struct StageReport {
    pub status: SubStatus,
    pub error: Option<String>,
}

impl StageReport {
    fn completed() -> Self {
        Self { status: SubStatus::Completed, error: None }
    }
    fn skipped() -> Self {
        Self { status: SubStatus::Skipped, error: None }
    }
    fn failed(message: impl Into<String>) -> Self {
        Self { status: SubStatus::Failed, error: Some(message.into()) }
    }
}

/// The four stage reports plus enough of stage 1's output for the
/// worker to fold into a confidence recomputation.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub entity: StageReport,
    pub relationship: StageReport,
    pub classification: StageReport,
    pub summary: StageReport,
    pub entities_extracted: usize,
}

/// Runs all four stages against `memory`, persisting after each one so
/// a crash mid-pipeline preserves every stage that did complete (spec
/// §4.4, §5: "not transactional across stages").
pub fn run<S, L>(memory: &mut Memory, store: &S, text_gen: &L, settings: &ConnectionSettings, now: DateTime<Utc>) -> Result<PipelineResult>
where
    S: MemoryStore + ?Sized,
    L: LlmTextGenerator + ?Sized,
{
    let (entity_report, entities) = run_entity_stage(memory, store, text_gen, settings, now)?;
    memory.enrichment.entity = entity_report.status;
    commit(memory, store)?;

    let relationship_report = if entities.is_empty() {
        StageReport::skipped()
    } else {
        run_relationship_stage(&memory.content, store, text_gen, settings, &entities, now)
    };
    memory.enrichment.relationship = relationship_report.status;
    commit(memory, store)?;

    let classification_report = run_classification_stage(memory, text_gen, settings);
    memory.enrichment.classification = classification_report.status;
    commit(memory, store)?;

    let summary_report = run_summary_stage(memory, text_gen);
    memory.enrichment.summarization = summary_report.status;
    commit(memory, store)?;

    Ok(PipelineResult {
        entity: entity_report,
        relationship: relationship_report,
        classification: classification_report,
        summary: summary_report,
        entities_extracted: entities.len(),
    })
}

fn commit<S: MemoryStore + ?Sized>(memory: &Memory, store: &S) -> Result<()> {
    store.update(memory).map_err(|e| Error::ExternalUnavailable(e.0))
}

/// Stage 1: entities. Failure here is fatal to the whole pipeline
/// (spec §4.4: "Stage 1 failure fails the whole pipeline").
fn run_entity_stage<S, L>(memory: &mut Memory, store: &S, text_gen: &L, settings: &ConnectionSettings, now: DateTime<Utc>) -> Result<(StageReport, Vec<Entity>)>
where
    S: MemoryStore + ?Sized,
    L: LlmTextGenerator + ?Sized,
{
    let prompt = prompts::entity_prompt(&memory.content, settings);
    let raw = text_gen.complete(&prompt).map_err(|e| Error::ExternalUnavailable(e.0))?;
    let parsed: Vec<RawEntity> = serde_json::from_str(&raw).map_err(|e| Error::Parse(e.to_string()))?;

    let mut accepted = Vec::new();
    for candidate in parsed {
        if !(0.0..=1.0).contains(&candidate.confidence) {
            continue;
        }
        if !settings.allows_entity_type(&candidate.entity_type) {
            let _ = store.record_unknown_type(&memory.domain, &candidate.entity_type, now);
            continue;
        }
        let Ok(entity) = store.upsert_entity(&candidate.entity_type, &candidate.name, candidate.description, now) else {
            continue;
        };
        if store.link_memory_entity(&memory.id, &entity.id, candidate.confidence, now).is_err() {
            continue;
        }
        memory.entities.insert(entity.id.clone());
        accepted.push(entity);
    }

    Ok((StageReport::completed(), accepted))
}

/// Stage 2: relationships, skipped upstream when no entities were
/// extracted. Prompt includes the extracted entities verbatim.
fn run_relationship_stage<S, L>(content: &str, store: &S, text_gen: &L, settings: &ConnectionSettings, entities: &[Entity], now: DateTime<Utc>) -> StageReport
where
    S: MemoryStore + ?Sized,
    L: LlmTextGenerator + ?Sized,
{
    let prompt = prompts::relationship_prompt(content, entities, settings);

    let raw = match text_gen.complete(&prompt) {
        Ok(raw) => raw,
        Err(e) => return StageReport::failed(e.0),
    };
    let parsed: Vec<RawRelationship> = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(e) => return StageReport::failed(e.to_string()),
    };

    let by_name = |name: &str| entities.iter().find(|e| e.name.eq_ignore_ascii_case(name));

    for candidate in parsed {
        if !(0.0..=1.0).contains(&candidate.confidence) {
            continue;
        }
        if !settings.allows_relationship_type(&candidate.rel_type) {
            continue;
        }
        let (Some(from), Some(to)) = (by_name(&candidate.from), by_name(&candidate.to)) else {
            continue;
        };
        let relationship = crate::memory::Relationship::new(&from.id, &to.id, &candidate.rel_type, candidate.confidence, now);
        let _ = store.upsert_relationship(relationship);
    }

    StageReport::completed()
}

/// Stage 3: classification, validated against the domain's merged
/// `memory_type` allow-list before being written to `memory`.
fn run_classification_stage<L: LlmTextGenerator + ?Sized>(memory: &mut Memory, text_gen: &L, settings: &ConnectionSettings) -> StageReport {
    let prompt = prompts::classification_prompt(&memory.content, settings);
    let raw = match text_gen.complete(&prompt) {
        Ok(raw) => raw,
        Err(e) => return StageReport::failed(e.0),
    };
    let parsed: RawClassification = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(e) => return StageReport::failed(e.to_string()),
    };
    if !settings.allows_memory_type(&parsed.memory_type) {
        return StageReport::failed(format!("memory_type '{}' is not in the allow-list", parsed.memory_type));
    }

    memory.memory_type = Some(parsed.memory_type);
    memory.category = parsed.category;
    memory.classification = parsed.classification;
    memory.priority = parsed.priority;
    memory.context_labels = parsed.context_labels;
    memory.tags = parsed.tags;

    StageReport::completed()
}

/// Stage 4: summarization.
fn run_summary_stage<L: LlmTextGenerator + ?Sized>(memory: &mut Memory, text_gen: &L) -> StageReport {
    let prompt = prompts::summary_prompt(&memory.content);
    let raw = match text_gen.complete(&prompt) {
        Ok(raw) => raw,
        Err(e) => return StageReport::failed(e.0),
    };
    let parsed: RawSummary = match serde_json::from_str(&raw) {
        Ok(parsed) => parsed,
        Err(e) => return StageReport::failed(e.to_string()),
    };

    memory.summary = Some(parsed.summary);
    memory.key_points = parsed.key_points;

    StageReport::completed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{IngestInput, MemorySource};
    use crate::testing::{InMemoryStore, ScriptedTextGenerator};

    fn fresh_memory() -> Memory {
        Memory::new(
            IngestInput {
                content: "Ada met Charles at the Royal Society.".to_string(),
                domain: "work".to_string(),
                source: MemorySource::Manual,
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn stage1_failure_aborts_before_later_stages() {
        let store = InMemoryStore::new();
        let text_gen = ScriptedTextGenerator::failing("rate limited");
        let mut memory = fresh_memory();
        store.store(memory.clone()).unwrap();
        let settings = ConnectionSettings::new("work");

        let err = run(&mut memory, &store, &text_gen, &settings, Utc::now());
        assert!(matches!(err, Err(Error::ExternalUnavailable(_))));
    }

    #[test]
    fn empty_entities_skip_relationship_stage() {
        let store = InMemoryStore::new();
        let text_gen = ScriptedTextGenerator::new(vec![
            "[]".to_string(),
            "unused".to_string(),
            r#"{"memory_type":"note","category":null,"classification":null,"priority":null,"context_labels":[],"tags":[]}"#.to_string(),
            r#"{"summary":"s","key_points":[]}"#.to_string(),
        ]);
        let mut memory = fresh_memory();
        store.store(memory.clone()).unwrap();
        let settings = ConnectionSettings::new("work");

        let result = run(&mut memory, &store, &text_gen, &settings, Utc::now()).unwrap();
        assert_eq!(result.relationship.status, SubStatus::Skipped);
        assert_eq!(result.entities_extracted, 0);
    }

    #[test]
    fn accepted_entities_are_linked_and_relationships_extracted() {
        let store = InMemoryStore::new();
        let text_gen = ScriptedTextGenerator::new(vec![
            r#"[{"name":"Ada","type":"person","description":null,"confidence":0.9},
                {"name":"Charles","type":"person","description":null,"confidence":0.8}]"#
                .to_string(),
            r#"[{"from":"Ada","to":"Charles","type":"friend_of","confidence":0.7}]"#.to_string(),
            r#"{"memory_type":"note","category":"people","classification":null,"priority":null,"context_labels":[],"tags":["history"]}"#.to_string(),
            r#"{"summary":"Ada met Charles","key_points":["met at the Royal Society"]}"#.to_string(),
        ]);
        let mut memory = fresh_memory();
        store.store(memory.clone()).unwrap();
        let settings = ConnectionSettings::new("work");

        let result = run(&mut memory, &store, &text_gen, &settings, Utc::now()).unwrap();
        assert_eq!(result.entity.status, SubStatus::Completed);
        assert_eq!(result.relationship.status, SubStatus::Completed);
        assert_eq!(result.entities_extracted, 2);
        assert_eq!(memory.tags, vec!["history".to_string()]);
        assert_eq!(memory.summary.as_deref(), Some("Ada met Charles"));
    }

    #[test]
    fn stage3_rejects_disallowed_memory_type_without_aborting_pipeline() {
        let store = InMemoryStore::new();
        let text_gen = ScriptedTextGenerator::new(vec![
            "[]".to_string(),
            "unused".to_string(),
            r#"{"memory_type":"spaceship","category":null,"classification":null,"priority":null,"context_labels":[],"tags":[]}"#.to_string(),
            r#"{"summary":"s","key_points":[]}"#.to_string(),
        ]);
        let mut memory = fresh_memory();
        store.store(memory.clone()).unwrap();
        let mut settings = ConnectionSettings::new("work");
        settings.custom_memory_types.push("note".to_string());

        let result = run(&mut memory, &store, &text_gen, &settings, Utc::now()).unwrap();
        assert_eq!(result.classification.status, SubStatus::Failed);
        assert_eq!(result.summary.status, SubStatus::Completed);
        assert!(memory.memory_type.is_none());
    }
}
