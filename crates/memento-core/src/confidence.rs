//! Confidence scorer (spec §4.3). Pure functions over [`Memory`] and
//! [`Relationship`] fields; no collaborator calls.

use chrono::{DateTime, Utc};

use crate::memory::{Memory, MemorySource, Relationship, SubStatus};

const WEIGHT_ENTITY: f32 = 0.3;
const WEIGHT_RELATIONSHIP: f32 = 0.2;
const WEIGHT_SOURCE: f32 = 0.3;
const WEIGHT_AGE: f32 = 0.2;

fn sub_score(status: SubStatus, count: usize, bonus_threshold: Option<usize>) -> f32 {
    match status {
        SubStatus::Failed => 0.2,
        SubStatus::Skipped | SubStatus::Pending | SubStatus::Processing => 0.5,
        SubStatus::Completed => {
            let bonus = match bonus_threshold {
                Some(threshold) if count >= threshold => 0.2,
                Some(_) => 0.0,
                None => 0.1 * count as f32,
            };
            (0.7 + bonus).min(1.0)
        }
    }
}

/// Entity sub-score: `0.7 + 0.1·n` capped at `1.0`, per spec §4.3.
pub fn entity_score(status: SubStatus, entity_count: usize) -> f32 {
    sub_score(status, entity_count, None)
}

/// Relationship sub-score: the "with entities" bonus is a flat `+0.2`
/// gated on having at least two entities, rather than per-count.
pub fn relationship_score(status: SubStatus, entity_count: usize) -> f32 {
    sub_score(status, entity_count, Some(2))
}

pub fn source_score(source: MemorySource) -> f32 {
    match source {
        MemorySource::Manual => 1.0,
        MemorySource::Note => 0.95,
        MemorySource::Document => 0.85,
        MemorySource::Email => 0.8,
        MemorySource::Message => 0.75,
        MemorySource::Imported => 0.7,
        MemorySource::Auto => 0.6,
        MemorySource::AiSummary => 0.5,
        MemorySource::Unknown => 0.5,
    }
}

/// Step function in the age of `reference` relative to `now`.
pub fn age_score(reference: DateTime<Utc>, now: DateTime<Utc>) -> f32 {
    let days = (now - reference).num_hours().max(0) as f64 / 24.0;
    if days < 1.0 {
        1.0
    } else if days < 7.0 {
        0.9
    } else if days < 30.0 {
        0.8
    } else if days < 90.0 {
        0.7
    } else if days < 180.0 {
        0.6
    } else if days < 365.0 {
        0.5
    } else {
        0.4
    }
}

/// Weighted combination of the four sub-scores (spec §4.3).
pub fn memory_confidence(memory: &Memory, now: DateTime<Utc>) -> f32 {
    let entity_count = memory.entities.len();
    let entity = entity_score(memory.enrichment.entity, entity_count);
    let relationship = relationship_score(memory.enrichment.relationship, entity_count);
    let source = source_score(memory.source);
    let age = age_score(memory.decay_reference_time(), now);

    (WEIGHT_ENTITY * entity + WEIGHT_RELATIONSHIP * relationship + WEIGHT_SOURCE * source + WEIGHT_AGE * age)
        .clamp(0.0, 1.0)
}

/// Relationship confidence: base `0.5` (overridden by an explicit
/// non-zero `weight`), plus evidence/bidirectional/recency bonuses,
/// clamped to `[0, 1]` (spec §4.3).
pub fn relationship_confidence(relationship: &Relationship, now: DateTime<Utc>) -> f32 {
    let base = if relationship.weight > 0.0 {
        relationship.weight
    } else {
        0.5
    };
    let evidence_bonus = (0.1 * relationship.evidence.len() as f32).min(0.3);
    let bidirectional_bonus = if relationship.bidirectional { 0.1 } else { 0.0 };
    let recency_bonus = if (now - relationship.created_at).num_days() < 30 {
        0.1
    } else {
        0.0
    };
    (base + evidence_bonus + bidirectional_bonus + recency_bonus).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn entity_score_failed_is_fixed_low() {
        assert_eq!(entity_score(SubStatus::Failed, 5), 0.2);
    }

    #[test]
    fn entity_score_completed_scales_with_count_and_caps() {
        assert!((entity_score(SubStatus::Completed, 0) - 0.7).abs() < 1e-6);
        assert!((entity_score(SubStatus::Completed, 2) - 0.9).abs() < 1e-6);
        assert_eq!(entity_score(SubStatus::Completed, 10), 1.0);
    }

    #[test]
    fn relationship_score_bonus_requires_two_entities() {
        assert!((relationship_score(SubStatus::Completed, 1) - 0.7).abs() < 1e-6);
        assert!((relationship_score(SubStatus::Completed, 2) - 0.9).abs() < 1e-6);
        assert!((relationship_score(SubStatus::Completed, 5) - 0.9).abs() < 1e-6);
    }

    #[test]
    fn source_score_table_matches_spec() {
        assert_eq!(source_score(MemorySource::Manual), 1.0);
        assert_eq!(source_score(MemorySource::AiSummary), 0.5);
        assert_eq!(source_score(MemorySource::Unknown), 0.5);
    }

    #[test]
    fn age_score_step_function() {
        let now = Utc::now();
        assert_eq!(age_score(now, now), 1.0);
        assert_eq!(age_score(now - Duration::days(10), now), 0.8);
        assert_eq!(age_score(now - Duration::days(400), now), 0.4);
    }

    #[test]
    fn relationship_confidence_uses_explicit_weight_as_base() {
        let now = Utc::now();
        let mut relationship = Relationship::new("a", "b", "friend_of", 0.9, now);
        relationship.evidence.insert("mem:work:aaaaaaaaaaaaaaaa".to_string());
        let confidence = relationship_confidence(&relationship, now);
        assert!((confidence - 1.0).abs() < 1e-6, "confidence = {confidence}");
    }

    #[test]
    fn relationship_confidence_falls_back_to_base_half() {
        let now = Utc::now();
        let relationship = Relationship::new("a", "b", "friend_of", 0.0, now - Duration::days(60));
        let confidence = relationship_confidence(&relationship, now);
        assert!((confidence - 0.5).abs() < 1e-6);
    }
}
