//! Entities and relationships (spec §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The closed system set of entity types (~22 values). Per-domain
/// custom types live alongside these as plain strings validated
/// against [`ConnectionSettings`](super::ConnectionSettings).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SystemEntityType {
    Person,
    Organization,
    Project,
    Location,
    Event,
    Concept,
    Tool,
    Technology,
    Product,
    Document,
    Task,
    Goal,
    Skill,
    Topic,
    Tag,
    Date,
    Email,
    Url,
    File,
    Language,
    Framework,
    Role,
}

impl SystemEntityType {
    pub const ALL: [SystemEntityType; 22] = [
        Self::Person,
        Self::Organization,
        Self::Project,
        Self::Location,
        Self::Event,
        Self::Concept,
        Self::Tool,
        Self::Technology,
        Self::Product,
        Self::Document,
        Self::Task,
        Self::Goal,
        Self::Skill,
        Self::Topic,
        Self::Tag,
        Self::Date,
        Self::Email,
        Self::Url,
        Self::File,
        Self::Language,
        Self::Framework,
        Self::Role,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Organization => "organization",
            Self::Project => "project",
            Self::Location => "location",
            Self::Event => "event",
            Self::Concept => "concept",
            Self::Tool => "tool",
            Self::Technology => "technology",
            Self::Product => "product",
            Self::Document => "document",
            Self::Task => "task",
            Self::Goal => "goal",
            Self::Skill => "skill",
            Self::Topic => "topic",
            Self::Tag => "tag",
            Self::Date => "date",
            Self::Email => "email",
            Self::Url => "url",
            Self::File => "file",
            Self::Language => "language",
            Self::Framework => "framework",
            Self::Role => "role",
        }
    }

    pub fn from_str_system(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s.to_lowercase())
    }
}

/// The closed system list of relationship types (~44 values).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SystemRelationshipType {
    FriendOf,
    RelatedTo,
    SimilarTo,
    CollaboratesWith,
    MarriedTo,
    ParentOf,
    ChildOf,
    Supervises,
    SupervisedBy,
    Owns,
    OwnedBy,
    Manages,
    ManagedBy,
    Creates,
    CreatedBy,
    Employs,
    EmployedBy,
    Mentors,
    MentoredBy,
    Teaches,
    TaughtBy,
    Leads,
    LedBy,
    Uses,
    UsedBy,
    DependsOn,
    DependencyOf,
    PartOf,
    Contains,
    Precedes,
    Follows,
    Causes,
    CausedBy,
    Supersedes,
    SupersededBy,
    BelongsTo,
    Has,
    WorksOn,
    WorkedOnBy,
    LocatedIn,
    HasLocation,
    MemberOf,
    HasMember,
}

impl SystemRelationshipType {
    pub const ALL: [SystemRelationshipType; 43] = [
        Self::FriendOf,
        Self::RelatedTo,
        Self::SimilarTo,
        Self::CollaboratesWith,
        Self::MarriedTo,
        Self::ParentOf,
        Self::ChildOf,
        Self::Supervises,
        Self::SupervisedBy,
        Self::Owns,
        Self::OwnedBy,
        Self::Manages,
        Self::ManagedBy,
        Self::Creates,
        Self::CreatedBy,
        Self::Employs,
        Self::EmployedBy,
        Self::Mentors,
        Self::MentoredBy,
        Self::Teaches,
        Self::TaughtBy,
        Self::Leads,
        Self::LedBy,
        Self::Uses,
        Self::UsedBy,
        Self::DependsOn,
        Self::DependencyOf,
        Self::PartOf,
        Self::Contains,
        Self::Precedes,
        Self::Follows,
        Self::Causes,
        Self::CausedBy,
        Self::Supersedes,
        Self::SupersededBy,
        Self::BelongsTo,
        Self::Has,
        Self::WorksOn,
        Self::WorkedOnBy,
        Self::LocatedIn,
        Self::HasLocation,
        Self::MemberOf,
        Self::HasMember,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FriendOf => "friend_of",
            Self::RelatedTo => "related_to",
            Self::SimilarTo => "similar_to",
            Self::CollaboratesWith => "collaborates_with",
            Self::MarriedTo => "married_to",
            Self::ParentOf => "parent_of",
            Self::ChildOf => "child_of",
            Self::Supervises => "supervises",
            Self::SupervisedBy => "supervised_by",
            Self::Owns => "owns",
            Self::OwnedBy => "owned_by",
            Self::Manages => "manages",
            Self::ManagedBy => "managed_by",
            Self::Creates => "creates",
            Self::CreatedBy => "created_by",
            Self::Employs => "employs",
            Self::EmployedBy => "employed_by",
            Self::Mentors => "mentors",
            Self::MentoredBy => "mentored_by",
            Self::Teaches => "teaches",
            Self::TaughtBy => "taught_by",
            Self::Leads => "leads",
            Self::LedBy => "led_by",
            Self::Uses => "uses",
            Self::UsedBy => "used_by",
            Self::DependsOn => "depends_on",
            Self::DependencyOf => "dependency_of",
            Self::PartOf => "part_of",
            Self::Contains => "contains",
            Self::Precedes => "precedes",
            Self::Follows => "follows",
            Self::Causes => "causes",
            Self::CausedBy => "caused_by",
            Self::Supersedes => "supersedes",
            Self::SupersededBy => "superseded_by",
            Self::BelongsTo => "belongs_to",
            Self::Has => "has",
            Self::WorksOn => "works_on",
            Self::WorkedOnBy => "worked_on_by",
            Self::LocatedIn => "located_in",
            Self::HasLocation => "has_location",
            Self::MemberOf => "member_of",
            Self::HasMember => "has_member",
        }
    }

    pub fn from_str_system(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s.to_lowercase())
    }

    /// Whether this type is symmetric or paired with a named inverse
    /// (spec §3: "tagged as symmetric ... or paired with an inverse").
    pub fn symmetry(self) -> RelationshipSymmetry {
        use RelationshipSymmetry::*;
        match self {
            Self::FriendOf | Self::RelatedTo | Self::SimilarTo | Self::CollaboratesWith | Self::MarriedTo => {
                Symmetric
            }
            Self::ParentOf => Inverse(Self::ChildOf),
            Self::ChildOf => Inverse(Self::ParentOf),
            Self::Supervises => Inverse(Self::SupervisedBy),
            Self::SupervisedBy => Inverse(Self::Supervises),
            Self::Owns => Inverse(Self::OwnedBy),
            Self::OwnedBy => Inverse(Self::Owns),
            Self::Manages => Inverse(Self::ManagedBy),
            Self::ManagedBy => Inverse(Self::Manages),
            Self::Creates => Inverse(Self::CreatedBy),
            Self::CreatedBy => Inverse(Self::Creates),
            Self::Employs => Inverse(Self::EmployedBy),
            Self::EmployedBy => Inverse(Self::Employs),
            Self::Mentors => Inverse(Self::MentoredBy),
            Self::MentoredBy => Inverse(Self::Mentors),
            Self::Teaches => Inverse(Self::TaughtBy),
            Self::TaughtBy => Inverse(Self::Teaches),
            Self::Leads => Inverse(Self::LedBy),
            Self::LedBy => Inverse(Self::Leads),
            Self::Uses => Inverse(Self::UsedBy),
            Self::UsedBy => Inverse(Self::Uses),
            Self::DependsOn => Inverse(Self::DependencyOf),
            Self::DependencyOf => Inverse(Self::DependsOn),
            Self::PartOf => Inverse(Self::Contains),
            Self::Contains => Inverse(Self::PartOf),
            Self::Precedes => Inverse(Self::Follows),
            Self::Follows => Inverse(Self::Precedes),
            Self::Causes => Inverse(Self::CausedBy),
            Self::CausedBy => Inverse(Self::Causes),
            Self::Supersedes => Inverse(Self::SupersededBy),
            Self::SupersededBy => Inverse(Self::Supersedes),
            Self::BelongsTo => Inverse(Self::Has),
            Self::Has => Inverse(Self::BelongsTo),
            Self::WorksOn => Inverse(Self::WorkedOnBy),
            Self::WorkedOnBy => Inverse(Self::WorksOn),
            Self::LocatedIn => Inverse(Self::HasLocation),
            Self::HasLocation => Inverse(Self::LocatedIn),
            Self::MemberOf => Inverse(Self::HasMember),
            Self::HasMember => Inverse(Self::MemberOf),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipSymmetry {
    Symmetric,
    Inverse(SystemRelationshipType),
}

/// Relationship type names consulted by the contradiction detector's
/// single-valued check (spec §4.10 item 1).
pub const SINGLE_VALUED_RELATIONSHIP_TYPES: &[&str] =
    &["married_to", "parent_of", "child_of", "supersedes"];

/// A named referent extracted from memories (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub entity_type: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    pub fn new(entity_type: &str, name: &str, description: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: crate::ids::entity_id(entity_type, name),
            name: name.to_string(),
            entity_type: entity_type.to_string(),
            description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A directed edge between two entities (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub rel_type: String,
    pub weight: f32,
    pub bidirectional: bool,
    pub inverse_type: Option<String>,
    pub evidence: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Arbitrary per-relationship metadata, e.g. `temporal_order`
    /// consulted by the contradiction detector (spec §4.10 item 3).
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Relationship {
    pub fn new(source_id: &str, target_id: &str, rel_type: &str, weight: f32, now: DateTime<Utc>) -> Self {
        Self {
            id: crate::ids::relationship_id(source_id, target_id, rel_type),
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            rel_type: rel_type.to_string(),
            weight: weight.clamp(0.0, 1.0),
            bidirectional: false,
            inverse_type: SystemRelationshipType::from_str_system(rel_type)
                .and_then(|t| match t.symmetry() {
                    RelationshipSymmetry::Inverse(inv) => Some(inv.as_str().to_string()),
                    RelationshipSymmetry::Symmetric => None,
                }),
            evidence: BTreeSet::new(),
            created_at: now,
            updated_at: now,
            metadata: serde_json::Map::new(),
        }
    }

    /// Temporal ordering hint consulted by C9 item 3, if present.
    pub fn temporal_order(&self) -> Option<&str> {
        self.metadata.get("temporal_order").and_then(|v| v.as_str())
    }
}

/// `(memory_id, entity_id)` link with monotone frequency/confidence (spec §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntityLink {
    pub frequency: u32,
    pub confidence: f32,
}

impl MemoryEntityLink {
    pub fn first_observation(confidence: f32) -> Self {
        Self {
            frequency: 1,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Merge a re-extraction observation: frequency increases
    /// monotonically, confidence takes the running max (spec §3).
    pub fn observe(&mut self, confidence: f32) {
        self.frequency += 1;
        self.confidence = self.confidence.max(confidence.clamp(0.0, 1.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_entity_type_count_matches_spec() {
        assert_eq!(SystemEntityType::ALL.len(), 22);
    }

    #[test]
    fn system_relationship_type_count_is_approximately_44() {
        assert!((40..=46).contains(&SystemRelationshipType::ALL.len()));
    }

    #[test]
    fn symmetric_types_have_no_inverse() {
        assert_eq!(SystemRelationshipType::MarriedTo.symmetry(), RelationshipSymmetry::Symmetric);
    }

    #[test]
    fn parent_child_are_mutual_inverses() {
        assert_eq!(
            SystemRelationshipType::ParentOf.symmetry(),
            RelationshipSymmetry::Inverse(SystemRelationshipType::ChildOf)
        );
        assert_eq!(
            SystemRelationshipType::ChildOf.symmetry(),
            RelationshipSymmetry::Inverse(SystemRelationshipType::ParentOf)
        );
    }

    #[test]
    fn link_observe_is_monotone_frequency_and_max_confidence() {
        let mut link = MemoryEntityLink::first_observation(0.6);
        link.observe(0.4);
        assert_eq!(link.frequency, 2);
        assert_eq!(link.confidence, 0.6);
        link.observe(0.9);
        assert_eq!(link.frequency, 3);
        assert_eq!(link.confidence, 0.9);
    }

    #[test]
    fn relationship_new_fills_inverse_type_for_known_types() {
        let rel = Relationship::new("ent:person:a", "ent:person:b", "parent_of", 0.9, Utc::now());
        assert_eq!(rel.inverse_type.as_deref(), Some("child_of"));
    }

    #[test]
    fn relationship_new_leaves_inverse_type_none_for_symmetric_or_custom() {
        let rel = Relationship::new("ent:person:a", "ent:person:b", "friend_of", 0.9, Utc::now());
        assert_eq!(rel.inverse_type, None);
        let custom = Relationship::new("ent:person:a", "ent:person:b", "custom_rel", 0.9, Utc::now());
        assert_eq!(custom.inverse_type, None);
    }
}
