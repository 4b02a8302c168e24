//! Per-domain connection settings (spec §3).
//!
//! Consulted to build the allow-list for enrichment output (spec §4.4)
//! and for the active classification category.

use serde::{Deserialize, Serialize};

use super::entity::{RelationshipSymmetry, SystemEntityType, SystemRelationshipType};

/// A per-domain custom entity type declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomEntityType {
    pub name: String,
}

/// A per-domain custom relationship type declaration, carrying its own
/// symmetry metadata since it isn't known at compile time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomRelationshipType {
    pub name: String,
    pub symmetric: bool,
    pub inverse_type: Option<String>,
}

/// Per-domain customisations (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    pub domain: String,
    pub custom_entity_types: Vec<CustomEntityType>,
    pub custom_relationship_types: Vec<CustomRelationshipType>,
    pub custom_memory_types: Vec<String>,
    pub active_classification_category: Option<String>,
}

impl ConnectionSettings {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }

    /// True if `entity_type` is in the system set or this domain's custom set.
    pub fn allows_entity_type(&self, entity_type: &str) -> bool {
        SystemEntityType::from_str_system(entity_type).is_some()
            || self
                .custom_entity_types
                .iter()
                .any(|t| t.name.eq_ignore_ascii_case(entity_type))
    }

    /// True if `rel_type` is in the system set or this domain's custom set.
    pub fn allows_relationship_type(&self, rel_type: &str) -> bool {
        SystemRelationshipType::from_str_system(rel_type).is_some()
            || self
                .custom_relationship_types
                .iter()
                .any(|t| t.name.eq_ignore_ascii_case(rel_type))
    }

    /// True if `memory_type` is in the per-domain custom memory-type allow-list.
    /// An empty allow-list permits anything (spec §4.4: "validated against the
    /// merged `memory_type` allow-list").
    pub fn allows_memory_type(&self, memory_type: &str) -> bool {
        self.custom_memory_types.is_empty()
            || self
                .custom_memory_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(memory_type))
    }

    /// Symmetry metadata for a relationship type, system or custom.
    pub fn relationship_symmetry(&self, rel_type: &str) -> Option<RelSymmetryInfo> {
        if let Some(system) = SystemRelationshipType::from_str_system(rel_type) {
            return Some(match system.symmetry() {
                RelationshipSymmetry::Symmetric => RelSymmetryInfo {
                    symmetric: true,
                    inverse_type: None,
                },
                RelationshipSymmetry::Inverse(inv) => RelSymmetryInfo {
                    symmetric: false,
                    inverse_type: Some(inv.as_str().to_string()),
                },
            });
        }
        self.custom_relationship_types
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(rel_type))
            .map(|t| RelSymmetryInfo {
                symmetric: t.symmetric,
                inverse_type: t.inverse_type.clone(),
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelSymmetryInfo {
    pub symmetric: bool,
    pub inverse_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_types_allowed_without_custom_declarations() {
        let settings = ConnectionSettings::new("work");
        assert!(settings.allows_entity_type("person"));
        assert!(settings.allows_relationship_type("friend_of"));
    }

    #[test]
    fn unknown_type_rejected_without_custom_declaration() {
        let settings = ConnectionSettings::new("work");
        assert!(!settings.allows_entity_type("spaceship"));
    }

    #[test]
    fn custom_type_allowed_once_declared() {
        let mut settings = ConnectionSettings::new("work");
        settings.custom_entity_types.push(CustomEntityType {
            name: "spaceship".to_string(),
        });
        assert!(settings.allows_entity_type("spaceship"));
        assert!(settings.allows_entity_type("Spaceship"));
    }

    #[test]
    fn empty_memory_type_allow_list_permits_anything() {
        let settings = ConnectionSettings::new("work");
        assert!(settings.allows_memory_type("note"));
    }

    #[test]
    fn nonempty_memory_type_allow_list_restricts() {
        let mut settings = ConnectionSettings::new("work");
        settings.custom_memory_types.push("task".to_string());
        assert!(settings.allows_memory_type("task"));
        assert!(!settings.allows_memory_type("note"));
    }
}
