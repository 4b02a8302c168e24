//! Prompt assembly for the four enrichment stages (spec §4.4).
//!
//! Each builder states the expected JSON shape explicitly; parsing
//! lives in [`super`], not here.

use crate::memory::ConnectionSettings;

fn allowed_entity_types(settings: &ConnectionSettings) -> String {
    let mut types: Vec<&str> = crate::memory::SystemEntityType::ALL.iter().map(|t| t.as_str()).collect();
    types.extend(settings.custom_entity_types.iter().map(|t| t.name.as_str()));
    types.join(", ")
}

fn allowed_relationship_types(settings: &ConnectionSettings) -> String {
    let mut types: Vec<&str> = crate::memory::SystemRelationshipType::ALL.iter().map(|t| t.as_str()).collect();
    types.extend(settings.custom_relationship_types.iter().map(|t| t.name.as_str()));
    types.join(", ")
}

/// Stage 1: entity extraction.
pub fn entity_prompt(content: &str, settings: &ConnectionSettings) -> String {
    format!(
        "Extract named entities from the text below. Allowed types: {types}.\n\
         Respond with a JSON array of objects: {{\"name\": string, \"type\": string, \
         \"description\": string|null, \"confidence\": number between 0 and 1}}.\n\n\
         Text:\n{content}",
        types = allowed_entity_types(settings),
    )
}

/// Stage 2: relationship extraction, given the entities stage 1 produced.
pub fn relationship_prompt(content: &str, entities: &[crate::memory::Entity], settings: &ConnectionSettings) -> String {
    let entity_list = entities
        .iter()
        .map(|e| format!("- {} ({})", e.name, e.entity_type))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Given the entities below, extract relationships between them mentioned in the text. \
         Allowed relationship types: {types}.\n\
         Respond with a JSON array of objects: {{\"from\": string, \"to\": string, \"type\": string, \
         \"confidence\": number between 0 and 1}}, where \"from\"/\"to\" are entity names.\n\n\
         Entities:\n{entity_list}\n\nText:\n{content}",
        types = allowed_relationship_types(settings),
    )
}

/// Stage 3: classification.
pub fn classification_prompt(content: &str, settings: &ConnectionSettings) -> String {
    let allow_list = if settings.custom_memory_types.is_empty() {
        "any".to_string()
    } else {
        settings.custom_memory_types.join(", ")
    };
    format!(
        "Classify the text below. Allowed memory types: {allow_list}.\n\
         Respond with a JSON object: {{\"memory_type\": string, \"category\": string|null, \
         \"classification\": string|null, \"priority\": string|null, \"context_labels\": string[], \
         \"tags\": string[], \"confidence\": number between 0 and 1}}.\n\n\
         Text:\n{content}"
    )
}

/// Stage 4: summarization.
pub fn summary_prompt(content: &str) -> String {
    format!(
        "Summarize the text below.\n\
         Respond with a JSON object: {{\"summary\": string, \"key_points\": string[]}}.\n\n\
         Text:\n{content}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_prompt_lists_system_types() {
        let prompt = entity_prompt("hello", &ConnectionSettings::new("work"));
        assert!(prompt.contains("person"));
        assert!(prompt.contains("hello"));
    }

    #[test]
    fn classification_prompt_reports_unrestricted_allow_list() {
        let prompt = classification_prompt("hello", &ConnectionSettings::new("work"));
        assert!(prompt.contains("any"));
    }
}
