//! Identifier schemes (spec §3, §6).
//!
//! IDs are not secret; they exist to be stable and to sort/group
//! sensibly by prefix. `mem:<domain>:<slug>`, `ent:<type>:<hash>`,
//! `rel:<src>:<dst>:<type>`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

/// Build a `mem:<domain>:<slug>` ID. `slug` is always 16 hex characters.
pub fn memory_id(domain: &str) -> String {
    format!("mem:{domain}:{}", random_hex16())
}

/// Build an `ent:<type>:<hash>` ID from the canonical `(name, type)` pair.
pub fn entity_id(entity_type: &str, name: &str) -> String {
    format!("ent:{entity_type}:{}", content_hash16(&canonical_entity_key(entity_type, name)))
}

/// Build a `rel:<src>:<dst>:<type>` ID.
pub fn relationship_id(source_id: &str, target_id: &str, rel_type: &str) -> String {
    format!("rel:{source_id}:{target_id}:{rel_type}")
}

/// Canonicalised key used both for entity ID hashing and dedup lookups.
pub fn canonical_entity_key(entity_type: &str, name: &str) -> String {
    format!("{}:{}", entity_type.to_lowercase(), name.trim().to_lowercase())
}

/// Canonicalise memory content for `content_hash` (spec §3 invariant:
/// two memories with the same hash in the same domain collide).
pub fn canonicalise_content(content: &str) -> String {
    content.trim().split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Content hash for deduplication, 16 hex characters.
pub fn content_hash(content: &str) -> String {
    content_hash16(&canonicalise_content(content))
}

fn content_hash16(s: &str) -> String {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// 8 random bytes rendered as 16 hex characters.
fn random_hex16() -> String {
    let uuid = uuid::Uuid::new_v4();
    uuid.as_bytes()[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Timestamp-derived slug, used when OS randomness is unavailable
/// (spec §6: "timestamp fallback is used if randomness is unavailable").
/// Exposed so callers embedding this crate in constrained environments
/// can wire it in as `Ids`' slug source.
pub fn timestamp_fallback_hex16() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("{:016x}", nanos as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_id_has_16_hex_slug() {
        let id = memory_id("work");
        let slug = id.rsplit(':').next().unwrap();
        assert_eq!(slug.len(), 16);
        assert!(slug.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(id.starts_with("mem:work:"));
    }

    #[test]
    fn entity_id_is_stable_for_same_canonical_key() {
        let a = entity_id("person", "Ada Lovelace");
        let b = entity_id("person", "  ada lovelace ");
        assert_eq!(a, b);
    }

    #[test]
    fn entity_id_differs_by_type() {
        let a = entity_id("person", "Ada");
        let b = entity_id("organization", "Ada");
        assert_ne!(a, b);
    }

    #[test]
    fn relationship_id_embeds_endpoints() {
        let id = relationship_id("ent:person:aaaa", "ent:person:bbbb", "friend_of");
        assert_eq!(id, "rel:ent:person:aaaa:ent:person:bbbb:friend_of");
    }

    #[test]
    fn content_hash_ignores_whitespace_and_case() {
        let a = content_hash("Hello   world");
        let b = content_hash("hello world  ");
        assert_eq!(a, b);
        let c = content_hash("hello mars");
        assert_ne!(a, c);
    }

    #[test]
    fn fallback_hex_is_well_formed() {
        let hex = timestamp_fallback_hex16();
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
