//! Identifier forms and generation.
//!
//! Two forms exist in project files:
//! - legacy: a decimal integer that round-trips through integer parsing
//! - stable: a random token in hyphenated UUID form
//!
//! Legacy identifiers are assigned per document and carry no cross-document
//! meaning.

use uuid::Uuid;

/// True if `id` is a legacy integer identifier.
///
/// `"12"` and `"-3"` qualify; `"007"`, `"+3"`, `"-0"` and `"1.0"` do not.
pub fn is_legacy_id(id: &str) -> bool {
    id.parse::<i64>().is_ok_and(|n| n.to_string() == id)
}

/// True if `id` is a stable identifier (hyphenated UUID, any version).
pub fn is_stable_id(id: &str) -> bool {
    id.len() == 36 && Uuid::parse_str(id).is_ok()
}

/// The "looks like an identifier" test used when collecting reference sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPredicate {
    /// Only legacy identifiers. Used by the migrator.
    Legacy,
    /// Legacy or stable identifiers. Used by align.
    LegacyOrStable,
}

impl IdPredicate {
    pub fn matches(self, value: &str) -> bool {
        match self {
            Self::Legacy => is_legacy_id(value),
            Self::LegacyOrStable => is_legacy_id(value) || is_stable_id(value),
        }
    }
}

/// Source of fresh stable identifiers.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&mut self) -> String {
        Uuid::new_v4().to_string()
    }
}
