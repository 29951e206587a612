//! Configuration structures for projalign-core.
//!
//! This module defines explicit, serializable option objects used by the CLI
//! (or any other host) to control alignment and identifier migration, plus the
//! static per-collection tables the algorithms run over.
//!
//! The core crate itself does not read environment variables. All configuration
//! must be provided explicitly by the caller.

use serde::{Deserialize, Serialize};

use crate::errors::{ProjalignError, ProjalignResult};
use crate::project::CollectionKind;

/// Collections visited by align, in the order of one pass.
///
/// Later collections can have identity fields that point at earlier ones
/// (pipeline -> shader, skin -> joints), so the order is fixed.
pub const ALIGN_ORDER: [CollectionKind; 11] = [
    CollectionKind::Objects,
    CollectionKind::Meshes,
    CollectionKind::Textures,
    CollectionKind::Images,
    CollectionKind::Materials,
    CollectionKind::Shaders,
    CollectionKind::Animations,
    CollectionKind::Skins,
    CollectionKind::Pipelines,
    CollectionKind::Files,
    CollectionKind::Fonts,
];

/// Ordered field names used as the fallback matching heuristic for one
/// collection. Empty means structural equality only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySpec {
    pub fields: Vec<String>,
}

impl IdentitySpec {
    pub fn new(fields: &[&str]) -> Self {
        Self {
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// The identity fields configured for a collection.
pub fn identity_spec(kind: CollectionKind) -> IdentitySpec {
    match kind {
        CollectionKind::Objects => IdentitySpec::new(&["link", "name", "parent"]),
        CollectionKind::Skins => IdentitySpec::new(&["link", "name", "joints"]),
        CollectionKind::Pipelines => IdentitySpec::new(&["link", "name", "shader"]),
        CollectionKind::Files => IdentitySpec::new(&[]),
        CollectionKind::Meshes
        | CollectionKind::Textures
        | CollectionKind::Images
        | CollectionKind::Materials
        | CollectionKind::Shaders
        | CollectionKind::Animations
        | CollectionKind::Fonts
        | CollectionKind::Languages => IdentitySpec::new(&["link", "name"]),
    }
}

/// What align is allowed to reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignScope {
    Ids,
}

/// Options for `align::align_projects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignOptions {
    /// Structural equality only; no identity-field fallback.
    #[serde(default)]
    pub strict: bool,

    /// Apply non-unique matches and treat unknown component string fields as
    /// references. Every such decision is recorded in the report.
    #[serde(default)]
    pub unsafe_mode: bool,

    /// What to reconcile. Defaults to everything.
    #[serde(default = "AlignOptions::default_scopes")]
    pub scopes: Vec<AlignScope>,

    /// Restrict the passes to these collections. `None` means all of
    /// `ALIGN_ORDER`.
    #[serde(default)]
    pub include: Option<Vec<CollectionKind>>,

    /// Report the target as writable even if duplicates remain after align.
    #[serde(default)]
    pub allow_duplicates_after: bool,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            strict: false,
            unsafe_mode: false,
            scopes: Self::default_scopes(),
            include: None,
            allow_duplicates_after: false,
        }
    }
}

impl AlignOptions {
    fn default_scopes() -> Vec<AlignScope> {
        vec![AlignScope::Ids]
    }

    pub fn aligns_ids(&self) -> bool {
        self.scopes.contains(&AlignScope::Ids)
    }

    /// Collections to visit each pass, in `ALIGN_ORDER`.
    pub fn collections(&self) -> Vec<CollectionKind> {
        ALIGN_ORDER
            .iter()
            .copied()
            .filter(|k| self.include.as_ref().map_or(true, |inc| inc.contains(k)))
            .collect()
    }
}

/// Options for `migrate::migrate_ids`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrateOptions {
    /// Treat unknown component string fields holding legacy identifiers as
    /// references.
    #[serde(default)]
    pub unsafe_mode: bool,

    /// Only report duplicates; do not rewrite anything.
    #[serde(default)]
    pub duplicates_only: bool,

    /// Report the project as writable even if a token collision produced
    /// duplicates.
    #[serde(default)]
    pub allow_duplicates_after: bool,
}

pub fn validate_align_options(opts: &AlignOptions) -> ProjalignResult<()> {
    if opts.scopes.is_empty() {
        return Err(ProjalignError::invalid_argument(
            "at least one align scope is required",
        ));
    }

    if let Some(include) = &opts.include {
        if include.is_empty() {
            return Err(ProjalignError::invalid_argument(
                "include list must not be empty",
            ));
        }
        if include.contains(&CollectionKind::Languages) {
            return Err(ProjalignError::invalid_argument(
                "languages are not aligned",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        let opts = AlignOptions::default();
        validate_align_options(&opts).unwrap();
        assert!(opts.aligns_ids());
        assert_eq!(opts.collections(), ALIGN_ORDER.to_vec());
    }

    #[test]
    fn include_filters_but_keeps_order() {
        let opts = AlignOptions {
            include: Some(vec![CollectionKind::Shaders, CollectionKind::Meshes]),
            ..Default::default()
        };
        assert_eq!(
            opts.collections(),
            vec![CollectionKind::Meshes, CollectionKind::Shaders]
        );
    }

    #[test]
    fn invalid_options_detected() {
        let mut opts = AlignOptions::default();
        opts.include = Some(vec![]);
        assert!(validate_align_options(&opts).is_err());

        opts.include = Some(vec![CollectionKind::Languages]);
        assert!(validate_align_options(&opts).is_err());

        let opts = AlignOptions {
            scopes: vec![],
            ..Default::default()
        };
        assert!(validate_align_options(&opts).is_err());
    }

    #[test]
    fn identity_table() {
        assert!(identity_spec(CollectionKind::Files).is_empty());
        assert_eq!(
            identity_spec(CollectionKind::Pipelines).fields,
            vec!["link", "name", "shader"]
        );
        assert_eq!(identity_spec(CollectionKind::Meshes).fields, vec!["link", "name"]);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: AlignOptions = serde_json::from_str(r#"{"strict": true}"#).unwrap();
        assert!(opts.strict);
        assert_eq!(opts.scopes, vec![AlignScope::Ids]);
        assert!(opts.include.is_none());
    }
}
