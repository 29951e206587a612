//! Structured results of align and migrate runs.
//!
//! Every stage returns its findings by value. The caller owns the report,
//! decides what to print and derives the process outcome from `outcome`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::project::CollectionKind;
use crate::schema::SchemaStatus;

/// How a target resource was judged equivalent to a source resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Full structural equality.
    Strict,
    /// Equality of the collection's identity fields only.
    Heuristic,
}

/// One identifier change applied to a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRecord {
    pub collection: CollectionKind,
    pub old_id: String,
    pub new_id: String,
    /// `None` for migration renames, which are unconditional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_kind: Option<MatchKind>,
    /// Reference sites rewritten from `old_id` to `new_id`.
    pub sites_rewritten: usize,
}

/// What the reference index builder had to guess or leave out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Component type -> fields with no schema definition whose value looked
    /// like an identifier.
    pub unsafe_component_fields: BTreeMap<String, Vec<String>>,
    /// Material property -> member names whose value looked like an
    /// identifier and was indexed.
    pub material_property_ids: BTreeMap<String, Vec<String>>,
    /// Candidate sites left out because inference was not allowed.
    pub ignored_sites: usize,
}

impl ScanReport {
    pub fn record_unsafe_field(&mut self, component_type: &str, field: &str) {
        push_unique(&mut self.unsafe_component_fields, component_type, field);
    }

    pub fn record_material_property(&mut self, property: &str, field: &str) {
        push_unique(&mut self.material_property_ids, property, field);
    }

    pub fn has_unsafe_inferences(&self) -> bool {
        !self.unsafe_component_fields.is_empty()
    }
}

fn push_unique(map: &mut BTreeMap<String, Vec<String>>, key: &str, value: &str) {
    let entry = map.entry(key.to_string()).or_default();
    if !entry.iter().any(|v| v == value) {
        entry.push(value.to_string());
    }
}

/// Final state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The document is consistent and may be written.
    Completed,
    /// Input already had duplicate identifiers; nothing was changed.
    PreexistingDuplicates,
    /// The run produced duplicate identifiers; the write must be withheld.
    PostOperationDuplicates,
    /// Duplicates were reported; no rewrite was requested.
    DryRun,
    /// The pair was not processed (target is the source file).
    Skipped,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Completed | Self::DryRun)
    }
}

/// Result of aligning one target against one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignReport {
    pub source_duplicates: Vec<String>,
    pub target_duplicates: Vec<String>,
    pub duplicates_after: Vec<String>,
    pub renames: Vec<RenameRecord>,
    /// Source identifiers already present in the target.
    pub already_aligned: Vec<String>,
    /// Source identifiers applied although the match was not unique.
    pub non_unique: Vec<String>,
    /// Full passes run, including the final pass with no change.
    pub passes: usize,
    pub scan: ScanReport,
    pub schema: SchemaStatus,
    /// Set when post-operation duplicates were accepted by the caller.
    pub forced: bool,
    pub outcome: Outcome,
}

impl AlignReport {
    pub fn new(schema: SchemaStatus) -> Self {
        Self {
            source_duplicates: Vec::new(),
            target_duplicates: Vec::new(),
            duplicates_after: Vec::new(),
            renames: Vec::new(),
            already_aligned: Vec::new(),
            non_unique: Vec::new(),
            passes: 0,
            scan: ScanReport::default(),
            schema,
            forced: false,
            outcome: Outcome::Completed,
        }
    }

    pub fn skipped() -> Self {
        Self {
            outcome: Outcome::Skipped,
            ..Self::new(SchemaStatus::Ignored)
        }
    }

    pub fn changed(&self) -> bool {
        !self.renames.is_empty()
    }

    /// True if the target may be written.
    pub fn writable(&self) -> bool {
        self.outcome == Outcome::Completed
            || (self.outcome == Outcome::PostOperationDuplicates && self.forced)
    }
}

/// Result of migrating one project to stable identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateReport {
    pub duplicates: Vec<String>,
    pub duplicates_after: Vec<String>,
    pub renames: Vec<RenameRecord>,
    /// Generated tokens discarded because they already existed.
    pub regenerated: usize,
    pub scan: ScanReport,
    pub schema: SchemaStatus,
    pub forced: bool,
    pub outcome: Outcome,
}

impl MigrateReport {
    pub fn new(schema: SchemaStatus) -> Self {
        Self {
            duplicates: Vec::new(),
            duplicates_after: Vec::new(),
            renames: Vec::new(),
            regenerated: 0,
            scan: ScanReport::default(),
            schema,
            forced: false,
            outcome: Outcome::Completed,
        }
    }

    pub fn writable(&self) -> bool {
        self.outcome == Outcome::Completed
            || (self.outcome == Outcome::PostOperationDuplicates && self.forced)
    }
}
