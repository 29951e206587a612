//! Resource matching between a source and a target collection.
//!
//! A source resource is matched in two steps:
//! 1. strict: a target resource structurally equal to it
//! 2. heuristic: a target resource whose identity fields equal its own
//!
//! Target identifiers that also exist in the source collection are reserved
//! for their own counterpart and never chosen for another resource.

use std::collections::HashSet;

use crate::config::IdentitySpec;
use crate::jsonc::{optional_values_equal, values_equal, Document, NodeId};
use crate::project::CollectionIndex;
use crate::report::MatchKind;

/// A target resource chosen for a source resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub target_id: String,
    pub target_node: NodeId,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The structurally equal target already uses the source identifier.
    AlreadyAligned,
    Matched(Candidate),
    Unmatched,
}

/// Inputs shared by every match in one collection pass.
pub struct Matcher<'a> {
    pub source: &'a Document,
    pub target: &'a Document,
    /// The source collection being aligned.
    pub source_ids: &'a CollectionIndex,
    /// The target collection, kept current with renames.
    pub targets: &'a CollectionIndex,
    pub identity: &'a IdentitySpec,
    pub strict_only: bool,
    /// Target resource nodes already renamed during this run.
    pub consumed: &'a HashSet<NodeId>,
}

impl Matcher<'_> {
    pub fn find(&self, source_id: &str, source_node: NodeId) -> MatchOutcome {
        if let Some(outcome) = self.strict(source_id, source_node) {
            return outcome;
        }
        if self.strict_only || self.identity.is_empty() {
            return MatchOutcome::Unmatched;
        }
        self.heuristic(source_id, source_node)
            .map(MatchOutcome::Matched)
            .unwrap_or(MatchOutcome::Unmatched)
    }

    fn strict(&self, source_id: &str, source_node: NodeId) -> Option<MatchOutcome> {
        let equal: Vec<(&str, NodeId)> = self
            .targets
            .iter()
            .filter(|(_, node)| !self.consumed.contains(node))
            .filter(|(_, node)| values_equal(self.source, source_node, self.target, *node))
            .collect();

        if equal.iter().any(|(id, _)| *id == source_id) {
            return Some(MatchOutcome::AlreadyAligned);
        }

        equal
            .into_iter()
            .find(|(id, _)| !self.source_ids.contains(id))
            .map(|(target_id, target_node)| {
                MatchOutcome::Matched(Candidate {
                    target_id: target_id.to_string(),
                    target_node,
                    kind: MatchKind::Strict,
                })
            })
    }

    fn heuristic(&self, source_id: &str, source_node: NodeId) -> Option<Candidate> {
        for (target_id, target_node) in self.targets.iter() {
            if self.consumed.contains(&target_node) {
                continue;
            }
            if target_id == source_id {
                // Same identifier on both sides: leave the pair alone.
                return None;
            }
            if self.source_ids.contains(target_id) {
                continue;
            }
            if identity_equal(self.identity, self.source, source_node, self.target, target_node) {
                return Some(Candidate {
                    target_id: target_id.to_string(),
                    target_node,
                    kind: MatchKind::Heuristic,
                });
            }
        }
        None
    }
}

/// True if every identity field is equal (or absent) on both resources.
pub fn identity_equal(identity: &IdentitySpec, a: &Document, a_node: NodeId, b: &Document, b_node: NodeId) -> bool {
    identity
        .fields
        .iter()
        .all(|f| optional_values_equal(a, a.get(a_node, f), b, b.get(b_node, f)))
}

/// Uniqueness safety check.
///
/// `id`/`node` is a resource of the collection `own` in `doc`. It is not
/// unique if another resource of the same collection is equal to it
/// (structurally for strict matches, by identity fields for heuristic ones)
/// and that other resource's identifier is not in `opposing`, the other
/// document's collection before the run. Identifiers on both sides are taken
/// as already aligned.
pub fn is_unique(
    doc: &Document,
    own: &CollectionIndex,
    id: &str,
    node: NodeId,
    identity: &IdentitySpec,
    kind: MatchKind,
    opposing: &CollectionIndex,
) -> bool {
    !own.iter().any(|(other_id, other_node)| {
        if other_id == id || other_node == node {
            return false;
        }
        let equal = match kind {
            MatchKind::Strict => values_equal(doc, node, doc, other_node),
            MatchKind::Heuristic => identity_equal(identity, doc, node, doc, other_node),
        };
        equal && !opposing.contains(other_id)
    })
}
