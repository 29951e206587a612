//! Reconciliation driver.
//!
//! Renames target identifiers to the identifiers of equivalent source
//! resources and rewrites every indexed reference to them. Collections are
//! visited in `ALIGN_ORDER`, and full passes repeat until one makes no change:
//! a rename in a later collection can rewrite a reference inside a resource of
//! an earlier one, which may make it match on the next pass.
//!
//! A source identifier, once aligned, is never revisited. Each changing pass
//! aligns at least one identifier, so the number of passes is bounded by the
//! number of source resources plus the final pass with no change.

use std::collections::{HashMap, HashSet};

use crate::config::{identity_spec, validate_align_options, AlignOptions, IdentitySpec};
use crate::duplicates::find_duplicates;
use crate::errors::{ProjalignError, ProjalignResult};
use crate::ids::IdPredicate;
use crate::jsonc::NodeId;
use crate::matcher::{is_unique, Candidate, MatchOutcome, Matcher};
use crate::project::{CollectionIndex, CollectionKind, Project};
use crate::references::ReferenceIndex;
use crate::report::{AlignReport, Outcome, RenameRecord};
use crate::schema::{SchemaProvider, SchemaStatus};

/// Align `target` to `source` in place.
///
/// Nothing is changed if either document already has duplicate identifiers.
/// The returned report's `outcome` says whether the target may be written;
/// persisting it is left to the caller.
pub fn align_projects(
    source: &Project,
    target: &mut Project,
    schema: &dyn SchemaProvider,
    schema_status: SchemaStatus,
    opts: &AlignOptions,
) -> ProjalignResult<AlignReport> {
    validate_align_options(opts)?;

    let mut report = AlignReport::new(schema_status);
    report.source_duplicates = find_duplicates(source);
    report.target_duplicates = find_duplicates(target);
    if !report.source_duplicates.is_empty() || !report.target_duplicates.is_empty() {
        tracing::warn!(
            source = report.source_duplicates.len(),
            target = report.target_duplicates.len(),
            "duplicate identifiers before align, nothing changed"
        );
        report.outcome = Outcome::PreexistingDuplicates;
        return Ok(report);
    }

    if !opts.aligns_ids() {
        return Ok(report);
    }

    let index = ReferenceIndex::build(&*target, schema, IdPredicate::LegacyOrStable, opts.unsafe_mode);
    let mut run = AlignRun::new(source, target, index, opts);

    let max_passes = source.resource_count() + 1;
    loop {
        run.passes += 1;
        if run.passes > max_passes {
            return Err(ProjalignError::invariant(format!(
                "align did not converge within {max_passes} passes"
            )));
        }

        let mut changed = false;
        for kind in opts.collections() {
            let identity = identity_spec(kind);
            if run.align_collection(kind, &identity, &mut report)? {
                changed = true;
            }
        }
        tracing::info!(pass = run.passes, changed, "align pass finished");
        if !changed {
            break;
        }
    }

    report.passes = run.passes;
    report.scan = run.index.into_scan();
    report.duplicates_after = find_duplicates(&*run.target);
    if report.duplicates_after.is_empty() {
        report.outcome = Outcome::Completed;
    } else {
        tracing::warn!(count = report.duplicates_after.len(), "duplicate identifiers after align");
        report.outcome = Outcome::PostOperationDuplicates;
        report.forced = opts.allow_duplicates_after;
    }

    tracing::info!(
        renames = report.renames.len(),
        passes = report.passes,
        outcome = ?report.outcome,
        "align finished"
    );
    Ok(report)
}

struct AlignRun<'a> {
    source: &'a Project,
    target: &'a mut Project,
    index: ReferenceIndex,
    opts: &'a AlignOptions,
    /// Source identifiers aligned so far, per collection.
    aligned: HashSet<(CollectionKind, String)>,
    /// Target resources renamed or claimed so far.
    consumed: HashSet<NodeId>,
    /// Target collections before the run.
    initial_targets: HashMap<CollectionKind, CollectionIndex>,
    passes: usize,
}

impl<'a> AlignRun<'a> {
    fn new(source: &'a Project, target: &'a mut Project, index: ReferenceIndex, opts: &'a AlignOptions) -> Self {
        let initial_targets = opts
            .collections()
            .into_iter()
            .map(|kind| (kind, target.collection_index(kind)))
            .collect();
        Self {
            source,
            target,
            index,
            opts,
            aligned: HashSet::new(),
            consumed: HashSet::new(),
            initial_targets,
            passes: 0,
        }
    }

    /// One collection of one pass. Returns true if anything was renamed.
    fn align_collection(
        &mut self,
        kind: CollectionKind,
        identity: &IdentitySpec,
        report: &mut AlignReport,
    ) -> ProjalignResult<bool> {
        let mut changed = false;
        let source_ids = self.source.collection_index(kind);
        let mut targets = self.target.collection_index(kind);

        for (source_id, source_node) in source_ids.iter() {
            let key = (kind, source_id.to_string());
            if self.aligned.contains(&key) {
                continue;
            }

            if let Some(existing) = targets.get(source_id) {
                self.mark_already_aligned(key, existing, report);
                continue;
            }

            let outcome = Matcher {
                source: self.source.document(),
                target: self.target.document(),
                source_ids: &source_ids,
                targets: &targets,
                identity,
                strict_only: self.opts.strict,
                consumed: &self.consumed,
            }
            .find(source_id, source_node);

            let candidate = match outcome {
                MatchOutcome::Matched(candidate) => candidate,
                // The same-id case was handled above.
                MatchOutcome::AlreadyAligned | MatchOutcome::Unmatched => continue,
            };

            if !self.approve(kind, identity, source_id, source_node, &candidate, &source_ids, &targets, report) {
                continue;
            }

            self.target.rename_resource(kind, &candidate.target_id, source_id)?;
            targets.rename(&candidate.target_id, source_id);
            let sites = self
                .index
                .rewrite(self.target.document_mut(), &candidate.target_id, source_id)?;
            tracing::debug!(
                collection = %kind,
                old = %candidate.target_id,
                new = %source_id,
                sites,
                kind = ?candidate.kind,
                "resource renamed"
            );

            report.renames.push(RenameRecord {
                collection: kind,
                old_id: candidate.target_id,
                new_id: source_id.to_string(),
                match_kind: Some(candidate.kind),
                sites_rewritten: sites,
            });
            self.consumed.insert(candidate.target_node);
            self.aligned.insert(key);
            changed = true;
        }

        Ok(changed)
    }

    fn mark_already_aligned(&mut self, key: (CollectionKind, String), node: NodeId, report: &mut AlignReport) {
        self.consumed.insert(node);
        report.already_aligned.push(key.1.clone());
        self.aligned.insert(key);
    }

    /// Apply the uniqueness safety check. Non-unique matches pass only in
    /// unsafe mode, and are then recorded.
    #[allow(clippy::too_many_arguments)]
    fn approve(
        &self,
        kind: CollectionKind,
        identity: &IdentitySpec,
        source_id: &str,
        source_node: NodeId,
        candidate: &Candidate,
        source_ids: &CollectionIndex,
        targets: &CollectionIndex,
        report: &mut AlignReport,
    ) -> bool {
        let empty = CollectionIndex::default();
        let initial_targets = self.initial_targets.get(&kind).unwrap_or(&empty);

        let source_unique = is_unique(
            self.source.document(),
            source_ids,
            source_id,
            source_node,
            identity,
            candidate.kind,
            initial_targets,
        );
        let unique = source_unique
            && is_unique(
                self.target.document(),
                targets,
                &candidate.target_id,
                candidate.target_node,
                identity,
                candidate.kind,
                source_ids,
            );

        if unique {
            return true;
        }
        if !self.opts.unsafe_mode {
            tracing::debug!(
                collection = %kind,
                source = source_id,
                target = %candidate.target_id,
                "match is not unique, skipped"
            );
            return false;
        }

        tracing::warn!(
            collection = %kind,
            source = source_id,
            target = %candidate.target_id,
            "applying non-unique match"
        );
        report.non_unique.push(source_id.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ComponentSchema;
    use assert_matches::assert_matches;

    fn project(name: &str, text: &str) -> Project {
        Project::from_text(name, text).unwrap()
    }

    fn align(source: &Project, target: &mut Project, opts: &AlignOptions) -> AlignReport {
        align_projects(
            source,
            target,
            &ComponentSchema::native(),
            SchemaStatus::Loaded,
            opts,
        )
        .unwrap()
    }

    #[test]
    fn renames_mesh_and_its_references() {
        let source = project("s.wlp", r#"{ "meshes": { "1": { "link": "a.glb" } } }"#);
        let mut target = project(
            "t.wlp",
            r#"{
  "objects": { "3": { "components": [ { "mesh": { "mesh": "7" } } ] } },
  "meshes": { "7": { "link": "a.glb" } }
}"#,
        );

        let report = align(&source, &mut target, &AlignOptions::default());

        assert_eq!(report.outcome, Outcome::Completed);
        assert_eq!(report.renames.len(), 1);
        assert_eq!(report.renames[0].sites_rewritten, 1);
        assert!(target.collection_index(CollectionKind::Meshes).contains("1"));
        assert!(target.render().contains(r#""mesh": "1""#));
        assert_eq!(report.passes, 2);
    }

    #[test]
    fn later_collection_rename_enables_earlier_match() {
        // The objects only become structurally equal once the mesh they point
        // at has been renamed, which happens after objects in the pass order.
        let source = project(
            "s.wlp",
            r#"{
  "objects": { "10": { "name": "o", "components": [ { "mesh": { "mesh": "1" } } ] } },
  "meshes": { "1": { "link": "a.glb" } }
}"#,
        );
        let mut target = project(
            "t.wlp",
            r#"{
  "objects": { "20": { "name": "o", "components": [ { "mesh": { "mesh": "2" } } ] } },
  "meshes": { "2": { "link": "a.glb" } }
}"#,
        );

        let opts = AlignOptions {
            strict: true,
            ..Default::default()
        };
        let report = align(&source, &mut target, &opts);

        assert_eq!(report.renames.len(), 2);
        assert_eq!(report.renames[0].collection, CollectionKind::Meshes);
        assert_eq!(report.renames[1].collection, CollectionKind::Objects);
        assert_eq!(report.passes, 3);
        assert!(target.collection_index(CollectionKind::Objects).contains("10"));
    }

    #[test]
    fn preexisting_duplicates_abort_without_changes() {
        let source = project("s.wlp", r#"{ "meshes": { "1": { "link": "a.glb" } } }"#);
        let text = r#"{ "meshes": { "12": { "link": "a.glb" } }, "textures": { "12": {} } }"#;
        let mut target = project("t.wlp", text);

        let report = align(&source, &mut target, &AlignOptions::default());

        assert_eq!(report.outcome, Outcome::PreexistingDuplicates);
        assert_eq!(report.target_duplicates, vec!["12"]);
        assert_eq!(target.render(), text);
    }

    #[test]
    fn collision_with_other_collection_is_reported_after() {
        let source = project("s.wlp", r#"{ "meshes": { "5": { "link": "a.glb" } } }"#);
        let mut target = project(
            "t.wlp",
            r#"{ "meshes": { "7": { "link": "a.glb" } }, "textures": { "5": {} } }"#,
        );

        let report = align(&source, &mut target, &AlignOptions::default());
        assert_eq!(report.outcome, Outcome::PostOperationDuplicates);
        assert_eq!(report.duplicates_after, vec!["5"]);
        assert!(!report.writable());

        let mut target = project(
            "t.wlp",
            r#"{ "meshes": { "7": { "link": "a.glb" } }, "textures": { "5": {} } }"#,
        );
        let opts = AlignOptions {
            allow_duplicates_after: true,
            ..Default::default()
        };
        assert!(align(&source, &mut target, &opts).writable());
    }

    #[test]
    fn include_limits_collections() {
        let source = project(
            "s.wlp",
            r#"{ "meshes": { "1": { "link": "a.glb" } }, "textures": { "2": { "link": "t.png" } } }"#,
        );
        let mut target = project(
            "t.wlp",
            r#"{ "meshes": { "7": { "link": "a.glb" } }, "textures": { "8": { "link": "t.png" } } }"#,
        );
        let opts = AlignOptions {
            include: Some(vec![CollectionKind::Textures]),
            ..Default::default()
        };

        let report = align(&source, &mut target, &opts);
        assert_eq!(report.renames.len(), 1);
        assert!(target.collection_index(CollectionKind::Meshes).contains("7"));
        assert!(target.collection_index(CollectionKind::Textures).contains("2"));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let source = project("s.wlp", "{}");
        let mut target = project("t.wlp", "{}");
        let opts = AlignOptions {
            include: Some(vec![]),
            ..Default::default()
        };
        let err = align_projects(
            &source,
            &mut target,
            &ComponentSchema::native(),
            SchemaStatus::Ignored,
            &opts,
        )
        .unwrap_err();
        assert_matches!(err, ProjalignError::InvalidArgument(_));
    }
}
