//! Legacy identifier migration.
//!
//! Every legacy integer identifier in a project is replaced with a freshly
//! generated stable identifier, and every indexed reference to it is
//! rewritten. Renames are unconditional, so one pass over the collections is
//! enough.

use std::collections::HashSet;

use crate::config::MigrateOptions;
use crate::duplicates::find_duplicates;
use crate::errors::{ProjalignError, ProjalignResult};
use crate::ids::{is_legacy_id, IdGenerator, IdPredicate};
use crate::project::{Project, ALL_COLLECTIONS};
use crate::references::ReferenceIndex;
use crate::report::{MigrateReport, Outcome, RenameRecord};
use crate::schema::{SchemaProvider, SchemaStatus};

/// Attempts at drawing an unused identifier before giving up on the generator.
const MAX_DRAWS: usize = 64;

/// Replace legacy identifiers in `project` with identifiers from `generator`.
///
/// Nothing is changed if the project already has duplicate identifiers or if
/// `opts.duplicates_only` is set.
pub fn migrate_ids(
    project: &mut Project,
    schema: &dyn SchemaProvider,
    schema_status: SchemaStatus,
    opts: &MigrateOptions,
    generator: &mut dyn IdGenerator,
) -> ProjalignResult<MigrateReport> {
    let mut report = MigrateReport::new(schema_status);
    report.duplicates = find_duplicates(project);

    if !report.duplicates.is_empty() {
        tracing::warn!(count = report.duplicates.len(), "duplicate identifiers, nothing changed");
        report.outcome = Outcome::PreexistingDuplicates;
        return Ok(report);
    }
    if opts.duplicates_only {
        report.outcome = Outcome::DryRun;
        return Ok(report);
    }

    let mut index = ReferenceIndex::build(project, schema, IdPredicate::Legacy, opts.unsafe_mode);
    let mut taken: HashSet<String> = project.all_ids().into_iter().collect();

    for kind in ALL_COLLECTIONS {
        for (old_id, _) in project.resources(kind) {
            if !is_legacy_id(&old_id) {
                continue;
            }

            let new_id = draw_unused(generator, &taken, &mut report.regenerated)?;
            project.rename_resource(kind, &old_id, &new_id)?;
            let sites = index.rewrite(project.document_mut(), &old_id, &new_id)?;
            tracing::debug!(collection = %kind, old = %old_id, new = %new_id, sites, "identifier migrated");

            taken.insert(new_id.clone());
            report.renames.push(RenameRecord {
                collection: kind,
                old_id,
                new_id,
                match_kind: None,
                sites_rewritten: sites,
            });
        }
    }

    report.scan = index.into_scan();
    report.duplicates_after = find_duplicates(project);
    if report.duplicates_after.is_empty() {
        report.outcome = Outcome::Completed;
    } else {
        tracing::warn!(
            count = report.duplicates_after.len(),
            "identifier collision after migration, run again"
        );
        report.outcome = Outcome::PostOperationDuplicates;
        report.forced = opts.allow_duplicates_after;
    }

    tracing::info!(renames = report.renames.len(), outcome = ?report.outcome, "migration finished");
    Ok(report)
}

fn draw_unused(generator: &mut dyn IdGenerator, taken: &HashSet<String>, regenerated: &mut usize) -> ProjalignResult<String> {
    for _ in 0..MAX_DRAWS {
        let id = generator.next_id();
        if !taken.contains(&id) {
            return Ok(id);
        }
        *regenerated += 1;
        tracing::debug!(id = %id, "generated identifier already in use, drawing again");
    }
    Err(ProjalignError::invariant(format!(
        "no unused identifier after {MAX_DRAWS} draws"
    )))
}
