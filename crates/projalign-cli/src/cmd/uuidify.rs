use std::path::{Path, PathBuf};

use anyhow::Result;

use projalign_core::config::MigrateOptions;
use projalign_core::ids::UuidGenerator;
use projalign_core::migrate::migrate_ids;
use projalign_core::report::{MigrateReport, Outcome};
use projalign_core::schema::{ComponentSchema, SchemaStatus};

use super::is_fatal;
use crate::args::SchemaArgs;
use crate::io::export::{self, Destination};
use crate::io::input;
use crate::output;

/// Migrates each project in turn. Returns a line per failed project, including
/// projects written with `--force` while duplicates remain.
pub async fn run(projects: &[PathBuf], dest: &Destination, opts: &MigrateOptions, schema: &SchemaArgs) -> Result<Vec<String>> {
    let mut failed = Vec::new();

    for path in projects {
        match migrate_one(path, dest, opts, schema).await {
            Ok((report, written)) => {
                output::migrate_report(path, &report, written.as_deref())?;
                if !report.outcome.is_success() {
                    failed.push(format!("{}: {:?}", path.display(), report.outcome));
                }
            }
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                output::eprintln_line(&format!("error: {e:#}"));
                failed.push(format!("{}: {e}", path.display()));
            }
        }
    }

    Ok(failed)
}

async fn migrate_one(
    path: &Path,
    dest: &Destination,
    opts: &MigrateOptions,
    schema_args: &SchemaArgs,
) -> Result<(MigrateReport, Option<PathBuf>)> {
    let mut project = input::read_project(path).await?;
    let (schema, status) = if opts.duplicates_only {
        (ComponentSchema::native(), SchemaStatus::Ignored)
    } else {
        input::load_schema(schema_args, path, opts.unsafe_mode).await?
    };

    let report = migrate_ids(&mut project, &schema, status, opts, &mut UuidGenerator)?;
    if report.outcome == Outcome::DryRun || !report.writable() {
        return Ok((report, None));
    }

    let out = dest.resolve(path);
    export::write_project(&project, &out).await?;
    Ok((report, Some(out)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use projalign_core::ids::is_stable_id;
    use projalign_core::project::Project;

    const LEGACY: &str = r#"{
  "objects": { "0": { "name": "root" }, "1": { "parent": "0" } },
  "meshes": { "2": { "link": "a.glb" } }
}"#;

    fn no_schema() -> SchemaArgs {
        SchemaArgs {
            schema: None,
            no_schema: true,
        }
    }

    #[tokio::test]
    async fn replace_rewrites_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.wlp");
        std::fs::write(&path, LEGACY).unwrap();

        let failed = run(&[path.clone()], &Destination::Replace, &MigrateOptions::default(), &no_schema())
            .await
            .unwrap();

        assert!(failed.is_empty());
        let project = Project::load(&path).unwrap();
        assert_eq!(project.all_ids().len(), 3);
        assert!(project.all_ids().iter().all(|id| is_stable_id(id)));
    }

    #[tokio::test]
    async fn duplicates_check_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let clean = dir.path().join("clean.wlp");
        let dup = dir.path().join("dup.wlp");
        std::fs::write(&clean, LEGACY).unwrap();
        std::fs::write(&dup, r#"{ "meshes": { "4": {} }, "fonts": { "4": {} } }"#).unwrap();
        let opts = MigrateOptions {
            duplicates_only: true,
            ..Default::default()
        };

        let failed = run(&[clean.clone(), dup.clone()], &Destination::Replace, &opts, &SchemaArgs::default())
            .await
            .unwrap();

        assert_eq!(failed.len(), 1);
        assert!(failed[0].contains("dup.wlp"));
        assert_eq!(std::fs::read_to_string(&clean).unwrap(), LEGACY);
    }
}
