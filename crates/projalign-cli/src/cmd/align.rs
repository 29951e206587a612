use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Result;

use projalign_core::align::align_projects;
use projalign_core::config::AlignOptions;
use projalign_core::project::Project;
use projalign_core::report::AlignReport;

use super::is_fatal;
use crate::args::SchemaArgs;
use crate::io::export::{self, Destination};
use crate::io::input;
use crate::output;

/// A source project and a target to align against it.
pub type Pair = (PathBuf, PathBuf);

/// Source/target pairs for one `align` invocation.
///
/// Targets naming the same file are kept once. With `all_combinations` the
/// source and the remaining targets form one list, and every project is
/// aligned against each one listed after it.
pub async fn pairs(source: &Path, targets: &[PathBuf], all_combinations: bool) -> Vec<Pair> {
    let targets = distinct(targets).await;
    if !all_combinations {
        return targets.into_iter().map(|t| (source.to_path_buf(), t)).collect();
    }

    let mut projects = vec![source.to_path_buf()];
    for target in targets {
        if !same_file(source, &target).await {
            projects.push(target);
        }
    }

    let mut pairs = Vec::new();
    for (i, earlier) in projects.iter().enumerate() {
        for later in &projects[i + 1..] {
            pairs.push((earlier.clone(), later.clone()));
        }
    }
    pairs
}

async fn distinct(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for path in paths {
        let key = tokio::fs::canonicalize(path).await.unwrap_or_else(|_| path.clone());
        if seen.insert(key) {
            out.push(path.clone());
        } else {
            tracing::debug!(path = %path.display(), "repeated target dropped");
        }
    }
    out
}

/// Aligns each pair in order, re-reading a source whenever it changes.
///
/// Returns a line per failed pair. A source that cannot be loaded, or a
/// reference index out of step with its document, fails the whole command.
pub async fn run(pairs: &[Pair], dest: &Destination, opts: &AlignOptions, schema: &SchemaArgs) -> Result<Vec<String>> {
    let mut failed = Vec::new();
    let mut loaded: Option<(&Path, Project)> = None;

    for (source, target) in pairs {
        if same_file(source, target).await {
            tracing::warn!(target = %target.display(), "target is the source project, skipped");
            output::align_report(source, target, &AlignReport::skipped(), None)?;
            continue;
        }

        if !matches!(&loaded, Some((path, _)) if *path == source.as_path()) {
            loaded = Some((source.as_path(), input::read_project(source).await?));
        }
        let Some((_, source_project)) = &loaded else {
            continue;
        };

        match align_one(source, source_project, target, dest, opts, schema).await {
            Ok((report, written)) => {
                output::align_report(source, target, &report, written.as_deref())?;
                if !report.outcome.is_success() {
                    failed.push(format!(
                        "{} -> {}: {:?}",
                        source.display(),
                        target.display(),
                        report.outcome
                    ));
                }
            }
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => {
                output::eprintln_line(&format!("error: {e:#}"));
                failed.push(format!("{} -> {}: {e}", source.display(), target.display()));
            }
        }
    }

    Ok(failed)
}

async fn align_one(
    source_path: &Path,
    source: &Project,
    target_path: &Path,
    dest: &Destination,
    opts: &AlignOptions,
    schema_args: &SchemaArgs,
) -> Result<(AlignReport, Option<PathBuf>)> {
    let mut target = input::read_project(target_path).await?;
    let (schema, status) = input::load_schema(schema_args, source_path, opts.unsafe_mode).await?;

    let report = align_projects(source, &mut target, &schema, status, opts)?;
    if !report.writable() {
        return Ok((report, None));
    }

    let out = dest.resolve(target_path);
    export::write_project(&target, &out).await?;
    Ok((report, Some(out)))
}

async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projalign_core::report::Outcome;
    use projalign_core::schema::SchemaStatus;

    const SOURCE: &str = r#"{ "meshes": { "1": { "link": "a.glb" } } }"#;
    const TARGET: &str = r#"{
  "objects": { "5": { "components": [ { "mesh": { "mesh": "7" } } ] } },
  "meshes": { "7": { "link": "a.glb" } }
}"#;

    fn no_schema() -> SchemaArgs {
        SchemaArgs {
            schema: None,
            no_schema: true,
        }
    }

    async fn run_single(source: &Path, targets: &[PathBuf], dest: &Destination, opts: &AlignOptions) -> Vec<String> {
        let pairs = pairs(source, targets, false).await;
        run(&pairs, dest, opts, &no_schema()).await.unwrap()
    }

    #[tokio::test]
    async fn writes_prefixed_copy_and_leaves_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.wlp");
        let target = dir.path().join("target.wlp");
        std::fs::write(&source, SOURCE).unwrap();
        std::fs::write(&target, TARGET).unwrap();

        let failed = run_single(
            &source,
            &[target.clone()],
            &Destination::Prefixed("aligned-"),
            &AlignOptions::default(),
        )
        .await;

        assert!(failed.is_empty());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), TARGET);
        let written = std::fs::read_to_string(dir.path().join("aligned-target.wlp")).unwrap();
        assert_eq!(written, TARGET.replace("\"7\"", "\"1\""));
    }

    #[tokio::test]
    async fn failed_pairs_are_collected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.wlp");
        let dup = dir.path().join("dup.wlp");
        let good = dir.path().join("good.wlp");
        std::fs::write(&source, SOURCE).unwrap();
        std::fs::write(&dup, r#"{ "meshes": { "3": {} }, "skins": { "3": {} } }"#).unwrap();
        std::fs::write(&good, TARGET).unwrap();
        let missing = dir.path().join("missing.wlp");

        let failed = run_single(
            &source,
            &[dup.clone(), missing, good.clone(), source.clone()],
            &Destination::Replace,
            &AlignOptions::default(),
        )
        .await;

        assert_eq!(failed.len(), 2);
        assert!(failed[0].contains("PreexistingDuplicates"));
        assert!(failed[1].contains("missing.wlp"));
        assert!(std::fs::read_to_string(&good).unwrap().contains(r#""1": { "link": "a.glb" }"#));
        assert_eq!(std::fs::read_to_string(&source).unwrap(), SOURCE);
    }

    #[tokio::test]
    async fn forced_write_with_duplicates_still_fails_the_pair() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.wlp");
        let target = dir.path().join("target.wlp");
        std::fs::write(&source, r#"{ "meshes": { "5": { "link": "a.glb" } } }"#).unwrap();
        std::fs::write(&target, r#"{ "meshes": { "7": { "link": "a.glb" } }, "textures": { "5": {} } }"#).unwrap();
        let opts = AlignOptions {
            allow_duplicates_after: true,
            ..Default::default()
        };

        let failed = run_single(&source, &[target.clone()], &Destination::Replace, &opts).await;

        assert_eq!(failed.len(), 1);
        assert!(failed[0].contains("PostOperationDuplicates"));
        let written = std::fs::read_to_string(&target).unwrap();
        assert!(written.contains(r#""5": { "link": "a.glb" }"#));
    }

    #[tokio::test]
    async fn repeated_targets_are_aligned_once() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.wlp");
        let target = dir.path().join("target.wlp");
        std::fs::write(&source, SOURCE).unwrap();
        std::fs::write(&target, TARGET).unwrap();
        let same = dir.path().join(".").join("target.wlp");

        let pairs = pairs(&source, &[target.clone(), same, target.clone()], false).await;
        assert_eq!(pairs, vec![(source.clone(), target.clone())]);
    }

    #[tokio::test]
    async fn combinations_follow_list_order() {
        let dir = tempfile::tempdir().unwrap();
        let [a, b, c] = ["a.wlp", "b.wlp", "c.wlp"].map(|name| dir.path().join(name));
        for path in [&a, &b, &c] {
            std::fs::write(path, "{}").unwrap();
        }

        let pairs = pairs(&a, &[b.clone(), a.clone(), c.clone(), b.clone()], true).await;
        assert_eq!(
            pairs,
            vec![(a.clone(), b.clone()), (a.clone(), c.clone()), (b.clone(), c.clone())]
        );
    }

    #[tokio::test]
    async fn all_combinations_chain_through_rewritten_projects() {
        let dir = tempfile::tempdir().unwrap();
        let [a, b, c] = ["a.wlp", "b.wlp", "c.wlp"].map(|name| dir.path().join(name));
        std::fs::write(&a, r#"{ "meshes": { "1": { "link": "a.glb" } } }"#).unwrap();
        std::fs::write(&b, r#"{ "meshes": { "7": { "link": "a.glb" }, "8": { "link": "b.glb" } } }"#).unwrap();
        std::fs::write(&c, r#"{ "meshes": { "20": { "link": "a.glb" }, "21": { "link": "b.glb" } } }"#).unwrap();

        let pairs = pairs(&a, &[b.clone(), c.clone()], true).await;
        let failed = run(&pairs, &Destination::Replace, &AlignOptions::default(), &no_schema())
            .await
            .unwrap();

        assert!(failed.is_empty());
        assert_eq!(
            std::fs::read_to_string(&b).unwrap(),
            r#"{ "meshes": { "1": { "link": "a.glb" }, "8": { "link": "b.glb" } } }"#
        );
        assert_eq!(
            std::fs::read_to_string(&c).unwrap(),
            r#"{ "meshes": { "1": { "link": "a.glb" }, "8": { "link": "b.glb" } } }"#
        );
    }

    #[tokio::test]
    async fn schema_bundle_is_read_next_to_the_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/cache")).unwrap();
        std::fs::create_dir(dir.path().join("other")).unwrap();
        std::fs::write(
            dir.path().join("src/cache/component-schema.json"),
            r#"{ "follow": { "target": "mesh" } }"#,
        )
        .unwrap();
        let source = dir.path().join("src/source.wlp");
        let target = dir.path().join("other/target.wlp");
        std::fs::write(&source, SOURCE).unwrap();
        std::fs::write(
            &target,
            r#"{ "objects": { "3": { "components": [ { "follow": { "target": "7" } } ] } }, "meshes": { "7": { "link": "a.glb" } } }"#,
        )
        .unwrap();

        let pairs = pairs(&source, &[target.clone()], false).await;
        let failed = run(&pairs, &Destination::Replace, &AlignOptions::default(), &SchemaArgs::default())
            .await
            .unwrap();

        assert!(failed.is_empty());
        assert!(std::fs::read_to_string(&target)
            .unwrap()
            .contains(r#"{ "follow": { "target": "1" } }"#));
    }

    #[tokio::test]
    async fn missing_schema_bundle_fails_the_pair() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source.wlp");
        let target = dir.path().join("target.wlp");
        std::fs::write(&source, SOURCE).unwrap();
        std::fs::write(&target, TARGET).unwrap();
        let dest = Destination::Prefixed("aligned-");
        let source_project = Project::from_text(&source, SOURCE).unwrap();

        let err = align_one(
            &source,
            &source_project,
            &target,
            &dest,
            &AlignOptions::default(),
            &SchemaArgs::default(),
        )
        .await;
        assert!(err.is_err());

        let unsafe_opts = AlignOptions {
            unsafe_mode: true,
            ..Default::default()
        };
        let (report, written) = align_one(
            &source,
            &source_project,
            &target,
            &dest,
            &unsafe_opts,
            &SchemaArgs::default(),
        )
        .await
        .unwrap();
        assert!(matches!(report.schema, SchemaStatus::Failed(_)));
        assert_eq!(report.outcome, Outcome::Completed);
        assert!(written.is_some());
    }
}
