use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

use projalign_core::defaults::SCHEMA_BUNDLE_PATH;
use projalign_core::project::Project;
use projalign_core::schema::{ComponentSchema, SchemaStatus};

use crate::args::SchemaArgs;

pub async fn read_project(path: &Path) -> Result<Project> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let project = Project::from_text(path, &text).with_context(|| format!("loading {}", path.display()))?;
    Ok(project)
}

/// Where the schema bundle for `project` is expected.
pub fn bundle_path(args: &SchemaArgs, project: &Path) -> PathBuf {
    match &args.schema {
        Some(path) => path.clone(),
        None => project_dir(project).join(SCHEMA_BUNDLE_PATH),
    }
}

fn project_dir(project: &Path) -> &Path {
    match project.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Component schema for a run on `project`.
///
/// A bundle that cannot be read or parsed aborts the run unless `unsafe_mode`
/// is set, in which case the native definitions are used and the failure is
/// recorded in the status.
pub async fn load_schema(args: &SchemaArgs, project: &Path, unsafe_mode: bool) -> Result<(ComponentSchema, SchemaStatus)> {
    if args.no_schema {
        return Ok((ComponentSchema::native(), SchemaStatus::Ignored));
    }

    let path = bundle_path(args, project);
    let loaded = match tokio::fs::read_to_string(&path).await {
        Ok(text) => ComponentSchema::from_json_str(&text).map_err(|e| anyhow!(e)),
        Err(e) => Err(anyhow!(e)),
    };

    match loaded {
        Ok(bundle) => {
            tracing::debug!(path = %path.display(), "schema bundle loaded");
            Ok((ComponentSchema::native().merge(bundle), SchemaStatus::Loaded))
        }
        Err(e) if unsafe_mode => {
            let reason = format!("{}: {e}", path.display());
            tracing::warn!(%reason, "continuing without schema bundle");
            Ok((ComponentSchema::native(), SchemaStatus::Failed(reason)))
        }
        Err(e) => Err(e.context(format!(
            "schema bundle {} unavailable (use --no-schema or --unsafe to continue without it)",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use projalign_core::schema::{FieldKind, SchemaProvider};
    use projalign_core::project::CollectionKind;

    #[test]
    fn default_bundle_sits_next_to_the_project() {
        let args = SchemaArgs::default();
        assert_eq!(
            bundle_path(&args, Path::new("game/main.wlp")),
            Path::new("game/cache/component-schema.json")
        );
        assert_eq!(
            bundle_path(&args, Path::new("main.wlp")),
            Path::new("./cache/component-schema.json")
        );
    }

    #[tokio::test]
    async fn bundle_is_merged_over_natives() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("cache")).unwrap();
        std::fs::write(
            dir.path().join("cache/component-schema.json"),
            r#"{ "follow": { "target": "object" } }"#,
        )
        .unwrap();

        let project = dir.path().join("p.wlp");
        let (schema, status) = load_schema(&SchemaArgs::default(), &project, false).await.unwrap();
        assert_eq!(status, SchemaStatus::Loaded);
        assert_eq!(
            schema.field_kind("follow", "target"),
            FieldKind::ReferenceTo(CollectionKind::Objects)
        );
        assert_eq!(
            schema.field_kind("mesh", "mesh"),
            FieldKind::ReferenceTo(CollectionKind::Meshes)
        );
    }

    #[tokio::test]
    async fn missing_bundle_aborts_unless_unsafe() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("p.wlp");

        assert!(load_schema(&SchemaArgs::default(), &project, false).await.is_err());

        let (_, status) = load_schema(&SchemaArgs::default(), &project, true).await.unwrap();
        assert!(matches!(status, SchemaStatus::Failed(_)));

        let skip = SchemaArgs {
            schema: None,
            no_schema: true,
        };
        let (_, status) = load_schema(&skip, &project, false).await.unwrap();
        assert_eq!(status, SchemaStatus::Ignored);
    }

    #[tokio::test]
    async fn unreadable_project_names_the_file() {
        let err = read_project(Path::new("does/not/exist.wlp")).await.unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.wlp"));
    }
}
