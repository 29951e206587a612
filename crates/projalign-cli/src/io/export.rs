use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use projalign_core::project::Project;

/// Where a rewritten project goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Next to the input, file name prefixed.
    Prefixed(&'static str),
    /// Over the input.
    Replace,
    Path(PathBuf),
}

impl Destination {
    pub fn new(output: Option<PathBuf>, replace: bool, prefix: &'static str) -> Self {
        match (output, replace) {
            (Some(path), _) => Self::Path(path),
            (None, true) => Self::Replace,
            (None, false) => Self::Prefixed(prefix),
        }
    }

    pub fn resolve(&self, input: &Path) -> PathBuf {
        match self {
            Self::Replace => input.to_path_buf(),
            Self::Path(path) => path.clone(),
            Self::Prefixed(prefix) => {
                let name = input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                input.with_file_name(format!("{prefix}{name}"))
            }
        }
    }
}

pub async fn write_project(project: &Project, path: &Path) -> Result<()> {
    tokio::fs::write(path, project.render())
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "project written");
    Ok(())
}
