//! Project documents: named resource collections over a JSONC tree.
//!
//! A project file holds one root object with a member per collection
//! (`objects`, `meshes`, ...) and a `settings` object. Each collection maps an
//! identifier (the member name) to a resource (the member value).
//!
//! `Project` owns its tree exclusively. Edits happen in place and are only
//! persisted by `save`; `save` writes the full rendering in one call so a
//! failed write leaves the in-memory state intact for a retry.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{ProjalignError, ProjalignResult};
use crate::jsonc::{Document, NodeId, NodeKind};

/// The kinds of resource collection a project can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    Objects,
    Meshes,
    Textures,
    Images,
    Materials,
    Shaders,
    Animations,
    Skins,
    Pipelines,
    Files,
    Fonts,
    Languages,
}

/// Every collection, in file order.
pub const ALL_COLLECTIONS: [CollectionKind; 12] = [
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
    CollectionKind::Languages,
];

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Objects => "objects",
            Self::Meshes => "meshes",
            Self::Textures => "textures",
            Self::Images => "images",
            Self::Materials => "materials",
            Self::Shaders => "shaders",
            Self::Animations => "animations",
            Self::Skins => "skins",
            Self::Pipelines => "pipelines",
            Self::Files => "files",
            Self::Fonts => "fonts",
            Self::Languages => "languages",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = ProjalignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_COLLECTIONS
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ProjalignError::invalid_argument(format!("unknown collection: {s}")))
    }
}

/// A loaded project file.
#[derive(Debug, Clone)]
pub struct Project {
    path: PathBuf,
    doc: Document,
    root: NodeId,
}

impl Project {
    /// Read and parse a project file.
    pub fn load(path: impl AsRef<Path>) -> ProjalignResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ProjalignError::io(path, e))?;
        Self::from_text(path, &text)
    }

    /// Parse project text that was read from `path`.
    ///
    /// Missing collections are treated as empty. A collection or `settings`
    /// member that is present but not an object is rejected.
    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> ProjalignResult<Self> {
        let doc = Document::parse(text)?;
        let root = doc
            .root_value()
            .filter(|r| doc.kind(*r) == NodeKind::Object)
            .ok_or_else(|| ProjalignError::invalid_project("root value must be an object"))?;

        let names = ALL_COLLECTIONS.iter().map(|k| k.as_str()).chain(["settings"]);
        for name in names {
            if let Some(node) = doc.get(root, name) {
                if doc.kind(node) != NodeKind::Object {
                    return Err(ProjalignError::invalid_project(format!(
                        "`{name}` must be an object"
                    )));
                }
            }
        }

        let project = Self {
            path: path.into(),
            doc,
            root,
        };
        tracing::debug!(
            path = %project.path.display(),
            resources = project.resource_count(),
            "project parsed"
        );
        Ok(project)
    }

    /// Write the full tree to `path`, or to the load path if `None`.
    pub fn save(&self, path: Option<&Path>) -> ProjalignResult<()> {
        let target = path.unwrap_or(self.path.as_path());
        std::fs::write(target, self.render()).map_err(|e| ProjalignError::io(target, e))?;
        tracing::info!(path = %target.display(), "project saved");
        Ok(())
    }

    pub fn render(&self) -> String {
        self.doc.render()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    /// The object node of a collection, if the file has one.
    pub fn collection(&self, kind: CollectionKind) -> Option<NodeId> {
        self.doc.get(self.root, kind.as_str())
    }

    pub fn settings(&self) -> Option<NodeId> {
        self.doc.get(self.root, "settings")
    }

    /// `(identifier, resource node)` pairs of a collection, in file order.
    pub fn resources(&self, kind: CollectionKind) -> Vec<(String, NodeId)> {
        self.collection(kind)
            .map(|c| {
                self.doc
                    .entries(c)
                    .into_iter()
                    .map(|(id, node)| (id.to_string(), node))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every identifier in every collection, in file order, duplicates kept.
    pub fn all_ids(&self) -> Vec<String> {
        ALL_COLLECTIONS
            .iter()
            .flat_map(|k| self.resources(*k).into_iter().map(|(id, _)| id))
            .collect()
    }

    pub fn resource_count(&self) -> usize {
        ALL_COLLECTIONS
            .iter()
            .filter_map(|k| self.collection(*k))
            .map(|c| self.doc.members(c).len())
            .sum()
    }

    /// Rename a collection entry in place.
    pub fn rename_resource(&mut self, kind: CollectionKind, old_id: &str, new_id: &str) -> ProjalignResult<()> {
        let collection = self.collection(kind).ok_or_else(|| ProjalignError::KeyNotFound {
            key: kind.as_str().to_string(),
        })?;
        self.doc.replace_key(collection, old_id, new_id)?;
        Ok(())
    }

    /// Snapshot of a collection with lookup by identifier.
    pub fn collection_index(&self, kind: CollectionKind) -> CollectionIndex {
        CollectionIndex::new(self.resources(kind))
    }
}

/// Identifiers of one collection in file order, with lookup by identifier.
///
/// A snapshot: renames made to the project afterwards are only seen through
/// `rename`.
#[derive(Debug, Clone, Default)]
pub struct CollectionIndex {
    entries: Vec<(String, NodeId)>,
    positions: HashMap<String, usize>,
}

impl CollectionIndex {
    fn new(entries: Vec<(String, NodeId)>) -> Self {
        let mut positions = HashMap::with_capacity(entries.len());
        for (i, (id, _)) in entries.iter().enumerate() {
            positions.entry(id.clone()).or_insert(i);
        }
        Self { entries, positions }
    }

    /// First resource with this identifier.
    pub fn get(&self, id: &str) -> Option<NodeId> {
        self.positions.get(id).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.entries.iter().map(|(id, node)| (id.as_str(), *node))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record a rename already applied to the document.
    pub fn rename(&mut self, old_id: &str, new_id: &str) {
        if let Some(i) = self.positions.remove(old_id) {
            self.entries[i].0 = new_id.to_string();
            self.positions.insert(new_id.to_string(), i);
        }
    }
}
