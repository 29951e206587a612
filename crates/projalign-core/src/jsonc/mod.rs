//! Format-preserving JSON-with-comments tree.
//!
//! A parsed file is stored as an arena of nodes addressed by `NodeId`. Every
//! byte of the input lives in exactly one leaf node (values, keys, punctuation,
//! whitespace and comments), so rendering the tree concatenates the leaves and
//! reproduces the input byte-for-byte. Structural edits swap a single leaf or
//! value node in its parent's child list; everything else keeps its original
//! text.
//!
//! Parent/child relations are index pairs, never owning pointers. A node that
//! has been replaced stays in the arena, detached (its `parent` is `None`).

use crate::errors::{ProjalignError, ProjalignResult};

mod equal;
mod parse;

pub use equal::{optional_values_equal, values_equal};

/// Stable index of a node inside one `Document` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Top-level container: leading trivia, the root value, trailing trivia.
    Root,
    Object,
    Array,
    String,
    Number,
    Boolean,
    Null,
    /// Object member name. Lives directly under its `Object`.
    Key,
    /// `{ } [ ] : ,`
    Punct,
    /// Whitespace run or a single comment.
    Trivia,
}

impl NodeKind {
    /// True for the kinds that can appear as a JSON value.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            Self::Object | Self::Array | Self::String | Self::Number | Self::Boolean | Self::Null
        )
    }

    pub fn is_container(self) -> bool {
        matches!(self, Self::Root | Self::Object | Self::Array)
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    /// Source text for leaves; empty for containers.
    raw: String,
    /// Decoded content for `String` and `Key` leaves.
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed JSONC document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Parse JSONC text. Comments, trailing commas and all formatting are kept.
    pub fn parse(text: &str) -> ProjalignResult<Self> {
        parse::parse_document(text)
    }

    pub(crate) fn with_root() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        doc.root = doc.push(NodeKind::Root, String::new(), None);
        doc
    }

    pub(crate) fn push(&mut self, kind: NodeKind, raw: String, text: Option<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            raw,
            text,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Serialize the whole tree back to text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if node.kind.is_container() {
                stack.extend(node.children.iter().rev().copied());
            } else {
                out.push_str(&node.raw);
            }
        }
        out
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The single value held by the root container.
    pub fn root_value(&self) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|c| self.kind(*c).is_value())
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id.0].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Original (or replacement) source text of a leaf.
    pub fn raw(&self, id: NodeId) -> &str {
        &self.nodes[id.0].raw
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.nodes[id.0].parent.is_some()
    }

    /// Decoded content of a `String` value node.
    pub fn as_str(&self, id: NodeId) -> Option<&str> {
        let node = &self.nodes[id.0];
        match node.kind {
            NodeKind::String => node.text.as_deref(),
            _ => None,
        }
    }

    /// Decoded name of a `Key` node.
    pub fn key_name(&self, id: NodeId) -> Option<&str> {
        let node = &self.nodes[id.0];
        match node.kind {
            NodeKind::Key => node.text.as_deref(),
            _ => None,
        }
    }

    pub fn as_f64(&self, id: NodeId) -> Option<f64> {
        match self.kind(id) {
            NodeKind::Number => self.raw(id).parse().ok(),
            _ => None,
        }
    }

    /// Members of an object, in document order, as `(key node, value node)`.
    ///
    /// Returns an empty list for non-objects. Duplicate keys are all listed.
    pub fn members(&self, obj: NodeId) -> Vec<(NodeId, NodeId)> {
        if self.kind(obj) != NodeKind::Object {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut pending_key: Option<NodeId> = None;
        for &child in self.children(obj) {
            let kind = self.kind(child);
            if kind == NodeKind::Key {
                pending_key = Some(child);
            } else if kind.is_value() {
                if let Some(key) = pending_key.take() {
                    out.push((key, child));
                }
            }
        }
        out
    }

    /// Members of an object as `(name, value node)`.
    pub fn entries(&self, obj: NodeId) -> Vec<(&str, NodeId)> {
        self.members(obj)
            .into_iter()
            .filter_map(|(k, v)| self.key_name(k).map(|name| (name, v)))
            .collect()
    }

    /// First member value with the given name.
    pub fn get(&self, obj: NodeId, key: &str) -> Option<NodeId> {
        self.members(obj)
            .into_iter()
            .find(|(k, _)| self.key_name(*k) == Some(key))
            .map(|(_, v)| v)
    }

    /// First member value with the given name, if it is a string.
    pub fn get_str(&self, obj: NodeId, key: &str) -> Option<&str> {
        self.get(obj, key).and_then(|v| self.as_str(v))
    }

    /// Elements of an array in order. Empty for non-arrays.
    pub fn elements(&self, arr: NodeId) -> Vec<NodeId> {
        if self.kind(arr) != NodeKind::Array {
            return Vec::new();
        }
        self.children(arr)
            .iter()
            .copied()
            .filter(|c| self.kind(*c).is_value())
            .collect()
    }

    /// Allocate a detached string value node holding `value`.
    pub fn new_string(&mut self, value: &str) -> ProjalignResult<NodeId> {
        let raw = quote(value)?;
        Ok(self.push(NodeKind::String, raw, Some(value.to_string())))
    }

    fn new_key(&mut self, name: &str) -> ProjalignResult<NodeId> {
        let raw = quote(name)?;
        Ok(self.push(NodeKind::Key, raw, Some(name.to_string())))
    }

    /// Rename the first member of `obj` called `old_key`, keeping its position
    /// and its value node. Returns the new key node.
    pub fn replace_key(&mut self, obj: NodeId, old_key: &str, new_key: &str) -> ProjalignResult<NodeId> {
        let position = self.nodes[obj.0]
            .children
            .iter()
            .position(|c| self.key_name(*c) == Some(old_key))
            .ok_or_else(|| ProjalignError::KeyNotFound {
                key: old_key.to_string(),
            })?;

        let replacement = self.new_key(new_key)?;
        let old = self.nodes[obj.0].children[position];
        self.nodes[old.0].parent = None;
        self.nodes[obj.0].children[position] = replacement;
        self.nodes[replacement.0].parent = Some(obj);
        Ok(replacement)
    }

    /// Swap `old_child` for the detached node `new_child` under `parent`.
    pub fn replace_value(&mut self, parent: NodeId, old_child: NodeId, new_child: NodeId) -> ProjalignResult<()> {
        if self.nodes[new_child.0].parent.is_some() || new_child == self.root {
            return Err(ProjalignError::invalid_argument(
                "replacement node is already attached",
            ));
        }

        let position = self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == old_child)
            .ok_or(ProjalignError::ChildNotFound)?;

        self.nodes[old_child.0].parent = None;
        self.nodes[parent.0].children[position] = new_child;
        self.nodes[new_child.0].parent = Some(parent);
        Ok(())
    }

    /// Replace `old_child` with a fresh string literal. Returns the new node.
    pub fn set_string(&mut self, parent: NodeId, old_child: NodeId, value: &str) -> ProjalignResult<NodeId> {
        let replacement = self.new_string(value)?;
        self.replace_value(parent, old_child, replacement)?;
        Ok(replacement)
    }
}

fn quote(value: &str) -> ProjalignResult<String> {
    serde_json::to_string(value)
        .map_err(|e| ProjalignError::invariant(format!("failed to encode string literal: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"// project
{
    "meshes": {
        "1": { "link": "a.glb", /* inline */ "name": "A" },
        "2": { "link": "b.glb", "name": "B", },
    },
    "list": [1, 2.5e3, true, null, "x\n"],
}
"#;

    #[test]
    fn render_reproduces_input() {
        let doc = Document::parse(SAMPLE).unwrap();
        assert_eq!(doc.render(), SAMPLE);
    }

    #[test]
    fn navigation() {
        let doc = Document::parse(SAMPLE).unwrap();
        let root = doc.root_value().unwrap();
        let meshes = doc.get(root, "meshes").unwrap();
        let names: Vec<&str> = doc.entries(meshes).into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["1", "2"]);

        let m2 = doc.get(meshes, "2").unwrap();
        assert_eq!(doc.get_str(m2, "link"), Some("b.glb"));
        assert_eq!(doc.parent(m2), Some(meshes));

        let list = doc.get(root, "list").unwrap();
        let items = doc.elements(list);
        assert_eq!(items.len(), 5);
        assert_eq!(doc.as_f64(items[1]), Some(2500.0));
        assert_eq!(doc.as_str(items[4]), Some("x\n"));
    }

    #[test]
    fn replace_key_keeps_position_and_formatting() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        let root = doc.root_value().unwrap();
        let meshes = doc.get(root, "meshes").unwrap();
        let value_before = doc.get(meshes, "1").unwrap();

        doc.replace_key(meshes, "1", "abc").unwrap();

        assert_eq!(doc.get(meshes, "abc"), Some(value_before));
        assert_eq!(doc.render(), SAMPLE.replacen("\"1\":", "\"abc\":", 1));
    }

    #[test]
    fn replace_value_swaps_only_that_literal() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        let root = doc.root_value().unwrap();
        let meshes = doc.get(root, "meshes").unwrap();
        let m1 = doc.get(meshes, "1").unwrap();
        let link = doc.get(m1, "link").unwrap();

        let new = doc.set_string(m1, link, "c \"quoted\".glb").unwrap();

        assert_eq!(doc.as_str(new), Some("c \"quoted\".glb"));
        assert!(!doc.is_attached(link));
        assert_eq!(
            doc.render(),
            SAMPLE.replacen("\"a.glb\"", r#""c \"quoted\".glb""#, 1)
        );
    }

    #[test]
    fn edits_fail_loudly_when_target_missing() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        let root = doc.root_value().unwrap();
        let meshes = doc.get(root, "meshes").unwrap();
        let list = doc.get(root, "list").unwrap();

        let err = doc.replace_key(meshes, "404", "x").unwrap_err();
        assert!(matches!(err, ProjalignError::KeyNotFound { .. }));

        let fresh = doc.new_string("y").unwrap();
        let err = doc.replace_value(meshes, list, fresh).unwrap_err();
        assert!(matches!(err, ProjalignError::ChildNotFound));
    }

    #[test]
    fn attached_node_cannot_be_reused_as_replacement() {
        let mut doc = Document::parse(SAMPLE).unwrap();
        let root = doc.root_value().unwrap();
        let meshes = doc.get(root, "meshes").unwrap();
        let list = doc.get(root, "list").unwrap();
        assert!(doc.replace_value(root, list, meshes).is_err());
    }
}
