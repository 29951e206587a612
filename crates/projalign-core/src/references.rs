//! Reference index: every place in a project whose value is the identifier of
//! another resource.
//!
//! Sites are discovered once per run and kept up to date while identifiers are
//! rewritten underneath them. The walk covers:
//! - objects: `parent`, `skin` and the fields of each component
//! - materials: `pipeline` and the members of nested property objects
//! - skins: `joints` entries
//! - pipelines: `shader`
//! - settings: `viewObject`, `leftEyeObject`, `rightEyeObject`, `appIcon` and
//!   `material`, at any depth
//!
//! Component fields are resolved through a `SchemaProvider`. A field with no
//! definition is only indexed when unsafe inference is enabled; either way the
//! decision is recorded in the `ScanReport`.

use std::collections::VecDeque;

use serde::Serialize;

use crate::errors::ProjalignResult;
use crate::ids::IdPredicate;
use crate::jsonc::{Document, NodeId, NodeKind};
use crate::project::{CollectionKind, Project};
use crate::report::ScanReport;
use crate::schema::{FieldKind, SchemaProvider};

/// Settings members that hold identifiers.
pub const SETTINGS_REFERENCE_KEYS: [&str; 5] = [
    "viewObject",
    "leftEyeObject",
    "rightEyeObject",
    "appIcon",
    "material",
];

/// Physx fields that hold an embedded mesh structure.
const PHYSX_MESH_FIELDS: [&str; 2] = ["convexMesh", "triangleMesh"];

/// The rule that found a reference site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SiteOrigin {
    ObjectParent,
    ObjectSkin,
    ComponentField { component_type: String, field: String },
    EmbeddedMesh { component_type: String, field: String },
    MaterialPipeline,
    MaterialProperty { property: String, field: String },
    SkinJoint,
    PipelineShader,
    Settings { key: String },
}

/// A string value node holding an identifier, and the container it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSite {
    /// Object or array directly containing `value`.
    pub owner: NodeId,
    /// The string node; replaced whenever the site is rewritten.
    pub value: NodeId,
    pub origin: SiteOrigin,
}

impl ReferenceSite {
    pub fn current<'d>(&self, doc: &'d Document) -> Option<&'d str> {
        doc.as_str(self.value)
    }
}

/// Reference sites of one project.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    sites: Vec<ReferenceSite>,
    scan: ScanReport,
}

impl ReferenceIndex {
    /// Walk `project` and collect every reference site.
    ///
    /// `predicate` decides which string values look like identifiers.
    /// `unsafe_inference` indexes component fields the schema does not know.
    pub fn build(
        project: &Project,
        schema: &dyn SchemaProvider,
        predicate: IdPredicate,
        unsafe_inference: bool,
    ) -> Self {
        let mut builder = Builder {
            doc: project.document(),
            schema,
            predicate,
            unsafe_inference,
            index: ReferenceIndex::default(),
        };

        for (_, object) in project.resources(CollectionKind::Objects) {
            builder.object(object);
        }
        for (_, material) in project.resources(CollectionKind::Materials) {
            builder.material(material);
        }
        for (_, skin) in project.resources(CollectionKind::Skins) {
            builder.skin(skin);
        }
        for (_, pipeline) in project.resources(CollectionKind::Pipelines) {
            builder.pipeline(pipeline);
        }
        if let Some(settings) = project.settings() {
            builder.settings(settings);
        }

        let index = builder.index;
        tracing::debug!(
            sites = index.sites.len(),
            ignored = index.scan.ignored_sites,
            "reference index built"
        );
        index
    }

    pub fn sites(&self) -> &[ReferenceSite] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn scan(&self) -> &ScanReport {
        &self.scan
    }

    pub fn into_scan(self) -> ScanReport {
        self.scan
    }

    /// Replace `old_id` with `new_id` at every site holding it.
    ///
    /// Fails if a site's node is no longer where the index recorded it, which
    /// means the document was edited behind the index.
    pub fn rewrite(&mut self, doc: &mut Document, old_id: &str, new_id: &str) -> ProjalignResult<usize> {
        let mut count = 0;
        for site in &mut self.sites {
            if doc.as_str(site.value) != Some(old_id) {
                continue;
            }
            site.value = doc.set_string(site.owner, site.value, new_id)?;
            count += 1;
        }
        if count > 0 {
            tracing::debug!(old = old_id, new = new_id, sites = count, "reference sites rewritten");
        }
        Ok(count)
    }
}

struct Builder<'a> {
    doc: &'a Document,
    schema: &'a dyn SchemaProvider,
    predicate: IdPredicate,
    unsafe_inference: bool,
    index: ReferenceIndex,
}

impl Builder<'_> {
    fn looks_like_id(&self, node: NodeId) -> bool {
        self.doc
            .as_str(node)
            .is_some_and(|s| self.predicate.matches(s))
    }

    fn push(&mut self, owner: NodeId, value: NodeId, origin: SiteOrigin) {
        self.index.sites.push(ReferenceSite { owner, value, origin });
    }

    /// Index `obj.key` if it holds an identifier-shaped string.
    fn field(&mut self, obj: NodeId, key: &str, origin: SiteOrigin) {
        if let Some(value) = self.doc.get(obj, key) {
            if self.looks_like_id(value) {
                self.push(obj, value, origin);
            }
        }
    }

    fn object(&mut self, object: NodeId) {
        self.field(object, "parent", SiteOrigin::ObjectParent);
        self.field(object, "skin", SiteOrigin::ObjectSkin);

        let doc = self.doc;
        let Some(components) = doc.get(object, "components") else {
            return;
        };
        for component in doc.elements(components) {
            for (component_type, props) in doc.entries(component) {
                if doc.kind(props) == NodeKind::Object {
                    self.component(component_type, props);
                }
            }
        }
    }

    fn component(&mut self, component_type: &str, props: NodeId) {
        let doc = self.doc;
        for (field, value) in doc.entries(props) {
            match self.schema.field_kind(component_type, field) {
                FieldKind::Scalar => {}
                FieldKind::ReferenceTo(_) => {
                    if self.looks_like_id(value) {
                        self.push(props, value, component_origin(component_type, field));
                    }
                }
                FieldKind::EmbeddedMeshReference => {
                    self.embedded_mesh(component_type, field, value);
                }
                FieldKind::Unknown => self.unknown_field(component_type, field, props, value),
            }
        }
    }

    fn embedded_mesh(&mut self, component_type: &str, field: &str, value: NodeId) {
        if let Some(mesh) = self.doc.get(value, "mesh") {
            if self.looks_like_id(mesh) {
                let origin = SiteOrigin::EmbeddedMesh {
                    component_type: component_type.to_string(),
                    field: field.to_string(),
                };
                self.push(value, mesh, origin);
            }
        }
    }

    fn unknown_field(&mut self, component_type: &str, field: &str, props: NodeId, value: NodeId) {
        if field != "name" && self.looks_like_id(value) {
            self.index.scan.record_unsafe_field(component_type, field);
            if self.unsafe_inference {
                tracing::warn!(component_type, field, "treating undefined component field as a reference");
                self.push(props, value, component_origin(component_type, field));
            } else {
                self.index.scan.ignored_sites += 1;
            }
            return;
        }

        if component_type == "physx" && PHYSX_MESH_FIELDS.contains(&field) {
            let Some(mesh) = self.doc.get(value, "mesh") else {
                return;
            };
            if !self.looks_like_id(mesh) {
                return;
            }
            self.index.scan.record_unsafe_field(component_type, field);
            if self.unsafe_inference {
                tracing::warn!(component_type, field, "treating undefined physx mesh field as a reference");
                let origin = SiteOrigin::EmbeddedMesh {
                    component_type: component_type.to_string(),
                    field: field.to_string(),
                };
                self.push(value, mesh, origin);
            } else {
                self.index.scan.ignored_sites += 1;
            }
        }
    }

    fn material(&mut self, material: NodeId) {
        self.field(material, "pipeline", SiteOrigin::MaterialPipeline);

        let doc = self.doc;
        for (property, value) in doc.entries(material) {
            if doc.kind(value) != NodeKind::Object {
                continue;
            }
            for (field, member) in doc.entries(value) {
                if self.looks_like_id(member) {
                    self.index.scan.record_material_property(property, field);
                    let origin = SiteOrigin::MaterialProperty {
                        property: property.to_string(),
                        field: field.to_string(),
                    };
                    self.push(value, member, origin);
                }
            }
        }
    }

    fn skin(&mut self, skin: NodeId) {
        let Some(joints) = self.doc.get(skin, "joints") else {
            return;
        };
        for joint in self.doc.elements(joints) {
            if self.looks_like_id(joint) {
                self.push(joints, joint, SiteOrigin::SkinJoint);
            }
        }
    }

    fn pipeline(&mut self, pipeline: NodeId) {
        self.field(pipeline, "shader", SiteOrigin::PipelineShader);
    }

    fn settings(&mut self, settings: NodeId) {
        let mut queue = VecDeque::from([settings]);
        let doc = self.doc;
        while let Some(obj) = queue.pop_front() {
            for (key, value) in doc.entries(obj) {
                if SETTINGS_REFERENCE_KEYS.contains(&key) && self.looks_like_id(value) {
                    self.push(obj, value, SiteOrigin::Settings { key: key.to_string() });
                }
                if doc.kind(value) == NodeKind::Object {
                    queue.push_back(value);
                }
            }
        }
    }
}

fn component_origin(component_type: &str, field: &str) -> SiteOrigin {
    SiteOrigin::ComponentField {
        component_type: component_type.to_string(),
        field: field.to_string(),
    }
}
