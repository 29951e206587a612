//! Component field schema.
//!
//! Object components are nested structures keyed by a component type name.
//! Whether a component field holds a reference to another resource is decided
//! by a `SchemaProvider`. The schema for custom component types is produced
//! outside this crate (by evaluating the engine's editor output) and handed in
//! as a JSON bundle; native component types are always known.
//!
//! Bundle format:
//!
//! ```json
//! {
//!   "my-component": {
//!     "target": "object",
//!     "speed": "float",
//!     "collider": "physx-mesh-options"
//!   }
//! }
//! ```
//!
//! `mesh`, `texture`, `animation`, `material`, `object` and `skin` are
//! references; `physx-mesh-options` is a nested structure whose own `mesh`
//! field is a reference; any other declared type is a scalar.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ProjalignError, ProjalignResult};
use crate::project::CollectionKind;

/// Component types implemented by the engine itself.
pub const NATIVE_COMPONENTS: [&str; 8] = [
    "animation",
    "collision",
    "input",
    "light",
    "mesh",
    "physx",
    "text",
    "view",
];

/// How a component field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    ReferenceTo(CollectionKind),
    /// Nested object whose `mesh` member references a mesh.
    EmbeddedMeshReference,
    /// No definition for this type or field.
    Unknown,
}

/// Field type names as they appear in a schema bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum DeclaredType {
    Mesh,
    Texture,
    Animation,
    Material,
    Object,
    Skin,
    PhysxMeshOptions,
    #[serde(other)]
    Other,
}

impl DeclaredType {
    fn field_kind(self) -> FieldKind {
        match self {
            Self::Mesh => FieldKind::ReferenceTo(CollectionKind::Meshes),
            Self::Texture => FieldKind::ReferenceTo(CollectionKind::Textures),
            Self::Animation => FieldKind::ReferenceTo(CollectionKind::Animations),
            Self::Material => FieldKind::ReferenceTo(CollectionKind::Materials),
            Self::Object => FieldKind::ReferenceTo(CollectionKind::Objects),
            Self::Skin => FieldKind::ReferenceTo(CollectionKind::Skins),
            Self::PhysxMeshOptions => FieldKind::EmbeddedMeshReference,
            Self::Other => FieldKind::Scalar,
        }
    }
}

/// Lookup of component field kinds by type name.
pub trait SchemaProvider {
    fn field_kind(&self, type_name: &str, field: &str) -> FieldKind;
}

/// In-memory component schema.
#[derive(Debug, Clone, Default)]
pub struct ComponentSchema {
    types: BTreeMap<String, BTreeMap<String, FieldKind>>,
}

impl ComponentSchema {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Definitions of the native component types.
    pub fn native() -> Self {
        use crate::project::CollectionKind::{Animations, Materials, Meshes, Skins};
        use crate::schema::FieldKind::{EmbeddedMeshReference as Embedded, ReferenceTo, Scalar};

        let mut schema = Self::empty();
        schema.define(
            "animation",
            &[
                ("animation", ReferenceTo(Animations)),
                ("playCount", Scalar),
                ("speed", Scalar),
                ("autoplay", Scalar),
                ("retarget", Scalar),
                ("preview", Scalar),
            ],
        );
        schema.define(
            "collision",
            &[
                ("groups", Scalar),
                ("collider", Scalar),
                ("sphere", Scalar),
                ("aabb", Scalar),
                ("box", Scalar),
            ],
        );
        schema.define("input", &[("type", Scalar)]);
        schema.define(
            "light",
            &[
                ("type", Scalar),
                ("color", Scalar),
                ("intensity", Scalar),
                ("outerAngle", Scalar),
                ("innerAngle", Scalar),
                ("shadows", Scalar),
                ("shadowRange", Scalar),
                ("shadowBias", Scalar),
                ("shadowNormalBias", Scalar),
                ("shadowTexelSize", Scalar),
            ],
        );
        schema.define(
            "mesh",
            &[
                ("mesh", ReferenceTo(Meshes)),
                ("material", ReferenceTo(Materials)),
                ("skin", ReferenceTo(Skins)),
            ],
        );
        schema.define(
            "physx",
            &[
                ("shape", Scalar),
                ("sphere", Scalar),
                ("capsule", Scalar),
                ("box", Scalar),
                ("convexMesh", Embedded),
                ("triangleMesh", Embedded),
                ("allowSimulation", Scalar),
                ("trigger", Scalar),
                ("allowQuery", Scalar),
                ("simulate", Scalar),
                ("static", Scalar),
                ("gravity", Scalar),
                ("kinematic", Scalar),
                ("mass", Scalar),
                ("linearDamping", Scalar),
                ("angularDamping", Scalar),
                ("staticFriction", Scalar),
                ("dynamicFriction", Scalar),
                ("bounciness", Scalar),
                ("groups", Scalar),
                ("block", Scalar),
                ("lockAxis", Scalar),
                ("solverPositionIterations", Scalar),
                ("solverVelocityIterations", Scalar),
            ],
        );
        schema.define(
            "text",
            &[
                ("alignment", Scalar),
                ("justification", Scalar),
                ("characterSpacing", Scalar),
                ("lineSpacing", Scalar),
                ("effect", Scalar),
                ("text", Scalar),
                ("material", ReferenceTo(Materials)),
            ],
        );
        schema.define(
            "view",
            &[("fov", Scalar), ("near", Scalar), ("far", Scalar)],
        );
        schema
    }

    /// Parse a schema bundle. Custom types may not reuse a native name.
    pub fn from_json_str(text: &str) -> ProjalignResult<Self> {
        let raw: BTreeMap<String, BTreeMap<String, DeclaredType>> = serde_json::from_str(text)
            .map_err(|e| ProjalignError::schema(format!("invalid schema bundle: {e}")))?;

        let mut schema = Self::empty();
        for (type_name, fields) in raw {
            if NATIVE_COMPONENTS.contains(&type_name.as_str()) {
                return Err(ProjalignError::schema(format!(
                    "component with native name `{type_name}` in schema bundle"
                )));
            }
            let fields = fields
                .into_iter()
                .map(|(name, declared)| (name, declared.field_kind()))
                .collect();
            schema.types.insert(type_name, fields);
        }
        Ok(schema)
    }

    /// Add or replace the definition of one component type.
    pub fn define(&mut self, type_name: &str, fields: &[(&str, FieldKind)]) {
        let fields = fields
            .iter()
            .map(|(name, kind)| (name.to_string(), *kind))
            .collect();
        self.types.insert(type_name.to_string(), fields);
    }

    /// Overlay `other` on top of `self`; `other` wins per type.
    pub fn merge(mut self, other: ComponentSchema) -> Self {
        self.types.extend(other.types);
        self
    }
}

impl SchemaProvider for ComponentSchema {
    fn field_kind(&self, type_name: &str, field: &str) -> FieldKind {
        self.types
            .get(type_name)
            .and_then(|fields| fields.get(field))
            .copied()
            .unwrap_or(FieldKind::Unknown)
    }
}

/// How the schema used for a run was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum SchemaStatus {
    /// A bundle was loaded and merged over the native definitions.
    Loaded,
    /// The caller chose to run with native definitions only.
    Ignored,
    /// Loading failed; only native definitions were available.
    Failed(String),
}

impl SchemaStatus {
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Loaded)
    }
}
