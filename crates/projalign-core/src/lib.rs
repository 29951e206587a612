//! projalign-core
//!
//! Core primitives for projalign:
//! - Format-preserving JSONC document tree
//! - Project model over named resource collections
//! - Reference indexing through a component schema
//! - Identifier reconciliation between two projects (align)
//! - Legacy identifier migration to stable identifiers (uuidify)
//! - Document-wide duplicate identifier detection

pub mod align;
pub mod config;
pub mod duplicates;
pub mod errors;
pub mod ids;
pub mod jsonc;
pub mod matcher;
pub mod migrate;
pub mod project;
pub mod references;
pub mod report;
pub mod schema;

pub use crate::errors::{ProjalignError, ProjalignResult};

/// Default file names and locations.
pub mod defaults {
    /// Prefix of the file written by align when no output path is given.
    pub const ALIGNED_PREFIX: &str = "aligned-";
    /// Prefix of the file written by uuidify when no output path is given.
    pub const UUIDIFIED_PREFIX: &str = "uuidified-";
    /// Schema bundle location, relative to the project directory.
    pub const SCHEMA_BUNDLE_PATH: &str = "cache/component-schema.json";
}

/// Convenience re-exports.
pub mod prelude {
    pub use crate::align::align_projects;
    pub use crate::config::{AlignOptions, AlignScope, MigrateOptions};
    pub use crate::duplicates::find_duplicates;
    pub use crate::ids::{IdGenerator, UuidGenerator};
    pub use crate::migrate::migrate_ids;
    pub use crate::project::{CollectionKind, Project};
    pub use crate::report::{AlignReport, MigrateReport, Outcome};
    pub use crate::schema::{ComponentSchema, SchemaProvider, SchemaStatus};
    pub use crate::{ProjalignError, ProjalignResult};
}
