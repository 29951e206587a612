//! Error types for projalign-core.
//!
//! Library code returns `ProjalignResult<T>`; the CLI wraps these in `anyhow`.
//!
//! Conditions that are part of normal operation (duplicate identifiers found
//! before or after an operation, ambiguous matches) are NOT errors: they are
//! recorded in the returned reports. Errors here are either load failures or
//! internal invariant violations.

use std::path::PathBuf;

use thiserror::Error;

pub type ProjalignResult<T> = Result<T, ProjalignError>;

#[derive(Debug, Error)]
pub enum ProjalignError {
    /// Reading or writing a project file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The text is not valid JSON-with-comments.
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// The document parsed but does not have the shape of a project.
    #[error("invalid project: {0}")]
    InvalidProject(String),

    /// `replace_key` did not find the key it was asked to rename.
    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    /// `replace_value` did not find the child it was asked to swap.
    #[error("child node not found under its recorded owner")]
    ChildNotFound,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The component schema could not be loaded or is malformed.
    #[error("schema unavailable: {0}")]
    Schema(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl ProjalignError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    pub fn invalid_project(msg: impl Into<String>) -> Self {
        Self::InvalidProject(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn parse(line: usize, column: usize, msg: impl Into<String>) -> Self {
        Self::Parse {
            line,
            column,
            message: msg.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors that mean the in-memory tree and the reference index
    /// disagree. These indicate a bug, not bad input.
    pub fn is_orphaned_site(&self) -> bool {
        matches!(self, Self::KeyNotFound { .. } | Self::ChildNotFound)
    }
}
