//! Error types for stack extraction, export and state import.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while turning a stack into a document or importing state
/// back into it.
#[derive(Debug, Error)]
pub enum Error {
    /// A payload could not be encoded
    #[error(transparent)]
    Encode(#[from] hclgen::Error),

    /// Required fields were left empty
    #[error("required fields are empty: {}", paths.join(", "))]
    MissingRequired {
        /// Dotted paths of every empty required field
        paths: Vec<String>,
    },

    /// More than one backend was declared
    #[error("stack declares more than one backend (second one at {path})")]
    MultipleBackends { path: String },

    /// A private field holds a component the walker cannot reach
    #[error("field {path} is private; components must be in exported fields")]
    NonExportedField { path: String },

    /// A field holds something that is neither a component nor a stack
    #[error("field {path} holds a value that is not a component or stack")]
    UnknownField { path: String },

    #[error("resource {address} is declared more than once")]
    DuplicateResource { address: String },

    #[error("data source data.{address} is declared more than once")]
    DuplicateDataSource { address: String },

    #[error("provider {key} is declared more than once")]
    DuplicateProvider { key: String },

    /// Resources or data sources were declared without any provider
    #[error("{address} requires a provider but the stack declares none")]
    MissingProvider { address: String },

    /// A resource selects a provider configuration that is not declared
    #[error("{address} uses provider {provider}, which is not declared")]
    UndeclaredProvider { address: String, provider: String },

    /// A type, name or alias is not a valid identifier
    #[error("invalid {what} name {name:?}")]
    InvalidName { what: &'static str, name: String },

    /// Two providers share a local name but disagree on source or version
    #[error("provider {name} is required as {existing} and as {conflicting}")]
    ConflictingProvider {
        name: String,
        existing: String,
        conflicting: String,
    },

    /// Strict state access found resources without state
    #[error("no state for: {}", addresses.join(", "))]
    MissingState { addresses: Vec<String> },

    /// A state record could not be decoded into the resource's state type
    #[error("failed to decode state of {address}: {message}")]
    StateDecode { address: String, message: String },

    /// The state snapshot is not valid JSON
    #[error("invalid state snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Reading or writing an exported file failed
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing to a caller-supplied writer failed
    #[error("failed to write document: {0}")]
    Write(#[source] std::io::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for declarative operations.
pub type Result<T> = std::result::Result<T, Error>;
