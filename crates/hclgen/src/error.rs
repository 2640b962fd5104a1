//! Error types for value rendering and block encoding.
//!
//! Every error here is a programmer error in how a declaration was built:
//! traversing a literal, reading a literal out of a reference, or producing
//! a body the external tool would reject. None of them are retryable.

use thiserror::Error;

/// Errors that can occur while building or encoding HCL values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A traversal operation (index, key, splat, reference access) was
    /// applied to a literal value
    #[error("cannot {operation} a literal value; only references can be traversed")]
    LiteralTraversal {
        /// Name of the attempted operation
        operation: &'static str,
    },

    /// A literal-only operation was applied to a reference-bound value
    #[error("value is bound to reference {reference}, it has no literal")]
    NotALiteral {
        /// Rendered reference
        reference: String,
    },

    /// A literal could not be converted to the requested type
    #[error("cannot convert {value:?} to {target}")]
    Conversion {
        /// Rendered source literal
        value: String,
        /// Target type name
        target: &'static str,
    },

    /// A name is not a valid HCL identifier
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// The same attribute was written twice into one body
    #[error("attribute {name:?} defined more than once in {block}")]
    DuplicateAttribute {
        /// Attribute name
        name: String,
        /// Path of the enclosing block
        block: String,
    },

    /// A label was added where no enclosing block exists
    #[error("label {label:?} has no enclosing block")]
    LabelOutsideBlock {
        /// The rejected label
        label: String,
    },

    /// A reference has no attribute path that can be rendered relative to
    /// its root
    #[error("reference {0} has no attribute path relative to its root")]
    EmptyRelativePath(String),

    /// The formatter rejected the document
    #[error("failed to format document: {0}")]
    Format(String),
}

/// Result type for value and encoding operations.
pub type Result<T> = std::result::Result<T, Error>;
