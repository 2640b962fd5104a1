//! Workflow errors.

use super::action::Phase;
use std::path::PathBuf;
use thiserror::Error;

/// Why a single phase of an action failed.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// Stack validation, encoding, export or state import failed
    #[error(transparent)]
    Declarative(#[from] declarative::Error),

    /// A terraform invocation failed
    #[error(transparent)]
    Terraform(#[from] tfexec::Error),

    /// State holds resources the stack does not declare
    #[error("state has {undeclared} undeclared resource(s)")]
    Drift {
        /// Number of state records without a declared resource
        undeclared: usize,
    },
}

/// A phase failure, attributed to its action.
#[derive(Debug, Error)]
#[error("{action}: {phase} failed: {source}")]
pub struct ActionError {
    pub action: String,
    pub phase: Phase,
    #[source]
    pub source: PhaseError,
}

impl ActionError {
    pub fn new(action: impl Into<String>, phase: Phase, source: impl Into<PhaseError>) -> Self {
        Self {
            action: action.into(),
            phase,
            source: source.into(),
        }
    }

    /// Actionable advice when the failure came from terraform.
    pub fn advice(&self) -> Option<&'static str> {
        match &self.source {
            PhaseError::Terraform(e) => Some(e.category().advice()),
            _ => None,
        }
    }
}

/// Errors from registering or running a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// An action with the same name and type is already registered
    #[error("{kind} action {name:?} is already registered")]
    Duplicate { name: String, kind: String },

    #[error(transparent)]
    Action(#[from] ActionError),

    /// Two actions would write to the same working directory
    #[error("actions {first:?} and {second:?} share working directory {}", dir.display())]
    SharedDirectory {
        dir: PathBuf,
        first: String,
        second: String,
    },

    /// The worker pool for parallel workflows could not be built
    #[error("failed to build workflow thread pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
