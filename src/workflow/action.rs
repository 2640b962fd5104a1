//! The unit of work a workflow sequences.

use super::error::ActionError;
use crate::progress::Progress;
use std::fmt;
use std::path::Path;

/// Step of an action, used to attribute failures and report progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Encode the stack and write it to the working directory
    Export,
    /// `terraform init`
    Init,
    /// `terraform plan`, plus `show` of the plan when it has changes
    Plan,
    /// `terraform apply` of the saved plan
    Apply,
    /// `terraform show` of the current state and import into the stack
    ImportState,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Export => "export",
            Self::Init => "init",
            Self::Plan => "plan",
            Self::Apply => "apply",
            Self::ImportState => "import state",
        };
        f.write_str(s)
    }
}

/// Registry key of an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionKey {
    pub name: String,
    pub kind: String,
}

impl fmt::Display for ActionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.name)
    }
}

/// Something a [`Workflow`](super::Workflow) can run and clean up.
///
/// `run` is called in registration order; `cleanup` in reverse
/// registration order, and only when the workflow is in destroy mode.
pub trait Action: Send {
    fn name(&self) -> &str;

    /// Type of action, e.g. `stack`.
    fn kind(&self) -> &str;

    fn run(&mut self, progress: &mut dyn Progress) -> Result<(), ActionError>;

    fn cleanup(&mut self, progress: &mut dyn Progress) -> Result<(), ActionError>;

    /// Whether the last run left infrastructure out of sync.
    fn has_changes(&self) -> bool;

    /// Directory the action owns exclusively, if any.
    fn working_dir(&self) -> Option<&Path> {
        None
    }

    fn key(&self) -> ActionKey {
        ActionKey {
            name: self.name().to_string(),
            kind: self.kind().to_string(),
        }
    }
}
