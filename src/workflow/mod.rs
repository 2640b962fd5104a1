//! Action / workflow orchestration.
//!
//! A [`Workflow`] is an ordered registry of [`Action`]s. Running executes
//! them in registration order and stops at the first failure. In destroy
//! mode, cleanup walks them in reverse registration order so dependents are
//! torn down before what they depend on, and stops at the first failure so
//! the dependencies of a resource that could not be destroyed stay in
//! place.

pub mod action;
pub mod error;
pub mod stack_action;

#[cfg(test)]
pub(crate) mod fixtures;

pub use action::{Action, ActionKey, Phase};
pub use error::{ActionError, PhaseError, Result, WorkflowError};
pub use stack_action::{PLAN_FILE, STACK_KIND, StackAction, StackOptions};

use crate::progress::Progress;
use log::{debug, error, info};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Ordered registry of actions keyed by name and type.
pub struct Workflow {
    destroy: bool,
    actions: Mutex<Vec<Box<dyn Action>>>,
}

impl Workflow {
    pub fn new(destroy: bool) -> Self {
        Self {
            destroy,
            actions: Mutex::new(Vec::new()),
        }
    }

    pub fn is_destroy(&self) -> bool {
        self.destroy
    }

    /// Register an action; safe to call from several threads.
    pub fn register(&self, action: impl Action + 'static) -> Result<()> {
        self.register_boxed(Box::new(action))
    }

    pub fn register_boxed(&self, action: Box<dyn Action>) -> Result<()> {
        let key = action.key();
        let mut actions = self.lock();
        if actions.iter().any(|a| a.key() == key) {
            return Err(WorkflowError::Duplicate {
                name: key.name,
                kind: key.kind,
            });
        }
        debug!("Registered {key}");
        actions.push(action);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> Vec<ActionKey> {
        self.lock().iter().map(|a| a.key()).collect()
    }

    /// Whether any action left infrastructure out of sync.
    pub fn has_changes(&self) -> bool {
        self.lock().iter().any(|a| a.has_changes())
    }

    /// Run every action in registration order.
    ///
    /// The registry stays locked until the run finishes, so `register`,
    /// `len` and `has_changes` from other threads block until then.
    pub fn run(&self, progress: &mut dyn Progress) -> Result<()> {
        let mut actions = self.lock();
        let total = actions.len();
        for (i, action) in actions.iter_mut().enumerate() {
            info!("[{}/{}] Running {}", i + 1, total, action.key());
            action.run(progress)?;
        }
        Ok(())
    }

    /// Clean up every action in reverse registration order.
    ///
    /// Does nothing unless the workflow is in destroy mode. Like
    /// [`Workflow::run`], holds the registry lock throughout.
    pub fn cleanup(&self, progress: &mut dyn Progress) -> Result<()> {
        if !self.destroy {
            debug!("Not in destroy mode, skipping cleanup");
            return Ok(());
        }
        let mut actions = self.lock();
        for action in actions.iter_mut().rev() {
            info!("Cleaning up {}", action.key());
            action.cleanup(progress)?;
        }
        Ok(())
    }

    /// Run, then clean up regardless of how the run went.
    ///
    /// When both fail the run error is returned and the cleanup error is
    /// logged.
    pub fn execute(&self, progress: &mut dyn Progress) -> Result<()> {
        let run = self.run(progress);
        let cleanup = self.cleanup(progress);
        match (run, cleanup) {
            (Err(run), Err(cleanup)) => {
                error!("Cleanup also failed: {cleanup}");
                Err(run)
            }
            (run, cleanup) => run.and(cleanup),
        }
    }

    fn working_dirs(&self) -> Vec<(PathBuf, ActionKey)> {
        self.lock()
            .iter()
            .filter_map(|a| a.working_dir().map(|dir| (dir.to_path_buf(), a.key())))
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Box<dyn Action>>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fail if two actions across `workflows` own the same directory.
pub fn check_exclusive_dirs(workflows: &[Workflow]) -> Result<()> {
    let mut owners: HashMap<PathBuf, ActionKey> = HashMap::new();
    for (dir, key) in workflows.iter().flat_map(Workflow::working_dirs) {
        if let Some(first) = owners.get(&dir) {
            return Err(WorkflowError::SharedDirectory {
                dir,
                first: first.to_string(),
                second: key.to_string(),
            });
        }
        owners.insert(dir, key);
    }
    Ok(())
}

/// Execute independent workflows on a pool of `jobs` threads.
///
/// Every workflow runs to completion; the first failure in input order is
/// returned.
pub fn run_parallel<P, F>(workflows: &[Workflow], jobs: usize, progress: F) -> Result<()>
where
    P: Progress,
    F: Fn() -> P + Sync,
{
    check_exclusive_dirs(workflows)?;

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let results: Vec<Result<()>> = pool.install(|| {
        workflows
            .par_iter()
            .map(|workflow| {
                let mut progress = progress();
                workflow.execute(&mut progress)
            })
            .collect()
    });

    results.into_iter().collect()
}
