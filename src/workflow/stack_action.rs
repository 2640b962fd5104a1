//! Runs one stack through terraform in its own working directory.
//!
//! A normal run is export, init, plan, apply (only when the plan has
//! changes and this is not a dry run) and finally a state import. In
//! destroy mode the run stops after init and imports state; the plan to
//! destroy and its apply happen in [`Action::cleanup`].

use super::action::{Action, Phase};
use super::error::{ActionError, PhaseError};
use crate::progress::Progress;
use declarative::{Document, Sink, Stack, StateSnapshot, StateStatus, state};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tfexec::{Context, Executor, Plan, PlanSummary, RetryConfig, Terraform};

/// Plan file written inside the working directory.
pub const PLAN_FILE: &str = "tfplan";

/// Action type of [`StackAction`].
pub const STACK_KIND: &str = "stack";

/// Behavior switches for a stack action.
#[derive(Debug, Clone, Default)]
pub struct StackOptions {
    /// Destroy instead of apply
    pub destroy: bool,
    /// Plan but never apply
    pub dry_run: bool,
    /// Pass `-upgrade` to init
    pub upgrade: bool,
    /// Fail when state holds undeclared resources
    pub fail_on_overflow: bool,
    /// Export one file per block role instead of `main.tf`
    pub split_files: bool,
    /// Mirror terraform output to the terminal
    pub echo_output: bool,
    /// Deadline for each terraform invocation
    pub timeout: Option<Duration>,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlanState {
    NotRun,
    NoChanges,
    Changes(PlanSummary),
    Applied,
}

/// Drives one stack through terraform.
///
/// The stack is shared through an [`Arc`] so callers keep access to the
/// imported resource state after the action is registered.
pub struct StackAction<S> {
    name: String,
    stack: Arc<S>,
    dir: PathBuf,
    terraform: Terraform,
    ctx: Context,
    options: StackOptions,
    initialized: bool,
    status: Option<StateStatus>,
    plan: PlanState,
}

impl<S: Stack + Send + Sync + 'static> StackAction<S> {
    /// Create an action working in `<work_dir>/<name>`.
    pub fn new(
        name: impl Into<String>,
        stack: Arc<S>,
        executor: Arc<dyn Executor>,
        work_dir: &Path,
        options: StackOptions,
    ) -> Self {
        let name = name.into();
        let dir = work_dir.join(&name);
        let terraform = Terraform::with_executor(executor, &dir)
            .with_retry(options.retry.clone())
            .with_echo(options.echo_output);
        Self {
            name,
            stack,
            dir,
            terraform,
            ctx: Context::background(),
            options,
            initialized: false,
            status: None,
            plan: PlanState::NotRun,
        }
    }

    /// Derive every invocation's context from `ctx`.
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    pub fn stack(&self) -> &Arc<S> {
        &self.stack
    }

    /// Classification of the last state import.
    pub fn status(&self) -> Option<StateStatus> {
        self.status
    }

    /// Summary of the last plan, if it had changes.
    pub fn plan_summary(&self) -> Option<PlanSummary> {
        match self.plan {
            PlanState::Changes(summary) => Some(summary),
            _ => None,
        }
    }

    fn invocation_context(&self) -> Context {
        match self.options.timeout {
            Some(timeout) => self.ctx.with_timeout(timeout),
            None => self.ctx.clone(),
        }
    }

    fn phase<T>(
        &mut self,
        progress: &mut dyn Progress,
        phase: Phase,
        step: impl FnOnce(&mut Self, &mut dyn Progress) -> Result<T, PhaseError>,
    ) -> Result<T, ActionError> {
        debug!("{}: {}", self.name, phase);
        progress.on_phase_start(&self.name, phase);
        let value = step(&mut *self, &mut *progress)
            .map_err(|e| ActionError::new(&self.name, phase, e))?;
        progress.on_phase_complete(&self.name, phase);
        Ok(value)
    }

    fn export(&mut self, _progress: &mut dyn Progress) -> Result<(), PhaseError> {
        let document = Document::from_stack(self.stack.as_ref())?;
        let mut sink = if self.options.split_files {
            Sink::SplitDirectory(self.dir.clone())
        } else {
            Sink::Directory(self.dir.clone())
        };
        let report = sink.write(&document)?;
        debug!(
            "{}: exported {} file(s), {} changed, {} removed",
            self.name,
            report.files.len(),
            report.changed.len(),
            report.removed.len()
        );
        Ok(())
    }

    fn init(&mut self, _progress: &mut dyn Progress) -> Result<(), PhaseError> {
        let ctx = self.invocation_context();
        self.terraform.init(&ctx, self.options.upgrade)?;
        self.initialized = true;
        Ok(())
    }

    /// Plan into [`PLAN_FILE`], returning whether there are changes.
    fn plan(&mut self, progress: &mut dyn Progress, destroy: bool) -> Result<bool, PhaseError> {
        let ctx = self.invocation_context();
        let plan_file = Path::new(PLAN_FILE);
        if !self.terraform.plan(&ctx, destroy, plan_file)? {
            info!("{}: no changes", self.name);
            self.plan = PlanState::NoChanges;
            return Ok(false);
        }

        let plan: Plan = self.terraform.show(&ctx, Some(plan_file))?;
        let summary = plan.summary();
        info!("{}: {}", self.name, summary);
        progress.on_plan(&self.name, &summary);
        self.plan = PlanState::Changes(summary);
        Ok(true)
    }

    fn apply(&mut self, _progress: &mut dyn Progress) -> Result<(), PhaseError> {
        let ctx = self.invocation_context();
        self.terraform.apply(&ctx, Path::new(PLAN_FILE))?;
        self.plan = PlanState::Applied;
        Ok(())
    }

    fn import_state(&mut self, progress: &mut dyn Progress) -> Result<(), PhaseError> {
        self.status = None;
        let ctx = self.invocation_context();
        let json = self.terraform.show_state_json(&ctx)?;
        let snapshot = StateSnapshot::from_json(&json)?;
        let summary = state::import(self.stack.as_ref(), &snapshot)?;
        self.status = Some(summary.status);
        progress.on_state(&self.name, &summary);

        if summary.status == StateStatus::Overflow {
            let undeclared = summary.records - summary.matched;
            warn!(
                "{}: state has {} resource(s) the stack does not declare",
                self.name, undeclared
            );
            if self.options.fail_on_overflow {
                return Err(PhaseError::Drift { undeclared });
            }
        }
        Ok(())
    }

    fn plan_and_apply(
        &mut self,
        progress: &mut dyn Progress,
        destroy: bool,
    ) -> Result<(), ActionError> {
        let changes = self.phase(progress, Phase::Plan, |action, progress| {
            action.plan(progress, destroy)
        })?;
        if !changes {
            return Ok(());
        }
        if self.options.dry_run {
            info!("{}: dry run, not applying", self.name);
            return Ok(());
        }
        self.phase(progress, Phase::Apply, Self::apply)
    }
}

impl<S: Stack + Send + Sync + 'static> Action for StackAction<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        STACK_KIND
    }

    fn run(&mut self, progress: &mut dyn Progress) -> Result<(), ActionError> {
        self.phase(progress, Phase::Export, Self::export)?;
        self.phase(progress, Phase::Init, Self::init)?;
        if !self.options.destroy {
            self.plan_and_apply(progress, false)?;
        }
        self.phase(progress, Phase::ImportState, Self::import_state)
    }

    fn cleanup(&mut self, progress: &mut dyn Progress) -> Result<(), ActionError> {
        if !self.options.destroy {
            return Ok(());
        }
        if !self.initialized {
            self.phase(progress, Phase::Export, Self::export)?;
            self.phase(progress, Phase::Init, Self::init)?;
        }
        self.plan_and_apply(progress, true)
    }

    /// False only when the last import was in sync and no pending plan has
    /// changes.
    fn has_changes(&self) -> bool {
        let in_sync = self.status == Some(StateStatus::Sync);
        let pending = matches!(self.plan, PlanState::Changes(_));
        !in_sync || pending
    }

    fn working_dir(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}
