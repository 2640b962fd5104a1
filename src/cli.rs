//! Flags and bootstrap for binaries that compose stacks.
//!
//! A binary declares its stacks and hands them to [`run`]:
//!
//! ```no_run
//! # use std::sync::Arc;
//! # fn network() -> Arc<MyStack> { Arc::new(MyStack) }
//! # struct MyStack;
//! # impl stackform::declarative::Stack for MyStack {
//! #     fn describe<'a>(&'a self, _: &mut stackform::declarative::Fields<'a>) {}
//! # }
//! fn main() -> anyhow::Result<()> {
//!     stackform::cli::run(|session, workflow| {
//!         workflow.register(session.stack_action("network", network()))?;
//!         Ok(())
//!     })
//! }
//! ```

use crate::config::Config;
use crate::logging;
use crate::paths;
use crate::progress::{Progress, TerminalProgress};
use crate::ui;
use crate::workflow::{StackAction, StackOptions, Workflow, WorkflowError};
use anyhow::Result;
use clap::Parser;
use declarative::Stack;
use std::path::PathBuf;
use std::sync::Arc;
use tfexec::{CliExecutor, Context, Executor};

#[derive(Parser, Debug, Clone, Default)]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Provision the declared stacks with terraform", long_about = None)]
pub struct WorkflowArgs {
    /// Destroy the stacks instead of applying them
    #[arg(long)]
    pub destroy: bool,

    /// Plan without applying
    #[arg(long)]
    pub dry_run: bool,

    /// Upgrade providers and modules during init
    #[arg(long)]
    pub upgrade: bool,

    /// Root of the per-stack working directories
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Config file
    #[arg(long, env = paths::ENV_CONFIG, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

// ============================================================================
// Session
// ============================================================================

/// Config and flags merged, plus the terraform every action shares.
pub struct Session {
    config: Config,
    destroy: bool,
    dry_run: bool,
    quiet: bool,
    executor: Arc<dyn Executor>,
    ctx: Context,
}

impl Session {
    /// Build a session running the configured terraform binary.
    pub fn new(config: Config, args: &WorkflowArgs) -> Result<Self> {
        let program = config.terraform_bin()?;
        log::debug!("Using terraform at {}", program.display());
        Ok(Self::with_executor(config, args, Arc::new(CliExecutor::new(program))))
    }

    /// Build a session around any executor. Flags in `args` win over
    /// `config`.
    pub fn with_executor(
        mut config: Config,
        args: &WorkflowArgs,
        executor: Arc<dyn Executor>,
    ) -> Self {
        if args.upgrade {
            config.upgrade = true;
        }
        if let Some(dir) = &args.work_dir {
            config.work_dir = dir.to_string_lossy().into_owned();
        }
        Self {
            config,
            destroy: args.destroy,
            dry_run: args.dry_run,
            quiet: args.quiet,
            executor,
            ctx: Context::background(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_destroy(&self) -> bool {
        self.destroy
    }

    /// Cancelling this context stops every action of the session.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn work_dir(&self) -> PathBuf {
        self.config.work_dir()
    }

    pub fn options(&self) -> StackOptions {
        StackOptions {
            destroy: self.destroy,
            dry_run: self.dry_run,
            upgrade: self.config.upgrade,
            fail_on_overflow: self.config.fail_on_overflow,
            split_files: self.config.split_files,
            echo_output: self.config.echo_output,
            timeout: self.config.timeout(),
            retry: self.config.retry_config(),
        }
    }

    /// An action for `stack` in `<work_dir>/<name>` with the session's
    /// options.
    pub fn stack_action<S>(&self, name: impl Into<String>, stack: Arc<S>) -> StackAction<S>
    where
        S: Stack + Send + Sync + 'static,
    {
        StackAction::new(
            name,
            stack,
            Arc::clone(&self.executor),
            &self.work_dir(),
            self.options(),
        )
        .with_context(self.ctx.child())
    }

    /// An empty workflow in the session's mode.
    pub fn workflow(&self) -> Workflow {
        Workflow::new(self.destroy)
    }
}

// ============================================================================
// Bootstrap
// ============================================================================

/// Parse flags, set up logging and config, then build and execute the
/// workflow.
pub fn run<F>(build: F) -> Result<()>
where
    F: FnOnce(&Session, &Workflow) -> Result<()>,
{
    run_with(WorkflowArgs::parse(), build)
}

/// [`run`] with already parsed flags.
pub fn run_with<F>(args: WorkflowArgs, build: F) -> Result<()>
where
    F: FnOnce(&Session, &Workflow) -> Result<()>,
{
    logging::init(args.verbose, args.quiet);
    let config = Config::load(args.config.as_deref())?;
    let session = Session::new(config, &args)?;
    let mut progress = TerminalProgress::new(args.quiet);
    execute(&session, &mut progress, build)
}

/// Build the session's workflow with `build` and execute it.
pub fn execute<F>(session: &Session, progress: &mut dyn Progress, build: F) -> Result<()>
where
    F: FnOnce(&Session, &Workflow) -> Result<()>,
{
    let workflow = session.workflow();
    build(session, &workflow)?;

    if workflow.is_empty() {
        ui::warn("No actions registered");
        return Ok(());
    }

    if let Err(err) = workflow.execute(progress) {
        if let WorkflowError::Action(action) = &err
            && let Some(advice) = action.advice()
        {
            ui::info(advice);
        }
        return Err(err.into());
    }

    if !session.quiet {
        report(session, &workflow);
    }
    Ok(())
}

fn report(session: &Session, workflow: &Workflow) {
    let count = workflow.len();
    ui::header("Summary");
    if session.destroy && !session.dry_run {
        ui::success(&format!("Destroyed {count} stack(s)"));
    } else if workflow.has_changes() {
        ui::warn(&format!("{count} stack(s) processed, changes pending"));
    } else {
        ui::success(&format!("{count} stack(s) in sync"));
    }
}
