//! # tfexec
//!
//! Pure Rust driver for the Terraform CLI.
//!
//! This crate provides functionality for:
//! - Running `init`, `plan`, `show` and `apply` in a working directory
//! - Cancelling running invocations through a [`Context`]
//! - Retrying transient failures (registry outages, state locks)
//! - Reading plan JSON into typed change summaries
//!
//! ## Example
//!
//! ```no_run
//! use tfexec::{Context, Plan, Terraform};
//! use std::path::Path;
//!
//! let tf = Terraform::new("infra/prod").expect("terraform not available");
//! let ctx = Context::background();
//!
//! tf.init(&ctx, false).expect("init failed");
//! let plan_file = Path::new("tfplan");
//! if tf.plan(&ctx, false, plan_file).expect("plan failed") {
//!     let plan: Plan = tf.show(&ctx, Some(plan_file)).expect("show failed");
//!     println!("{}", plan.summary());
//!     tf.apply(&ctx, plan_file).expect("apply failed");
//! }
//! ```

#![warn(clippy::all)]

pub mod backend;
pub mod context;
pub mod error;
pub mod retry;
pub mod types;

pub use backend::Executor;
pub use backend::cli::{CliExecutor, TERRAFORM_BIN, find_terraform};
pub use backend::recording::{Invocation, RecordingExecutor, Response};
pub use context::Context;
pub use error::{Error, ErrorCategory, Result};
pub use retry::{LogCallback, NoCallback, RetryCallback, with_retry};
pub use types::{ChangeAction, Plan, PlanSummary, ResourceChange, RetryConfig};

use log::debug;
use serde::de::DeserializeOwned;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Exit code of `plan -detailed-exitcode` when the plan has changes.
pub const PLAN_DIFF_EXIT_CODE: i32 = 2;

/// Main client for driving Terraform in one working directory.
///
/// Cheap to clone; clones share the executor.
#[derive(Clone)]
pub struct Terraform {
    executor: Arc<dyn Executor>,
    working_dir: PathBuf,
    retry: RetryConfig,
    echo: bool,
}

impl std::fmt::Debug for Terraform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terraform")
            .field("working_dir", &self.working_dir)
            .field("retry", &self.retry)
            .field("echo", &self.echo)
            .finish_non_exhaustive()
    }
}

impl Terraform {
    /// Create a client using the terraform binary found in PATH.
    pub fn new(working_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::with_executor(
            Arc::new(CliExecutor::find()?),
            working_dir,
        ))
    }

    /// Create a client with a custom executor (useful for testing).
    pub fn with_executor(executor: Arc<dyn Executor>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            working_dir: working_dir.into(),
            retry: RetryConfig::default(),
            echo: false,
        }
    }

    /// Set the retry behavior for `init`.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Mirror command output to this process's stdout/stderr.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Run `init`, retrying transient failures.
    pub fn init(&self, ctx: &Context, upgrade: bool) -> Result<()> {
        let mut args = vec!["init".to_string()];
        if upgrade {
            args.push("-upgrade".to_string());
        }
        with_retry(ctx, &self.retry, Some(&LogCallback), || {
            self.invoke(ctx, &args)?.check("init")
        })
    }

    /// Run `plan` into `out`.
    ///
    /// Returns whether the plan has changes.
    pub fn plan(&self, ctx: &Context, destroy: bool, out: &Path) -> Result<bool> {
        let mut args = vec!["plan".to_string()];
        if destroy {
            args.push("-destroy".to_string());
        }
        args.push(format!("-out={}", out.display()));
        args.push("-detailed-exitcode".to_string());

        let output = self.invoke(ctx, &args)?;
        match output.exit_code {
            0 => Ok(false),
            PLAN_DIFF_EXIT_CODE => Ok(true),
            _ => output.check("plan").map(|()| false),
        }
    }

    /// Run `show -json`, on the current state or on a saved plan.
    pub fn show<T: DeserializeOwned>(&self, ctx: &Context, plan_file: Option<&Path>) -> Result<T> {
        let mut args = vec!["show".to_string(), "-json".to_string()];
        if let Some(plan_file) = plan_file {
            args.push(plan_file.display().to_string());
        }
        let output = self.invoke(ctx, &args)?;
        output.check("show")?;
        Ok(serde_json::from_slice(&output.stdout)?)
    }

    /// Raw `show -json` output of the current state.
    pub fn show_state_json(&self, ctx: &Context) -> Result<Vec<u8>> {
        let args = ["show".to_string(), "-json".to_string()];
        let output = self.invoke(ctx, &args)?;
        output.check("show")?;
        Ok(output.stdout)
    }

    /// Run `apply` on a saved plan.
    pub fn apply(&self, ctx: &Context, plan_file: &Path) -> Result<()> {
        let args = [
            "apply".to_string(),
            "-input=false".to_string(),
            plan_file.display().to_string(),
        ];
        self.invoke(ctx, &args)?.check("apply")
    }

    fn invoke(&self, ctx: &Context, args: &[String]) -> Result<Output> {
        let mut stdout = Capture::new(self.echo.then(|| Box::new(io::stdout()) as Box<dyn Write + Send>));
        let mut stderr = Capture::new(self.echo.then(|| Box::new(io::stderr()) as Box<dyn Write + Send>));

        let exit_code = match self.executor.execute(
            ctx,
            &self.working_dir,
            &mut stdout,
            &mut stderr,
            args,
        ) {
            Ok(()) => 0,
            Err(Error::Exit { code }) => code,
            Err(e) => return Err(e),
        };
        debug!("terraform {} exited with {}", args.join(" "), exit_code);

        Ok(Output {
            exit_code,
            stdout: stdout.buffer,
            stderr: String::from_utf8_lossy(&stderr.buffer).into_owned(),
        })
    }
}

/// Captured result of one invocation.
struct Output {
    exit_code: i32,
    stdout: Vec<u8>,
    stderr: String,
}

impl Output {
    fn check(&self, command: &str) -> Result<()> {
        match self.exit_code {
            0 => Ok(()),
            code => Err(Error::from_cli_output(command, code, &self.stderr)),
        }
    }
}

/// Buffers a stream, optionally mirroring it.
struct Capture {
    buffer: Vec<u8>,
    echo: Option<Box<dyn Write + Send>>,
}

impl Capture {
    fn new(echo: Option<Box<dyn Write + Send>>) -> Self {
        Self {
            buffer: Vec::new(),
            echo,
        }
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(echo) = &mut self.echo {
            echo.write_all(buf)?;
        }
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut self.echo {
            Some(echo) => echo.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client(executor: &Arc<RecordingExecutor>) -> Terraform {
        Terraform::with_executor(executor.clone(), "/work")
            .with_retry(RetryConfig::new(3, Duration::from_millis(1), 1.0))
    }

    fn args(executor: &RecordingExecutor) -> Vec<Vec<String>> {
        executor.invocations().into_iter().map(|i| i.args).collect()
    }

    #[test]
    fn test_init_args() {
        let executor = Arc::new(RecordingExecutor::new());
        let tf = client(&executor);
        tf.init(&Context::background(), false).unwrap();
        tf.init(&Context::background(), true).unwrap();

        assert_eq!(args(&executor), vec![vec!["init"], vec!["init", "-upgrade"]]);
    }

    #[test]
    fn test_init_retries_network_errors() {
        let executor = Arc::new(RecordingExecutor::new());
        executor
            .respond(
                "init",
                Response::exit(1).with_stderr("Error: Failed to query available provider packages"),
            )
            .respond("init", Response::ok());

        client(&executor).init(&Context::background(), false).unwrap();
        assert_eq!(executor.commands(), vec!["init", "init"]);
    }

    #[test]
    fn test_init_does_not_retry_config_errors() {
        let executor = Arc::new(RecordingExecutor::new());
        executor.respond("init", Response::exit(1).with_stderr("Error: Invalid block"));

        let err = client(&executor)
            .init(&Context::background(), false)
            .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { ref command, .. } if command == "init"));
        assert_eq!(executor.commands().len(), 1);
    }

    #[test]
    fn test_plan_exit_codes() {
        let executor = Arc::new(RecordingExecutor::new());
        executor
            .respond("plan", Response::ok())
            .respond("plan", Response::exit(PLAN_DIFF_EXIT_CODE))
            .respond("plan", Response::exit(1).with_stderr("Error: boom"));
        let tf = client(&executor);
        let ctx = Context::background();

        assert!(!tf.plan(&ctx, false, Path::new("tfplan")).unwrap());
        assert!(tf.plan(&ctx, true, Path::new("tfplan")).unwrap());
        assert!(matches!(
            tf.plan(&ctx, false, Path::new("tfplan")),
            Err(Error::CommandFailed { code: 1, .. })
        ));

        assert_eq!(
            args(&executor)[1],
            vec!["plan", "-destroy", "-out=tfplan", "-detailed-exitcode"]
        );
    }

    #[test]
    fn test_show_parses_json() {
        let executor = Arc::new(RecordingExecutor::new());
        executor.respond(
            "show",
            Response::ok().with_stdout(
                r#"{"resource_changes":[{"address":"a.b","type":"a","name":"b","change":{"actions":["create"]}}]}"#,
            ),
        );

        let plan: Plan = client(&executor)
            .show(&Context::background(), Some(Path::new("tfplan")))
            .unwrap();
        assert_eq!(plan.summary().create, 1);
        assert_eq!(args(&executor)[0], vec!["show", "-json", "tfplan"]);
    }

    #[test]
    fn test_show_invalid_json() {
        let executor = Arc::new(RecordingExecutor::new());
        executor.respond("show", Response::ok().with_stdout("not json"));

        let result: Result<Plan> = client(&executor).show(&Context::background(), None);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_apply_args() {
        let executor = Arc::new(RecordingExecutor::new());
        client(&executor)
            .apply(&Context::background(), Path::new("tfplan"))
            .unwrap();
        assert_eq!(args(&executor), vec![vec!["apply", "-input=false", "tfplan"]]);
    }

    #[test]
    fn test_cancelled_context_runs_nothing() {
        let executor = Arc::new(RecordingExecutor::new());
        let ctx = Context::background();
        ctx.cancel();

        assert!(matches!(
            client(&executor).init(&ctx, false),
            Err(Error::Cancelled)
        ));
        assert!(executor.invocations().is_empty());
    }
}
