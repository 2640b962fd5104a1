//! CLI executor that spawns the terraform binary.

use super::Executor;
use crate::context::Context;
use crate::error::{Error, Result};
use log::debug;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

/// Name of the terraform binary looked up in PATH.
pub const TERRAFORM_BIN: &str = "terraform";

/// How often a running process is checked for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Find the terraform executable.
pub fn find_terraform() -> Result<PathBuf> {
    which::which(TERRAFORM_BIN).map_err(|_| Error::BinaryNotFound)
}

/// Executor that runs a real program.
#[derive(Debug, Clone)]
pub struct CliExecutor {
    program: PathBuf,
    env: Vec<(String, String)>,
}

impl CliExecutor {
    /// Use `program` as the terraform binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            env: vec![("TF_IN_AUTOMATION".to_string(), "1".to_string())],
        }
    }

    /// Use the terraform binary found in PATH.
    pub fn find() -> Result<Self> {
        find_terraform().map(Self::new)
    }

    /// Set an extra environment variable for every invocation.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Executor for CliExecutor {
    fn execute(
        &self,
        ctx: &Context,
        working_dir: &Path,
        stdout: &mut (dyn Write + Send),
        stderr: &mut (dyn Write + Send),
        args: &[String],
    ) -> Result<()> {
        ctx.check()?;
        debug!(
            "Running {} {} in {}",
            self.program.display(),
            args.join(" "),
            working_dir.display()
        );

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .current_dir(working_dir)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // The child leads its own process group; cancellation kills the group.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let mut child = command
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => Error::BinaryNotFound,
                _ => Error::Spawn {
                    program: self.program.clone(),
                    source: e,
                },
            })?;

        let child_out = child.stdout.take();
        let child_err = child.stderr.take();

        let (status, out_copy, err_copy) = thread::scope(|scope| {
            let out = scope.spawn(move || pump(child_out, stdout));
            let err = scope.spawn(move || pump(child_err, stderr));
            let status = wait(&mut child, ctx);
            (status, joined(out.join()), joined(err.join()))
        });

        let status = status?;
        out_copy?;
        err_copy?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Exit {
                code: status.code().unwrap_or(-1),
            })
        }
    }
}

/// Copy a child pipe into `sink` until the child closes it.
fn pump(pipe: Option<impl Read>, sink: &mut (dyn Write + Send)) -> io::Result<()> {
    if let Some(mut pipe) = pipe {
        io::copy(&mut pipe, sink)?;
    }
    sink.flush()
}

fn joined(result: thread::Result<io::Result<()>>) -> io::Result<()> {
    result.unwrap_or_else(|_| Err(io::Error::other("output copy thread panicked")))
}

/// Wait for the child, killing it once the context is done.
fn wait(child: &mut Child, ctx: &Context) -> Result<ExitStatus> {
    loop {
        if let Err(e) = ctx.check() {
            debug!("Stopping process {}: {}", child.id(), e);
            kill(child);
            return Err(e);
        }
        let interval = ctx
            .remaining()
            .map_or(POLL_INTERVAL, |remaining| remaining.min(POLL_INTERVAL));
        if let Some(status) = child.wait_timeout(interval)? {
            return Ok(status);
        }
    }
}

/// Kill the child with its whole process group and reap it.
#[cfg(unix)]
#[allow(unsafe_code)]
fn kill(child: &mut Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg only sends a signal to the group led by our child.
        unsafe { libc::killpg(pgid, libc::SIGKILL) };
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn kill(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
