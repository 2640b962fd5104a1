//! Executor abstraction for Terraform invocations.
//!
//! The [`Executor`] trait runs one command line in a working directory,
//! allowing for different implementations (real CLI, recording fake for
//! testing).

pub mod cli;
pub mod recording;

use crate::context::Context;
use crate::error::Result;
use std::io::Write;
use std::path::Path;

/// Runs one Terraform command line.
///
/// Implementations stream the process output into `stdout` and `stderr`,
/// return [`Error::Exit`](crate::Error::Exit) for a non-zero exit, and stop
/// the process once `ctx` is done.
pub trait Executor: Send + Sync {
    fn execute(
        &self,
        ctx: &Context,
        working_dir: &Path,
        stdout: &mut (dyn Write + Send),
        stderr: &mut (dyn Write + Send),
        args: &[String],
    ) -> Result<()>;
}

/// Get the default executor (real terraform CLI from PATH).
pub fn default_executor() -> Result<cli::CliExecutor> {
    cli::CliExecutor::find()
}
