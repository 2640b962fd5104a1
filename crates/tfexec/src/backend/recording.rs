//! Recording executor for tests.
//!
//! Records every invocation and answers with scripted responses instead of
//! running a process. Responses are queued per subcommand; the last queued
//! response keeps answering once the queue is drained.

use super::Executor;
use crate::context::Context;
use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// One recorded command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub working_dir: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    /// The subcommand, e.g. `plan`.
    pub fn command(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }
}

/// Scripted outcome of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Response {
    /// Successful exit with no output.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Exit with `code` and no output.
    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    pub fn with_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.stdout = stdout.into();
        self
    }

    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }
}

type Responder = dyn Fn(&Invocation) -> Response + Send + Sync;

/// Executor that records invocations and replays scripted responses.
#[derive(Default)]
pub struct RecordingExecutor {
    invocations: Mutex<Vec<Invocation>>,
    scripted: Mutex<HashMap<String, VecDeque<Response>>>,
    responder: Option<Box<Responder>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer unscripted commands with `responder` instead of success.
    pub fn with_responder(
        responder: impl Fn(&Invocation) -> Response + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::default()
        }
    }

    /// Queue `response` for the next invocation of `command`.
    pub fn respond(&self, command: &str, response: Response) -> &Self {
        self.scripted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(command.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Every invocation so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Subcommands invoked so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(|i| i.command().to_string())
            .collect()
    }

    fn next_response(&self, invocation: &Invocation) -> Response {
        let mut scripted = self.scripted.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(queue) = scripted.get_mut(invocation.command()) {
            if queue.len() > 1 {
                if let Some(response) = queue.pop_front() {
                    return response;
                }
            } else if let Some(response) = queue.front() {
                return response.clone();
            }
        }
        drop(scripted);
        self.responder
            .as_ref()
            .map_or_else(Response::ok, |responder| responder(invocation))
    }
}

impl Executor for RecordingExecutor {
    fn execute(
        &self,
        ctx: &Context,
        working_dir: &Path,
        stdout: &mut (dyn Write + Send),
        stderr: &mut (dyn Write + Send),
        args: &[String],
    ) -> Result<()> {
        ctx.check()?;
        let invocation = Invocation {
            working_dir: working_dir.to_path_buf(),
            args: args.to_vec(),
        };
        let response = self.next_response(&invocation);
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(invocation);

        stdout.write_all(response.stdout.as_bytes())?;
        stderr.write_all(response.stderr.as_bytes())?;
        match response.exit_code {
            0 => Ok(()),
            code => Err(Error::Exit { code }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(executor: &RecordingExecutor, args: &[&str]) -> (Result<()>, String) {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        let mut out = Vec::new();
        let result = executor.execute(
            &Context::background(),
            Path::new("/work"),
            &mut out,
            &mut Vec::new(),
            &args,
        );
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_records_invocations() {
        let executor = RecordingExecutor::new();
        run(&executor, &["init"]).0.unwrap();
        run(&executor, &["plan", "-out=x"]).0.unwrap();

        assert_eq!(executor.commands(), vec!["init", "plan"]);
        assert_eq!(executor.invocations()[1].working_dir, PathBuf::from("/work"));
    }

    #[test]
    fn test_queued_responses_last_one_sticks() {
        let executor = RecordingExecutor::new();
        executor
            .respond("plan", Response::exit(1))
            .respond("plan", Response::exit(2));

        assert!(matches!(run(&executor, &["plan"]).0, Err(Error::Exit { code: 1 })));
        assert!(matches!(run(&executor, &["plan"]).0, Err(Error::Exit { code: 2 })));
        assert!(matches!(run(&executor, &["plan"]).0, Err(Error::Exit { code: 2 })));
    }

    #[test]
    fn test_responder_handles_unscripted() {
        let executor = RecordingExecutor::with_responder(|inv| {
            Response::ok().with_stdout(format!("ran {}", inv.command()))
        });
        executor.respond("show", Response::ok().with_stdout("{}"));

        assert_eq!(run(&executor, &["apply"]).1, "ran apply");
        assert_eq!(run(&executor, &["show"]).1, "{}");
    }

    #[test]
    fn test_cancelled_context_records_nothing() {
        let executor = RecordingExecutor::new();
        let ctx = Context::background();
        ctx.cancel();
        let result = executor.execute(
            &ctx,
            Path::new("/work"),
            &mut Vec::new(),
            &mut Vec::new(),
            &["init".to_string()],
        );
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(executor.invocations().is_empty());
    }
}
