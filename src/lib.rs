//! Infrastructure declared as Rust data, compiled to HCL and driven
//! through Terraform.
//!
//! The pieces live in three workspace crates, re-exported here:
//!
//! - [`hclgen`]: typed values, attribute references and block encoding
//! - [`declarative`]: stacks, lifecycle metadata, export and state import
//! - [`tfexec`]: the terraform CLI driver with cancellation and retries
//!
//! This crate adds the workflow engine that runs stacks through
//! export, init, plan, apply and state import, plus the config, logging
//! and flag handling shared by binaries that compose stacks.

#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod logging;
pub mod paths;
pub mod progress;
pub mod ui;
pub mod workflow;

pub use declarative;
pub use hclgen;
pub use tfexec;

pub use cli::{Session, WorkflowArgs};
pub use config::Config;
pub use progress::{NoProgress, Progress, TerminalProgress};
pub use workflow::{
    Action, ActionError, ActionKey, Phase, StackAction, StackOptions, Workflow, WorkflowError,
    run_parallel,
};
