//! Error types for Terraform invocations.
//!
//! Errors are categorized to enable smart retry logic and appropriate
//! user feedback. Failed invocations are classified from their stderr so
//! transient failures (network, state locks) can be told apart from
//! configuration mistakes.

use std::path::PathBuf;
use thiserror::Error;

/// Categories of Terraform errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Registry, provider download or backend connectivity problems
    Network,
    /// Another process holds the state lock
    StateLocked,
    /// The terraform binary could not be found or started
    BinaryNotFound,
    /// The invocation was cancelled or ran past its deadline
    Cancelled,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network | Self::StateLocked)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::StateLocked => "State is locked",
            Self::BinaryNotFound => "Terraform not installed",
            Self::Cancelled => "Cancelled",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check your internet connection and registry access, then try again",
            Self::StateLocked => {
                "Wait for the other operation to finish, or release the lock with `terraform force-unlock`"
            }
            Self::BinaryNotFound => {
                "Install Terraform from https://developer.hashicorp.com/terraform/install or set terraform_bin"
            }
            Self::Cancelled => "Increase timeout_secs if the operation needs more time",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while driving Terraform.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-related failure reported by Terraform
    #[error("network error: {message}")]
    Network {
        /// Terraform's error output
        message: String,
    },

    /// The state lock could not be acquired
    #[error("state locked: {message}")]
    StateLocked {
        /// Terraform's error output
        message: String,
    },

    /// Terraform is not installed or not found in PATH
    #[error("terraform binary not found")]
    BinaryNotFound,

    /// The process could not be started
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        /// Program that failed to start
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The context was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// The context deadline passed
    #[error("operation timed out")]
    DeadlineExceeded,

    /// The process exited with a non-zero code
    #[error("process exited with code {code}")]
    Exit {
        /// Exit code, -1 when killed by a signal
        code: i32,
    },

    /// A Terraform command failed for a reason not covered above
    #[error("terraform {command} failed (exit code {code}): {stderr}")]
    CommandFailed {
        /// Subcommand that failed
        command: String,
        /// Exit code
        code: i32,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network { .. } => ErrorCategory::Network,
            Self::StateLocked { .. } => ErrorCategory::StateLocked,
            Self::BinaryNotFound | Self::Spawn { .. } => ErrorCategory::BinaryNotFound,
            Self::Cancelled | Self::DeadlineExceeded => ErrorCategory::Cancelled,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Exit code of the failed process, if the failure was an exit.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Exit { code } | Self::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Create an error from the output of a failed terraform command.
    ///
    /// Analyzes stderr to categorize the error appropriately.
    pub fn from_cli_output(command: &str, code: i32, stderr: &str) -> Self {
        let stderr_lower = stderr.to_lowercase();

        // State lock contention
        if stderr_lower.contains("error acquiring the state lock")
            || stderr_lower.contains("state lock")
            || stderr_lower.contains("conditionalcheckfailedexception")
        {
            return Self::StateLocked {
                message: stderr.trim().to_string(),
            };
        }

        // Network errors
        if stderr_lower.contains("failed to query available provider packages")
            || stderr_lower.contains("could not connect")
            || stderr_lower.contains("connection refused")
            || stderr_lower.contains("connection reset")
            || stderr_lower.contains("no such host")
            || stderr_lower.contains("could not resolve")
            || stderr_lower.contains("i/o timeout")
            || stderr_lower.contains("timed out")
            || stderr_lower.contains("tls handshake")
            || stderr_lower.contains("failed to install provider")
        {
            return Self::Network {
                message: stderr.trim().to_string(),
            };
        }

        Self::CommandFailed {
            command: command.to_string(),
            code,
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for Terraform operations.
pub type Result<T> = std::result::Result<T, Error>;
