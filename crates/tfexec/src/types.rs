//! Core types for Terraform operations.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,
    /// Base delay between retries
    pub base_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with custom settings.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Never exceeds `max_delay`. A negative delay means no delay; a NaN
    /// delay means `max_delay`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64()).max(0.0);
        Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

// ============================================================================
// Plan JSON
// ============================================================================

/// The parts of `terraform show -json <planfile>` this crate reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub format_version: Option<String>,
    #[serde(default)]
    pub resource_changes: Vec<ResourceChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceChange {
    pub address: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub change: Change,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    pub actions: Vec<ChangeAction>,
}

/// One planned action on a resource instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
    NoOp,
    Create,
    Read,
    Update,
    Delete,
    #[serde(other)]
    Unknown,
}

impl Plan {
    /// Count the planned changes by kind.
    pub fn summary(&self) -> PlanSummary {
        use ChangeAction::{Create, Delete, NoOp, Read, Update};

        let mut summary = PlanSummary::default();
        for rc in &self.resource_changes {
            match rc.change.actions.as_slice() {
                [NoOp] => summary.no_op += 1,
                [Create] => summary.create += 1,
                [Update] => summary.update += 1,
                [Delete] => summary.delete += 1,
                [Read] => summary.read += 1,
                [Create, Delete] | [Delete, Create] => summary.replace += 1,
                _ => {}
            }
        }
        summary
    }
}

/// Planned change counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub replace: usize,
    pub read: usize,
    pub no_op: usize,
}

impl PlanSummary {
    /// Whether applying would modify any infrastructure.
    pub fn has_changes(&self) -> bool {
        self.create + self.update + self.delete + self.replace > 0
    }
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to replace, {} to delete",
            self.create, self.update, self.replace, self.delete
        )
    }
}
