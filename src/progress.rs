//! Progress reporting for workflows.
//!
//! The engine reports through the [`Progress`] trait so it can be driven
//! without a terminal. [`TerminalProgress`] prints coloured status lines.

use crate::ui;
use crate::workflow::Phase;
use declarative::{ImportSummary, StateStatus};
use tfexec::PlanSummary;

/// Progress callback for workflow execution.
pub trait Progress: Send {
    /// Called when an action enters a phase
    fn on_phase_start(&mut self, action: &str, phase: Phase);

    /// Called when a phase finishes successfully
    fn on_phase_complete(&mut self, action: &str, phase: Phase);

    /// Called after a plan with changes has been summarised
    fn on_plan(&mut self, action: &str, summary: &PlanSummary);

    /// Called after state has been imported into the stack
    fn on_state(&mut self, action: &str, summary: &ImportSummary);
}

/// No-op progress callback.
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_phase_start(&mut self, _action: &str, _phase: Phase) {}
    fn on_phase_complete(&mut self, _action: &str, _phase: Phase) {}
    fn on_plan(&mut self, _action: &str, _summary: &PlanSummary) {}
    fn on_state(&mut self, _action: &str, _summary: &ImportSummary) {}
}

/// Prints progress to the terminal.
pub struct TerminalProgress {
    quiet: bool,
}

impl TerminalProgress {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Progress for TerminalProgress {
    fn on_phase_start(&mut self, action: &str, phase: Phase) {
        if !self.quiet {
            ui::dim(&format!("{action}: {phase}..."));
        }
    }

    fn on_phase_complete(&mut self, action: &str, phase: Phase) {
        if !self.quiet && phase == Phase::Apply {
            ui::success(&format!("{action}: applied"));
        }
    }

    fn on_plan(&mut self, action: &str, summary: &PlanSummary) {
        if !self.quiet {
            ui::kv(action, &summary.to_string());
        }
    }

    fn on_state(&mut self, action: &str, summary: &ImportSummary) {
        let line = format!(
            "{action}: state {} ({}/{} declared, {} records)",
            summary.status, summary.matched, summary.declared, summary.records
        );
        match summary.status {
            StateStatus::Overflow => ui::warn(&line),
            _ if !self.quiet => ui::info(&line),
            _ => {}
        }
    }
}
