//! State import.
//!
//! Matches the records of a `show -json` snapshot against the resources a
//! stack declares, fills their state slots and classifies how well the two
//! agree.

use crate::error::{Error, Result};
use crate::graph;
use crate::role::Resource;
use crate::stack::Stack;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Mode of a managed resource record.
const MANAGED_MODE: &str = "managed";

fn default_mode() -> String {
    MANAGED_MODE.to_string()
}

/// Output of `show -json` for the current state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateSnapshot {
    #[serde(default)]
    pub format_version: Option<String>,
    #[serde(default)]
    pub values: Option<StateValues>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateValues {
    #[serde(default)]
    pub root_module: RootModule,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RootModule {
    #[serde(default)]
    pub resources: Vec<StateRecord>,
}

/// One resource instance in the snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct StateRecord {
    pub address: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(rename = "values", default)]
    pub attribute_values: serde_json::Value,
}

impl StateRecord {
    pub fn is_managed(&self) -> bool {
        self.mode == MANAGED_MODE
    }
}

impl StateSnapshot {
    pub fn from_json(json: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Records of managed resources; data source reads are skipped.
    pub fn managed_records(&self) -> impl Iterator<Item = &StateRecord> {
        self.values
            .iter()
            .flat_map(|v| v.root_module.resources.iter())
            .filter(|r| r.is_managed())
    }
}

// ============================================================================
// Classification
// ============================================================================

/// How completely the snapshot covers the declared resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateStatus {
    /// The snapshot has no records
    Empty,
    /// Some declared resources have no record
    Partial,
    /// Every declared resource has a record, and nothing else does
    Sync,
    /// Every declared resource has a record, plus records nobody declares
    Overflow,
}

impl StateStatus {
    /// Classify `matched` of `declared` resources against `records` records.
    pub fn classify(declared: usize, matched: usize, records: usize) -> Self {
        if records == 0 {
            Self::Empty
        } else if matched < declared {
            Self::Partial
        } else if records == declared {
            Self::Sync
        } else {
            Self::Overflow
        }
    }
}

impl fmt::Display for StateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::Partial => "partial",
            Self::Sync => "sync",
            Self::Overflow => "overflow",
        };
        f.write_str(s)
    }
}

/// Result of one import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub status: StateStatus,
    pub declared: usize,
    pub matched: usize,
    pub records: usize,
    /// Addresses of declared resources with no record
    pub unmatched: Vec<String>,
}

/// Import `snapshot` into the state slots of every resource in `stack`.
///
/// Declared resources without a record have their slot cleared. If any
/// record fails to decode, every slot is cleared so the stack never holds
/// state from two different snapshots.
pub fn import(stack: &dyn Stack, snapshot: &StateSnapshot) -> Result<ImportSummary> {
    let graph = graph::extract(stack)?;
    let records: HashMap<(&str, &str), &StateRecord> = snapshot
        .managed_records()
        .map(|r| ((r.kind.as_str(), r.name.as_str()), r))
        .collect();

    let mut matched = 0;
    let mut unmatched = Vec::new();
    for resource in &graph.resources {
        match records.get(&(resource.kind(), resource.name())) {
            Some(record) => {
                if let Err(e) = resource.import_state(&record.attribute_values) {
                    graph.resources.iter().for_each(|r| r.clear_state());
                    return Err(e);
                }
                matched += 1;
            }
            None => {
                resource.clear_state();
                unmatched.push(resource.address());
            }
        }
    }

    let declared = graph.resources.len();
    let record_count = snapshot.managed_records().count();
    let status = StateStatus::classify(declared, matched, record_count);
    debug!("Imported state: {status} ({matched}/{declared} declared, {record_count} records)");

    if status == StateStatus::Overflow {
        let known: HashSet<(&str, &str)> =
            graph.resources.iter().map(|r| (r.kind(), r.name())).collect();
        snapshot
            .managed_records()
            .filter(|r| !known.contains(&(r.kind.as_str(), r.name.as_str())))
            .for_each(|r| warn!("State has undeclared resource {}", r.address));
    }

    Ok(ImportSummary {
        status,
        declared,
        matched,
        records: record_count,
        unmatched,
    })
}

// ============================================================================
// Strict access
// ============================================================================

/// Collects every resource without state so they can be reported together.
#[derive(Debug, Default)]
pub struct RequiredState {
    missing: Vec<String>,
}

impl RequiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `resource`, recording it as missing when absent.
    pub fn require<A, S: Clone>(&mut self, resource: &Resource<A, S>) -> Option<S> {
        let state = resource.state();
        if state.is_none() {
            self.missing.push(resource.reference().to_string());
        }
        state
    }

    /// Fail with every address recorded as missing.
    pub fn finish(self) -> Result<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingState {
                addresses: self.missing,
            })
        }
    }
}
