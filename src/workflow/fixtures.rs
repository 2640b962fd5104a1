//! Stacks and a scripted terraform shared by the workflow tests.

use crate::progress::Progress;
use crate::workflow::Phase;
use declarative::{Backend, Fields, ImportSummary, Provider, Resource, Stack};
use hclgen::{BodyEncoder, Describe, StringValue};
use std::sync::Arc;
use tfexec::{Invocation, PlanSummary, RecordingExecutor, Response};

/// `plan` exit code for a plan without changes.
pub const NO_CHANGES: i32 = 0;

/// `plan` exit code for a plan with changes.
pub const CHANGES: i32 = tfexec::PLAN_DIFF_EXIT_CODE;

pub struct S3Backend {
    bucket: StringValue,
    key: StringValue,
}

impl Describe for S3Backend {
    fn describe(&self, body: &mut BodyEncoder) -> hclgen::Result<()> {
        body.attribute("bucket", &self.bucket)?;
        body.attribute("key", &self.key)
    }
}

pub struct DummyStack {
    pub backend: Backend<S3Backend>,
    pub provider: Provider,
    pub resource: Resource<()>,
}

impl Stack for DummyStack {
    fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
        fields
            .component("backend", &self.backend)
            .component("provider", &self.provider)
            .component("resource", &self.resource);
    }
}

/// A stack with one `dummy_resource` named `resource`.
pub fn dummy_stack(resource: &str) -> Arc<DummyStack> {
    Arc::new(DummyStack {
        backend: Backend::new(
            "s3",
            S3Backend {
                bucket: "my-s3-bucket".into(),
                key: "some/path/to/state".into(),
            },
        ),
        provider: Provider::new("dummy", "dummy/dummy", "0", ()),
        resource: Resource::new("dummy_resource", resource, ()),
    })
}

/// A resource with no provider to serve it.
pub struct ProviderlessStack {
    resources: Vec<Resource<()>>,
}

impl Stack for ProviderlessStack {
    fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
        fields.components("resources", &self.resources);
    }
}

impl ProviderlessStack {
    pub fn new() -> Self {
        Self {
            resources: vec![Resource::new("dummy_resource", "orphan", ())],
        }
    }
}

/// `show -json` output with one `dummy_resource` per name.
pub fn state_json(names: &[&str]) -> String {
    let resources: Vec<_> = names
        .iter()
        .map(|name| {
            serde_json::json!({
                "address": format!("dummy_resource.{name}"),
                "mode": "managed",
                "type": "dummy_resource",
                "name": name,
                "values": {"id": format!("id-{name}")}
            })
        })
        .collect();
    serde_json::json!({
        "format_version": "1.0",
        "values": {"root_module": {"resources": resources}}
    })
    .to_string()
}

fn plan_json(name: &str) -> String {
    serde_json::json!({
        "format_version": "1.2",
        "resource_changes": [{
            "address": format!("dummy_resource.{name}"),
            "type": "dummy_resource",
            "name": name,
            "change": {"actions": ["create"]}
        }]
    })
    .to_string()
}

/// Answer like terraform would for a stack whose working directory is
/// named after its only resource, which exists in state.
pub fn respond(invocation: &Invocation, plan_exit: i32) -> Response {
    let name = invocation
        .working_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    match invocation.args.as_slice() {
        [cmd, ..] if cmd == "plan" => Response::exit(plan_exit),
        [cmd, _, _] if cmd == "show" => Response::ok().with_stdout(plan_json(&name)),
        [cmd, _] if cmd == "show" => Response::ok().with_stdout(state_json(&[&name])),
        _ => Response::ok(),
    }
}

/// A scripted terraform whose plans exit with `plan_exit`.
pub fn terraform(plan_exit: i32) -> Arc<RecordingExecutor> {
    Arc::new(RecordingExecutor::with_responder(move |inv| {
        respond(inv, plan_exit)
    }))
}

pub fn invocations(executor: &RecordingExecutor) -> Vec<Vec<String>> {
    executor
        .invocations()
        .into_iter()
        .map(|i| i.args)
        .collect()
}

/// Records phase starts, plan summaries and state statuses.
#[derive(Default)]
pub struct RecordingProgress {
    pub events: Vec<String>,
}

impl Progress for RecordingProgress {
    fn on_phase_start(&mut self, action: &str, phase: Phase) {
        self.events.push(format!("{action}: {phase}"));
    }

    fn on_phase_complete(&mut self, _action: &str, _phase: Phase) {}

    fn on_plan(&mut self, action: &str, summary: &PlanSummary) {
        self.events.push(format!("{action}: plan summary {summary}"));
    }

    fn on_state(&mut self, action: &str, summary: &ImportSummary) {
        self.events
            .push(format!("{action}: state {}", summary.status));
    }
}
