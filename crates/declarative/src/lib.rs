//! # Declarative
//!
//! Infrastructure declared as plain Rust data.
//!
//! This crate turns a user-composed aggregate of components into a
//! Terraform configuration document and reconciles returned state back into
//! it.
//!
//! ## Core Concepts
//!
//! - **Stack**: any type that lists its fields through [`Fields`]
//! - **Roles**: [`Backend`], [`Provider`], [`Resource`] and [`DataSource`]
//!   wrap a payload that implements [`hclgen::Describe`]
//! - **Graph**: the components of a stack grouped by role ([`graph::extract`])
//! - **Document**: the encoded HCL blocks, written through a [`Sink`]
//! - **State import**: [`state::import`] fills resource state slots from a
//!   `show -json` snapshot and classifies the result as a [`StateStatus`]
//!
//! ## Example
//!
//! ```
//! use declarative::{Document, Fields, Provider, Resource, Stack};
//! use hclgen::{BodyEncoder, Describe, Result, StringValue};
//!
//! struct Bucket {
//!     bucket: StringValue,
//! }
//!
//! impl Describe for Bucket {
//!     fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
//!         body.attribute("bucket", &self.bucket)
//!     }
//! }
//!
//! struct Storage {
//!     aws: Provider,
//!     logs: Resource<Bucket>,
//! }
//!
//! impl Stack for Storage {
//!     fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
//!         fields.component("aws", &self.aws).component("logs", &self.logs);
//!     }
//! }
//!
//! let storage = Storage {
//!     aws: Provider::new("aws", "hashicorp/aws", "~> 5.0", ()),
//!     logs: Resource::new("aws_s3_bucket", "logs", Bucket { bucket: "my-logs".into() }),
//! };
//!
//! let text = Document::from_stack(&storage).unwrap().to_hcl().unwrap();
//! assert!(text.contains("required_providers"));
//! assert!(text.contains("resource \"aws_s3_bucket\" \"logs\""));
//! ```

pub mod document;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod role;
pub mod sink;
pub mod stack;
pub mod state;
pub mod validate;

// Re-export main types at crate root
pub use document::Document;
pub use error::{Error, Result};
pub use graph::Graph;
pub use lifecycle::{DependsOn, IgnoreChanges, Lifecycle};
pub use role::{
    Backend, BackendBlock, Component, DataSource, DataSourceBlock, Declared, Provider,
    ProviderBlock, ProviderRef, Resource, ResourceBlock,
};
pub use sink::{ExportReport, GENERATED_HEADER, Sink};
pub use stack::{Field, FieldKind, Fields, Stack};
pub use state::{ImportSummary, RequiredState, StateSnapshot, StateStatus};
