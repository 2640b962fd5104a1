//! # hclgen
//!
//! Typed HCL values and block encoding for generated Terraform configuration.
//!
//! This crate provides:
//! - [`Value`]: a literal or a reference to an attribute computed later
//! - [`Reference`]: symbolic `type.name.attr[0]["key"][*]` paths
//! - [`List`], [`Map`] and [`Set`] collections that can be indexed, keyed
//!   or splatted when they are reference-bound
//! - [`Describe`] and [`BodyEncoder`]: the visitor that turns payload
//!   structs into HCL bodies
//!
//! ## Example
//!
//! ```
//! use hclgen::{BodyEncoder, Describe, Reference, Result, StringValue};
//!
//! struct Subnet {
//!     vpc_id: StringValue,
//!     cidr_block: StringValue,
//! }
//!
//! impl Describe for Subnet {
//!     fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
//!         body.attribute("vpc_id", &self.vpc_id)?;
//!         body.attribute("cidr_block", &self.cidr_block)
//!     }
//! }
//!
//! let subnet = Subnet {
//!     vpc_id: Reference::resource("aws_vpc", "main").append("id").into(),
//!     cidr_block: "10.0.1.0/24".into(),
//! };
//!
//! let block = hclgen::encode_block("resource", &["aws_subnet", "a"], &subnet).unwrap();
//! let text = hclgen::to_hcl_string(&hcl::Body(vec![block.into()])).unwrap();
//! assert!(text.contains("aws_vpc.main.id"));
//! ```

#![warn(clippy::all)]

pub mod collection;
pub mod encode;
pub mod error;
pub mod reference;
pub mod value;

pub use collection::{List, Map, Set, SetOf};
pub use encode::{AttributeValue, BodyEncoder, Describe, encode_block, encode_body, to_hcl_string};
pub use error::{Error, Result};
pub use reference::{Reference, Root, Step};
pub use value::{BoolValue, FromReference, NumberValue, Render, StringValue, Value};
