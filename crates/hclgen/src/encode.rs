//! Block encoder.
//!
//! Payload types describe themselves to a [`BodyEncoder`] through the
//! [`Describe`] trait. The encoder collects attributes, nested blocks and
//! labels in call order and produces an [`hcl::Body`] or [`hcl::Block`].
//! Nothing is written anywhere until the whole body has been built, so an
//! error leaves no partial output behind.
//!
//! ```
//! use hclgen::{BodyEncoder, Describe, Result, StringValue, encode_block, to_hcl_string};
//!
//! struct Bucket {
//!     bucket: StringValue,
//!     acl: Option<StringValue>,
//! }
//!
//! impl Describe for Bucket {
//!     fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
//!         body.attribute("bucket", &self.bucket)?;
//!         body.attribute("acl", &self.acl)
//!     }
//! }
//!
//! let bucket = Bucket { bucket: "logs".into(), acl: None };
//! let block = encode_block("resource", &["aws_s3_bucket", "logs"], &bucket).unwrap();
//! let text = to_hcl_string(&hcl::Body(vec![block.into()])).unwrap();
//! assert!(text.contains("\"logs\""));
//! assert!(!text.contains("acl"));
//! ```

use crate::error::{Error, Result};
use crate::reference::Reference;
use crate::value::{Render, Value};
use hcl::Identifier;
use hcl::expr::Expression;
use hcl::structure::{Attribute, Block, BlockLabel, Body, Structure};
use std::collections::{BTreeMap, HashSet};

/// A payload that can write itself into a block body.
pub trait Describe {
    fn describe(&self, body: &mut BodyEncoder) -> Result<()>;
}

impl Describe for () {
    fn describe(&self, _body: &mut BodyEncoder) -> Result<()> {
        Ok(())
    }
}

impl<D: Describe + ?Sized> Describe for Box<D> {
    fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
        (**self).describe(body)
    }
}

impl<D: Describe + ?Sized> Describe for &D {
    fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
        (**self).describe(body)
    }
}

/// Something that may produce an attribute expression.
///
/// Returning `None` means the attribute is left out of the body.
pub trait AttributeValue {
    fn attribute_expression(&self) -> Option<Expression>;
}

impl<T: Render> AttributeValue for Value<T> {
    fn attribute_expression(&self) -> Option<Expression> {
        Some(self.to_expression())
    }
}

impl<V: AttributeValue> AttributeValue for Option<V> {
    fn attribute_expression(&self) -> Option<Expression> {
        self.as_ref().and_then(AttributeValue::attribute_expression)
    }
}

impl AttributeValue for Reference {
    fn attribute_expression(&self) -> Option<Expression> {
        Some(self.to_expression())
    }
}

impl AttributeValue for Expression {
    fn attribute_expression(&self) -> Option<Expression> {
        Some(self.clone())
    }
}

// ============================================================================
// Body encoder
// ============================================================================

/// Collects the structures of one body.
#[derive(Debug)]
pub struct BodyEncoder {
    /// Dotted path of the body, used in error messages
    path: String,
    /// Labels of the enclosing block, `None` at the document root
    labels: Option<Vec<BlockLabel>>,
    structures: Vec<Structure>,
    attributes: HashSet<String>,
}

impl BodyEncoder {
    fn root() -> Self {
        Self {
            path: String::new(),
            labels: None,
            structures: Vec::new(),
            attributes: HashSet::new(),
        }
    }

    fn block_body(path: String, labels: Vec<BlockLabel>) -> Self {
        Self {
            path,
            labels: Some(labels),
            structures: Vec::new(),
            attributes: HashSet::new(),
        }
    }

    fn location(&self) -> String {
        if self.path.is_empty() {
            "document root".to_string()
        } else {
            self.path.clone()
        }
    }

    fn child_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{name}", self.path)
        }
    }

    /// Write `name = value`, or nothing when the value is absent.
    pub fn attribute<V: AttributeValue + ?Sized>(&mut self, name: &str, value: &V) -> Result<()> {
        match value.attribute_expression() {
            Some(expr) => self.raw_attribute(name, expr),
            None => Ok(()),
        }
    }

    /// Write `name = expr` unconditionally.
    pub fn raw_attribute(&mut self, name: &str, expr: Expression) -> Result<()> {
        let key = identifier(name)?;
        if !self.attributes.insert(name.to_string()) {
            return Err(Error::DuplicateAttribute {
                name: name.to_string(),
                block: self.location(),
            });
        }
        self.structures.push(Structure::Attribute(Attribute { key, expr }));
        Ok(())
    }

    /// Write a nested block described by `payload`.
    pub fn block<D: Describe + ?Sized>(&mut self, name: &str, payload: &D) -> Result<()> {
        let block = self.build_block(name, Vec::new(), payload)?;
        self.structures.push(Structure::Block(block));
        Ok(())
    }

    /// Write a nested block if `payload` is present.
    pub fn optional_block<D: Describe>(&mut self, name: &str, payload: &Option<D>) -> Result<()> {
        match payload {
            Some(payload) => self.block(name, payload),
            None => Ok(()),
        }
    }

    /// Write one nested block per element.
    pub fn repeated_block<D: Describe>(&mut self, name: &str, payloads: &[D]) -> Result<()> {
        payloads.iter().try_for_each(|payload| self.block(name, payload))
    }

    /// Append a positional label to the enclosing block.
    pub fn label(&mut self, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        match &mut self.labels {
            Some(labels) => {
                labels.push(BlockLabel::String(label));
                Ok(())
            }
            None => Err(Error::LabelOutsideBlock { label }),
        }
    }

    /// Write every entry of `entries` as its own attribute, keys sorted.
    pub fn remain<V: Render>(&mut self, entries: &BTreeMap<String, V>) -> Result<()> {
        entries
            .iter()
            .try_for_each(|(name, value)| self.raw_attribute(name, value.to_expression()))
    }

    /// Flatten `payload` into this body.
    pub fn embed<D: Describe + ?Sized>(&mut self, payload: &D) -> Result<()> {
        payload.describe(self)
    }

    fn build_block<D: Describe + ?Sized>(
        &self,
        name: &str,
        labels: Vec<BlockLabel>,
        payload: &D,
    ) -> Result<Block> {
        let identifier = identifier(name)?;
        let mut child = Self::block_body(self.child_path(name), labels);
        payload.describe(&mut child)?;
        Ok(Block {
            identifier,
            labels: child.labels.unwrap_or_default(),
            body: Body(child.structures),
        })
    }

    fn finish(self) -> Body {
        Body(self.structures)
    }
}

fn identifier(name: &str) -> Result<Identifier> {
    Identifier::new(name).map_err(|_| Error::InvalidIdentifier(name.to_string()))
}

// ============================================================================
// Entry points
// ============================================================================

/// Encode a payload as a top-level body.
pub fn encode_body<D: Describe + ?Sized>(payload: &D) -> Result<Body> {
    let mut encoder = BodyEncoder::root();
    payload.describe(&mut encoder)?;
    Ok(encoder.finish())
}

/// Encode a payload as a block with the given leading labels. Labels the
/// payload adds itself follow these.
pub fn encode_block<D: Describe + ?Sized>(
    identifier: &str,
    labels: &[&str],
    payload: &D,
) -> Result<Block> {
    let labels = labels
        .iter()
        .map(|label| BlockLabel::String((*label).to_string()))
        .collect();
    BodyEncoder::root().build_block(identifier, labels, payload)
}

/// Format a body as HCL text.
pub fn to_hcl_string(body: &Body) -> Result<String> {
    hcl::format::to_string(body).map_err(|e| Error::Format(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{List, Map};
    use crate::value::{BoolValue, NumberValue, StringValue};

    struct Ingress {
        from_port: NumberValue,
        cidr_blocks: List<StringValue>,
    }

    impl Describe for Ingress {
        fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
            body.attribute("from_port", &self.from_port)?;
            body.attribute("cidr_blocks", &self.cidr_blocks)
        }
    }

    struct Common {
        description: Option<StringValue>,
    }

    impl Describe for Common {
        fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
            body.attribute("description", &self.description)
        }
    }

    struct SecurityGroup {
        name: StringValue,
        vpc_id: StringValue,
        revoke: Option<BoolValue>,
        common: Common,
        ingress: Vec<Ingress>,
        egress: Option<Box<Ingress>>,
        tags: BTreeMap<String, StringValue>,
    }

    impl Describe for SecurityGroup {
        fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
            body.attribute("name", &self.name)?;
            body.attribute("vpc_id", &self.vpc_id)?;
            body.attribute("revoke_rules_on_delete", &self.revoke)?;
            body.embed(&self.common)?;
            body.repeated_block("ingress", &self.ingress)?;
            body.optional_block("egress", &self.egress)?;
            body.remain(&self.tags)
        }
    }

    fn security_group() -> SecurityGroup {
        let mut tags = BTreeMap::new();
        tags.insert("zone".to_string(), StringValue::from("b"));
        tags.insert("env".to_string(), StringValue::from("prod"));
        SecurityGroup {
            name: "web".into(),
            vpc_id: Reference::resource("aws_vpc", "main").append("id").into(),
            revoke: None,
            common: Common {
                description: Some("web tier".into()),
            },
            ingress: vec![
                Ingress {
                    from_port: 80.into(),
                    cidr_blocks: vec![StringValue::from("0.0.0.0/0")].into(),
                },
                Ingress {
                    from_port: 443.into(),
                    cidr_blocks: Value::Reference(
                        Reference::resource("aws_subnet", "a").append("cidrs"),
                    ),
                },
            ],
            egress: None,
            tags,
        }
    }

    fn names(body: &Body) -> Vec<String> {
        body.0
            .iter()
            .map(|s| match s {
                Structure::Attribute(a) => a.key.to_string(),
                Structure::Block(b) => b.identifier.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_dispatch_order_and_omission() {
        let block = encode_block("resource", &["aws_security_group", "web"], &security_group())
            .unwrap();

        assert_eq!(
            block.labels,
            vec![
                BlockLabel::String("aws_security_group".into()),
                BlockLabel::String("web".into()),
            ]
        );
        assert_eq!(
            names(&block.body),
            vec!["name", "vpc_id", "description", "ingress", "ingress", "env", "zone"]
        );
    }

    #[test]
    fn test_round_trip_through_parser() {
        let block = encode_block("resource", &["aws_security_group", "web"], &security_group())
            .unwrap();
        let body = Body(vec![Structure::Block(block)]);

        let text = to_hcl_string(&body).unwrap();
        let parsed: Body = hcl::parse(&text).unwrap();
        assert_eq!(parsed, body);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let first = to_hcl_string(&encode_body(&security_group()).unwrap()).unwrap();
        let second = to_hcl_string(&encode_body(&security_group()).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    struct Labeled(&'static str);

    impl Describe for Labeled {
        fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
            body.label(self.0)
        }
    }

    struct Outer;

    impl Describe for Outer {
        fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
            body.block("dynamic", &Labeled("setting"))
        }
    }

    #[test]
    fn test_labels_attach_to_enclosing_block() {
        let body = encode_body(&Outer).unwrap();
        let Some(Structure::Block(block)) = body.0.first() else {
            panic!("expected a block");
        };
        assert_eq!(block.labels, vec![BlockLabel::String("setting".into())]);
    }

    #[test]
    fn test_label_at_root_fails() {
        assert!(matches!(
            encode_body(&Labeled("x")),
            Err(Error::LabelOutsideBlock { .. })
        ));
    }

    struct Twice;

    impl Describe for Twice {
        fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
            body.attribute("name", &StringValue::from("a"))?;
            body.attribute("name", &StringValue::from("b"))
        }
    }

    #[test]
    fn test_duplicate_attribute_fails() {
        let err = encode_block("resource", &["t", "n"], &Twice).unwrap_err();
        assert_eq!(
            err,
            Error::DuplicateAttribute {
                name: "name".into(),
                block: "resource".into(),
            }
        );
    }

    struct BadName;

    impl Describe for BadName {
        fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
            body.attribute("not valid", &StringValue::from("x"))
        }
    }

    #[test]
    fn test_invalid_identifier_fails() {
        assert!(matches!(
            encode_body(&BadName),
            Err(Error::InvalidIdentifier(name)) if name == "not valid"
        ));
    }

    #[test]
    fn test_map_attribute_and_unit_payload() {
        let mut labels = BTreeMap::new();
        labels.insert("b".to_string(), StringValue::from("2"));
        labels.insert("a".to_string(), StringValue::from("1"));
        let map: Map<StringValue> = labels.into();

        struct WithMap(Map<StringValue>);
        impl Describe for WithMap {
            fn describe(&self, body: &mut BodyEncoder) -> Result<()> {
                body.attribute("labels", &self.0)
            }
        }

        let text = to_hcl_string(&encode_body(&WithMap(map)).unwrap()).unwrap();
        let a = text.find("\"a\"").unwrap();
        let b = text.find("\"b\"").unwrap();
        assert!(a < b);

        let empty = encode_block("provider", &["dummy"], &()).unwrap();
        assert!(empty.body.0.is_empty());
    }
}
