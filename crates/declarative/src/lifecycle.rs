//! Explicit dependencies and lifecycle settings of a resource.

use hclgen::{AttributeValue, BodyEncoder, Describe, Reference};
use hcl::expr::{Expression, Variable};

/// Keyword that makes `ignore_changes` cover every attribute.
const ALL_KEYWORD: &str = "all";

/// Explicit `depends_on` list.
///
/// Entries always render as bare resource or data source addresses; any
/// attribute path on a reference is dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependsOn(Vec<Reference>);

impl DependsOn {
    pub fn new(references: impl IntoIterator<Item = Reference>) -> Self {
        Self(references.into_iter().collect())
    }

    pub fn push(&mut self, reference: Reference) {
        self.0.push(reference);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn references(&self) -> &[Reference] {
        &self.0
    }
}

impl AttributeValue for DependsOn {
    fn attribute_expression(&self) -> Option<Expression> {
        if self.0.is_empty() {
            return None;
        }
        Some(Expression::Array(
            self.0
                .iter()
                .map(|r| r.resource_reference().to_expression())
                .collect(),
        ))
    }
}

/// What `ignore_changes` covers.
#[derive(Debug, Clone, PartialEq)]
pub enum IgnoreChanges {
    /// Every attribute
    All,
    /// Attributes of the owning resource, written relative to it
    Attributes(Vec<Reference>),
}

/// `lifecycle` block settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lifecycle {
    pub create_before_destroy: bool,
    pub prevent_destroy: bool,
    pub ignore_changes: Option<IgnoreChanges>,
    pub replace_triggered_by: Vec<Reference>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_before_destroy(mut self) -> Self {
        self.create_before_destroy = true;
        self
    }

    pub fn prevent_destroy(mut self) -> Self {
        self.prevent_destroy = true;
        self
    }

    pub fn ignore_all_changes(mut self) -> Self {
        self.ignore_changes = Some(IgnoreChanges::All);
        self
    }

    pub fn ignore_changes(mut self, attributes: impl IntoIterator<Item = Reference>) -> Self {
        self.ignore_changes = Some(IgnoreChanges::Attributes(attributes.into_iter().collect()));
        self
    }

    pub fn replace_triggered_by(mut self, references: impl IntoIterator<Item = Reference>) -> Self {
        self.replace_triggered_by = references.into_iter().collect();
        self
    }

    /// Whether the block would render with no content.
    pub fn is_empty(&self) -> bool {
        !self.create_before_destroy
            && !self.prevent_destroy
            && self.ignore_changes.is_none()
            && self.replace_triggered_by.is_empty()
    }
}

impl Describe for Lifecycle {
    fn describe(&self, body: &mut BodyEncoder) -> hclgen::Result<()> {
        if self.create_before_destroy {
            body.raw_attribute("create_before_destroy", Expression::Bool(true))?;
        }
        if self.prevent_destroy {
            body.raw_attribute("prevent_destroy", Expression::Bool(true))?;
        }
        match &self.ignore_changes {
            Some(IgnoreChanges::All) => {
                body.raw_attribute(
                    "ignore_changes",
                    Expression::Variable(Variable::unchecked(ALL_KEYWORD)),
                )?;
            }
            Some(IgnoreChanges::Attributes(attributes)) => {
                let paths = attributes
                    .iter()
                    .map(Reference::to_relative_expression)
                    .collect::<hclgen::Result<Vec<_>>>()?;
                body.raw_attribute("ignore_changes", Expression::Array(paths))?;
            }
            None => {}
        }
        if !self.replace_triggered_by.is_empty() {
            let triggers = self
                .replace_triggered_by
                .iter()
                .map(Reference::to_expression)
                .collect();
            body.raw_attribute("replace_triggered_by", Expression::Array(triggers))?;
        }
        Ok(())
    }
}
