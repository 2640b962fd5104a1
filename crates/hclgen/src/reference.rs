//! Symbolic references to attributes of resources and data sources.
//!
//! A [`Reference`] is a root (a resource or a data source) followed by a list
//! of traversal steps. References are values: every extension returns a new
//! reference and leaves the original untouched.
//!
//! ```
//! use hclgen::Reference;
//!
//! let subnets = Reference::resource("aws_subnet", "private");
//! let first_id = subnets.append("ids").index(0);
//!
//! assert_eq!(subnets.to_string(), "aws_subnet.private");
//! assert_eq!(first_id.to_string(), "aws_subnet.private.ids[0]");
//! ```

use crate::error::{Error, Result};
use hcl::Identifier;
use hcl::expr::{Expression, Traversal, TraversalOperator, Variable};
use std::fmt;

/// Keyword that prefixes every data source address.
const DATA_KEYWORD: &str = "data";

/// The object a reference starts from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Root {
    /// A managed resource, addressed as `type.name`
    Resource { kind: String, name: String },
    /// A data source, addressed as `data.type.name`
    DataSource { kind: String, name: String },
}

impl Root {
    /// Resource or data source type
    pub fn kind(&self) -> &str {
        match self {
            Self::Resource { kind, .. } | Self::DataSource { kind, .. } => kind,
        }
    }

    /// Local name within the stack
    pub fn name(&self) -> &str {
        match self {
            Self::Resource { name, .. } | Self::DataSource { name, .. } => name,
        }
    }

    /// Whether this root is a data source
    pub fn is_data_source(&self) -> bool {
        matches!(self, Self::DataSource { .. })
    }
}

/// One traversal step after the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Step {
    /// `.attr`
    Attr(String),
    /// `[0]`
    Index(u64),
    /// `["key"]`
    Key(String),
    /// `[*]`
    Splat,
}

impl Step {
    fn to_operator(&self) -> TraversalOperator {
        match self {
            Self::Attr(attr) => TraversalOperator::GetAttr(Identifier::unchecked(attr.as_str())),
            Self::Index(index) => TraversalOperator::Index(Expression::Number((*index).into())),
            Self::Key(key) => TraversalOperator::Index(Expression::String(key.clone())),
            Self::Splat => TraversalOperator::FullSplat,
        }
    }
}

/// A path to a (possibly not yet known) attribute of a resource or data
/// source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    root: Root,
    steps: Vec<Step>,
}

impl Reference {
    /// Reference to a managed resource.
    pub fn resource(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            root: Root::Resource {
                kind: kind.into(),
                name: name.into(),
            },
            steps: Vec::new(),
        }
    }

    /// Reference to a data source.
    pub fn data_source(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            root: Root::DataSource {
                kind: kind.into(),
                name: name.into(),
            },
            steps: Vec::new(),
        }
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Extend with an attribute access (`.attr`).
    pub fn append(&self, attr: impl Into<String>) -> Self {
        self.extend(Step::Attr(attr.into()))
    }

    /// Extend with a numeric index (`[i]`).
    pub fn index(&self, index: u64) -> Self {
        self.extend(Step::Index(index))
    }

    /// Extend with a map key (`["key"]`).
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.extend(Step::Key(key.into()))
    }

    /// Extend with a full splat (`[*]`).
    pub fn splat(&self) -> Self {
        self.extend(Step::Splat)
    }

    fn extend(&self, step: Step) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend_from_slice(&self.steps);
        steps.push(step);
        Self {
            root: self.root.clone(),
            steps,
        }
    }

    /// The bare resource or data source this reference starts from.
    pub fn resource_reference(&self) -> Self {
        Self {
            root: self.root.clone(),
            steps: Vec::new(),
        }
    }

    /// Render the absolute traversal, e.g. `aws_vpc.main.id`.
    pub fn to_expression(&self) -> Expression {
        let mut operators = Vec::with_capacity(self.steps.len() + 2);
        let head = match &self.root {
            Root::Resource { kind, name } => {
                operators.push(TraversalOperator::GetAttr(Identifier::unchecked(name.as_str())));
                Variable::unchecked(kind.as_str())
            }
            Root::DataSource { kind, name } => {
                operators.push(TraversalOperator::GetAttr(Identifier::unchecked(kind.as_str())));
                operators.push(TraversalOperator::GetAttr(Identifier::unchecked(name.as_str())));
                Variable::unchecked(DATA_KEYWORD)
            }
        };
        operators.extend(self.steps.iter().map(Step::to_operator));
        Expression::from(Traversal::new(head, operators))
    }

    /// Render the path relative to the root, e.g. `tags["Name"]` for
    /// `aws_vpc.main.tags["Name"]`.
    ///
    /// The first step must be an attribute access.
    pub fn to_relative_expression(&self) -> Result<Expression> {
        let Some((Step::Attr(first), rest)) = self.steps.split_first() else {
            return Err(Error::EmptyRelativePath(self.to_string()));
        };
        let head = Variable::unchecked(first.as_str());
        if rest.is_empty() {
            return Ok(Expression::Variable(head));
        }
        let operators: Vec<TraversalOperator> = rest.iter().map(Step::to_operator).collect();
        Ok(Expression::from(Traversal::new(head, operators)))
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.root {
            Root::Resource { kind, name } => write!(f, "{kind}.{name}")?,
            Root::DataSource { kind, name } => write!(f, "{DATA_KEYWORD}.{kind}.{name}")?,
        }
        for step in &self.steps {
            match step {
                Step::Attr(attr) => write!(f, ".{attr}")?,
                Step::Index(index) => write!(f, "[{index}]")?,
                Step::Key(key) => write!(f, "[\"{}\"]", escape(key))?,
                Step::Splat => f.write_str("[*]")?,
            }
        }
        Ok(())
    }
}

fn escape(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
