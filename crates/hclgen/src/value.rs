//! Typed configuration values.
//!
//! A [`Value`] is either a literal known at declaration time or a
//! [`Reference`] to an attribute that the external tool computes later.
//! Both render to an HCL [`Expression`]; only references can be traversed
//! and only literals can be read back.

use crate::error::{Error, Result};
use crate::reference::Reference;
use hcl::Number;
use hcl::expr::Expression;

/// Anything that renders to an HCL expression.
pub trait Render {
    fn to_expression(&self) -> Expression;
}

/// Types that can be rebuilt on top of a new reference.
///
/// Container values use this to produce correctly typed elements when they
/// are indexed, keyed or splatted.
pub trait FromReference: Sized {
    fn from_reference(reference: Reference) -> Self;
}

/// A literal or a reference-bound value of nominal type `T`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<T> {
    /// Known at declaration time
    Literal(T),
    /// Computed by the external tool, rendered as a traversal
    Reference(Reference),
}

/// String value.
pub type StringValue = Value<String>;
/// Number value.
pub type NumberValue = Value<f64>;
/// Boolean value.
pub type BoolValue = Value<bool>;

impl<T> Value<T> {
    pub fn literal(value: T) -> Self {
        Self::Literal(value)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }

    /// The reference this value is bound to.
    pub fn as_reference(&self) -> Result<&Reference> {
        match self {
            Self::Reference(reference) => Ok(reference),
            Self::Literal(_) => Err(Error::LiteralTraversal {
                operation: "take the reference of",
            }),
        }
    }

    /// The literal this value holds.
    pub fn as_literal(&self) -> Result<&T> {
        match self {
            Self::Literal(value) => Ok(value),
            Self::Reference(reference) => Err(Error::NotALiteral {
                reference: reference.to_string(),
            }),
        }
    }

    /// Bound reference for a traversal operation named `operation`.
    pub(crate) fn traverse(&self, operation: &'static str) -> Result<&Reference> {
        match self {
            Self::Reference(reference) => Ok(reference),
            Self::Literal(_) => Err(Error::LiteralTraversal { operation }),
        }
    }

    /// Same reference under a different nominal type.
    fn rewrap<U>(reference: &Reference) -> Value<U> {
        Value::Reference(reference.clone())
    }
}

impl<T> FromReference for Value<T> {
    fn from_reference(reference: Reference) -> Self {
        Self::Reference(reference)
    }
}

impl<T: Render> Render for Value<T> {
    fn to_expression(&self) -> Expression {
        match self {
            Self::Literal(value) => value.to_expression(),
            Self::Reference(reference) => reference.to_expression(),
        }
    }
}

impl<T> From<Reference> for Value<T> {
    fn from(reference: Reference) -> Self {
        Self::Reference(reference)
    }
}

impl From<&str> for Value<String> {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<String> for Value<String> {
    fn from(value: String) -> Self {
        Self::Literal(value)
    }
}

impl From<f64> for Value<f64> {
    fn from(value: f64) -> Self {
        Self::Literal(value)
    }
}

impl From<i64> for Value<f64> {
    fn from(value: i64) -> Self {
        Self::Literal(value as f64)
    }
}

impl From<bool> for Value<bool> {
    fn from(value: bool) -> Self {
        Self::Literal(value)
    }
}

// ============================================================================
// Scalar rendering
// ============================================================================

impl Render for String {
    fn to_expression(&self) -> Expression {
        Expression::String(self.clone())
    }
}

impl Render for bool {
    fn to_expression(&self) -> Expression {
        Expression::Bool(*self)
    }
}

impl Render for f64 {
    fn to_expression(&self) -> Expression {
        if !self.is_finite() {
            return Expression::Null;
        }
        if self.fract() == 0.0 && self.abs() < MAX_EXACT_INTEGER {
            return Expression::Number(Number::from(*self as i64));
        }
        Number::from_f64(*self).map_or(Expression::Null, Expression::Number)
    }
}

impl Render for i64 {
    fn to_expression(&self) -> Expression {
        Expression::Number(Number::from(*self))
    }
}

impl Render for Expression {
    fn to_expression(&self) -> Expression {
        self.clone()
    }
}

/// Largest magnitude at which every integer is exactly representable in f64.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Canonical decimal form of a number, `1` rather than `1.0`.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl Value<String> {
    /// Convert to a number. Literals must parse as a decimal number.
    pub fn as_number(&self) -> Result<Value<f64>> {
        match self {
            Self::Literal(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Value::Literal)
                .ok_or_else(|| Error::Conversion {
                    value: s.clone(),
                    target: "number",
                }),
            Self::Reference(reference) => Ok(Self::rewrap(reference)),
        }
    }

    /// Convert to a bool. Literals must be exactly `"true"` or `"false"`.
    pub fn as_bool(&self) -> Result<Value<bool>> {
        match self {
            Self::Literal(s) => match s.as_str() {
                "true" => Ok(Value::Literal(true)),
                "false" => Ok(Value::Literal(false)),
                _ => Err(Error::Conversion {
                    value: s.clone(),
                    target: "bool",
                }),
            },
            Self::Reference(reference) => Ok(Self::rewrap(reference)),
        }
    }
}

impl Value<f64> {
    pub fn as_string(&self) -> Value<String> {
        match self {
            Self::Literal(n) => Value::Literal(format_number(*n)),
            Self::Reference(reference) => Self::rewrap(reference),
        }
    }

    /// Numbers and bools do not convert into each other; only references
    /// can be re-typed.
    pub fn as_bool(&self) -> Result<Value<bool>> {
        match self {
            Self::Literal(n) => Err(Error::Conversion {
                value: format_number(*n),
                target: "bool",
            }),
            Self::Reference(reference) => Ok(Self::rewrap(reference)),
        }
    }
}

impl Value<bool> {
    pub fn as_string(&self) -> Value<String> {
        match self {
            Self::Literal(b) => Value::Literal(b.to_string()),
            Self::Reference(reference) => Self::rewrap(reference),
        }
    }

    pub fn as_number(&self) -> Result<Value<f64>> {
        match self {
            Self::Literal(b) => Err(Error::Conversion {
                value: b.to_string(),
                target: "number",
            }),
            Self::Reference(reference) => Ok(Self::rewrap(reference)),
        }
    }
}
