//! Lists, sets and maps of values.
//!
//! Collections are ordinary [`Value`]s whose literal is a Rust container.
//! A literal collection renders as a tuple or object; a reference-bound
//! collection renders as its path and can be indexed, keyed or splatted.

use crate::error::Result;
use crate::value::{FromReference, Render, Value};
use hcl::expr::{Expression, ObjectKey};
use std::collections::BTreeMap;

/// Ordered list of values.
pub type List<E> = Value<Vec<E>>;
/// String-keyed map of values, rendered with sorted keys.
pub type Map<E> = Value<BTreeMap<String, E>>;
/// Set of values.
pub type Set<E> = Value<SetOf<E>>;

/// Literal set contents.
///
/// Elements keep insertion order; an element whose rendering equals an
/// earlier element is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOf<E>(Vec<E>);

impl<E: Render> SetOf<E> {
    pub fn new(items: impl IntoIterator<Item = E>) -> Self {
        let mut set = Self(Vec::new());
        for item in items {
            set.insert(item);
        }
        set
    }

    /// Insert an element, returning false if an equal element exists.
    pub fn insert(&mut self, item: E) -> bool {
        let rendered = item.to_expression();
        if self.0.iter().any(|e| e.to_expression() == rendered) {
            return false;
        }
        self.0.push(item);
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<E: Render> FromIterator<E> for SetOf<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self::new(iter)
    }
}

// ============================================================================
// Rendering
// ============================================================================

impl<E: Render> Render for Vec<E> {
    fn to_expression(&self) -> Expression {
        Expression::Array(self.iter().map(Render::to_expression).collect())
    }
}

impl<E: Render> Render for SetOf<E> {
    fn to_expression(&self) -> Expression {
        Expression::Array(self.0.iter().map(Render::to_expression).collect())
    }
}

impl<E: Render> Render for BTreeMap<String, E> {
    fn to_expression(&self) -> Expression {
        Expression::Object(
            self.iter()
                .map(|(k, v)| (ObjectKey::Expression(Expression::String(k.clone())), v.to_expression()))
                .collect(),
        )
    }
}

impl<E> From<Vec<E>> for Value<Vec<E>> {
    fn from(items: Vec<E>) -> Self {
        Self::Literal(items)
    }
}

impl<E> From<BTreeMap<String, E>> for Value<BTreeMap<String, E>> {
    fn from(items: BTreeMap<String, E>) -> Self {
        Self::Literal(items)
    }
}

impl<E> From<SetOf<E>> for Value<SetOf<E>> {
    fn from(items: SetOf<E>) -> Self {
        Self::Literal(items)
    }
}

// ============================================================================
// Traversal
// ============================================================================

impl<E: FromReference> Value<Vec<E>> {
    /// Element `index` of a computed list.
    pub fn index(&self, index: u64) -> Result<E> {
        let reference = self.traverse("index")?;
        Ok(E::from_reference(reference.index(index)))
    }

    /// Every element of a computed list, `list[*]`.
    pub fn splat(&self) -> Result<List<E>> {
        let reference = self.traverse("splat")?;
        Ok(Value::Reference(reference.splat()))
    }
}

impl<E: FromReference> Value<SetOf<E>> {
    /// Every element of a computed set, `set[*]`. Sets have no stable order,
    /// so splatting is the only traversal they support.
    pub fn splat(&self) -> Result<List<E>> {
        let reference = self.traverse("splat")?;
        Ok(Value::Reference(reference.splat()))
    }
}

impl<E: FromReference> Value<BTreeMap<String, E>> {
    /// Entry `key` of a computed map.
    pub fn key(&self, key: impl Into<String>) -> Result<E> {
        let reference = self.traverse("key")?;
        Ok(E::from_reference(reference.key(key)))
    }
}
