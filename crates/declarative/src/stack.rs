//! Stack description.
//!
//! A [`Stack`] is any user aggregate of components. Instead of being
//! inspected reflectively, it lists its fields to a [`Fields`] collector in
//! declaration order, saying for each one what kind of field it is:
//!
//! ```
//! use declarative::{Backend, Fields, Provider, Resource, Stack};
//!
//! struct Network {
//!     backend: Backend<()>,
//!     aws: Provider,
//!     vpc: Resource<()>,
//!     subnets: Vec<Resource<()>>,
//!     notes: String,
//! }
//!
//! impl Stack for Network {
//!     fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
//!         fields
//!             .component("backend", &self.backend)
//!             .component("aws", &self.aws)
//!             .component("vpc", &self.vpc)
//!             .components("subnets", &self.subnets)
//!             .required()
//!             .ignore("notes");
//!     }
//! }
//! ```

use crate::role::Declared;

/// A user-composed aggregate of components and nested stacks.
pub trait Stack: Send + Sync {
    fn describe<'a>(&'a self, fields: &mut Fields<'a>);
}

impl<S: Stack + ?Sized> Stack for Box<S> {
    fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
        (**self).describe(fields);
    }
}

/// What a field holds.
pub enum FieldKind<'a> {
    /// A single component, `None` when unset
    Component(Option<&'a dyn Declared>),
    /// A list of components
    Components(Vec<&'a dyn Declared>),
    /// A nested stack, `None` when unset
    Nested(Option<&'a dyn Stack>),
    /// A list of nested stacks
    NestedList(Vec<&'a dyn Stack>),
    /// A stack whose fields are flattened into the parent
    Embedded(&'a dyn Stack),
    /// Explicitly skipped
    Ignored,
    /// Not visible to the walker
    Private,
    /// Something that is neither a component nor a stack
    Opaque { empty: bool },
}

impl FieldKind<'_> {
    /// Whether the field holds nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Component(c) => c.is_none(),
            Self::Components(items) => items.is_empty(),
            Self::Nested(s) => s.is_none(),
            Self::NestedList(items) => items.is_empty(),
            Self::Embedded(_) => false,
            Self::Ignored | Self::Private => true,
            Self::Opaque { empty } => *empty,
        }
    }
}

/// One described field.
pub struct Field<'a> {
    pub name: &'static str,
    pub kind: FieldKind<'a>,
    pub required: bool,
}

/// Collector a stack describes its fields into.
#[derive(Default)]
pub struct Fields<'a> {
    entries: Vec<Field<'a>>,
}

impl<'a> Fields<'a> {
    /// Collect the fields of `stack`.
    pub fn of(stack: &'a dyn Stack) -> Self {
        let mut fields = Self::default();
        stack.describe(&mut fields);
        fields
    }

    fn push(&mut self, name: &'static str, kind: FieldKind<'a>) -> &mut Self {
        self.entries.push(Field {
            name,
            kind,
            required: false,
        });
        self
    }

    pub fn component<D: Declared>(&mut self, name: &'static str, component: &'a D) -> &mut Self {
        self.push(name, FieldKind::Component(Some(component)))
    }

    pub fn optional<D: Declared>(
        &mut self,
        name: &'static str,
        component: &'a Option<D>,
    ) -> &mut Self {
        let component = component.as_ref().map(|c| c as &dyn Declared);
        self.push(name, FieldKind::Component(component))
    }

    pub fn components<D: Declared>(&mut self, name: &'static str, items: &'a [D]) -> &mut Self {
        let items = items.iter().map(|c| c as &dyn Declared).collect();
        self.push(name, FieldKind::Components(items))
    }

    pub fn nested<S: Stack>(&mut self, name: &'static str, stack: &'a S) -> &mut Self {
        self.push(name, FieldKind::Nested(Some(stack)))
    }

    pub fn optional_nested<S: Stack>(&mut self, name: &'static str, stack: &'a Option<S>) -> &mut Self {
        let stack = stack.as_ref().map(|s| s as &dyn Stack);
        self.push(name, FieldKind::Nested(stack))
    }

    pub fn nested_list<S: Stack>(&mut self, name: &'static str, stacks: &'a [S]) -> &mut Self {
        let stacks = stacks.iter().map(|s| s as &dyn Stack).collect();
        self.push(name, FieldKind::NestedList(stacks))
    }

    pub fn embed<S: Stack>(&mut self, name: &'static str, stack: &'a S) -> &mut Self {
        self.push(name, FieldKind::Embedded(stack))
    }

    pub fn ignore(&mut self, name: &'static str) -> &mut Self {
        self.push(name, FieldKind::Ignored)
    }

    pub fn private(&mut self, name: &'static str) -> &mut Self {
        self.push(name, FieldKind::Private)
    }

    /// A field holding plain data. Non-empty opaque fields are rejected by
    /// the walker.
    pub fn opaque(&mut self, name: &'static str, empty: bool) -> &mut Self {
        self.push(name, FieldKind::Opaque { empty })
    }

    /// Mark the most recently described field as required.
    pub fn required(&mut self) -> &mut Self {
        if let Some(last) = self.entries.last_mut() {
            last.required = true;
        }
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Field<'a>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for Fields<'a> {
    type Item = Field<'a>;
    type IntoIter = std::vec::IntoIter<Field<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Path of a child field under `prefix`.
pub(crate) fn field_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Resource;

    struct Pair {
        first: Resource<()>,
        second: Option<Resource<()>>,
    }

    impl Stack for Pair {
        fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
            fields
                .component("first", &self.first)
                .optional("second", &self.second)
                .required()
                .opaque("label", false);
        }
    }

    #[test]
    fn test_fields_in_declaration_order() {
        let pair = Pair {
            first: Resource::new("null_resource", "a", ()),
            second: None,
        };
        let fields = Fields::of(&pair);
        let names: Vec<_> = fields.iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["first", "second", "label"]);
    }

    #[test]
    fn test_required_marks_last_field() {
        let pair = Pair {
            first: Resource::new("null_resource", "a", ()),
            second: None,
        };
        let fields = Fields::of(&pair);
        let required: Vec<_> = fields.iter().map(|f| f.required).collect();
        assert_eq!(required, vec![false, true, false]);
        assert!(fields.iter().nth(1).unwrap().kind.is_empty());
    }

    #[test]
    fn test_field_path() {
        assert_eq!(field_path("", "vpc"), "vpc");
        assert_eq!(field_path("network", "vpc"), "network.vpc");
    }
}
