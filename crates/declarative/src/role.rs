//! Component roles: backends, providers, resources and data sources.
//!
//! Each role is a generic wrapper around a user payload that implements
//! [`Describe`]. The wrappers carry the identity the document needs (type,
//! local name, alias) and, for resources, the slot imported state lands in.
//! The walker sees them through the object-safe `*Block` traits and the
//! [`Component`] tag produced by [`Declared::component`].

use crate::error::{Error, Result};
use crate::lifecycle::{DependsOn, Lifecycle};
use hcl::Identifier;
use hcl::expr::{Expression, Traversal, TraversalOperator, Variable};
use hclgen::{Describe, Reference, Value};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::{PoisonError, RwLock};

// ============================================================================
// Object-safe views
// ============================================================================

/// A managed resource as seen by the graph walker.
pub trait ResourceBlock: Send + Sync {
    fn kind(&self) -> &str;
    fn name(&self) -> &str;
    fn payload(&self) -> &dyn Describe;
    fn depends_on(&self) -> Option<&DependsOn>;
    fn lifecycle(&self) -> Option<&Lifecycle>;
    fn provider(&self) -> Option<&ProviderRef>;

    /// Decode a state record into the resource's state slot.
    fn import_state(&self, values: &serde_json::Value) -> Result<()>;

    /// Empty the state slot.
    fn clear_state(&self);

    fn has_state(&self) -> bool;

    /// `type.name`
    fn address(&self) -> String {
        format!("{}.{}", self.kind(), self.name())
    }
}

/// A data source as seen by the graph walker.
pub trait DataSourceBlock: Send + Sync {
    fn kind(&self) -> &str;
    fn name(&self) -> &str;
    fn payload(&self) -> &dyn Describe;
    fn provider(&self) -> Option<&ProviderRef>;

    /// `data.type.name`
    fn address(&self) -> String {
        format!("data.{}.{}", self.kind(), self.name())
    }
}

/// A provider configuration as seen by the graph walker.
pub trait ProviderBlock: Send + Sync {
    fn name(&self) -> &str;
    fn source(&self) -> &str;
    fn version(&self) -> &str;
    fn alias(&self) -> Option<&str>;
    fn payload(&self) -> &dyn Describe;

    fn reference(&self) -> ProviderRef {
        ProviderRef {
            name: self.name().to_string(),
            alias: self.alias().map(ToString::to_string),
        }
    }
}

/// The state backend as seen by the graph walker.
pub trait BackendBlock: Send + Sync {
    fn kind(&self) -> &str;
    fn payload(&self) -> &dyn Describe;
}

/// A classified component.
#[derive(Clone, Copy)]
pub enum Component<'a> {
    Backend(&'a dyn BackendBlock),
    Provider(&'a dyn ProviderBlock),
    Resource(&'a dyn ResourceBlock),
    DataSource(&'a dyn DataSourceBlock),
}

impl fmt::Debug for Component<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(b) => write!(f, "Backend({})", b.kind()),
            Self::Provider(p) => write!(f, "Provider({})", p.reference()),
            Self::Resource(r) => write!(f, "Resource({})", r.address()),
            Self::DataSource(d) => write!(f, "DataSource({})", d.address()),
        }
    }
}

/// Anything a stack field can hold as a component.
pub trait Declared: Send + Sync {
    fn component(&self) -> Component<'_>;
}

// ============================================================================
// Provider selection
// ============================================================================

/// Selects a provider configuration, rendered as `name` or `name.alias`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderRef {
    pub name: String,
    pub alias: Option<String>,
}

impl ProviderRef {
    pub fn to_expression(&self) -> Expression {
        let head = Variable::unchecked(self.name.as_str());
        match &self.alias {
            Some(alias) => Expression::from(Traversal::new(
                head,
                [TraversalOperator::GetAttr(Identifier::unchecked(alias.as_str()))],
            )),
            None => Expression::Variable(head),
        }
    }
}

impl fmt::Display for ProviderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{}.{alias}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

// ============================================================================
// Resource
// ============================================================================

/// A managed resource with payload `A` and decoded state type `S`.
pub struct Resource<A, S = serde_json::Value> {
    kind: String,
    name: String,
    args: A,
    depends_on: Option<DependsOn>,
    lifecycle: Option<Lifecycle>,
    provider: Option<ProviderRef>,
    state: RwLock<Option<S>>,
}

impl<A, S> Resource<A, S> {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, args: A) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            args,
            depends_on: None,
            lifecycle: None,
            provider: None,
            state: RwLock::new(None),
        }
    }

    pub fn with_depends_on(mut self, depends_on: DependsOn) -> Self {
        self.depends_on = Some(depends_on);
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    /// Use a specific (usually aliased) provider configuration.
    pub fn with_provider<P>(mut self, provider: &Provider<P>) -> Self {
        self.provider = Some(provider.selection());
        self
    }

    pub fn args(&self) -> &A {
        &self.args
    }

    /// Reference to the resource itself, `type.name`.
    pub fn reference(&self) -> Reference {
        Reference::resource(self.kind.as_str(), self.name.as_str())
    }

    /// Reference-bound value for one attribute, `type.name.attr`.
    pub fn attribute<T>(&self, name: &str) -> Value<T> {
        Value::Reference(self.reference().append(name))
    }

    /// Imported state, if the last import matched this resource.
    pub fn state(&self) -> Option<S>
    where
        S: Clone,
    {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<A, S> fmt::Debug for Resource<A, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<A, S> ResourceBlock for Resource<A, S>
where
    A: Describe + Send + Sync,
    S: DeserializeOwned + Send + Sync,
{
    fn kind(&self) -> &str {
        &self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn payload(&self) -> &dyn Describe {
        &self.args
    }

    fn depends_on(&self) -> Option<&DependsOn> {
        self.depends_on.as_ref()
    }

    fn lifecycle(&self) -> Option<&Lifecycle> {
        self.lifecycle.as_ref()
    }

    fn provider(&self) -> Option<&ProviderRef> {
        self.provider.as_ref()
    }

    fn import_state(&self, values: &serde_json::Value) -> Result<()> {
        let decoded = serde_json::from_value::<S>(values.clone()).map_err(|e| Error::StateDecode {
            address: ResourceBlock::address(self),
            message: e.to_string(),
        })?;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(decoded);
        Ok(())
    }

    fn clear_state(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn has_state(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<A, S> Declared for Resource<A, S>
where
    A: Describe + Send + Sync,
    S: DeserializeOwned + Send + Sync,
{
    fn component(&self) -> Component<'_> {
        Component::Resource(self)
    }
}

// ============================================================================
// Data source
// ============================================================================

/// A data source with payload `A`.
pub struct DataSource<A> {
    kind: String,
    name: String,
    args: A,
    provider: Option<ProviderRef>,
}

impl<A> DataSource<A> {
    pub fn new(kind: impl Into<String>, name: impl Into<String>, args: A) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            args,
            provider: None,
        }
    }

    pub fn with_provider<P>(mut self, provider: &Provider<P>) -> Self {
        self.provider = Some(provider.selection());
        self
    }

    pub fn args(&self) -> &A {
        &self.args
    }

    /// `data.type.name`
    pub fn reference(&self) -> Reference {
        Reference::data_source(self.kind.as_str(), self.name.as_str())
    }

    pub fn attribute<T>(&self, name: &str) -> Value<T> {
        Value::Reference(self.reference().append(name))
    }
}

impl<A: Describe + Send + Sync> DataSourceBlock for DataSource<A> {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn payload(&self) -> &dyn Describe {
        &self.args
    }

    fn provider(&self) -> Option<&ProviderRef> {
        self.provider.as_ref()
    }
}

impl<A: Describe + Send + Sync> Declared for DataSource<A> {
    fn component(&self) -> Component<'_> {
        Component::DataSource(self)
    }
}

// ============================================================================
// Provider
// ============================================================================

/// A provider configuration with payload `A`.
pub struct Provider<A = ()> {
    name: String,
    source: String,
    version: String,
    alias: Option<String>,
    args: A,
}

impl<A> Provider<A> {
    /// `name` is the local name (`aws`), `source` the registry address
    /// (`hashicorp/aws`) and `version` a version constraint.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        version: impl Into<String>,
        args: A,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            version: version.into(),
            alias: None,
            args,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn args(&self) -> &A {
        &self.args
    }

    fn selection(&self) -> ProviderRef {
        ProviderRef {
            name: self.name.clone(),
            alias: self.alias.clone(),
        }
    }
}

impl<A: Describe + Send + Sync> ProviderBlock for Provider<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    fn payload(&self) -> &dyn Describe {
        &self.args
    }
}

impl<A: Describe + Send + Sync> Declared for Provider<A> {
    fn component(&self) -> Component<'_> {
        Component::Provider(self)
    }
}

// ============================================================================
// Backend
// ============================================================================

/// The state backend, e.g. `s3` or `local`.
pub struct Backend<A> {
    kind: String,
    args: A,
}

impl<A> Backend<A> {
    pub fn new(kind: impl Into<String>, args: A) -> Self {
        Self {
            kind: kind.into(),
            args,
        }
    }

    pub fn args(&self) -> &A {
        &self.args
    }
}

impl<A: Describe + Send + Sync> BackendBlock for Backend<A> {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn payload(&self) -> &dyn Describe {
        &self.args
    }
}

impl<A: Describe + Send + Sync> Declared for Backend<A> {
    fn component(&self) -> Component<'_> {
        Component::Backend(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hclgen::StringValue;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct VpcState {
        id: String,
    }

    #[test]
    fn test_resource_attribute_reference() {
        let vpc: Resource<()> = Resource::new("aws_vpc", "main", ());
        let id: StringValue = vpc.attribute("id");
        assert_eq!(id.as_reference().unwrap().to_string(), "aws_vpc.main.id");
        assert_eq!(ResourceBlock::address(&vpc), "aws_vpc.main");
    }

    #[test]
    fn test_data_source_attribute_reference() {
        let ami = DataSource::new("aws_ami", "ubuntu", ());
        let id: StringValue = ami.attribute("id");
        assert_eq!(id.as_reference().unwrap().to_string(), "data.aws_ami.ubuntu.id");
        assert_eq!(DataSourceBlock::address(&ami), "data.aws_ami.ubuntu");
    }

    #[test]
    fn test_state_slot_import_and_clear() {
        let vpc: Resource<(), VpcState> = Resource::new("aws_vpc", "main", ());
        assert!(vpc.state().is_none());

        vpc.import_state(&serde_json::json!({"id": "vpc-123", "cidr_block": "10.0.0.0/16"}))
            .unwrap();
        assert_eq!(vpc.state(), Some(VpcState { id: "vpc-123".into() }));
        assert!(vpc.has_state());

        vpc.clear_state();
        assert!(vpc.state().is_none());
    }

    #[test]
    fn test_state_decode_failure_names_resource() {
        let vpc: Resource<(), VpcState> = Resource::new("aws_vpc", "main", ());
        let err = vpc.import_state(&serde_json::json!({"arn": "x"})).unwrap_err();
        assert!(matches!(err, Error::StateDecode { address, .. } if address == "aws_vpc.main"));
        assert!(vpc.state().is_none());
    }

    #[test]
    fn test_provider_selection_rendering() {
        let west = Provider::new("aws", "hashicorp/aws", "~> 5.0", ()).with_alias("west");
        let bucket: Resource<()> = Resource::new("aws_s3_bucket", "logs", ()).with_provider(&west);

        let selected = bucket.provider().unwrap();
        assert_eq!(selected.to_string(), "aws.west");
        let Expression::Traversal(traversal) = selected.to_expression() else {
            panic!("expected a traversal");
        };
        assert_eq!(traversal.expr, Expression::Variable(Variable::unchecked("aws")));

        let plain = ProviderRef {
            name: "aws".into(),
            alias: None,
        };
        assert_eq!(plain.to_expression(), Expression::Variable(Variable::unchecked("aws")));
    }

    #[test]
    fn test_component_classification() {
        let backend = Backend::new("local", ());
        let provider = Provider::new("null", "hashicorp/null", "", ());
        let resource: Resource<()> = Resource::new("null_resource", "a", ());
        let data = DataSource::new("null_data_source", "b", ());

        assert!(matches!(backend.component(), Component::Backend(_)));
        assert!(matches!(provider.component(), Component::Provider(_)));
        assert!(matches!(resource.component(), Component::Resource(_)));
        assert!(matches!(data.component(), Component::DataSource(_)));
    }
}
