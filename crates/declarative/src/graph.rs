//! Stack graph extraction.
//!
//! Walks a [`Stack`] depth first, in field declaration order, and sorts
//! every reachable component into the four roles. Embedded stacks are
//! flattened; nested stacks and lists are recursed into. Identity
//! invariants are checked once the walk is complete.

use crate::error::{Error, Result};
use crate::role::{BackendBlock, Component, DataSourceBlock, ProviderBlock, ResourceBlock};
use crate::stack::{FieldKind, Fields, Stack, field_path};
use crate::validate;
use log::debug;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Valid type, name and alias identifiers.
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").unwrap());

/// Components of a stack, grouped by role in discovery order.
#[derive(Default)]
pub struct Graph<'a> {
    pub backend: Option<&'a dyn BackendBlock>,
    pub providers: Vec<&'a dyn ProviderBlock>,
    pub resources: Vec<&'a dyn ResourceBlock>,
    pub data_sources: Vec<&'a dyn DataSourceBlock>,
}

impl Graph<'_> {
    pub fn is_empty(&self) -> bool {
        self.backend.is_none()
            && self.providers.is_empty()
            && self.resources.is_empty()
            && self.data_sources.is_empty()
    }
}

/// Validate required fields, then walk the stack and check identities.
pub fn extract(stack: &dyn Stack) -> Result<Graph<'_>> {
    validate::required_fields(stack)?;

    let mut graph = Graph::default();
    walk(stack, "", &mut graph)?;
    check_identities(&graph)?;

    debug!(
        "Extracted stack: backend={}, {} providers, {} resources, {} data sources",
        graph.backend.map_or("none", |b| b.kind()),
        graph.providers.len(),
        graph.resources.len(),
        graph.data_sources.len()
    );
    Ok(graph)
}

fn walk<'a>(stack: &'a dyn Stack, prefix: &str, graph: &mut Graph<'a>) -> Result<()> {
    for field in Fields::of(stack) {
        let path = field_path(prefix, field.name);
        match field.kind {
            FieldKind::Component(Some(component)) => classify(component.component(), &path, graph)?,
            FieldKind::Components(items) => {
                for (i, component) in items.into_iter().enumerate() {
                    classify(component.component(), &format!("{path}[{i}]"), graph)?;
                }
            }
            FieldKind::Nested(Some(nested)) => walk(nested, &path, graph)?,
            FieldKind::NestedList(stacks) => {
                for (i, nested) in stacks.into_iter().enumerate() {
                    walk(nested, &format!("{path}[{i}]"), graph)?;
                }
            }
            FieldKind::Embedded(embedded) => walk(embedded, prefix, graph)?,
            FieldKind::Private => return Err(Error::NonExportedField { path }),
            FieldKind::Opaque { empty: false } => return Err(Error::UnknownField { path }),
            FieldKind::Component(None)
            | FieldKind::Nested(None)
            | FieldKind::Opaque { empty: true }
            | FieldKind::Ignored => {}
        }
    }
    Ok(())
}

fn classify<'a>(component: Component<'a>, path: &str, graph: &mut Graph<'a>) -> Result<()> {
    match component {
        Component::Backend(backend) => {
            if graph.backend.is_some() {
                return Err(Error::MultipleBackends {
                    path: path.to_string(),
                });
            }
            graph.backend = Some(backend);
        }
        Component::Provider(provider) => graph.providers.push(provider),
        Component::Resource(resource) => graph.resources.push(resource),
        Component::DataSource(data) => graph.data_sources.push(data),
    }
    Ok(())
}

fn check_name(what: &'static str, name: &str) -> Result<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidName {
            what,
            name: name.to_string(),
        })
    }
}

fn check_identities(graph: &Graph<'_>) -> Result<()> {
    if let Some(backend) = graph.backend {
        check_name("backend type", backend.kind())?;
    }

    let mut providers = HashSet::new();
    for provider in &graph.providers {
        check_name("provider", provider.name())?;
        if let Some(alias) = provider.alias() {
            check_name("provider alias", alias)?;
        }
        let selection = provider.reference();
        if !providers.insert(selection.clone()) {
            return Err(Error::DuplicateProvider {
                key: selection.to_string(),
            });
        }
    }

    let mut resources = HashSet::new();
    for resource in &graph.resources {
        check_name("resource type", resource.kind())?;
        check_name("resource", resource.name())?;
        if !resources.insert((resource.kind(), resource.name())) {
            return Err(Error::DuplicateResource {
                address: resource.address(),
            });
        }
    }

    let mut data_sources = HashSet::new();
    for data in &graph.data_sources {
        check_name("data source type", data.kind())?;
        check_name("data source", data.name())?;
        if !data_sources.insert((data.kind(), data.name())) {
            return Err(Error::DuplicateDataSource {
                address: format!("{}.{}", data.kind(), data.name()),
            });
        }
    }

    if graph.providers.is_empty() {
        let first = graph
            .resources
            .first()
            .map(|r| r.address())
            .or_else(|| graph.data_sources.first().map(|d| d.address()));
        if let Some(address) = first {
            return Err(Error::MissingProvider { address });
        }
    }

    let selections = graph
        .resources
        .iter()
        .map(|r| (r.address(), r.provider()))
        .chain(graph.data_sources.iter().map(|d| (d.address(), d.provider())));
    for (address, selection) in selections {
        if let Some(selection) = selection
            && !providers.contains(selection)
        {
            return Err(Error::UndeclaredProvider {
                address,
                provider: selection.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::{Backend, DataSource, Provider, Resource};

    struct Network {
        vpc: Resource<()>,
        subnets: Vec<Resource<()>>,
    }

    impl Stack for Network {
        fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
            fields
                .component("vpc", &self.vpc)
                .components("subnets", &self.subnets);
        }
    }

    struct Base {
        backend: Backend<()>,
        provider: Provider,
    }

    impl Stack for Base {
        fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
            fields
                .component("backend", &self.backend)
                .component("provider", &self.provider);
        }
    }

    struct Platform {
        base: Base,
        ami: DataSource<()>,
        networks: Vec<Network>,
        extra: Option<Backend<()>>,
        notes: &'static str,
    }

    impl Stack for Platform {
        fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
            fields
                .embed("base", &self.base)
                .component("ami", &self.ami)
                .nested_list("networks", &self.networks)
                .optional("extra", &self.extra)
                .opaque("notes", self.notes.is_empty())
                .ignore("secret");
        }
    }

    fn network(suffix: &str) -> Network {
        Network {
            vpc: Resource::new("aws_vpc", format!("vpc_{suffix}"), ()),
            subnets: vec![
                Resource::new("aws_subnet", format!("{suffix}_a"), ()),
                Resource::new("aws_subnet", format!("{suffix}_b"), ()),
            ],
        }
    }

    fn platform() -> Platform {
        Platform {
            base: Base {
                backend: Backend::new("s3", ()),
                provider: Provider::new("aws", "hashicorp/aws", "~> 5.0", ()),
            },
            ami: DataSource::new("aws_ami", "ubuntu", ()),
            networks: vec![network("east"), network("west")],
            extra: None,
            notes: "",
        }
    }

    #[test]
    fn test_walk_order_and_classification() {
        let platform = platform();
        let graph = extract(&platform).unwrap();

        assert_eq!(graph.backend.unwrap().kind(), "s3");
        assert_eq!(graph.providers.len(), 1);
        assert_eq!(graph.data_sources[0].address(), "data.aws_ami.ubuntu");
        let addresses: Vec<_> = graph.resources.iter().map(|r| r.address()).collect();
        assert_eq!(
            addresses,
            vec![
                "aws_vpc.vpc_east",
                "aws_subnet.east_a",
                "aws_subnet.east_b",
                "aws_vpc.vpc_west",
                "aws_subnet.west_a",
                "aws_subnet.west_b",
            ]
        );
    }

    #[test]
    fn test_multiple_backends() {
        let mut platform = platform();
        platform.extra = Some(Backend::new("local", ()));
        assert!(matches!(
            extract(&platform),
            Err(Error::MultipleBackends { path }) if path == "extra"
        ));
    }

    #[test]
    fn test_non_empty_opaque_field() {
        let mut platform = platform();
        platform.notes = "hello";
        assert!(matches!(
            extract(&platform),
            Err(Error::UnknownField { path }) if path == "notes"
        ));
    }

    struct WithPrivate {
        provider: Provider,
    }

    impl Stack for WithPrivate {
        fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
            fields.component("provider", &self.provider).private("inner");
        }
    }

    #[test]
    fn test_private_field() {
        let stack = WithPrivate {
            provider: Provider::new("aws", "hashicorp/aws", "", ()),
        };
        assert!(matches!(
            extract(&stack),
            Err(Error::NonExportedField { path }) if path == "inner"
        ));
    }

    #[test]
    fn test_duplicate_resource() {
        let mut platform = platform();
        platform.networks.push(network("east"));
        assert!(matches!(
            extract(&platform),
            Err(Error::DuplicateResource { address }) if address == "aws_vpc.vpc_east"
        ));
    }

    struct Loose {
        providers: Vec<Provider>,
        resources: Vec<Resource<()>>,
        data: Vec<DataSource<()>>,
    }

    impl Stack for Loose {
        fn describe<'a>(&'a self, fields: &mut Fields<'a>) {
            fields
                .components("providers", &self.providers)
                .components("resources", &self.resources)
                .components("data", &self.data);
        }
    }

    fn aws() -> Provider {
        Provider::new("aws", "hashicorp/aws", "", ())
    }

    #[test]
    fn test_duplicate_data_source() {
        let stack = Loose {
            providers: vec![aws()],
            resources: vec![],
            data: vec![
                DataSource::new("aws_ami", "x", ()),
                DataSource::new("aws_ami", "x", ()),
            ],
        };
        assert!(matches!(extract(&stack), Err(Error::DuplicateDataSource { .. })));
    }

    #[test]
    fn test_duplicate_provider_and_aliases() {
        let aliased = Loose {
            providers: vec![aws(), aws().with_alias("west")],
            resources: vec![],
            data: vec![],
        };
        assert!(extract(&aliased).is_ok());

        let duplicated = Loose {
            providers: vec![aws().with_alias("west"), aws().with_alias("west")],
            resources: vec![],
            data: vec![],
        };
        assert!(matches!(
            extract(&duplicated),
            Err(Error::DuplicateProvider { key }) if key == "aws.west"
        ));
    }

    #[test]
    fn test_missing_provider() {
        let stack = Loose {
            providers: vec![],
            resources: vec![Resource::new("aws_vpc", "main", ())],
            data: vec![],
        };
        assert!(matches!(
            extract(&stack),
            Err(Error::MissingProvider { address }) if address == "aws_vpc.main"
        ));
    }

    #[test]
    fn test_undeclared_provider_selection() {
        let west = aws().with_alias("west");
        let stack = Loose {
            providers: vec![aws()],
            resources: vec![Resource::new("aws_vpc", "main", ()).with_provider(&west)],
            data: vec![],
        };
        assert!(matches!(
            extract(&stack),
            Err(Error::UndeclaredProvider { provider, .. }) if provider == "aws.west"
        ));
    }

    #[test]
    fn test_invalid_names() {
        let stack = Loose {
            providers: vec![aws()],
            resources: vec![Resource::new("aws_vpc", "1main", ())],
            data: vec![],
        };
        assert!(matches!(
            extract(&stack),
            Err(Error::InvalidName { what: "resource", name }) if name == "1main"
        ));

        let stack = Loose {
            providers: vec![Provider::new("my provider", "x/y", "", ())],
            resources: vec![],
            data: vec![],
        };
        assert!(matches!(extract(&stack), Err(Error::InvalidName { .. })));
    }

    #[test]
    fn test_empty_stack() {
        let stack = Loose {
            providers: vec![],
            resources: vec![],
            data: vec![],
        };
        assert!(extract(&stack).unwrap().is_empty());
    }
}
