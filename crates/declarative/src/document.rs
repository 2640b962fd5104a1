//! Document assembly.
//!
//! Turns an extracted [`Graph`] into HCL blocks in the order the external
//! tool expects to find them: the `terraform` settings block, then
//! providers, data sources and resources. The whole document is built in
//! memory; an error in any payload means no document at all.

use crate::error::{Error, Result};
use crate::graph::{self, Graph};
use crate::role::{BackendBlock, DataSourceBlock, ProviderBlock, ResourceBlock};
use crate::stack::Stack;
use hcl::Identifier;
use hcl::expr::{Expression, ObjectKey};
use hcl::structure::{Block, Body, Structure};
use hclgen::{BodyEncoder, Describe};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// File holding the `terraform` block when split.
pub const TERRAFORM_FILE: &str = "terraform.tf";
/// File holding provider blocks when split.
pub const PROVIDERS_FILE: &str = "providers.tf";
/// File holding data blocks when split.
pub const DATA_FILE: &str = "data.tf";
/// File holding resource blocks when split.
pub const RESOURCES_FILE: &str = "resources.tf";
/// Single-file export name.
pub const MAIN_FILE: &str = "main.tf";

/// An encoded configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub terraform: Option<Block>,
    pub providers: Vec<Block>,
    pub data_sources: Vec<Block>,
    pub resources: Vec<Block>,
}

impl Document {
    /// Extract and encode a stack.
    pub fn from_stack(stack: &dyn Stack) -> Result<Self> {
        let graph = graph::extract(stack)?;
        Self::from_graph(&graph)
    }

    /// Encode an already extracted graph.
    pub fn from_graph(graph: &Graph<'_>) -> Result<Self> {
        let required = required_providers(&graph.providers)?;
        let terraform = if graph.backend.is_some() || !required.is_empty() {
            let settings = TerraformSettings {
                backend: graph.backend,
                required,
            };
            Some(hclgen::encode_block("terraform", &[], &settings)?)
        } else {
            None
        };

        let providers = graph
            .providers
            .iter()
            .map(|p| hclgen::encode_block("provider", &[p.name()], &ProviderBody(*p)))
            .collect::<hclgen::Result<Vec<_>>>()?;
        let data_sources = graph
            .data_sources
            .iter()
            .map(|d| hclgen::encode_block("data", &[d.kind(), d.name()], &DataBody(*d)))
            .collect::<hclgen::Result<Vec<_>>>()?;
        let resources = graph
            .resources
            .iter()
            .map(|r| hclgen::encode_block("resource", &[r.kind(), r.name()], &ResourceBody(*r)))
            .collect::<hclgen::Result<Vec<_>>>()?;

        Ok(Self {
            terraform,
            providers,
            data_sources,
            resources,
        })
    }

    /// Every block, in document order.
    pub fn body(&self) -> Body {
        Body(self.sections().into_iter().flat_map(|(_, blocks)| blocks).collect())
    }

    /// The whole document as one HCL text.
    pub fn to_hcl(&self) -> Result<String> {
        Ok(hclgen::to_hcl_string(&self.body())?)
    }

    /// The document split into per-role files. Empty sections produce no
    /// file.
    pub fn files(&self) -> Result<Vec<(&'static str, String)>> {
        self.sections()
            .into_iter()
            .filter(|(_, blocks)| !blocks.is_empty())
            .map(|(name, blocks)| Ok((name, hclgen::to_hcl_string(&Body(blocks))?)))
            .collect()
    }

    fn sections(&self) -> [(&'static str, Vec<Structure>); 4] {
        let structures = |blocks: &[Block]| -> Vec<Structure> {
            blocks.iter().cloned().map(Structure::Block).collect()
        };
        [
            (TERRAFORM_FILE, structures(self.terraform.as_slice())),
            (PROVIDERS_FILE, structures(&self.providers)),
            (DATA_FILE, structures(&self.data_sources)),
            (RESOURCES_FILE, structures(&self.resources)),
        ]
    }
}

// ============================================================================
// Terraform settings block
// ============================================================================

/// Collapse provider configurations into one `required_providers` entry per
/// local name.
fn required_providers(providers: &[&dyn ProviderBlock]) -> Result<BTreeMap<String, Expression>> {
    let mut seen: BTreeMap<String, (&str, &str)> = BTreeMap::new();
    for provider in providers {
        let requirement = (provider.source(), provider.version());
        match seen.entry(provider.name().to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(requirement);
            }
            Entry::Occupied(entry) if *entry.get() != requirement => {
                return Err(Error::ConflictingProvider {
                    name: entry.key().clone(),
                    existing: describe_requirement(*entry.get()),
                    conflicting: describe_requirement(requirement),
                });
            }
            Entry::Occupied(_) => {}
        }
    }

    Ok(seen
        .into_iter()
        .map(|(name, (source, version))| {
            let entry = [("source", source), ("version", version)]
                .into_iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(key, value)| {
                    (
                        ObjectKey::Identifier(Identifier::unchecked(key)),
                        Expression::String(value.to_string()),
                    )
                })
                .collect();
            (name, Expression::Object(entry))
        })
        .collect())
}

fn describe_requirement((source, version): (&str, &str)) -> String {
    if version.is_empty() {
        format!("{source:?}")
    } else {
        format!("{source:?} {version:?}")
    }
}

struct TerraformSettings<'a> {
    backend: Option<&'a dyn BackendBlock>,
    required: BTreeMap<String, Expression>,
}

impl Describe for TerraformSettings<'_> {
    fn describe(&self, body: &mut BodyEncoder) -> hclgen::Result<()> {
        if let Some(backend) = self.backend {
            body.block("backend", &BackendBody(backend))?;
        }
        if !self.required.is_empty() {
            body.block("required_providers", &RequiredProviders(&self.required))?;
        }
        Ok(())
    }
}

struct BackendBody<'a>(&'a dyn BackendBlock);

impl Describe for BackendBody<'_> {
    fn describe(&self, body: &mut BodyEncoder) -> hclgen::Result<()> {
        body.label(self.0.kind())?;
        body.embed(self.0.payload())
    }
}

struct RequiredProviders<'a>(&'a BTreeMap<String, Expression>);

impl Describe for RequiredProviders<'_> {
    fn describe(&self, body: &mut BodyEncoder) -> hclgen::Result<()> {
        body.remain(self.0)
    }
}

// ============================================================================
// Component blocks
// ============================================================================

struct ProviderBody<'a>(&'a dyn ProviderBlock);

impl Describe for ProviderBody<'_> {
    fn describe(&self, body: &mut BodyEncoder) -> hclgen::Result<()> {
        if let Some(alias) = self.0.alias() {
            body.raw_attribute("alias", Expression::String(alias.to_string()))?;
        }
        body.embed(self.0.payload())
    }
}

struct DataBody<'a>(&'a dyn DataSourceBlock);

impl Describe for DataBody<'_> {
    fn describe(&self, body: &mut BodyEncoder) -> hclgen::Result<()> {
        body.embed(self.0.payload())?;
        if let Some(provider) = self.0.provider() {
            body.raw_attribute("provider", provider.to_expression())?;
        }
        Ok(())
    }
}

struct ResourceBody<'a>(&'a dyn ResourceBlock);

impl Describe for ResourceBody<'_> {
    fn describe(&self, body: &mut BodyEncoder) -> hclgen::Result<()> {
        let resource = self.0;
        body.embed(resource.payload())?;
        if let Some(provider) = resource.provider() {
            body.raw_attribute("provider", provider.to_expression())?;
        }
        body.attribute("depends_on", &resource.depends_on().cloned())?;
        if let Some(lifecycle) = resource.lifecycle().filter(|l| !l.is_empty()) {
            body.block("lifecycle", lifecycle)?;
        }
        Ok(())
    }
}
