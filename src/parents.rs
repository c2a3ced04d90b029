//! Parent Index
//!
//! The flattened, read-only view of a resource graph handed to code
//! generators: one descriptor per resource id with its ancestor chain, its
//! children and its links.
//!
//! ```json
//! {
//!   "configs.config.tsm.example.com": {
//!     "name": "Config",
//!     "restName": "config.Config",
//!     "isSingleton": false,
//!     "parents": ["roots.root.tsm.example.com"],
//!     "children": {
//!       "gnses.gns.tsm.example.com": {
//!         "fieldName": "GNS",
//!         "fieldNameGvk": "gNSGvk",
//!         "goFieldNameGvk": "GNSGvk",
//!         "isNamed": false
//!       }
//!     },
//!     "links": {
//!       "DNS": {
//!         "resourceId": "dnses.gns.tsm.example.com",
//!         "fieldName": "DNS",
//!         "fieldNameGvk": "dNSGvk",
//!         "goFieldNameGvk": "DNSGvk",
//!         "isNamed": false
//!       }
//!     }
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::checksum::Fingerprint;
use crate::config::OutputFormat;
use crate::error::{CompilerError, Result};
use crate::graph::{ResourceGraph, ResourceNode};
use crate::names;
use crate::query::QuerySpec;

/// How a node refers to one child or link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDescriptor {
    pub field_name: String,
    /// Tag-safe reference field name, `lowerFirst(field) + "Gvk"`
    pub field_name_gvk: String,
    /// Identifier reference field name, `field + "Gvk"`
    pub go_field_name_gvk: String,
    pub is_named: bool,
}

impl EdgeDescriptor {
    pub fn new(field_name: &str, is_named: bool) -> Self {
        Self {
            field_name: field_name.to_string(),
            field_name_gvk: names::gvk_field_tag(field_name),
            go_field_name_gvk: names::gvk_field_name(field_name),
            is_named,
        }
    }
}

/// A link field and the resource it points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDescriptor {
    pub resource_id: String,
    #[serde(flatten)]
    pub edge: EdgeDescriptor,
}

/// Everything generators need to know about one resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDescriptor {
    /// Display type name
    pub name: String,
    /// `<pkg>.<Type>`
    pub rest_name: String,
    pub is_singleton: bool,
    /// Ancestor resource ids, root first
    pub parents: Vec<String>,
    /// child resource id -> descriptor
    pub children: BTreeMap<String, EdgeDescriptor>,
    /// link field name -> descriptor; several fields may link the same type
    pub links: BTreeMap<String, LinkDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_spec: Option<QuerySpec>,
}

/// `resourceId -> NodeDescriptor` for every resource in the hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParentIndex {
    nodes: BTreeMap<String, NodeDescriptor>,
}

impl ParentIndex {
    pub fn get(&self, resource_id: &str) -> Option<&NodeDescriptor> {
        self.nodes.get(resource_id)
    }

    /// Ancestor chain of a resource, root first
    pub fn parents(&self, resource_id: &str) -> Option<&[String]> {
        self.nodes.get(resource_id).map(|n| n.parents.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &NodeDescriptor)> + '_ {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// SHA256 of the compact JSON encoding
    pub fn fingerprint(&self) -> Result<Fingerprint> {
        Ok(Fingerprint::of_json(self)?)
    }

    pub fn to_json(&self, format: OutputFormat) -> Result<String> {
        format.to_json(self)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read an index previously written with [`ParentIndex::to_json`]
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Flattens a resource graph into a [`ParentIndex`]
#[derive(Debug, Default)]
pub struct ParentResolver;

impl ParentResolver {
    pub fn new() -> Self {
        Self
    }

    /// Walk the graph from its roots and describe every node reached
    pub fn resolve(&self, graph: &ResourceGraph) -> Result<ParentIndex> {
        let mut nodes = BTreeMap::new();
        let mut failure = None;

        graph.walk(|node| {
            if failure.is_some() {
                return;
            }
            match Self::describe(graph, node) {
                Ok(descriptor) => {
                    nodes.insert(node.resource_id.clone(), descriptor);
                }
                Err(e) => failure = Some(e),
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }
        debug!(entries = nodes.len(), "resolved parent index");
        Ok(ParentIndex { nodes })
    }

    fn describe(graph: &ResourceGraph, node: &ResourceNode) -> Result<NodeDescriptor> {
        if node.resource_id.is_empty() {
            return Err(CompilerError::UnresolvedCrdName(names::rest_name(&node.package, &node.name)));
        }

        // several fields may own the same type; the first in field order wins
        let mut children = BTreeMap::new();
        for (field, target, named) in node.all_children() {
            if target.is_empty() || graph.get(target).is_none() {
                return Err(CompilerError::UnresolvedCrdName(format!("{}.{}", node.name, field)));
            }
            children
                .entry(target.clone())
                .or_insert_with(|| EdgeDescriptor::new(field, named));
        }

        let mut links = BTreeMap::new();
        for (field, target, named) in node.all_links() {
            if target.is_empty() {
                return Err(CompilerError::UnresolvedCrdName(format!("{}.{}", node.name, field)));
            }
            links.insert(
                field.clone(),
                LinkDescriptor {
                    resource_id: target.clone(),
                    edge: EdgeDescriptor::new(field, named),
                },
            );
        }

        Ok(NodeDescriptor {
            name: node.name.clone(),
            rest_name: names::rest_name(&node.package, &node.name),
            is_singleton: node.is_singleton,
            parents: node.parents.clone(),
            children,
            links,
            query_spec: node.query_spec.clone(),
        })
    }
}
