//! Resource Graph
//!
//! The rooted hierarchy of resource types produced by the graph builder.
//! Every resource type occupies exactly one position: its `parents` chain is
//! assigned once, from the single traversal that reaches it, and never
//! changes afterwards.
//!
//! Consumers normally go through [`crate::parents::ParentIndex`]; the graph is
//! exposed for diagnostics and DOT export.

pub mod builder;
pub mod classify;
pub mod validate;

pub use builder::GraphBuilder;
pub use classify::{classify, Classification, FieldRole, Relation, RelationKind};

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::query::QuerySpec;

/// Canonical resource identifier: `<plural>.<pkg>.<domain>`
pub type ResourceId = String;

/// A classified, non-graph field of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecField {
    pub name: String,
    /// Type as written in the datamodel, e.g. `map[string]gns.Host`
    pub ty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_name: Option<String>,
}

/// One resource type with its resolved position and edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    pub resource_id: ResourceId,
    /// Type name as declared
    pub name: String,
    /// Declaring package name
    pub package: String,
    /// Declaring package import path
    pub import_path: String,
    pub is_singleton: bool,
    /// Ancestor chain, root first
    pub parents: Vec<ResourceId>,
    /// field name -> child resource id
    pub children: BTreeMap<String, ResourceId>,
    pub named_children: BTreeMap<String, ResourceId>,
    pub links: BTreeMap<String, ResourceId>,
    pub named_links: BTreeMap<String, ResourceId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spec_fields: Vec<SpecField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_field: Option<SpecField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_spec: Option<QuerySpec>,
}

impl ResourceNode {
    /// Empty node for a declared type; edges and parents are filled in later
    pub fn new(
        resource_id: impl Into<ResourceId>,
        name: impl Into<String>,
        package: impl Into<String>,
        import_path: impl Into<String>,
        is_singleton: bool,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            name: name.into(),
            package: package.into(),
            import_path: import_path.into(),
            is_singleton,
            parents: Vec::new(),
            children: BTreeMap::new(),
            named_children: BTreeMap::new(),
            links: BTreeMap::new(),
            named_links: BTreeMap::new(),
            spec_fields: Vec::new(),
            status_field: None,
            query_spec: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Owned children, single then named, each in field-name order
    pub fn all_children(&self) -> impl Iterator<Item = (&String, &ResourceId, bool)> + '_ {
        self.children
            .iter()
            .map(|(f, id)| (f, id, false))
            .chain(self.named_children.iter().map(|(f, id)| (f, id, true)))
    }

    /// Links, single then named, each in field-name order
    pub fn all_links(&self) -> impl Iterator<Item = (&String, &ResourceId, bool)> + '_ {
        self.links
            .iter()
            .map(|(f, id)| (f, id, false))
            .chain(self.named_links.iter().map(|(f, id)| (f, id, true)))
    }
}

/// The resolved hierarchy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceGraph {
    pub(crate) nodes: BTreeMap<ResourceId, ResourceNode>,
    pub(crate) roots: Vec<ResourceId>,
}

impl ResourceGraph {
    /// Root resource ids after root repair; normally exactly one
    pub fn roots(&self) -> &[ResourceId] {
        &self.roots
    }

    pub fn get(&self, id: &str) -> Option<&ResourceNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ResourceNode> + '_ {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first, pre-order visit of every node reachable from the roots
    pub fn walk<F>(&self, mut visit: F)
    where
        F: FnMut(&ResourceNode),
    {
        for root in &self.roots {
            let mut stack = vec![root.as_str()];
            while let Some(id) = stack.pop() {
                let Some(node) = self.nodes.get(id) else {
                    continue;
                };
                visit(node);
                let children: Vec<&str> = node.all_children().map(|(_, c, _)| c.as_str()).collect();
                // reversed so the first child is visited first
                stack.extend(children.into_iter().rev());
            }
        }
    }

    /// Render the hierarchy in Graphviz DOT format
    ///
    /// Solid edges are ownership, labelled with the field name; links are
    /// included with a `link:` prefix.
    pub fn to_dot(&self) -> String {
        let mut graph: DiGraph<String, String> = DiGraph::with_capacity(self.nodes.len(), self.nodes.len() * 2);
        let mut indices: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.nodes.len());

        for (id, node) in &self.nodes {
            let idx = graph.add_node(format!("{}.{}", node.package, node.name));
            indices.insert(id.as_str(), idx);
        }

        for (id, node) in &self.nodes {
            let from = indices[id.as_str()];
            for (field, target, named) in node.all_children() {
                if let Some(&to) = indices.get(target.as_str()) {
                    let label = if named { format!("{}[]", field) } else { field.clone() };
                    graph.add_edge(from, to, label);
                }
            }
            for (field, target, named) in node.all_links() {
                if let Some(&to) = indices.get(target.as_str()) {
                    let label = if named { format!("link:{}[]", field) } else { format!("link:{}", field) };
                    graph.add_edge(from, to, label);
                }
            }
        }

        format!("{}", Dot::with_config(&graph, &[Config::GraphContentOnly]))
            .lines()
            .fold(String::from("digraph resources {\n"), |mut out, line| {
                out.push_str(line);
                out.push('\n');
                out
            })
            + "}\n"
    }
}
