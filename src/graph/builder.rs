//! Graph Builder
//!
//! Turns a loaded datamodel into a [`ResourceGraph`] in three passes:
//!
//! 1. **Discovery**: depth-first from every candidate root (node types
//!    declared in the datamodel root directory), classifying fields and
//!    resolving child and link targets into a `petgraph` arena. A node met
//!    again while still on the discovery stack is a cycle.
//! 2. **Root repair**: a candidate root that is owned by any discovered node
//!    is not a root.
//! 3. **Placement**: each node reachable from the repaired roots gets its
//!    ancestor chain exactly once. Reaching it again along a different chain
//!    is an error.

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

use super::classify::{classify, Relation, RelationKind};
use super::validate;
use super::{ResourceGraph, ResourceId, ResourceNode, SpecField};
use crate::config::CompilerConfig;
use crate::dsl::{Field, Import, Record, RecordKind, TypeExpr};
use crate::error::{CompilerError, Result};
use crate::loader::{Datamodel, Package};
use crate::names;
use crate::query::QuerySpecs;

/// Annotation carrying the serialized field name of a spec field
const JSON_KEY: &str = "json";

/// Arena slot for one declared node type
struct Slot<'m> {
    resource_id: ResourceId,
    package: &'m Package,
    record: &'m Record,
    imports: &'m [Import],
}

impl Slot<'_> {
    fn is_singleton(&self) -> bool {
        self.record.kind == RecordKind::SingletonNode
    }
}

/// Resolved field edge
#[derive(Debug, Clone)]
struct Edge {
    field: String,
    relation: Relation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    OnStack,
    Done,
}

/// Every node type of a datamodel with its resolved edges
struct Arena<'m> {
    graph: DiGraph<Slot<'m>, Edge>,
    /// (import path, type name) -> slot
    by_type: HashMap<(String, String), NodeIndex>,
    by_id: HashMap<ResourceId, NodeIndex>,
}

impl<'m> Arena<'m> {
    fn id(&self, idx: NodeIndex) -> &ResourceId {
        &self.graph[idx].resource_id
    }

    /// Child edges of a node in declaration order
    fn child_edges(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges(idx)
            .filter(|e| e.weight().relation.kind == RelationKind::Child)
            .map(|e| (e.id(), e.target()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);
        edges.into_iter().map(|(_, target)| target).collect()
    }
}

/// Builds the resource graph of a datamodel
pub struct GraphBuilder<'a> {
    config: &'a CompilerConfig,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(config: &'a CompilerConfig) -> Self {
        Self { config }
    }

    /// Build the graph of everything reachable from the datamodel's root
    pub fn build(&self, model: &Datamodel) -> Result<ResourceGraph> {
        let mut arena = self.register(model)?;
        let candidates: Vec<NodeIndex> = arena
            .graph
            .node_indices()
            .filter(|&idx| arena.graph[idx].package.is_root())
            .collect();

        if candidates.is_empty() {
            warn!("datamodel root declares no nodes, graph is empty");
            return Ok(ResourceGraph::default());
        }

        // Pass 1: discovery
        let mut state = vec![Visit::Unvisited; arena.graph.node_count()];
        let mut stack = Vec::new();
        for &root in &candidates {
            self.discover(model, &mut arena, root, &mut state, &mut stack)?;
        }

        // Pass 2: root repair
        let owned: HashSet<NodeIndex> = arena
            .graph
            .node_indices()
            .filter(|idx| state[idx.index()] == Visit::Done)
            .flat_map(|idx| arena.child_edges(idx))
            .collect();
        let roots: Vec<NodeIndex> = candidates
            .iter()
            .copied()
            .filter(|idx| !owned.contains(idx))
            .collect();
        for idx in candidates.iter().filter(|idx| owned.contains(*idx)) {
            debug!(resource = %arena.id(*idx), "candidate root is owned by another node");
        }
        if roots.len() > 1 {
            let ids: Vec<&str> = roots.iter().map(|r| arena.id(*r).as_str()).collect();
            warn!(roots = ?ids, "datamodel has more than one root");
        }

        // Pass 3: placement
        let mut chains: Vec<Option<Vec<ResourceId>>> = vec![None; arena.graph.node_count()];
        for &root in &roots {
            Self::place(&arena, root, &[], &mut chains)?;
        }

        self.finish(model, &arena, &roots, chains)
    }

    /// Give every node type an arena slot
    fn register<'m>(&self, model: &'m Datamodel) -> Result<Arena<'m>> {
        let mut arena = Arena {
            graph: DiGraph::with_capacity(model.node_count(), model.node_count() * 2),
            by_type: HashMap::new(),
            by_id: HashMap::new(),
        };
        let base_domain = &self.config.datamodel.base_domain;

        for package in &model.packages {
            for (record, imports) in package.records() {
                if !record.kind.is_node() {
                    continue;
                }
                let resource_id = names::resource_id(&record.name, &package.name, base_domain);
                if let Some(&existing) = arena.by_id.get(&resource_id) {
                    let other = &arena.graph[existing];
                    return Err(CompilerError::DuplicateResourceId {
                        resource_id,
                        first: names::rest_name(&other.package.name, &other.record.name),
                        second: names::rest_name(&package.name, &record.name),
                    });
                }

                let idx = arena.graph.add_node(Slot {
                    resource_id: resource_id.clone(),
                    package,
                    record,
                    imports,
                });
                arena
                    .by_type
                    .insert((package.import_path.clone(), record.name.clone()), idx);
                arena.by_id.insert(resource_id, idx);
            }
        }

        info!(nodes = arena.graph.node_count(), "registered node types");
        Ok(arena)
    }

    /// Resolve the edges of `idx` and everything it owns
    fn discover<'m>(
        &self,
        model: &'m Datamodel,
        arena: &mut Arena<'m>,
        idx: NodeIndex,
        state: &mut [Visit],
        stack: &mut Vec<NodeIndex>,
    ) -> Result<()> {
        if state[idx.index()] != Visit::Unvisited {
            return Ok(());
        }
        state[idx.index()] = Visit::OnStack;
        stack.push(idx);

        let (record, package, imports) = {
            let slot = &arena.graph[idx];
            (slot.record, slot.package, slot.imports)
        };

        for field in &record.fields {
            validate::check_field_name(&record.name, field)?;
        }

        let classification = classify(record)?;
        let mut edges = Vec::with_capacity(classification.relations.len());
        for &(field, relation) in &classification.relations {
            validate::check_relation_shape(&record.name, field)?;
            let target = resolve_target(model, arena, package, imports, record, field)?;
            validate::check_named_target(&record.name, field, relation.named, arena.graph[target].is_singleton())?;
            debug!(
                node = %record.name,
                field = %field.name,
                target = %arena.id(target),
                ?relation,
                "resolved edge"
            );
            edges.push((
                target,
                Edge {
                    field: field.name.clone(),
                    relation,
                },
            ));
        }

        for (target, edge) in &edges {
            arena.graph.add_edge(idx, *target, edge.clone());
        }

        for (target, edge) in edges {
            if edge.relation.kind != RelationKind::Child {
                continue;
            }
            match state[target.index()] {
                Visit::OnStack => {
                    let start = stack.iter().position(|&n| n == target).unwrap_or(0);
                    let mut cycle: Vec<String> = stack[start..].iter().map(|&n| arena.id(n).clone()).collect();
                    cycle.push(arena.id(target).clone());
                    return Err(CompilerError::CyclicGraph { cycle });
                }
                Visit::Unvisited => self.discover(model, arena, target, state, stack)?,
                Visit::Done => {}
            }
        }

        stack.pop();
        state[idx.index()] = Visit::Done;
        Ok(())
    }

    /// Assign `chain` to `idx`, then place its children under it
    fn place(
        arena: &Arena<'_>,
        idx: NodeIndex,
        chain: &[ResourceId],
        chains: &mut Vec<Option<Vec<ResourceId>>>,
    ) -> Result<()> {
        if let Some(existing) = &chains[idx.index()] {
            if existing.as_slice() == chain {
                return Ok(());
            }
            return Err(CompilerError::MultiplePositionsForNode {
                node: arena.id(idx).clone(),
                first: existing.clone(),
                second: chain.to_vec(),
            });
        }
        chains[idx.index()] = Some(chain.to_vec());

        let mut below = chain.to_vec();
        below.push(arena.id(idx).clone());
        for child in arena.child_edges(idx) {
            Self::place(arena, child, &below, chains)?;
        }
        Ok(())
    }

    /// Materialize placed nodes into the output graph
    fn finish(
        &self,
        model: &Datamodel,
        arena: &Arena<'_>,
        roots: &[NodeIndex],
        chains: Vec<Option<Vec<ResourceId>>>,
    ) -> Result<ResourceGraph> {
        let query_specs = QuerySpecs::collect(model);
        let mut nodes = BTreeMap::new();

        for (i, chain) in chains.into_iter().enumerate() {
            let idx = NodeIndex::new(i);
            let slot = &arena.graph[idx];
            let Some(parents) = chain else {
                debug!(resource = %slot.resource_id, "node is not reachable from a root");
                continue;
            };

            let mut node = ResourceNode::new(
                slot.resource_id.clone(),
                slot.record.name.clone(),
                slot.package.name.clone(),
                slot.package.import_path.clone(),
                slot.is_singleton(),
            );
            node.parents = parents;

            for edge in arena.graph.edges(idx) {
                let target = arena.id(edge.target()).clone();
                let Edge { field, relation } = edge.weight();
                let map = match (relation.kind, relation.named) {
                    (RelationKind::Child, false) => &mut node.children,
                    (RelationKind::Child, true) => &mut node.named_children,
                    (RelationKind::Link, false) => &mut node.links,
                    (RelationKind::Link, true) => &mut node.named_links,
                };
                map.insert(field.clone(), target);
            }

            let classification = classify(slot.record)?;
            node.spec_fields = classification.spec.iter().map(|f| spec_field(f)).collect();
            node.status_field = classification.status.map(spec_field);
            node.query_spec = query_specs.attached_to(&slot.package.name, slot.record)?;

            nodes.insert(node.resource_id.clone(), node);
        }

        let roots: Vec<ResourceId> = roots.iter().map(|r| arena.id(*r).clone()).collect();
        info!(nodes = nodes.len(), roots = roots.len(), "built resource graph");
        Ok(ResourceGraph { nodes, roots })
    }
}

fn spec_field(field: &Field) -> SpecField {
    SpecField {
        name: field.name.clone(),
        ty: field.ty.to_string(),
        json_name: field.annotation_value(JSON_KEY).map(String::from),
    }
}

/// Find the node type a child or link field refers to
fn resolve_target(
    model: &Datamodel,
    arena: &Arena<'_>,
    package: &Package,
    imports: &[Import],
    record: &Record,
    field: &Field,
) -> Result<NodeIndex> {
    let unresolved = || CompilerError::UnresolvedFieldType {
        node: record.name.clone(),
        field: field.name.clone(),
        ty: field.ty.to_string(),
        suggestion: suggest(arena, &field.ty),
    };

    let TypeExpr::Named { qualifier, name } = &field.ty else {
        return Err(unresolved());
    };
    let import_path = match qualifier {
        None => Some(package.import_path.as_str()),
        Some(q) => import_for(model, imports, q),
    };
    import_path
        .and_then(|path| arena.by_type.get(&(path.to_string(), name.clone())))
        .copied()
        .ok_or_else(unresolved)
}

/// Import path a qualifier refers to
///
/// An alias wins; otherwise an unaliased import matches by the package name
/// declared at its path, then by its last path segment.
fn import_for<'i>(model: &Datamodel, imports: &'i [Import], qualifier: &str) -> Option<&'i str> {
    if let Some(import) = imports.iter().find(|i| i.alias.as_deref() == Some(qualifier)) {
        return Some(import.path.as_str());
    }
    let unaliased = || imports.iter().filter(|i| i.alias.is_none());
    unaliased()
        .find(|i| {
            model
                .package_by_import_path(&i.path)
                .map(|p| p.name == qualifier)
                .unwrap_or(false)
        })
        .or_else(|| unaliased().find(|i| i.last_segment() == qualifier))
        .map(|i| i.path.as_str())
}

/// Closest known node type to an unresolved name, as `pkg.Type`
fn suggest(arena: &Arena<'_>, ty: &TypeExpr) -> Option<String> {
    let TypeExpr::Named { name, .. } = ty else {
        return None;
    };
    let matcher = SkimMatcherV2::default();
    arena
        .graph
        .node_weights()
        .filter_map(|slot| {
            matcher
                .fuzzy_match(&slot.record.name, name)
                .map(|score| (score, names::rest_name(&slot.package.name, &slot.record.name)))
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1)))
        .map(|(_, candidate)| candidate)
}
