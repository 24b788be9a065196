//! core::graph
//!
//! Dependency graph produced by one resolution call.
//!
//! # Architecture
//!
//! The graph is a DAG where:
//! - Nodes are resolved references plus their loaded recipe
//! - Edges point from requirer to dependency
//! - The root is synthetic and carries no reference
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Both directions
//! are stored, so dependencies and dependents are equally cheap to walk.
//!
//! # Invariants
//!
//! - Graph must be acyclic (the builder rejects edges onto ancestors)
//! - Node 0 is the root
//! - An edge is recorded at most once
//!
//! # Example
//!
//! ```
//! use stowage::core::graph::DepsGraph;
//! use stowage::core::reference::Reference;
//!
//! let mut graph = DepsGraph::new();
//! let say = graph.add_node(Reference::parse("say/0.3@u/c").unwrap(), None);
//! graph.add_edge(graph.root(), say);
//!
//! assert_eq!(graph.dependencies(graph.root()), &[say]);
//! assert_eq!(graph.dependents(say), &[graph.root()]);
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use crate::core::reference::Reference;
use crate::recipe::Recipe;

/// Index of a node inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Resolution progress of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeState {
    /// Requirement discovered
    Pending,
    /// Reference fixed, recipe loaded
    Resolving,
    /// Own requirements enqueued
    Expanded,
    /// Build finished
    Complete,
}

/// One node of the graph.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    reference: Option<Reference>,
    package_id: Option<String>,
    recipe: Option<Arc<dyn Recipe>>,
    remote: Option<String>,
    private: bool,
    state: NodeState,
    dependencies: Vec<NodeId>,
    dependents: Vec<NodeId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Resolved reference; `None` only for the root.
    pub fn reference(&self) -> Option<&Reference> {
        self.reference.as_ref()
    }

    /// Package name, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        self.reference.as_ref().map(Reference::name)
    }

    pub fn package_id(&self) -> Option<&str> {
        self.package_id.as_deref()
    }

    pub fn recipe(&self) -> Option<&Arc<dyn Recipe>> {
        self.recipe.as_ref()
    }

    /// Remote the recipe was retrieved from during this resolution.
    pub fn remote(&self) -> Option<&str> {
        self.remote.as_deref()
    }

    /// Whether the node was introduced by a private requirement.
    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_root(&self) -> bool {
        self.id.0 == 0
    }

    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    pub fn dependents(&self) -> &[NodeId] {
        &self.dependents
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reference {
            Some(reference) => write!(f, "{}", reference),
            None => write!(f, "root"),
        }
    }
}

/// The resolved dependency graph.
#[derive(Debug, Clone)]
pub struct DepsGraph {
    nodes: Vec<Node>,
    edges: Vec<(NodeId, NodeId)>,
}

impl Default for DepsGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DepsGraph {
    /// Graph holding only the root node.
    pub fn new() -> Self {
        let root = Node {
            id: NodeId(0),
            reference: None,
            package_id: None,
            recipe: None,
            remote: None,
            private: false,
            state: NodeState::Pending,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        };
        Self {
            nodes: vec![root],
            edges: Vec::new(),
        }
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Add a node in the `Pending` state.
    pub fn add_node(&mut self, reference: Reference, recipe: Option<Arc<dyn Recipe>>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            reference: Some(reference),
            package_id: None,
            recipe,
            remote: None,
            private: false,
            state: NodeState::Pending,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        });
        id
    }

    /// Add the edge `from -> to`. Returns false if it already existed.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) -> bool {
        if self.nodes[from.0].dependencies.contains(&to) {
            return false;
        }
        self.nodes[from.0].dependencies.push(to);
        self.nodes[to.0].dependents.push(from);
        self.edges.push((from, to));
        true
    }

    /// Fix the node's reference and recipe and move it to `Resolving`.
    pub fn resolve_node(&mut self, id: NodeId, reference: Reference, recipe: Arc<dyn Recipe>) {
        let node = &mut self.nodes[id.0];
        node.reference = Some(reference);
        node.recipe = Some(recipe);
        node.state = NodeState::Resolving;
    }

    pub fn set_state(&mut self, id: NodeId, state: NodeState) {
        self.nodes[id.0].state = state;
    }

    pub fn set_recipe(&mut self, id: NodeId, recipe: Arc<dyn Recipe>) {
        self.nodes[id.0].recipe = Some(recipe);
    }

    pub fn set_remote(&mut self, id: NodeId, remote: Option<String>) {
        self.nodes[id.0].remote = remote;
    }

    pub fn set_private(&mut self, id: NodeId, private: bool) {
        self.nodes[id.0].private = private;
    }

    /// Attach the package id computed by an external collaborator.
    pub fn set_package_id(&mut self, id: NodeId, package_id: impl Into<String>) {
        self.nodes[id.0].package_id = Some(package_id.into());
    }

    /// Mark every node `Complete`.
    pub fn complete_all(&mut self) {
        for node in &mut self.nodes {
            node.state = NodeState::Complete;
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// All nodes in creation order, root first.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds only its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::dependencies).unwrap_or(&[])
    }

    pub fn dependents(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::dependents).unwrap_or(&[])
    }

    /// Nodes whose reference is named `name`, in creation order.
    pub fn nodes_named(&self, name: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.name() == Some(name))
            .map(Node::id)
            .collect()
    }

    /// Whether `to` is reachable from `from` through dependencies.
    ///
    /// A node reaches itself.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([from]);

        while let Some(current) = queue.pop_front() {
            if current == to {
                return true;
            }
            if visited.insert(current) {
                queue.extend(self.dependencies(current).iter().copied());
            }
        }
        false
    }

    /// Nodes grouped by level, leaves first.
    ///
    /// Every node appears in a later level than all of its dependencies.
    /// Within a level, nodes are ordered by id.
    pub fn by_levels(&self) -> Vec<Vec<NodeId>> {
        let mut remaining: Vec<usize> = self.nodes.iter().map(|n| n.dependencies.len()).collect();
        let mut current: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.dependencies.is_empty())
            .map(Node::id)
            .collect();
        let mut levels = Vec::new();

        while !current.is_empty() {
            let mut next = Vec::new();
            for id in &current {
                for dependent in self.dependents(*id) {
                    remaining[dependent.0] -= 1;
                    if remaining[dependent.0] == 0 {
                        next.push(*dependent);
                    }
                }
            }
            next.sort();
            next.dedup();
            levels.push(current);
            current = next;
        }
        levels
    }
}
