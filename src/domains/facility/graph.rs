use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::watch;

use super::ports::FacilityDataSource;
use crate::common::DomainResult;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Position {
    fn from(p: [f64; 2]) -> Self {
        Self { x: p[0], y: p[1] }
    }
}

/// A leaf location of the facility (a department).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

impl Node {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(alias = "distance")]
    pub weight: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Outcome of installing a graph snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphLoadReport {
    pub nodes: usize,
    pub edges: usize,
    pub skipped_edges: usize,
}

/// Leaf-level graph store: node positions indexed by id plus informational edges.
///
/// Dependents that must not render before the graph exists subscribe to the
/// `loaded` flag instead of polling.
pub struct FacilityGraph {
    graph: UnGraph<Node, f64>,
    index: HashMap<String, NodeIndex>,
    loaded: watch::Sender<bool>,
}

impl Default for FacilityGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl FacilityGraph {
    pub fn new() -> Self {
        let (loaded, _) = watch::channel(false);
        Self {
            graph: UnGraph::default(),
            index: HashMap::new(),
            loaded,
        }
    }

    /// Fetch the leaf graph from the data source and install it.
    pub async fn load(&mut self, source: &dyn FacilityDataSource) -> DomainResult<GraphLoadReport> {
        let snapshot = source.fetch_graph().await?;
        Ok(self.install(snapshot))
    }

    /// Replace the store's content with `snapshot`. Later duplicates of a node id
    /// win; edges naming unknown nodes are skipped.
    pub fn install(&mut self, snapshot: GraphSnapshot) -> GraphLoadReport {
        self.graph.clear();
        self.index.clear();

        for node in snapshot.nodes {
            match self.index.get(&node.id) {
                Some(&idx) => self.graph[idx] = node,
                None => {
                    let id = node.id.clone();
                    let idx = self.graph.add_node(node);
                    self.index.insert(id, idx);
                }
            }
        }

        let mut skipped_edges = 0;
        for edge in snapshot.edges {
            match (self.index.get(&edge.source), self.index.get(&edge.target)) {
                (Some(&a), Some(&b)) => {
                    self.graph.add_edge(a, b, edge.weight);
                }
                _ => skipped_edges += 1,
            }
        }

        self.loaded.send_replace(true);

        GraphLoadReport {
            nodes: self.graph.node_count(),
            edges: self.graph.edge_count(),
            skipped_edges,
        }
    }

    pub fn is_loaded(&self) -> bool {
        *self.loaded.borrow()
    }

    /// Readiness notification; resolves to `true` once a graph is installed.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.loaded.subscribe()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Position of a leaf location, `None` when the id is unknown.
    pub fn position(&self, id: &str) -> Option<Position> {
        self.node(id).map(Node::position)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    pub fn edges(&self) -> impl Iterator<Item = (&Node, &Node, f64)> {
        self.graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()], *e.weight()))
    }

    /// Induced subgraph over `members`: member nodes in the given order and the
    /// edges whose endpoints are both members.
    pub fn subgraph<'a>(&'a self, members: &[String]) -> (Vec<&'a Node>, Vec<(&'a Node, &'a Node, f64)>) {
        let wanted: HashSet<NodeIndex> = members
            .iter()
            .filter_map(|id| self.index.get(id).copied())
            .collect();

        let nodes = members
            .iter()
            .filter_map(|id| self.index.get(id))
            .map(|&idx| &self.graph[idx])
            .collect();

        let edges = self
            .graph
            .edge_references()
            .filter(|e| wanted.contains(&e.source()) && wanted.contains(&e.target()))
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()], *e.weight()))
            .collect();

        (nodes, edges)
    }
}
