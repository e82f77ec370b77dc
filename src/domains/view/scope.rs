use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domains::clustering::ClusterAggregator;
use crate::domains::facility::{FacilityGraph, Position};

/// What the render surface currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// One glyph per cluster.
    Aggregate,
    /// The departments of a single cluster.
    Detail(String),
    /// The whole leaf graph; the only scope when clusters are unavailable.
    FullDetail,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Aggregate => write!(f, "aggregate"),
            Scope::Detail(cluster) => write!(f, "detail({})", cluster),
            Scope::FullDetail => write!(f, "full-detail"),
        }
    }
}

/// Resolves a location id to a drawable position within a scope.
pub trait ScopedResolver {
    fn resolve(&self, scope: &Scope, location: &str) -> Option<Position>;
}

/// Projects locations through the graph store and the cluster table.
pub struct Projector<'a> {
    pub graph: &'a FacilityGraph,
    pub clusters: &'a ClusterAggregator,
}

impl<'a> Projector<'a> {
    pub fn new(graph: &'a FacilityGraph, clusters: &'a ClusterAggregator) -> Self {
        Self { graph, clusters }
    }

    /// True when the id names a leaf node or a cluster at all, regardless of scope.
    pub fn is_known(&self, location: &str) -> bool {
        self.graph.contains(location) || self.clusters.cluster(location).is_some()
    }
}

impl ScopedResolver for Projector<'_> {
    fn resolve(&self, scope: &Scope, location: &str) -> Option<Position> {
        match scope {
            Scope::Aggregate => {
                let cluster_id = match self.clusters.cluster(location) {
                    Some(cluster) => return Some(cluster.center),
                    None => self.clusters.cluster_for_department(location)?,
                };
                self.clusters.cluster(cluster_id).map(|c| c.center)
            }
            Scope::Detail(cluster_id) => {
                if self.clusters.cluster_for_department(location) == Some(cluster_id.as_str()) {
                    self.graph.position(location)
                } else {
                    None
                }
            }
            Scope::FullDetail => self.graph.position(location),
        }
    }
}
