use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::common::{DomainError, DomainResult};
use crate::domains::facility::{FacilityDataSource, Position};

/// Department type that dominates a cluster; unknown names fall back to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum DominantType {
    Emergency,
    Surgery,
    Inpatient,
    Diagnostic,
    Outpatient,
    Support,
    #[default]
    Other,
}

impl From<String> for DominantType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Emergency" => DominantType::Emergency,
            "Surgery" => DominantType::Surgery,
            "Inpatient" => DominantType::Inpatient,
            "Diagnostic" => DominantType::Diagnostic,
            "Outpatient" => DominantType::Outpatient,
            "Support" => DominantType::Support,
            _ => DominantType::Other,
        }
    }
}

impl DominantType {
    pub fn color(&self) -> &'static str {
        match self {
            DominantType::Emergency => "#e74c3c",
            DominantType::Surgery => "#9b59b6",
            DominantType::Inpatient => "#3498db",
            DominantType::Diagnostic => "#2ecc71",
            DominantType::Outpatient => "#f39c12",
            DominantType::Support => "#7f8c8d",
            DominantType::Other => "#95a5a6",
        }
    }
}

/// Cluster record as delivered by the aggregation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterRecord {
    pub name: String,
    pub center: [f64; 2],
    pub size: usize,
    #[serde(default)]
    pub dominant_type: DominantType,
    #[serde(default)]
    pub departments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAdjacency {
    pub source: String,
    pub target: String,
    pub strength: f64,
}

impl ClusterAdjacency {
    pub fn stroke_width(&self) -> f64 {
        (self.strength / 5.0).clamp(1.0, 8.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub clusters: BTreeMap<String, ClusterRecord>,
    #[serde(default)]
    pub department_to_cluster: HashMap<String, String>,
    #[serde(default)]
    pub connections: Vec<ClusterAdjacency>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub dominant_type: DominantType,
    pub center: Position,
    /// Department count reported by the snapshot; drives the radius.
    pub size: usize,
    pub departments: Vec<String>,
}

impl Cluster {
    pub fn radius(&self) -> f64 {
        (self.size as f64).sqrt() * 5.0
    }

    pub fn contains(&self, department: &str) -> bool {
        self.departments.iter().any(|d| d == department)
    }
}

/// Cluster table, department→cluster index and adjacency built from an optional
/// aggregation snapshot. When no usable snapshot exists the aggregator reports
/// itself unavailable and every lookup misses.
#[derive(Debug, Clone, Default)]
pub struct ClusterAggregator {
    clusters: BTreeMap<String, Cluster>,
    department_index: HashMap<String, String>,
    adjacency: Vec<ClusterAdjacency>,
    available: bool,
}

impl ClusterAggregator {
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// Pull the aggregation snapshot; any failure degrades to `unavailable`.
    /// The error (if any) is returned alongside so the caller can log it once.
    pub async fn load(source: &dyn FacilityDataSource) -> (Self, Option<DomainError>) {
        match source.fetch_clusters().await {
            Ok(Some(snapshot)) => match Self::from_snapshot(snapshot) {
                Ok(aggregator) => (aggregator, None),
                Err(e) => (Self::unavailable(), Some(e)),
            },
            Ok(None) => (
                Self::unavailable(),
                Some(DomainError::unavailable("clusters", "aggregation endpoint absent")),
            ),
            Err(e) => (Self::unavailable(), Some(e)),
        }
    }

    pub fn from_snapshot(snapshot: ClusterSnapshot) -> DomainResult<Self> {
        let mut clusters = BTreeMap::new();
        let mut department_index: HashMap<String, String> = HashMap::new();

        for (id, record) in snapshot.clusters {
            for department in &record.departments {
                if let Some(other) = department_index.insert(department.clone(), id.clone()) {
                    if other != id {
                        return Err(DomainError::unavailable(
                            "clusters",
                            format!("department {} listed in clusters {} and {}", department, other, id),
                        ));
                    }
                }
            }
            clusters.insert(
                id.clone(),
                Cluster {
                    id,
                    name: record.name,
                    dominant_type: record.dominant_type,
                    center: Position::from(record.center),
                    size: record.size,
                    departments: record.departments,
                },
            );
        }

        // Index-only entries extend membership; contradictions reject the snapshot.
        let mut extra: Vec<(String, String)> = snapshot.department_to_cluster.into_iter().collect();
        extra.sort();
        for (department, cluster_id) in extra {
            match department_index.get(&department) {
                Some(existing) if *existing == cluster_id => {}
                Some(existing) => {
                    return Err(DomainError::unavailable(
                        "clusters",
                        format!(
                            "index maps {} to {} but membership says {}",
                            department, cluster_id, existing
                        ),
                    ));
                }
                None => {
                    if let Some(cluster) = clusters.get_mut(&cluster_id) {
                        cluster.departments.push(department.clone());
                        department_index.insert(department, cluster_id);
                    }
                }
            }
        }

        let adjacency = snapshot
            .connections
            .into_iter()
            .filter(|c| clusters.contains_key(&c.source) && clusters.contains_key(&c.target))
            .collect();

        Ok(Self {
            clusters,
            department_index,
            adjacency,
            available: true,
        })
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn cluster(&self, id: &str) -> Option<&Cluster> {
        self.clusters.get(id)
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }

    pub fn cluster_for_department(&self, department: &str) -> Option<&str> {
        self.department_index.get(department).map(String::as_str)
    }

    /// Ordered membership, empty for an unknown cluster.
    pub fn departments_in_cluster(&self, cluster_id: &str) -> &[String] {
        self.clusters
            .get(cluster_id)
            .map(|c| c.departments.as_slice())
            .unwrap_or(&[])
    }

    pub fn adjacency(&self) -> &[ClusterAdjacency] {
        &self.adjacency
    }
}
