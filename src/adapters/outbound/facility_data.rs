use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::common::{DomainError, DomainResult};
use crate::domains::clustering::ClusterSnapshot;
use crate::domains::facility::{FacilityDataSource, GraphSnapshot};
use crate::domains::movement::EntitySnapshot;

pub const GRAPH_FILE: &str = "graph.json";
pub const CLUSTERS_FILE: &str = "clusters.json";
pub const ENTITIES_FILE: &str = "entities.json";

/// Reads snapshots from JSON files in a data directory.
/// Precedence for the directory: explicit path -> FACILITY_DATA_DIR -> ./resources/facility
pub struct FilesystemDataSource {
    base: PathBuf,
}

impl FilesystemDataSource {
    pub fn new(base: Option<PathBuf>) -> Self {
        let base = base.unwrap_or_else(|| {
            if let Ok(v) = env::var("FACILITY_DATA_DIR") {
                PathBuf::from(v)
            } else {
                PathBuf::from("resources/facility")
            }
        });
        Self { base }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> DomainResult<T> {
        let p = self.base.join(name);
        let content = tokio::fs::read_to_string(&p)
            .await
            .map_err(|e| DomainError::unavailable(name, format!("{}: {}", p.display(), e)))?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl FacilityDataSource for FilesystemDataSource {
    async fn fetch_graph(&self) -> DomainResult<GraphSnapshot> {
        self.read_json(GRAPH_FILE).await
    }

    async fn fetch_clusters(&self) -> DomainResult<Option<ClusterSnapshot>> {
        if !self.base.join(CLUSTERS_FILE).exists() {
            return Ok(None);
        }
        self.read_json(CLUSTERS_FILE).await.map(Some)
    }

    async fn fetch_entities(&self) -> DomainResult<Vec<EntitySnapshot>> {
        if !self.base.join(ENTITIES_FILE).exists() {
            return Ok(Vec::new());
        }
        self.read_json(ENTITIES_FILE).await
    }
}

/// In-process source; entity snapshots can be swapped between pulls.
#[derive(Default)]
pub struct InMemoryDataSource {
    graph: Mutex<Option<GraphSnapshot>>,
    clusters: Option<ClusterSnapshot>,
    entities: Mutex<Vec<EntitySnapshot>>,
}

impl InMemoryDataSource {
    pub fn new(graph: GraphSnapshot, clusters: Option<ClusterSnapshot>, entities: Vec<EntitySnapshot>) -> Self {
        Self {
            graph: Mutex::new(Some(graph)),
            clusters,
            entities: Mutex::new(entities),
        }
    }

    /// A source whose graph endpoint fails until `set_graph` is called.
    pub fn without_graph(clusters: Option<ClusterSnapshot>, entities: Vec<EntitySnapshot>) -> Self {
        Self {
            graph: Mutex::new(None),
            clusters,
            entities: Mutex::new(entities),
        }
    }

    pub fn set_graph(&self, graph: GraphSnapshot) {
        if let Ok(mut guard) = self.graph.lock() {
            *guard = Some(graph);
        }
    }

    pub fn set_entities(&self, entities: Vec<EntitySnapshot>) {
        if let Ok(mut guard) = self.entities.lock() {
            *guard = entities;
        }
    }
}

#[async_trait]
impl FacilityDataSource for InMemoryDataSource {
    async fn fetch_graph(&self) -> DomainResult<GraphSnapshot> {
        self.graph
            .lock()
            .map_err(|e| DomainError::InfrastructureError(format!("graph snapshot lock poisoned: {}", e)))?
            .clone()
            .ok_or_else(|| DomainError::unavailable("graph", "no graph snapshot configured"))
    }

    async fn fetch_clusters(&self) -> DomainResult<Option<ClusterSnapshot>> {
        Ok(self.clusters.clone())
    }

    async fn fetch_entities(&self) -> DomainResult<Vec<EntitySnapshot>> {
        self.entities
            .lock()
            .map(|guard| guard.clone())
            .map_err(|e| DomainError::InfrastructureError(format!("entity snapshot lock poisoned: {}", e)))
    }
}
