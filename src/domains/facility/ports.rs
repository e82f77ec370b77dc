use crate::common::DomainResult;
use crate::domains::clustering::ClusterSnapshot;
use crate::domains::movement::EntitySnapshot;
use async_trait::async_trait;

use super::graph::GraphSnapshot;

/// Port the dashboard depends on for pulling snapshots from the facility backend.
/// Implementations (adapters) provide filesystem, in-memory or network-backed sources.
#[async_trait]
pub trait FacilityDataSource: Send + Sync {
    async fn fetch_graph(&self) -> DomainResult<GraphSnapshot>;

    /// `Ok(None)` when the aggregation endpoint does not exist.
    async fn fetch_clusters(&self) -> DomainResult<Option<ClusterSnapshot>>;

    async fn fetch_entities(&self) -> DomainResult<Vec<EntitySnapshot>>;
}
