use serde::{Deserialize, Serialize};

use super::scope::{Projector, Scope, ScopedResolver};
use super::surface::{EntityMarker, GlyphKind, LinkGlyph, LocationGlyph, RenderSurface};
use crate::common::{DomainError, DomainResult};
use crate::domains::clustering::ClusterAggregator;
use crate::domains::facility::{FacilityGraph, Node, Position};
use crate::domains::movement::{EntityRenderState, EntityTable};

const DEPARTMENT_COLOR: &str = "#90CAF9";
const LINK_WIDTH: f64 = 2.0;

/// Per-mount presentation settings. One controller is instantiated per mounting
/// context with its own options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    pub mount: String,
    pub node_radius: f64,
    pub entity_radius: f64,
    pub show_edge_weights: bool,
    pub short_labels: bool,
    /// Offer the aggregate/cluster scopes when cluster data exists.
    pub cluster_view: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            mount: "dashboard".to_string(),
            node_radius: 20.0,
            entity_radius: 12.0,
            show_edge_weights: true,
            short_labels: false,
            cluster_view: true,
        }
    }
}

/// Owns the render surface and the active scope. Every scope change is a full
/// clear-and-rebuild: location layers are redrawn, idle markers are dropped and
/// re-projected, animating markers are left alone.
pub struct ViewController<S: RenderSurface> {
    surface: S,
    scope: Scope,
    options: ViewOptions,
}

impl<S: RenderSurface> ViewController<S> {
    pub fn new(surface: S, options: ViewOptions) -> Self {
        Self {
            surface,
            scope: Scope::FullDetail,
            options,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    fn clusters_offered(&self, clusters: &ClusterAggregator) -> bool {
        self.options.cluster_view && clusters.is_available()
    }

    /// Scope to open with: the cluster overview when possible, else the leaf graph.
    pub fn home_scope(&self, clusters: &ClusterAggregator) -> Scope {
        if self.clusters_offered(clusters) {
            Scope::Aggregate
        } else {
            Scope::FullDetail
        }
    }

    pub fn offered_scopes(&self, clusters: &ClusterAggregator) -> Vec<Scope> {
        if !self.clusters_offered(clusters) {
            return vec![Scope::FullDetail];
        }
        std::iter::once(Scope::Aggregate)
            .chain(clusters.clusters().map(|c| Scope::Detail(c.id.clone())))
            .collect()
    }

    /// Switch scope and rebuild. Returns the number of idle markers drawn.
    pub fn switch_to(
        &mut self,
        scope: Scope,
        graph: &FacilityGraph,
        clusters: &ClusterAggregator,
        entities: &EntityTable,
    ) -> DomainResult<usize> {
        if !self.offered_scopes(clusters).contains(&scope) {
            return Err(DomainError::InvalidCommand {
                reason: format!("scope {} is not offered on mount {}", scope, self.options.mount),
            });
        }
        self.scope = scope;
        Ok(self.rebuild(graph, clusters, entities))
    }

    /// Idempotent reset of the surface for the current scope.
    pub fn rebuild(&mut self, graph: &FacilityGraph, clusters: &ClusterAggregator, entities: &EntityTable) -> usize {
        self.surface.clear_layers();
        self.draw_layers(graph, clusters);
        let caption = self.caption(clusters);
        self.surface.set_caption(&caption);

        for id in self.surface.entity_ids() {
            let animating = entities.get(&id).map(|e| e.is_animating()).unwrap_or(false);
            if !animating {
                self.surface.remove_entity(&id);
            }
        }

        let projector = Projector::new(graph, clusters);
        let mut drawn = 0;
        for entity in entities.idle() {
            if self.show_entity(entity, &projector) {
                drawn += 1;
            }
        }
        drawn
    }

    /// Draw (or hide) one idle entity at its projected position in this scope.
    pub fn show_entity(&mut self, entity: &EntityRenderState, projector: &dyn ScopedResolver) -> bool {
        match projector.resolve(&self.scope, &entity.current_location) {
            Some(position) => {
                let marker = self.marker(entity, position, false);
                self.surface.place_entity(marker);
                true
            }
            None => {
                if self.surface.has_entity(&entity.id) {
                    self.surface.remove_entity(&entity.id);
                }
                false
            }
        }
    }

    pub fn marker(&self, entity: &EntityRenderState, position: Position, animating: bool) -> EntityMarker {
        EntityMarker {
            id: entity.id.clone(),
            label: entity.label(),
            position,
            radius: self.options.entity_radius,
            color: entity.status.color().to_string(),
            location: entity.current_location.clone(),
            animating,
        }
    }

    pub fn caption(&self, clusters: &ClusterAggregator) -> String {
        match &self.scope {
            Scope::Aggregate => "Viewing: Facility Clusters".to_string(),
            Scope::Detail(id) => match clusters.cluster(id) {
                Some(cluster) => format!("Viewing: {}", cluster.name),
                None => format!("Viewing: {}", id),
            },
            Scope::FullDetail => "Viewing: Facility".to_string(),
        }
    }

    fn draw_layers(&mut self, graph: &FacilityGraph, clusters: &ClusterAggregator) {
        match self.scope.clone() {
            Scope::Aggregate => {
                for link in clusters.adjacency() {
                    let (Some(a), Some(b)) = (clusters.cluster(&link.source), clusters.cluster(&link.target)) else {
                        continue;
                    };
                    self.surface.draw_link(LinkGlyph {
                        source: a.id.clone(),
                        target: b.id.clone(),
                        from: a.center,
                        to: b.center,
                        width: link.stroke_width(),
                        label: None,
                    });
                }
                for cluster in clusters.clusters() {
                    self.surface.draw_location(LocationGlyph {
                        id: cluster.id.clone(),
                        label: cluster.name.clone(),
                        kind: GlyphKind::Cluster,
                        position: cluster.center,
                        radius: cluster.radius(),
                        color: cluster.dominant_type.color().to_string(),
                    });
                }
            }
            Scope::Detail(cluster_id) => {
                let (nodes, edges) = graph.subgraph(clusters.departments_in_cluster(&cluster_id));
                self.draw_leaf(nodes, edges);
            }
            Scope::FullDetail => {
                let nodes: Vec<&Node> = graph.nodes().collect();
                let edges: Vec<(&Node, &Node, f64)> = graph.edges().collect();
                self.draw_leaf(nodes, edges);
            }
        }
    }

    fn draw_leaf(&mut self, nodes: Vec<&Node>, edges: Vec<(&Node, &Node, f64)>) {
        for (a, b, weight) in edges {
            self.surface.draw_link(LinkGlyph {
                source: a.id.clone(),
                target: b.id.clone(),
                from: a.position(),
                to: b.position(),
                width: LINK_WIDTH,
                label: self.options.show_edge_weights.then(|| format!("{}", weight)),
            });
        }
        for node in nodes {
            let label = if self.options.short_labels {
                node.id.chars().take(3).collect()
            } else {
                node.id.clone()
            };
            self.surface.draw_location(LocationGlyph {
                id: node.id.clone(),
                label,
                kind: GlyphKind::Department,
                position: node.position(),
                radius: self.options.node_radius,
                color: DEPARTMENT_COLOR.to_string(),
            });
        }
    }
}
