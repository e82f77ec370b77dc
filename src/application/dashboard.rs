use tokio::time::Instant;

use crate::common::{DomainError, DomainEvent};
use crate::domains::clustering::ClusterAggregator;
use crate::domains::facility::{FacilityDataSource, FacilityGraph, GraphLoadReport, GraphSnapshot};
use crate::domains::logger::DynLogger;
use crate::domains::movement::{
    compress_to_clusters, filter_to_cluster, format_clock, AnimationScheduler, EntitySnapshot, EntityStatus,
    EntityTable, FeedEvent, PlannedMove, StepOrder, StepOutcome, UpsertOutcome,
};
use crate::domains::view::{ConnectionStatus, Projector, RenderSurface, Scope, ScopedResolver, ViewController};

/// Work the dashboard cannot do synchronously; the runtime carries it out.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Arm a timer for `order.duration`, then report `complete_step`.
    Schedule(StepOrder),
    /// Try a creation at a not yet known location again after the configured delay.
    RetryCreate {
        id: String,
        location: String,
        status: EntityStatus,
        attempt: u32,
    },
    /// Pull a fresh entity snapshot.
    Reconcile,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped_animating: usize,
    pub malformed: usize,
}

/// The single serialized path through which every state change flows: feed
/// events, step completions, reconciliation snapshots and user commands.
pub struct Dashboard<S: RenderSurface> {
    graph: FacilityGraph,
    clusters: ClusterAggregator,
    entities: EntityTable,
    scheduler: AnimationScheduler,
    view: ViewController<S>,
    connection: ConnectionStatus,
    resolve_retries: u32,
    /// Creations received before the graph was loaded, replayed by `graph_ready`.
    held_creations: Vec<(String, String, EntityStatus)>,
    logger: DynLogger,
}

impl<S: RenderSurface> Dashboard<S> {
    pub fn new(view: ViewController<S>, scheduler: AnimationScheduler, logger: DynLogger) -> Self {
        Self {
            graph: FacilityGraph::new(),
            clusters: ClusterAggregator::unavailable(),
            entities: EntityTable::new(),
            scheduler,
            view,
            connection: ConnectionStatus::Connected,
            resolve_retries: 5,
            held_creations: Vec::new(),
            logger,
        }
    }

    pub fn with_resolve_retries(mut self, retries: u32) -> Self {
        self.resolve_retries = retries;
        self
    }

    pub fn graph(&self) -> &FacilityGraph {
        &self.graph
    }

    pub fn clusters(&self) -> &ClusterAggregator {
        &self.clusters
    }

    pub fn entities(&self) -> &EntityTable {
        &self.entities
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    pub fn view(&self) -> &ViewController<S> {
        &self.view
    }

    pub fn surface(&self) -> &S {
        self.view.surface()
    }

    pub fn scope(&self) -> &Scope {
        self.view.scope()
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn held_creations(&self) -> usize {
        self.held_creations.len()
    }

    /// No animation in flight.
    pub fn is_idle(&self) -> bool {
        self.scheduler.active_count() == 0
    }

    pub fn into_surface(self) -> S {
        self.view.into_surface()
    }

    /// Load the leaf graph and the optional cluster snapshot, then open the home
    /// scope. Neither failure is fatal: a missing graph leaves an empty map, missing
    /// clusters leave only the full-detail scope.
    pub async fn load_sources(&mut self, source: &dyn FacilityDataSource) {
        match self.graph.load(source).await {
            Ok(report) => self.log_graph_report(&report),
            Err(e) => self.logger.error(&format!("Facility graph unavailable: {}", e)),
        }

        let (clusters, error) = ClusterAggregator::load(source).await;
        self.install_clusters(clusters, error);
    }

    /// Install a graph that arrived after startup and redraw the current scope.
    /// Subscribers of the graph's readiness flag are notified.
    pub fn install_graph(&mut self, snapshot: GraphSnapshot) {
        let report = self.graph.install(snapshot);
        self.log_graph_report(&report);
        self.view.rebuild(&self.graph, &self.clusters, &self.entities);
    }

    /// Replay creations held while the graph was missing.
    pub fn graph_ready(&mut self) -> Vec<Effect> {
        let held = std::mem::take(&mut self.held_creations);
        if !held.is_empty() {
            self.logger
                .info(&format!("Facility graph ready; applying {} held creations", held.len()));
        }
        held.into_iter()
            .flat_map(|(id, location, status)| self.create_entity(id, location, status, 0))
            .collect()
    }

    fn log_graph_report(&self, report: &GraphLoadReport) {
        self.logger.info(&format!(
            "Facility graph loaded: {} nodes, {} edges",
            report.nodes, report.edges
        ));
        if report.skipped_edges > 0 {
            self.logger
                .warn(&format!("Skipped {} edges referencing unknown nodes", report.skipped_edges));
        }
    }

    /// Install a cluster table (possibly the unavailable one) and rebuild in the home
    /// scope. The failure, if any, is logged once here and never retried.
    pub fn install_clusters(&mut self, clusters: ClusterAggregator, error: Option<DomainError>) {
        if let Some(e) = error {
            self.logger.warn(&format!("{}; falling back to the facility detail view", e));
        } else if clusters.is_available() {
            self.logger.info(&format!("Loaded {} clusters", clusters.cluster_count()));
        }
        self.clusters = clusters;
        let home = self.view.home_scope(&self.clusters);
        if let Err(e) = self.view.switch_to(home, &self.graph, &self.clusters, &self.entities) {
            self.logger.error(&e.to_string());
        }
    }

    /// Apply a full-state pull. Only idle entities are touched.
    pub fn reconcile(&mut self, snapshots: Vec<EntitySnapshot>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let projector = Projector::new(&self.graph, &self.clusters);
        for snapshot in snapshots {
            if snapshot.id.is_empty() {
                report.malformed += 1;
                continue;
            }
            match self.entities.upsert(&snapshot.id, &snapshot.current_location, snapshot.status) {
                UpsertOutcome::Created => report.created += 1,
                UpsertOutcome::Updated => report.updated += 1,
                UpsertOutcome::Unchanged => {
                    report.unchanged += 1;
                    if self.view.surface().has_entity(&snapshot.id) {
                        continue;
                    }
                }
                UpsertOutcome::SkippedAnimating => {
                    report.skipped_animating += 1;
                    continue;
                }
            }
            if let Some(entity) = self.entities.get(&snapshot.id) {
                self.view.show_entity(entity, &projector);
            }
        }
        if report.malformed > 0 {
            self.logger
                .debug(&format!("Reconciliation dropped {} records without an id", report.malformed));
        }
        report
    }

    pub fn handle_event(&mut self, event: FeedEvent, now: Instant) -> Vec<Effect> {
        if let Some(id) = event.entity_id() {
            self.logger.debug(&format!("{} for {}", event.event_type(), id));
        }
        match event {
            FeedEvent::EntityCreated {
                id,
                current_location,
                status,
            } => self.create_entity(id, current_location, status, 0),
            FeedEvent::EntityMoved { id, path, durations } => self.move_entity(id, path, durations, now),
            FeedEvent::EntityStatusChanged { id, status } => {
                if self.entities.set_status(&id, status) {
                    let projector = Projector::new(&self.graph, &self.clusters);
                    if let Some(entity) = self.entities.get(&id).filter(|e| !e.is_animating()) {
                        self.view.show_entity(entity, &projector);
                    }
                }
                Vec::new()
            }
            FeedEvent::RequestLifecycleChanged { request_id, status } => {
                if let (Some(request), Some(status)) = (request_id, status) {
                    self.logger.debug(&format!("Request {} is now {}", request, status));
                }
                self.view.surface_mut().refresh_summary();
                Vec::new()
            }
            FeedEvent::ActivityLog { message } => {
                self.logger.info(&message);
                Vec::new()
            }
            FeedEvent::ClockTick { sim_time } => {
                self.view.surface_mut().set_clock(&format_clock(sim_time));
                Vec::new()
            }
            FeedEvent::Connected => {
                if self.connection == ConnectionStatus::Connected {
                    return Vec::new();
                }
                self.connection = ConnectionStatus::Connected;
                self.view.surface_mut().set_status(ConnectionStatus::Connected);
                self.logger.info("Feed reconnected; reconciling");
                vec![Effect::Reconcile]
            }
            FeedEvent::Disconnected => {
                if self.connection == ConnectionStatus::Connected {
                    self.connection = ConnectionStatus::Disconnected;
                    self.view.surface_mut().set_status(ConnectionStatus::Disconnected);
                    self.logger
                        .warn(&DomainError::ConnectivityLoss("push feed disconnected".to_string()).to_string());
                }
                Vec::new()
            }
        }
    }

    /// Re-attempt a creation whose location could not be resolved earlier.
    pub fn retry_create(&mut self, id: String, location: String, status: EntityStatus, attempt: u32) -> Vec<Effect> {
        self.create_entity(id, location, status, attempt)
    }

    /// A step timer fired.
    pub fn complete_step(&mut self, entity_id: &str, ticket: u64, now: Instant) -> Vec<Effect> {
        let projector = Projector::new(&self.graph, &self.clusters);
        match self
            .scheduler
            .on_step_complete(&mut self.entities, &projector, entity_id, ticket, now)
        {
            StepOutcome::Next(order) => {
                self.view
                    .surface_mut()
                    .move_entity(&order.entity_id, order.target, order.duration);
                vec![Effect::Schedule(order)]
            }
            StepOutcome::Completed { entity_id, location } => {
                self.logger.debug(&format!("{} arrived at {}", entity_id, location));
                if let Some(entity) = self.entities.get(&entity_id) {
                    self.view.show_entity(entity, &projector);
                }
                Vec::new()
            }
            StepOutcome::Aborted {
                entity_id,
                location,
                error,
            } => {
                self.logger
                    .error(&format!("Animation of {} aborted at {}: {}", entity_id, location, error));
                if let Some(entity) = self.entities.get(&entity_id) {
                    self.view.show_entity(entity, &projector);
                }
                Vec::new()
            }
            StepOutcome::Stale => {
                self.logger
                    .debug(&format!("Ignoring stale step completion for {} (ticket {})", entity_id, ticket));
                Vec::new()
            }
        }
    }

    /// Watchdog pass: abort animations whose current step overran its deadline.
    pub fn sweep(&mut self, now: Instant) -> usize {
        let released = self.scheduler.sweep_stalled(&mut self.entities, now);
        let projector = Projector::new(&self.graph, &self.clusters);
        for (id, location) in &released {
            self.logger
                .warn(&format!("Animation of {} stalled; released at {}", id, location));
            if let Some(entity) = self.entities.get(id) {
                self.view.show_entity(entity, &projector);
            }
        }
        released.len()
    }

    pub fn switch_scope(&mut self, scope: Scope) -> Result<Vec<Effect>, DomainError> {
        let drawn = self
            .view
            .switch_to(scope, &self.graph, &self.clusters, &self.entities)?;
        self.logger.info(&format!(
            "{} ({} idle entities shown)",
            self.view.caption(&self.clusters),
            drawn
        ));
        Ok(vec![Effect::Reconcile])
    }

    pub fn enter_cluster(&mut self, cluster_id: &str) -> Result<Vec<Effect>, DomainError> {
        self.switch_scope(Scope::Detail(cluster_id.to_string()))
    }

    pub fn exit_cluster(&mut self) -> Result<Vec<Effect>, DomainError> {
        self.switch_scope(Scope::Aggregate)
    }

    /// Discard all entity state and redraw; in-flight completions become stale.
    pub fn reset(&mut self) -> Vec<Effect> {
        self.scheduler.cancel_all(&mut self.entities);
        self.entities.clear();
        self.held_creations.clear();
        self.view.rebuild(&self.graph, &self.clusters, &self.entities);
        self.logger.info("View reset");
        vec![Effect::Reconcile]
    }

    fn create_entity(&mut self, id: String, location: String, status: EntityStatus, attempt: u32) -> Vec<Effect> {
        if id.is_empty() {
            self.logger.debug("Dropping creation event without an id");
            return Vec::new();
        }
        if !self.graph.is_loaded() {
            self.logger
                .debug(&format!("Facility graph not loaded; holding creation of {}", id));
            self.held_creations.retain(|(held, _, _)| held != &id);
            self.held_creations.push((id, location, status));
            return Vec::new();
        }
        let projector = Projector::new(&self.graph, &self.clusters);
        if !projector.is_known(&location) {
            if attempt < self.resolve_retries {
                return vec![Effect::RetryCreate {
                    id,
                    location,
                    status,
                    attempt: attempt + 1,
                }];
            }
            let error = DomainError::UnresolvedLocation { id: location };
            self.logger
                .error(&format!("Giving up on {} after {} attempts: {}", id, attempt + 1, error));
            return Vec::new();
        }

        match self.entities.upsert(&id, &location, status) {
            UpsertOutcome::SkippedAnimating => {
                self.logger.debug(&format!("{} is animating; creation ignored", id));
            }
            outcome => {
                if outcome == UpsertOutcome::Created {
                    self.logger.info(&format!("New entity {} at {}", id, location));
                }
                if let Some(entity) = self.entities.get(&id) {
                    self.view.show_entity(entity, &projector);
                }
            }
        }
        Vec::new()
    }

    fn plan(&self, path: &[String], durations: &[u64]) -> Option<PlannedMove> {
        match self.view.scope() {
            Scope::Aggregate => compress_to_clusters(&self.clusters, path, durations).into_move(),
            Scope::Detail(cluster_id) => {
                filter_to_cluster(self.clusters.departments_in_cluster(cluster_id), path, durations)
            }
            Scope::FullDetail => PlannedMove::direct(path, durations),
        }
    }

    fn move_entity(&mut self, id: String, path: Vec<String>, durations: Vec<u64>, now: Instant) -> Vec<Effect> {
        if id.is_empty() || path.len() < 2 {
            let error = DomainError::malformed(format!("movement '{}' with {} location(s)", id, path.len()));
            self.logger.debug(&format!("Dropping event: {}", error));
            return Vec::new();
        }
        if self.connection == ConnectionStatus::Disconnected {
            self.logger
                .debug(&format!("Feed disconnected; dropping movement of {}", id));
            return Vec::new();
        }

        let projector = Projector::new(&self.graph, &self.clusters);
        if !self.entities.contains(&id) {
            self.entities.upsert(&id, &path[0], EntityStatus::Active);
            if let Some(entity) = self.entities.get(&id) {
                self.view.show_entity(entity, &projector);
            }
        }

        let Some(planned) = self.plan(&path, &durations) else {
            self.logger.debug(&format!(
                "Movement of {} has nothing to animate in scope {}",
                id,
                self.view.scope()
            ));
            return Vec::new();
        };

        let scope = self.view.scope().clone();
        match self
            .scheduler
            .animate(&mut self.entities, &projector, &scope, &id, planned, now)
        {
            Ok(order) => {
                if let Some(entity) = self.entities.get(&id) {
                    let start = projector.resolve(&scope, &order.from).unwrap_or(order.target);
                    let marker = self.view.marker(entity, start, true);
                    let surface = self.view.surface_mut();
                    surface.place_entity(marker);
                    surface.move_entity(&order.entity_id, order.target, order.duration);
                }
                vec![Effect::Schedule(order)]
            }
            Err(e @ DomainError::EntityBusy { .. }) => {
                self.logger.warn(&format!("Movement rejected: {}", e));
                Vec::new()
            }
            Err(e) => {
                self.logger.error(&format!("Animation of {} aborted: {}", id, e));
                if let Some(entity) = self.entities.get(&id) {
                    self.view.show_entity(entity, &projector);
                }
                Vec::new()
            }
        }
    }
}
