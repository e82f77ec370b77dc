use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

use super::dashboard::{Dashboard, Effect};
use crate::common::{ApplicationResult, DomainResult};
use crate::config::Config;
use crate::domains::facility::{FacilityDataSource, GraphSnapshot};
use crate::domains::logger::DynLogger;
use crate::domains::movement::{EntitySnapshot, EntityStatus, FeedEvent};
use crate::domains::view::RenderSurface;

/// User interaction forwarded into the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    EnterCluster(String),
    ExitCluster,
    /// Pull the entity snapshot now.
    Refresh,
    Reset,
    Shutdown,
}

/// Messages the loop posts to itself from spawned timers and pulls.
enum Internal {
    StepDone {
        entity_id: String,
        ticket: u64,
    },
    RetryCreate {
        id: String,
        location: String,
        status: EntityStatus,
        attempt: u32,
    },
    Pulled(DomainResult<Vec<EntitySnapshot>>),
    GraphFetched(DomainResult<GraphSnapshot>),
}

#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub reconcile_interval: Duration,
    pub resolve_delay: Duration,
    pub channel_capacity: usize,
    /// Stop once the feed is closed and nothing is in flight.
    pub exit_when_drained: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl RuntimeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            reconcile_interval: config.reconciliation.interval().max(Duration::from_millis(1)),
            resolve_delay: config.animation.resolve_delay(),
            channel_capacity: config.feed.channel_capacity.max(1),
            exit_when_drained: true,
        }
    }
}

/// Cooperative event loop around a [`Dashboard`]. Everything that mutates the
/// dashboard runs on this loop; timers and pulls run as spawned tasks and report
/// back through an internal channel.
pub struct DashboardRuntime<S: RenderSurface> {
    dashboard: Dashboard<S>,
    source: Arc<dyn FacilityDataSource>,
    settings: RuntimeSettings,
    logger: DynLogger,
    internal_tx: mpsc::Sender<Internal>,
    internal_rx: mpsc::Receiver<Internal>,
    command_tx: mpsc::Sender<Command>,
    command_rx: mpsc::Receiver<Command>,
    pending_retries: usize,
    pending_pulls: usize,
    graph_fetch_pending: bool,
}

impl<S: RenderSurface> DashboardRuntime<S> {
    pub fn new(
        dashboard: Dashboard<S>,
        source: Arc<dyn FacilityDataSource>,
        settings: RuntimeSettings,
        logger: DynLogger,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::channel(settings.channel_capacity);
        let (command_tx, command_rx) = mpsc::channel(settings.channel_capacity);
        Self {
            dashboard,
            source,
            settings,
            logger,
            internal_tx,
            internal_rx,
            command_tx,
            command_rx,
            pending_retries: 0,
            pending_pulls: 0,
            graph_fetch_pending: false,
        }
    }

    pub fn command_sender(&self) -> mpsc::Sender<Command> {
        self.command_tx.clone()
    }

    pub fn dashboard(&self) -> &Dashboard<S> {
        &self.dashboard
    }

    /// Load graph and clusters, open the home scope and apply the initial entity
    /// snapshot.
    pub async fn bootstrap(&mut self) {
        self.dashboard.load_sources(self.source.as_ref()).await;
        match self.source.fetch_entities().await {
            Ok(snapshots) => {
                let report = self.dashboard.reconcile(snapshots);
                self.logger
                    .info(&format!("Initial snapshot: {} entities", report.created + report.updated));
            }
            Err(e) => self.logger.warn(&format!("Initial entity snapshot failed: {}", e)),
        }
    }

    /// Bootstrap, then process the feed until shutdown (or until drained when
    /// `exit_when_drained` is set). Returns the dashboard for inspection.
    ///
    /// A graph missing at startup is fetched again on every reconciliation tick;
    /// creations wait on the graph's readiness flag meanwhile.
    pub async fn run(mut self, mut feed: mpsc::Receiver<FeedEvent>) -> ApplicationResult<Dashboard<S>> {
        let mut graph_ready = self.dashboard.graph().subscribe();
        self.bootstrap().await;

        let period = self.settings.reconcile_interval.max(Duration::from_millis(1));
        let mut reconcile = interval_at(Instant::now() + period, period);
        reconcile.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut feed_open = true;
        let mut awaiting_graph = true;

        loop {
            tokio::select! {
                event = feed.recv(), if feed_open => {
                    match event {
                        Some(event) => {
                            let effects = self.dashboard.handle_event(event, Instant::now());
                            self.apply(effects);
                        }
                        None => {
                            feed_open = false;
                            self.logger.info("Feed closed");
                        }
                    }
                }

                loaded = async { graph_ready.wait_for(|ready| *ready).await.is_ok() }, if awaiting_graph => {
                    awaiting_graph = false;
                    if loaded {
                        let effects = self.dashboard.graph_ready();
                        self.apply(effects);
                    }
                }

                Some(message) = self.internal_rx.recv() => {
                    self.on_internal(message);
                }

                Some(command) = self.command_rx.recv() => {
                    if !self.on_command(command) {
                        break;
                    }
                }

                _ = reconcile.tick() => {
                    self.dashboard.sweep(Instant::now());
                    if !self.dashboard.graph().is_loaded() {
                        self.spawn_graph_fetch();
                    }
                    self.spawn_pull();
                }
            }

            if self.settings.exit_when_drained && !feed_open && self.is_drained() {
                break;
            }
        }

        Ok(self.dashboard)
    }

    fn is_drained(&self) -> bool {
        self.dashboard.is_idle()
            && self.dashboard.held_creations() == 0
            && self.pending_retries == 0
            && self.pending_pulls == 0
            && !self.graph_fetch_pending
    }

    fn on_internal(&mut self, message: Internal) {
        match message {
            Internal::StepDone { entity_id, ticket } => {
                let effects = self.dashboard.complete_step(&entity_id, ticket, Instant::now());
                self.apply(effects);
            }
            Internal::RetryCreate {
                id,
                location,
                status,
                attempt,
            } => {
                self.pending_retries = self.pending_retries.saturating_sub(1);
                let effects = self.dashboard.retry_create(id, location, status, attempt);
                self.apply(effects);
            }
            Internal::Pulled(result) => {
                self.pending_pulls = self.pending_pulls.saturating_sub(1);
                match result {
                    Ok(snapshots) => {
                        self.dashboard.reconcile(snapshots);
                    }
                    Err(e) => self.logger.warn(&format!("Reconciliation pull failed: {}", e)),
                }
            }
            Internal::GraphFetched(result) => {
                self.graph_fetch_pending = false;
                match result {
                    Ok(snapshot) => self.dashboard.install_graph(snapshot),
                    Err(e) => self.logger.warn(&format!("Facility graph still unavailable: {}", e)),
                }
            }
        }
    }

    /// Returns false on shutdown.
    fn on_command(&mut self, command: Command) -> bool {
        let result = match command {
            Command::EnterCluster(id) => self.dashboard.enter_cluster(&id),
            Command::ExitCluster => self.dashboard.exit_cluster(),
            Command::Refresh => Ok(vec![Effect::Reconcile]),
            Command::Reset => Ok(self.dashboard.reset()),
            Command::Shutdown => {
                self.logger.info("Shutting down");
                return false;
            }
        };
        match result {
            Ok(effects) => self.apply(effects),
            Err(e) => self.logger.warn(&e.to_string()),
        }
        true
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Schedule(order) => {
                    let tx = self.internal_tx.clone();
                    tokio::spawn(async move {
                        sleep(order.duration).await;
                        let _ = tx
                            .send(Internal::StepDone {
                                entity_id: order.entity_id,
                                ticket: order.ticket,
                            })
                            .await;
                    });
                }
                Effect::RetryCreate {
                    id,
                    location,
                    status,
                    attempt,
                } => {
                    self.pending_retries += 1;
                    let tx = self.internal_tx.clone();
                    let delay = self.settings.resolve_delay;
                    tokio::spawn(async move {
                        sleep(delay).await;
                        let _ = tx
                            .send(Internal::RetryCreate {
                                id,
                                location,
                                status,
                                attempt,
                            })
                            .await;
                    });
                }
                Effect::Reconcile => self.spawn_pull(),
            }
        }
    }

    fn spawn_graph_fetch(&mut self) {
        if self.graph_fetch_pending {
            return;
        }
        self.graph_fetch_pending = true;
        let tx = self.internal_tx.clone();
        let source = self.source.clone();
        tokio::spawn(async move {
            let result = source.fetch_graph().await;
            let _ = tx.send(Internal::GraphFetched(result)).await;
        });
    }

    fn spawn_pull(&mut self) {
        self.pending_pulls += 1;
        let tx = self.internal_tx.clone();
        let source = self.source.clone();
        tokio::spawn(async move {
            let result = source.fetch_entities().await;
            let _ = tx.send(Internal::Pulled(result)).await;
        });
    }
}
