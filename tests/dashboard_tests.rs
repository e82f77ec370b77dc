use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::assert_err;
use transport_viewer::adapters::outbound::{InMemoryDataSource, SceneSurface};
use transport_viewer::application::{Dashboard, Effect};
use transport_viewer::domains::clustering::ClusterSnapshot;
use transport_viewer::domains::facility::{FacilityDataSource, GraphSnapshot, Position};
use transport_viewer::domains::logger::{DomainLogger, DynLogger};
use transport_viewer::domains::movement::{AnimationScheduler, EntitySnapshot, EntityStatus, FeedEvent};
use transport_viewer::domains::view::{ConnectionStatus, Scope, ViewController, ViewOptions};

#[derive(Default)]
struct Capture {
    messages: Mutex<Vec<String>>,
}

impl Capture {
    fn contains(&self, needle: &str) -> bool {
        self.messages.lock().unwrap().iter().any(|m| m.contains(needle))
    }

    fn count(&self, needle: &str) -> usize {
        self.messages.lock().unwrap().iter().filter(|m| m.contains(needle)).count()
    }
}

impl DomainLogger for Capture {
    fn debug(&self, msg: &str) { self.messages.lock().unwrap().push(format!("DEBUG:{}", msg)); }
    fn info(&self, msg: &str) { self.messages.lock().unwrap().push(format!("INFO:{}", msg)); }
    fn warn(&self, msg: &str) { self.messages.lock().unwrap().push(format!("WARN:{}", msg)); }
    fn error(&self, msg: &str) { self.messages.lock().unwrap().push(format!("ERR:{}", msg)); }
}

fn graph_snapshot() -> GraphSnapshot {
    serde_json::from_value(json!({
        "nodes": [
            { "id": "A", "x": 0.0, "y": 0.0 },
            { "id": "B", "x": 100.0, "y": 0.0 },
            { "id": "C", "x": 200.0, "y": 0.0 },
            { "id": "D", "x": 300.0, "y": 0.0 }
        ],
        "edges": [
            { "source": "A", "target": "B", "distance": 25.0 },
            { "source": "B", "target": "C", "distance": 30.0 }
        ]
    }))
    .unwrap()
}

fn cluster_snapshot() -> ClusterSnapshot {
    serde_json::from_value(json!({
        "clusters": {
            "X": { "name": "Acute Care", "center": [50.0, 50.0], "size": 2, "dominant_type": "Emergency", "departments": ["A", "B"] },
            "Y": { "name": "Theatres", "center": [250.0, 50.0], "size": 2, "dominant_type": "Surgery", "departments": ["C", "D"] }
        }
    }))
    .unwrap()
}

fn at(id: &str, location: &str, status: EntityStatus) -> EntitySnapshot {
    EntitySnapshot {
        id: id.to_string(),
        status,
        current_location: location.to_string(),
    }
}

fn path(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn moved(id: &str, ids: &[&str], durations: &[u64]) -> FeedEvent {
    FeedEvent::EntityMoved {
        id: id.to_string(),
        path: path(ids),
        durations: durations.to_vec(),
    }
}

async fn dashboard(clusters: Option<ClusterSnapshot>, capture: &Arc<Capture>) -> Dashboard<SceneSurface> {
    let logger: DynLogger = capture.clone();
    let source = InMemoryDataSource::new(graph_snapshot(), clusters, vec![at("T1", "A", EntityStatus::Active)]);
    let view = ViewController::new(SceneSurface::new(), ViewOptions::default());
    let mut dashboard = Dashboard::new(view, AnimationScheduler::default(), logger);
    dashboard.load_sources(&source).await;
    dashboard.reconcile(source.fetch_entities().await.unwrap());
    dashboard
}

fn scheduled(effects: &[Effect]) -> transport_viewer::domains::movement::StepOrder {
    match effects {
        [Effect::Schedule(order)] => order.clone(),
        other => panic!("expected one scheduled step, got {:?}", other),
    }
}

#[tokio::test]
async fn test_aggregate_move_is_one_cluster_step() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;
    assert_eq!(dashboard.scope(), &Scope::Aggregate);
    let now = Instant::now();

    let order = scheduled(&dashboard.handle_event(moved("T1", &["A", "B", "C"], &[500, 700]), now));
    assert_eq!(order.from, "X");
    assert_eq!(order.to, "Y");
    assert_eq!(order.duration, Duration::from_millis(1200));

    let transitions = dashboard.surface().transitions_for("T1");
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].from, Position::new(50.0, 50.0));
    assert_eq!(transitions[0].to, Position::new(250.0, 50.0));
    assert_eq!(transitions[0].duration_ms, 1200);

    assert!(dashboard.complete_step("T1", order.ticket, now + order.duration).is_empty());
    let entity = dashboard.entities().get("T1").unwrap();
    assert_eq!(entity.current_location, "Y");
    assert!(!entity.is_animating());
    let marker = dashboard.surface().marker("T1").unwrap();
    assert!(!marker.animating);
    assert_eq!(marker.position, Position::new(250.0, 50.0));
    assert!(dashboard.is_idle());
}

#[tokio::test]
async fn test_oversized_durations_are_scheduled_without_overflow() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;
    let now = Instant::now();

    let order = scheduled(&dashboard.handle_event(moved("T1", &["A", "B", "C"], &[u64::MAX, 5]), now));
    assert_eq!(order.to, "Y");
    assert_eq!(order.duration, Duration::from_millis(u64::MAX));

    assert_eq!(dashboard.sweep(now + Duration::from_secs(3600)), 0);
    assert!(dashboard.entities().get("T1").unwrap().is_animating());
}

#[tokio::test]
async fn test_reconciliation_leaves_animating_entity_alone() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;
    let now = Instant::now();
    let order = scheduled(&dashboard.handle_event(moved("T1", &["A", "C"], &[900]), now));

    let report = dashboard.reconcile(vec![at("T1", "A", EntityStatus::Idle), at("T2", "D", EntityStatus::Idle)]);

    assert_eq!(report.skipped_animating, 1);
    assert_eq!(report.created, 1);
    assert_eq!(dashboard.entities().get("T1").unwrap().current_location, "X");
    let marker = dashboard.surface().marker("T1").unwrap();
    assert!(marker.animating);
    assert_eq!(marker.position, Position::new(250.0, 50.0));
    assert_eq!(dashboard.surface().position_of("T2"), Some(Position::new(250.0, 50.0)));

    dashboard.complete_step("T1", order.ticket, now + order.duration);
    assert_eq!(dashboard.entities().get("T1").unwrap().current_location, "Y");
}

#[tokio::test]
async fn test_second_movement_is_rejected_and_logged() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;
    let now = Instant::now();

    let first = scheduled(&dashboard.handle_event(moved("T1", &["A", "C"], &[400]), now));
    assert!(dashboard.handle_event(moved("T1", &["C", "A"], &[400]), now).is_empty());
    assert!(capture.contains("WARN:Movement rejected"));

    dashboard.complete_step("T1", first.ticket, now + first.duration);
    assert_eq!(dashboard.entities().get("T1").unwrap().current_location, "Y");
    assert_eq!(dashboard.surface().transitions_for("T1").len(), 1);
}

#[tokio::test]
async fn test_single_cluster_movement_is_not_animated() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;

    assert!(dashboard.handle_event(moved("T1", &["A", "B"], &[400]), Instant::now()).is_empty());
    let entity = dashboard.entities().get("T1").unwrap();
    assert!(!entity.is_animating());
    assert_eq!(entity.current_location, "A");
    assert!(dashboard.surface().transitions.is_empty());
}

#[tokio::test]
async fn test_malformed_movement_is_dropped_at_debug() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;

    assert!(dashboard.handle_event(moved("T1", &["A"], &[]), Instant::now()).is_empty());
    assert!(dashboard.handle_event(moved("", &["A", "C"], &[]), Instant::now()).is_empty());
    assert_eq!(capture.count("DEBUG:Dropping event"), 2);
}

#[tokio::test]
async fn test_movement_for_unseen_entity_creates_it() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;

    scheduled(&dashboard.handle_event(moved("T9", &["D", "A"], &[]), Instant::now()));

    let entity = dashboard.entities().get("T9").unwrap();
    assert_eq!(entity.status, EntityStatus::Active);
    assert!(entity.is_animating());
    assert_eq!(entity.current_location, "Y");
}

#[tokio::test]
async fn test_disconnect_suspends_scheduling_until_reconnect() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;
    let now = Instant::now();

    assert!(dashboard.handle_event(FeedEvent::Disconnected, now).is_empty());
    assert_eq!(dashboard.connection(), ConnectionStatus::Disconnected);
    assert_eq!(dashboard.surface().status, ConnectionStatus::Disconnected);

    assert!(dashboard.handle_event(moved("T1", &["A", "C"], &[400]), now).is_empty());
    assert!(capture.contains("DEBUG:Feed disconnected"));

    assert_eq!(dashboard.handle_event(FeedEvent::Connected, now), vec![Effect::Reconcile]);
    assert_eq!(dashboard.surface().status, ConnectionStatus::Connected);
    assert!(dashboard.handle_event(FeedEvent::Connected, now).is_empty());

    scheduled(&dashboard.handle_event(moved("T1", &["A", "C"], &[400]), now));
}

#[tokio::test]
async fn test_creation_at_unknown_location_retries_then_gives_up() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;
    let created = FeedEvent::EntityCreated {
        id: "T5".to_string(),
        current_location: "Q".to_string(),
        status: EntityStatus::Idle,
    };

    let effects = dashboard.handle_event(created, Instant::now());
    assert_eq!(
        effects,
        vec![Effect::RetryCreate {
            id: "T5".to_string(),
            location: "Q".to_string(),
            status: EntityStatus::Idle,
            attempt: 1,
        }]
    );

    let effects = dashboard.retry_create("T5".to_string(), "Q".to_string(), EntityStatus::Idle, 5);
    assert!(effects.is_empty());
    assert!(capture.contains("ERR:Giving up on T5"));
    assert!(!dashboard.entities().contains("T5"));
}

#[tokio::test]
async fn test_creation_before_graph_load_is_held_until_ready() {
    let capture = Arc::new(Capture::default());
    let logger: DynLogger = capture.clone();
    let view = ViewController::new(SceneSurface::new(), ViewOptions::default());
    let mut dashboard = Dashboard::new(view, AnimationScheduler::default(), logger);
    let mut ready = dashboard.graph().subscribe();

    let created = FeedEvent::EntityCreated {
        id: "T7".to_string(),
        current_location: "B".to_string(),
        status: EntityStatus::Idle,
    };
    assert!(dashboard.handle_event(created, Instant::now()).is_empty());
    assert_eq!(dashboard.held_creations(), 1);
    assert!(!dashboard.entities().contains("T7"));
    assert!(capture.contains("DEBUG:Facility graph not loaded; holding creation of T7"));

    dashboard.install_graph(graph_snapshot());
    assert!(*ready.wait_for(|loaded| *loaded).await.unwrap());

    assert!(dashboard.graph_ready().is_empty());
    assert_eq!(dashboard.held_creations(), 0);
    assert!(dashboard.entities().contains("T7"));
    assert_eq!(dashboard.surface().position_of("T7"), Some(Position::new(100.0, 0.0)));
    assert!(capture.contains("INFO:Facility graph ready; applying 1 held creations"));
}

#[tokio::test]
async fn test_creation_places_marker_in_current_scope() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;
    let created = FeedEvent::EntityCreated {
        id: "Sim_Transporter_3".to_string(),
        current_location: "D".to_string(),
        status: EntityStatus::Idle,
    };

    assert!(dashboard.handle_event(created, Instant::now()).is_empty());
    let marker = dashboard.surface().marker("Sim_Transporter_3").unwrap();
    assert_eq!(marker.position, Position::new(250.0, 50.0));
    assert_eq!(marker.label, "T3");
    assert!(capture.contains("INFO:New entity Sim_Transporter_3"));
}

#[tokio::test]
async fn test_detail_scope_filters_to_members() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;

    assert_eq!(dashboard.enter_cluster("X").unwrap(), vec![Effect::Reconcile]);
    assert_eq!(dashboard.scope(), &Scope::Detail("X".to_string()));
    assert_eq!(dashboard.surface().caption, "Viewing: Acute Care");

    let order = scheduled(&dashboard.handle_event(moved("T1", &["A", "B", "C"], &[500, 700]), Instant::now()));
    assert_eq!(order.to, "B");
    assert_eq!(order.target, Position::new(100.0, 0.0));
    assert_eq!(order.duration, Duration::from_millis(500));

    assert_err!(dashboard.enter_cluster("nope"));
    assert_eq!(dashboard.exit_cluster().unwrap(), vec![Effect::Reconcile]);
    assert_eq!(dashboard.scope(), &Scope::Aggregate);
}

#[tokio::test]
async fn test_without_clusters_leaf_path_is_animated_as_is() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(None, &capture).await;
    assert_eq!(dashboard.scope(), &Scope::FullDetail);
    assert_eq!(capture.count("falling back"), 1);
    let now = Instant::now();

    let first = scheduled(&dashboard.handle_event(moved("T1", &["A", "B", "C"], &[500]), now));
    assert_eq!(first.to, "B");
    let second = scheduled(&dashboard.complete_step("T1", first.ticket, now));
    assert_eq!(second.to, "C");
    assert_eq!(second.duration, Duration::from_millis(1000));

    assert_err!(dashboard.exit_cluster());
}

#[tokio::test]
async fn test_status_clock_summary_and_log_events() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;
    let now = Instant::now();

    dashboard.handle_event(
        FeedEvent::EntityStatusChanged {
            id: "T1".to_string(),
            status: EntityStatus::Idle,
        },
        now,
    );
    assert_eq!(dashboard.surface().marker("T1").unwrap().color, "#A9A9A9");

    dashboard.handle_event(FeedEvent::ClockTick { sim_time: 3725.0 }, now);
    assert_eq!(dashboard.surface().clock, "01:02:05");

    dashboard.handle_event(
        FeedEvent::RequestLifecycleChanged {
            request_id: Some("R1".to_string()),
            status: Some("completed".to_string()),
        },
        now,
    );
    assert_eq!(dashboard.surface().summary_refreshes, 1);

    dashboard.handle_event(
        FeedEvent::ActivityLog {
            message: "Transport R1 completed".to_string(),
        },
        now,
    );
    assert!(capture.contains("INFO:Transport R1 completed"));
}

#[tokio::test]
async fn test_watchdog_sweep_releases_entity() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;
    let now = Instant::now();
    let order = scheduled(&dashboard.handle_event(moved("T1", &["A", "C"], &[1000]), now));

    assert_eq!(dashboard.sweep(now + Duration::from_secs(2)), 0);
    assert_eq!(dashboard.sweep(now + Duration::from_secs(6)), 1);

    let entity = dashboard.entities().get("T1").unwrap();
    assert!(!entity.is_animating());
    assert_eq!(entity.current_location, "X");
    assert!(!dashboard.surface().marker("T1").unwrap().animating);
    assert!(capture.contains("WARN:Animation of T1 stalled"));

    assert!(dashboard.complete_step("T1", order.ticket, now + Duration::from_secs(7)).is_empty());
}

#[tokio::test]
async fn test_reset_discards_entities_and_stales_completions() {
    let capture = Arc::new(Capture::default());
    let mut dashboard = dashboard(Some(cluster_snapshot()), &capture).await;
    let now = Instant::now();
    let order = scheduled(&dashboard.handle_event(moved("T1", &["A", "C"], &[1000]), now));

    assert_eq!(dashboard.reset(), vec![Effect::Reconcile]);
    assert!(dashboard.entities().is_empty());
    assert!(dashboard.surface().entities.is_empty());
    assert!(dashboard.is_idle());

    assert!(dashboard.complete_step("T1", order.ticket, now + order.duration).is_empty());
    assert!(capture.contains("DEBUG:Ignoring stale step completion for T1"));
}
