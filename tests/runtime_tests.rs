use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use transport_viewer::adapters::outbound::{init_noop_logger, InMemoryDataSource, SceneSurface};
use transport_viewer::application::{Command, Dashboard, DashboardRuntime, RuntimeSettings};
use transport_viewer::Config;
use transport_viewer::domains::clustering::ClusterSnapshot;
use transport_viewer::domains::facility::{GraphSnapshot, Position};
use transport_viewer::domains::movement::{AnimationScheduler, EntitySnapshot, EntityStatus, FeedEvent};
use transport_viewer::domains::view::{Scope, ViewController, ViewOptions};

fn graph() -> GraphSnapshot {
    serde_json::from_value(json!({
        "nodes": [
            { "id": "A", "x": 0.0, "y": 0.0 },
            { "id": "B", "x": 100.0, "y": 0.0 },
            { "id": "C", "x": 200.0, "y": 0.0 }
        ],
        "edges": [
            { "source": "A", "target": "B", "distance": 5.0 },
            { "source": "B", "target": "C", "distance": 7.0 }
        ]
    }))
    .unwrap()
}

fn clusters() -> ClusterSnapshot {
    serde_json::from_value(json!({
        "clusters": {
            "X": { "name": "North", "center": [50.0, 10.0], "size": 2, "departments": ["A", "B"] },
            "Y": { "name": "South", "center": [200.0, 90.0], "size": 1, "departments": ["C"] }
        }
    }))
    .unwrap()
}

fn source(entities: Vec<EntitySnapshot>) -> Arc<InMemoryDataSource> {
    Arc::new(InMemoryDataSource::new(graph(), Some(clusters()), entities))
}

fn runtime(source: Arc<InMemoryDataSource>, settings: RuntimeSettings) -> DashboardRuntime<SceneSurface> {
    let logger = init_noop_logger();
    let view = ViewController::new(SceneSurface::new(), ViewOptions::default());
    let dashboard = Dashboard::new(view, AnimationScheduler::default(), logger.clone());
    DashboardRuntime::new(dashboard, source, settings, logger)
}

fn t_at_a() -> Vec<EntitySnapshot> {
    vec![EntitySnapshot {
        id: "T".to_string(),
        status: EntityStatus::Active,
        current_location: "A".to_string(),
    }]
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_aggregate_animation() {
    let runtime = runtime(source(t_at_a()), RuntimeSettings::default());
    let (tx, rx) = mpsc::channel(8);
    tx.send(FeedEvent::EntityMoved {
        id: "T".to_string(),
        path: vec!["A".to_string(), "B".to_string(), "C".to_string()],
        durations: vec![500, 700],
    })
    .await
    .unwrap();
    drop(tx);

    let started = Instant::now();
    let dashboard = runtime.run(rx).await.unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1200) && elapsed < Duration::from_millis(1300));
    let transitions = dashboard.surface().transitions_for("T");
    assert_eq!(transitions.len(), 1);
    assert_eq!(transitions[0].from, Position::new(50.0, 10.0));
    assert_eq!(transitions[0].to, Position::new(200.0, 90.0));
    assert_eq!(transitions[0].duration_ms, 1200);

    let entity = dashboard.entities().get("T").unwrap();
    assert_eq!(entity.current_location, "Y");
    assert!(!entity.is_animating());
    assert_eq!(dashboard.surface().position_of("T"), Some(Position::new(200.0, 90.0)));
}

#[tokio::test(start_paused = true)]
async fn test_drained_feed_with_nothing_in_flight_exits_immediately() {
    let runtime = runtime(source(t_at_a()), RuntimeSettings::default());
    let (tx, rx) = mpsc::channel::<FeedEvent>(1);
    drop(tx);

    let started = Instant::now();
    let dashboard = runtime.run(rx).await.unwrap();

    assert!(started.elapsed() < RuntimeSettings::default().reconcile_interval);
    assert_eq!(dashboard.entities().len(), 1);
    assert_eq!(dashboard.scope(), &Scope::Aggregate);
}

#[tokio::test(start_paused = true)]
async fn test_creation_retries_until_location_resolves_or_gives_up() {
    let settings = RuntimeSettings {
        resolve_delay: Duration::from_millis(300),
        ..RuntimeSettings::default()
    };
    let runtime = runtime(source(Vec::new()), settings);
    let (tx, rx) = mpsc::channel(8);
    tx.send(FeedEvent::EntityCreated {
        id: "lost".to_string(),
        current_location: "nowhere".to_string(),
        status: EntityStatus::Idle,
    })
    .await
    .unwrap();
    tx.send(FeedEvent::EntityCreated {
        id: "found".to_string(),
        current_location: "C".to_string(),
        status: EntityStatus::Idle,
    })
    .await
    .unwrap();
    drop(tx);

    let started = Instant::now();
    let dashboard = runtime.run(rx).await.unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(5 * 300) && elapsed < Duration::from_millis(6 * 300));
    assert!(!dashboard.entities().contains("lost"));
    assert!(dashboard.entities().contains("found"));
    assert_eq!(dashboard.surface().position_of("found"), Some(Position::new(200.0, 90.0)));
}

#[tokio::test(start_paused = true)]
async fn test_commands_switch_scope_and_shut_down() {
    let settings = RuntimeSettings {
        exit_when_drained: false,
        ..RuntimeSettings::default()
    };
    let runtime = runtime(source(t_at_a()), settings);
    let commands = runtime.command_sender();
    let (_tx, rx) = mpsc::channel::<FeedEvent>(1);

    commands.send(Command::EnterCluster("X".to_string())).await.unwrap();
    commands.send(Command::Shutdown).await.unwrap();

    let dashboard = runtime.run(rx).await.unwrap();
    assert_eq!(dashboard.scope(), &Scope::Detail("X".to_string()));
    assert_eq!(dashboard.surface().caption, "Viewing: North");
    assert_eq!(dashboard.surface().position_of("T"), Some(Position::new(0.0, 0.0)));
}

#[tokio::test(start_paused = true)]
async fn test_periodic_reconciliation_picks_up_new_snapshot() {
    let source = source(t_at_a());
    let runtime = runtime(source.clone(), RuntimeSettings::default());
    let (tx, rx) = mpsc::channel::<FeedEvent>(1);

    let commands = runtime.command_sender();
    let feed_source = source.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        feed_source.set_entities(vec![EntitySnapshot {
            id: "T".to_string(),
            status: EntityStatus::Idle,
            current_location: "C".to_string(),
        }]);
        tokio::time::sleep(Duration::from_millis(4500)).await;
        drop(tx);
        let _ = commands.send(Command::Shutdown).await;
    });

    let dashboard = runtime.run(rx).await.unwrap();
    let entity = dashboard.entities().get("T").unwrap();
    assert_eq!(entity.current_location, "C");
    assert_eq!(entity.status, EntityStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_creation_waits_for_a_graph_that_loads_late() {
    let late = Arc::new(InMemoryDataSource::without_graph(Some(clusters()), Vec::new()));
    let settings = RuntimeSettings {
        reconcile_interval: Duration::from_secs(2),
        ..RuntimeSettings::default()
    };
    let runtime = runtime(late.clone(), settings);
    let (tx, rx) = mpsc::channel(8);
    tx.send(FeedEvent::EntityCreated {
        id: "T2".to_string(),
        current_location: "A".to_string(),
        status: EntityStatus::Idle,
    })
    .await
    .unwrap();
    drop(tx);

    let loader = late.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        loader.set_graph(graph());
    });

    let started = Instant::now();
    let dashboard = runtime.run(rx).await.unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_millis(2500));
    assert!(dashboard.graph().is_loaded());
    assert_eq!(dashboard.held_creations(), 0);
    assert!(dashboard.entities().contains("T2"));
    assert_eq!(dashboard.surface().position_of("T2"), Some(Position::new(50.0, 10.0)));
}

#[tokio::test(start_paused = true)]
async fn test_zero_reconcile_interval_is_clamped() {
    let mut config = Config::default();
    config.reconciliation.interval_ms = 0;
    let settings = RuntimeSettings::from_config(&config);
    assert_eq!(settings.reconcile_interval, Duration::from_millis(1));

    let runtime = runtime(source(t_at_a()), settings);
    let (tx, rx) = mpsc::channel::<FeedEvent>(1);
    drop(tx);
    let dashboard = runtime.run(rx).await.unwrap();
    assert_eq!(dashboard.entities().len(), 1);
}
