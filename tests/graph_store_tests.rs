use serde_json::json;
use transport_viewer::adapters::outbound::InMemoryDataSource;
use transport_viewer::domains::facility::{FacilityGraph, GraphSnapshot, Position};

fn snapshot() -> GraphSnapshot {
    serde_json::from_value(json!({
        "nodes": [
            { "id": "A", "x": 0.0, "y": 0.0 },
            { "id": "B", "x": 100.0, "y": 0.0 },
            { "id": "C", "x": 200.0, "y": 0.0 },
            { "id": "D", "x": 300.0, "y": 0.0 }
        ],
        "edges": [
            { "source": "A", "target": "B", "distance": 25.0 },
            { "source": "B", "target": "C", "distance": 30.0 },
            { "source": "C", "target": "D", "distance": 10.0 },
            { "source": "D", "target": "ghost", "distance": 1.0 }
        ]
    }))
    .unwrap()
}

#[test]
fn test_install_indexes_nodes_and_skips_dangling_edges() {
    let mut graph = FacilityGraph::new();
    let report = graph.install(snapshot());

    assert_eq!(report.nodes, 4);
    assert_eq!(report.edges, 3);
    assert_eq!(report.skipped_edges, 1);
    assert_eq!(graph.position("C"), Some(Position::new(200.0, 0.0)));
    assert!(graph.contains("A"));
}

#[test]
fn test_unknown_position_is_not_found() {
    let mut graph = FacilityGraph::new();
    assert_eq!(graph.position("A"), None);

    graph.install(snapshot());
    assert_eq!(graph.position("nowhere"), None);
    assert!(graph.node("nowhere").is_none());
}

#[test]
fn test_duplicate_node_ids_keep_the_last_position() {
    let mut graph = FacilityGraph::new();
    let mut snap = snapshot();
    snap.nodes.push(serde_json::from_value(json!({ "id": "A", "x": 5.0, "y": 6.0 })).unwrap());

    let report = graph.install(snap);
    assert_eq!(report.nodes, 4);
    assert_eq!(graph.position("A"), Some(Position::new(5.0, 6.0)));
}

#[test]
fn test_subgraph_is_induced_by_members() {
    let mut graph = FacilityGraph::new();
    graph.install(snapshot());

    let members = vec!["A".to_string(), "B".to_string(), "D".to_string()];
    let (nodes, edges) = graph.subgraph(&members);

    let mut ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["A", "B", "D"]);
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].2, 25.0);
}

#[tokio::test]
async fn test_readiness_is_signalled_to_subscribers() {
    let mut graph = FacilityGraph::new();
    let mut ready = graph.subscribe();
    assert!(!graph.is_loaded());

    let waiter = tokio::spawn(async move { ready.wait_for(|loaded| *loaded).await.is_ok() });

    let source = InMemoryDataSource::new(snapshot(), None, Vec::new());
    let report = graph.load(&source).await.unwrap();

    assert_eq!(report.nodes, 4);
    assert!(graph.is_loaded());
    assert!(waiter.await.unwrap());
}

#[tokio::test]
async fn test_reload_replaces_content() {
    let mut graph = FacilityGraph::new();
    graph.install(snapshot());

    let smaller: GraphSnapshot = serde_json::from_value(json!({ "nodes": [{ "id": "Z", "x": 1.0, "y": 1.0 }] })).unwrap();
    let report = graph.install(smaller);

    assert_eq!(report.nodes, 1);
    assert_eq!(graph.node_count(), 1);
    assert!(!graph.contains("A"));
    assert_eq!(graph.edges().count(), 0);
}
