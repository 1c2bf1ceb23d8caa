//! # Finding Correlations - Integration Tests
//!
//! End-to-end tests that drive the public store surface:
//! upstream document -> index -> graph builder -> level state machine -> API
//!
//! These tests build small known correlation sets (or seeded fixtures),
//! push them through [`CorrelationStore`] as a UI container would, and check
//! node/edge counts, degrees, navigation history and error surfacing.
//!
//! Copyright (c) 2026 CIPS Corps. All rights reserved.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use finding_correlations::api::route_command;
use finding_correlations::colors::ColorProvider;
use finding_correlations::fixtures;
use finding_correlations::graph::{CorrelationGraphData, CorrelationLevel, GraphEvent, LevelKind};
use finding_correlations::index::{canonical_pair, FindingCorrelationIndex};
use finding_correlations::source::JsonFileSource;
use finding_correlations::store::{CorrelationStore, GraphEventOutcome};
use finding_correlations::{
    CorrelationError, CorrelationPair, CorrelationsConfig, Finding, FixtureConfig, GraphConfig,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory for test files. Returns the path.
fn create_test_dir(test_name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("finding-correlations-test")
        .join(test_name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create test dir");
    dir
}

fn cleanup_test_dir(dir: &PathBuf) {
    let _ = fs::remove_dir_all(dir);
}

/// F1:dns, F2:s3, F3:s3 with F1<->F2 and F1<->F3, both scored.
fn three_finding_index() -> FindingCorrelationIndex {
    FindingCorrelationIndex::from_parts(
        vec![
            Finding::new("F1", "dns"),
            Finding::new("F2", "s3"),
            Finding::new("F3", "s3"),
        ],
        vec![
            CorrelationPair::new("F1", "F2").with_score(0.35),
            CorrelationPair::new("F1", "F3").with_score(0.8),
        ],
    )
    .expect("fixture index")
}

fn three_finding_store() -> CorrelationStore {
    CorrelationStore::new(three_finding_index(), GraphConfig::default())
}

const THREE_FINDING_DOC: &str = r#"{
    "findings": [
        {"id": "F1", "log_type": "dns"},
        {"id": "F2", "log_type": "s3"},
        {"id": "F3", "log_type": "s3"}
    ],
    "correlations": [
        {"a": "F1", "b": "F2", "score": 0.35},
        {"a": "F3", "b": "F1", "score": 0.8}
    ]
}"#;

// ---------------------------------------------------------------------------
// Graph scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_all_findings_three_node_scenario() {
    let mut store = three_finding_store();
    let data = store.get_correlations_graph_data(None).unwrap();

    assert_eq!(data.level, LevelKind::AllFindings);
    assert_eq!(data.graph.nodes.len(), 3);
    assert_eq!(data.graph.edges.len(), 2);
    assert!(data.graph.edges.iter().any(|e| e.connects("F1", "F2")));
    assert!(data.graph.edges.iter().any(|e| e.connects("F1", "F3")));
    assert_eq!(data.graph.node("F1").unwrap().value, 2);
    assert_eq!(data.graph.node("F2").unwrap().value, 1);
    assert_eq!(data.graph.node("F3").unwrap().value, 1);
}

#[test]
fn test_drill_into_f1_scenario() {
    let mut store = three_finding_store();
    store.get_correlations_graph_data(None).unwrap();
    let outcome = store.handle_event(&GraphEvent::double_click("F1")).unwrap();
    let GraphEventOutcome::DrilledDown(data) = outcome else {
        panic!("double-click at AllFindings should drill down");
    };

    assert_eq!(data.level, LevelKind::Finding);
    let ids: HashSet<&str> = data.graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, HashSet::from(["F1", "F2", "F3"]));
    assert_eq!(data.graph.edges.len(), 2);
    for edge in &data.graph.edges {
        let score = edge.score.expect("scored edge").value;
        assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        assert!(edge.label.is_some());
    }
}

#[test]
fn test_level_transition_and_go_back() {
    let mut store = three_finding_store();
    let before = store.get_correlations_graph_data(None).unwrap();
    store.drill_down("F1").unwrap();
    assert_eq!(store.level(), &CorrelationLevel::finding("F1"));

    let restored = store.go_back().expect("history entry");
    assert_eq!(restored, before);
    assert_eq!(store.level().kind(), LevelKind::AllFindings);
    assert!(store.go_back().is_none());
}

#[test]
fn test_reset_idempotence() {
    let mut store = three_finding_store();
    store.get_correlations_graph_data(None).unwrap();
    store.drill_down("F2").unwrap();

    store.reset_correlations_level();
    let level_once = store.level().clone();
    let depth_once = store.history_len();
    store.reset_correlations_level();

    assert_eq!(store.level(), &level_once);
    assert_eq!(store.history_len(), depth_once);
    assert_eq!(store.level(), &CorrelationLevel::all_findings());
    assert_eq!(store.history_len(), 0);
}

#[test]
fn test_handlers_called_in_order_before_return() {
    let mut store = three_finding_store();
    let log = Rc::new(RefCell::new(Vec::new()));
    for tag in ["a", "b"] {
        let log = Rc::clone(&log);
        store.register_graph_update_handler(Box::new(move |g: &CorrelationGraphData| {
            log.borrow_mut().push(format!("{}:{:?}", tag, g.level));
        }));
    }
    let dropped = {
        let log = Rc::clone(&log);
        store.register_graph_update_handler(Box::new(move |_: &CorrelationGraphData| {
            log.borrow_mut().push("dropped".to_string());
        }))
    };
    assert!(store.unsubscribe(dropped));

    store.drill_down("F1").unwrap();
    assert_eq!(*log.borrow(), vec!["a:Finding".to_string(), "b:Finding".to_string()]);

    store.go_back();
    assert_eq!(log.borrow().len(), 4);
    assert_eq!(log.borrow()[3], "b:AllFindings");
}

// ---------------------------------------------------------------------------
// Fixture invariants
// ---------------------------------------------------------------------------

#[test]
fn test_fixture_index_invariants() {
    let config = FixtureConfig {
        correlation_count: 30,
        ..FixtureConfig::default()
    };
    let index = fixtures::generate(&config).unwrap();
    assert_eq!(index.correlation_count(), 30);

    for finding in index.findings() {
        let neighbors = index.get_correlated_finding_ids(&finding.id);
        assert!(!neighbors.contains(&finding.id), "self-correlation on {}", finding.id);
        for other in neighbors {
            assert!(
                index.get_correlated_finding_ids(other).contains(&finding.id),
                "{} -> {} is one-sided",
                finding.id,
                other
            );
            let other = index.get_finding(other).unwrap();
            assert_ne!(finding.log_type, other.log_type);
        }
    }

    // Same seed, same data.
    let again = fixtures::generate(&config).unwrap();
    assert_eq!(index.pairs(), again.pairs());
}

#[test]
fn test_fixture_graph_has_no_duplicate_edges() {
    let config = FixtureConfig {
        findings_per_log_type: 6,
        correlation_count: 80,
        ..FixtureConfig::default()
    };
    let mut store = CorrelationStore::new(fixtures::generate(&config).unwrap(), GraphConfig::default());
    let data = store.get_correlations_graph_data(None).unwrap();

    let mut seen = HashSet::new();
    for edge in &data.graph.edges {
        let (lo, hi) = canonical_pair(&edge.from, &edge.to);
        assert!(seen.insert((lo.to_string(), hi.to_string())), "duplicate edge {}", edge.id);
    }
    assert_eq!(data.graph.edges.len(), store.index().correlation_count());
}

#[test]
fn test_fixture_overcommit_rejected() {
    let config = FixtureConfig {
        log_types: vec!["dns".into(), "s3".into()],
        findings_per_log_type: 2,
        correlation_count: 5,
        ..FixtureConfig::default()
    };
    assert!(matches!(fixtures::generate(&config), Err(CorrelationError::Fixture(_))));
}

#[test]
fn test_palette_wraps_without_error() {
    let mut colors = ColorProvider::new();
    let palette = colors.palette_len();
    let assigned: Vec<String> = (0..palette + 2).map(|i| colors.get_color(&format!("type-{}", i))).collect();
    assert_eq!(assigned[0], assigned[palette]);
    assert_eq!(colors.get_color("type-1"), assigned[1]);
}

// ---------------------------------------------------------------------------
// Upstream refresh
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_refresh_from_json_document() {
    let dir = create_test_dir("refresh_ok");
    let path = dir.join("findings.json");
    fs::write(&path, THREE_FINDING_DOC).unwrap();

    let mut store = CorrelationStore::new(FindingCorrelationIndex::new(), GraphConfig::default());
    let data = store.refresh(&JsonFileSource::new(&path)).await.unwrap();
    assert_eq!(data.graph.nodes.len(), 3);
    assert_eq!(data.graph.edges.len(), 2);
    assert_eq!(data.graph.node("F1").unwrap().value, 2);

    cleanup_test_dir(&dir);
}

#[tokio::test]
async fn test_failed_refresh_keeps_working_graph() {
    let dir = create_test_dir("refresh_fail");
    let path = dir.join("findings.json");
    fs::write(&path, THREE_FINDING_DOC).unwrap();

    let source = JsonFileSource::new(&path);
    let mut store = CorrelationStore::new(FindingCorrelationIndex::new(), GraphConfig::default());
    let good = store.refresh(&source).await.unwrap();

    fs::write(&path, "{\"findings\": [oops").unwrap();
    let err = store.refresh(&source).await.unwrap_err();
    assert!(matches!(err, CorrelationError::UpstreamFetch(_)));
    assert_eq!(store.current_graph(), Some(&good));
    assert_eq!(store.index().finding_count(), 3);

    cleanup_test_dir(&dir);
}

#[tokio::test]
async fn test_configured_window_limits_refresh() {
    let dir = create_test_dir("refresh_window");
    let path = dir.join("findings.json");
    let doc = r#"{
        "findings": [
            {"id": "old", "log_type": "dns", "timestamp": "2025-12-31T23:59:59Z"},
            {"id": "in_a", "log_type": "dns", "timestamp": "2026-01-01T00:00:00Z"},
            {"id": "in_b", "log_type": "s3", "timestamp": "2026-01-01T06:00:00Z"}
        ],
        "correlations": [{"a": "old", "b": "in_b"}, {"a": "in_a", "b": "in_b"}]
    }"#;
    fs::write(&path, doc).unwrap();

    let mut config = CorrelationsConfig::default();
    config.window.start = "2026-01-01T00:00:00Z".parse().ok();
    config.window.end = "2026-01-02T00:00:00Z".parse().ok();
    config.validate().unwrap();
    let mut store = CorrelationStore::from_config(FindingCorrelationIndex::new(), &config).unwrap();

    let data = store.refresh(&JsonFileSource::new(&path)).await.unwrap();
    let ids: HashSet<&str> = data.graph.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, HashSet::from(["in_a", "in_b"]));
    assert_eq!(data.graph.edges.len(), 1);

    cleanup_test_dir(&dir);
}

#[test]
fn test_stale_fetch_loses_to_reset() {
    let mut store = three_finding_store();
    let slow = store.begin_fetch();
    store.reset_correlations_level();
    let fresh = store.begin_fetch();

    let result = store.apply_fetch(slow, FindingCorrelationIndex::new());
    assert!(matches!(result, Err(CorrelationError::StaleFetch { .. })));
    assert_eq!(store.index().finding_count(), 3);

    assert!(store.apply_fetch(fresh, three_finding_index()).is_ok());
}

// ---------------------------------------------------------------------------
// API surface
// ---------------------------------------------------------------------------

#[test]
fn test_api_session() {
    let mut store = three_finding_store();

    let graph = route_command(&mut store, "graph", serde_json::Value::Null);
    assert!(graph.ok, "{}", graph.message);

    let drill = route_command(&mut store, "event", serde_json::json!({"event": "double_click", "nodes": ["F1"]}));
    assert!(drill.ok, "{}", drill.message);
    assert_eq!(drill.data["outcome"], "drilled_down");

    let detail = route_command(&mut store, "event", serde_json::json!({"event": "double_click", "nodes": ["F3"]}));
    assert_eq!(detail.data["outcome"], "finding_detail");
    assert_eq!(detail.data["data"]["finding"]["id"], "F3");

    let filters = route_command(&mut store, "set_filters", serde_json::json!({}));
    assert!(!filters.ok);

    let reset = route_command(&mut store, "reset", serde_json::Value::Null);
    assert!(reset.ok);
    assert_eq!(reset.data["graph"]["edges"].as_array().unwrap().len(), 2);

    let rule = serde_json::json!({
        "name": "dns then s3",
        "fields": [
            {"log_type": "dns", "conditions": [{"name": "dns.question.name", "value": "evil.example", "condition": "AND"}]},
            {"log_type": "s3", "conditions": [{"name": "aws.s3.bucket", "value": "exfil", "condition": "OR"}]}
        ]
    });
    assert!(route_command(&mut store, "create_rule", rule).ok);
    let listed = route_command(&mut store, "list_rules", serde_json::Value::Null);
    assert_eq!(listed.data.as_array().unwrap().len(), 1);
}
