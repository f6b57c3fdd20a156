//! # Engine Scenarios
//!
//! End-to-end reconciliation through [`ConsoleEngine::ingest`] using raw
//! feed frames.

use serde_json::json;
use shield_console::{
    hash_pair, verify_bundle, ActionStatus, ConsoleConfig, ConsoleEngine, ConsoleError,
    DispatchOutcome, GuardianScope, PathElement, ProofBundle,
};

fn engine() -> ConsoleEngine {
    ConsoleEngine::new(&ConsoleConfig::default()).expect("default config is valid")
}

fn frame(tag: &str, data: serde_json::Value) -> String {
    json!({ "type": tag, "data": data }).to_string()
}

fn threat(id: &str, severity: &str, guardian: &str, affected: &[&str]) -> String {
    frame(
        "threat_event",
        json!({
            "id": id,
            "timestamp": "2025-03-01T12:00:00Z",
            "severity": severity,
            "event_type": "brute_force",
            "source": "198.51.100.23",
            "guardian_id": guardian,
            "affected": affected,
        }),
    )
}

#[test]
fn test_critical_event_engages_active_defense() {
    let mut engine = engine();
    engine.ingest(&threat("e1", "critical", "g1", &["h1"])).unwrap();

    let snapshot = engine.snapshot();
    assert!(snapshot.active_defense);
    let g1 = snapshot.guardian("g1").expect("guardian g1");
    assert_eq!(g1.events, 1);
    assert!(g1.online);
    assert_eq!(snapshot.suggested_target(), Some("h1"));
}

#[test]
fn test_requested_then_result_leaves_one_record() {
    let mut engine = engine();
    engine
        .ingest(&frame(
            "offsec.action.requested",
            json!({
                "action_id": "a1",
                "action_type": "offsec.action.block_ip",
                "target": {"ip": "198.51.100.23"},
                "ts": "2025-03-01T12:00:01Z",
            }),
        ))
        .unwrap();
    assert_eq!(engine.snapshot().actions[0].status, ActionStatus::Requested);

    engine
        .ingest(&frame(
            "offsec.action.result",
            json!({
                "action_id": "a1",
                "action_type": "offsec.action.block_ip",
                "status": "applied",
                "ts": "2025-03-01T12:00:04Z",
            }),
        ))
        .unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.actions.len(), 1);
    let record = &snapshot.actions[0];
    assert_eq!(record.id, "a1");
    assert_eq!(record.status, ActionStatus::Applied);
    assert!(record.created_at.is_some());
    assert!(record.executed_at.is_some());
}

#[test]
fn test_left_sibling_bundle_verifies() {
    let (leaf, sibling) = ("1f", "2e");
    let root = hash_pair(sibling, leaf);
    let bundle = ProofBundle {
        leaf: leaf.to_string(),
        path: vec![PathElement::left(sibling)],
        root: root.clone(),
        anchor: None,
        receipt_id: None,
        event_type: None,
        ts: None,
    };

    let report = verify_bundle(&bundle).unwrap();
    assert!(report.valid);
    assert_eq!(report.computed_root, root);

    let mut mutated = bundle;
    mutated.leaf = "3d".to_string();
    assert!(!verify_bundle(&mutated).unwrap().valid);
}

#[test]
fn test_newest_mesh_root_is_retained() {
    let mut engine = engine();
    let announce = |root: &str, ts: &str| {
        frame("mesh.root_announce", json!({"from": "p1", "root": root, "ts": ts}))
    };
    engine.ingest(&announce("aa", "2025-03-01T12:00:00Z")).unwrap();
    engine.ingest(&announce("bb", "2025-03-01T12:05:00Z")).unwrap();
    // Late delivery of an older announcement
    engine.ingest(&announce("cc", "2025-03-01T12:01:00Z")).unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.mesh_roots.len(), 1);
    assert_eq!(snapshot.mesh_root("p1").unwrap().root, "bb");
}

#[test]
fn test_unknown_and_malformed_frames_are_contained() {
    let mut engine = engine();
    assert!(matches!(
        engine.ingest(&frame("guardian.heartbeat", json!({"id": "g1"}))).unwrap(),
        DispatchOutcome::Ignored { .. }
    ));
    assert!(matches!(
        engine.ingest("not json").unwrap(),
        DispatchOutcome::Dropped { .. }
    ));
    assert!(matches!(
        engine.ingest(&frame("offsec.action.result", json!({"action_id": "a1"}))).unwrap(),
        DispatchOutcome::Dropped { .. }
    ));

    let snapshot = engine.snapshot();
    assert!(snapshot.actions.is_empty());
    assert_eq!(snapshot.version, 0);
}

#[test]
fn test_scope_filters_operator_view() {
    let mut engine = engine();
    engine.ingest(&threat("e1", "low", "g1", &["h1"])).unwrap();
    engine.ingest(&threat("e2", "medium", "g2", &["h2"])).unwrap();
    engine.set_scope(GuardianScope::Only("g1".to_string()));

    let snapshot = engine.snapshot();
    let ids: Vec<&str> = snapshot.scoped_events().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["e1"]);
    assert_eq!(snapshot.suggested_target(), Some("h1"));
}

#[test]
fn test_disposed_engine_refuses_work() {
    let mut engine = engine();
    engine.dispose();
    assert!(matches!(
        engine.ingest(&threat("e1", "critical", "g1", &[])),
        Err(ConsoleError::Disposed)
    ));
    assert!(!engine.snapshot().active_defense);
}
