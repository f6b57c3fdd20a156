//! # Event Store
//!
//! Bounded, deduplicated collections of threat events, action records and
//! receipts, plus the console-wide flags derived from them.
//!
//! Every mutation bumps [`EventStore::version`]. The guardian projection is
//! memoized against that version.

use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::algorithms::{merge_action, project_guardians, ActionPatch};
use crate::config::ConsoleConfig;
use crate::domain::{ActionRecord, BoundedBuffer, Guardian, Receipt, ThreatEvent};

/// Outcome of applying an action patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionApplied {
    Inserted,
    Merged,
}

pub struct EventStore {
    events: BoundedBuffer<ThreatEvent>,
    actions: BoundedBuffer<ActionRecord>,
    receipts: BoundedBuffer<Receipt>,
    /// Guardian ids seen this session, including evicted ones.
    seen_guardians: BTreeSet<String>,
    active_defense: bool,
    current_root: Option<String>,
    version: u64,
    guardian_cache: Option<(u64, Vec<Guardian>)>,
}

impl EventStore {
    pub fn new(config: &ConsoleConfig) -> Self {
        Self {
            events: BoundedBuffer::new(config.event_capacity),
            actions: BoundedBuffer::new(config.action_capacity),
            receipts: BoundedBuffer::new(config.receipt_capacity),
            seen_guardians: BTreeSet::new(),
            active_defense: false,
            current_root: None,
            version: 0,
            guardian_cache: None,
        }
    }

    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Bump the version for a mutation held outside the store.
    pub fn touch(&mut self) -> u64 {
        self.bump()
    }

    fn see(&mut self, guardian_id: Option<&str>) {
        if let Some(id) = guardian_id {
            if !self.seen_guardians.contains(id) {
                self.seen_guardians.insert(id.to_string());
            }
        }
    }

    /// Prepend a threat event. Returns true when it raised active defense.
    pub fn record_event(&mut self, event: ThreatEvent) -> bool {
        let escalates = event.severity.escalates() && !self.active_defense;
        if escalates {
            info!(
                event_id = %event.id,
                source = %event.source,
                "[shield] Critical event, active defense engaged"
            );
            self.active_defense = true;
        }
        self.see(event.guardian_id.as_deref());
        self.events.push_front(event);
        self.bump();
        escalates
    }

    /// Merge by id in place, or insert at the front.
    pub fn apply_action(&mut self, patch: ActionPatch) -> ActionApplied {
        self.see(patch.guardian_id.as_deref());
        let outcome = match self.actions.find_mut(|a| a.id == patch.id) {
            Some(existing) => {
                merge_action(existing, patch);
                ActionApplied::Merged
            }
            None => {
                debug!(action_id = %patch.id, "[shield] New action record");
                self.actions.push_front(patch.into_record());
                ActionApplied::Inserted
            }
        };
        self.bump();
        outcome
    }

    /// Prepend a live receipt.
    pub fn record_receipt(&mut self, receipt: Receipt) {
        self.see(receipt.attributed_guardian());
        self.receipts.push_front(receipt);
        self.bump();
    }

    /// Merge a fetched receipt listing (newest first) by identifier.
    ///
    /// Receipts already stored are skipped; the rest are inserted oldest
    /// first so the listing's newest entry ends up in front. Returns the
    /// number inserted.
    pub fn merge_receipt_snapshot(&mut self, receipts: Vec<Receipt>) -> usize {
        let mut inserted = 0;
        for receipt in receipts.into_iter().rev() {
            if self.receipts.contains_by(|r| r.same_receipt(&receipt)) {
                continue;
            }
            self.see(receipt.attributed_guardian());
            self.receipts.push_front(receipt);
            inserted += 1;
        }
        if inserted > 0 {
            self.bump();
        }
        inserted
    }

    /// Record the published root. Returns false when unchanged.
    pub fn set_current_root(&mut self, root: String) -> bool {
        if root.is_empty() || self.current_root.as_deref() == Some(root.as_str()) {
            return false;
        }
        self.current_root = Some(root);
        self.bump();
        true
    }

    /// Clear the active-defense flag. Returns false when already clear.
    pub fn reset_active_defense(&mut self) -> bool {
        if !self.active_defense {
            return false;
        }
        info!("[shield] Active defense cleared by operator");
        self.active_defense = false;
        self.bump();
        true
    }

    /// Guardian view, recomputed when the store changed since last call.
    pub fn guardians(&mut self) -> &[Guardian] {
        let stale = !matches!(&self.guardian_cache, Some((v, _)) if *v == self.version);
        if stale {
            let view = project_guardians(
                &self.seen_guardians,
                self.events.iter(),
                self.actions.iter(),
                self.receipts.iter(),
            );
            self.guardian_cache = Some((self.version, view));
        }
        match &self.guardian_cache {
            Some((_, view)) => view,
            None => &[],
        }
    }

    /// Receipt by `id` or `receipt_id`.
    pub fn find_receipt(&self, id: &str) -> Option<&Receipt> {
        self.receipts.find(|r| r.matches_id(id))
    }

    pub fn find_action(&self, id: &str) -> Option<&ActionRecord> {
        self.actions.find(|a| a.id == id)
    }

    pub fn events(&self) -> &BoundedBuffer<ThreatEvent> {
        &self.events
    }

    pub fn actions(&self) -> &BoundedBuffer<ActionRecord> {
        &self.actions
    }

    pub fn receipts(&self) -> &BoundedBuffer<Receipt> {
        &self.receipts
    }

    pub fn active_defense(&self) -> bool {
        self.active_defense
    }

    pub fn current_root(&self) -> Option<&str> {
        self.current_root.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        invariant_unique_actions, invariant_within_capacity, ActionStatus, Severity,
    };
    use chrono::{DateTime, Utc};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn store() -> EventStore {
        EventStore::new(&ConsoleConfig::for_testing())
    }

    fn event(id: &str, severity: Severity, guardian: Option<&str>) -> ThreatEvent {
        ThreatEvent {
            id: id.to_string(),
            timestamp: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
            severity,
            event_type: "brute_force".to_string(),
            source: "198.51.100.7".to_string(),
            source_host: None,
            source_role: None,
            guardian_id: guardian.map(str::to_string),
            guardian_tags: Vec::new(),
            description: String::new(),
            affected: Vec::new(),
            metadata: Default::default(),
        }
    }

    fn patch(id: &str, status: ActionStatus, guardian: Option<&str>) -> ActionPatch {
        ActionPatch {
            id: id.to_string(),
            action_type: "block_ip".to_string(),
            status,
            created_at: None,
            executed_at: None,
            guardian_id: guardian.map(str::to_string),
            guardian_tags: Vec::new(),
        }
    }

    fn receipt(id: &str) -> Receipt {
        Receipt {
            id: id.to_string(),
            receipt_id: None,
            hash: "ab".to_string(),
            merkle_path: None,
            merkle_root: None,
            ts: None,
            timestamp: None,
            event_type: None,
            action_id: None,
            guardian_id: None,
            agent_id: None,
        }
    }

    #[test]
    fn test_critical_event_engages_active_defense_once() {
        let mut store = store();
        assert!(!store.record_event(event("e0", Severity::High, None)));
        assert!(!store.active_defense());
        assert!(store.record_event(event("e1", Severity::Critical, None)));
        assert!(!store.record_event(event("e2", Severity::Critical, None)));
        assert!(!store.record_event(event("e3", Severity::Low, None)));
        assert!(store.active_defense());

        assert!(store.reset_active_defense());
        assert!(!store.active_defense());
        assert!(!store.reset_active_defense());
    }

    #[test]
    fn test_event_buffer_is_bounded() {
        let mut store = store();
        for i in 0..8 {
            store.record_event(event(&format!("e{i}"), Severity::Low, None));
        }
        let ids: Vec<&str> = store.events().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e7", "e6", "e5", "e4", "e3"]);
    }

    #[test]
    fn test_action_merge_keeps_position() {
        let mut store = store();
        store.apply_action(patch("a1", ActionStatus::Requested, None));
        store.apply_action(patch("a2", ActionStatus::Requested, None));
        assert_eq!(
            store.apply_action(patch("a1", ActionStatus::Applied, None)),
            ActionApplied::Merged
        );

        let ids: Vec<&str> = store.actions().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a1"]);
        assert_eq!(store.find_action("a1").unwrap().status, ActionStatus::Applied);
        assert!(invariant_unique_actions(store.actions().iter()));
    }

    #[test]
    fn test_receipt_snapshot_merges_by_identifier() {
        let mut store = store();
        store.record_receipt(receipt("r2"));

        let inserted = store.merge_receipt_snapshot(vec![receipt("r3"), receipt("r2"), receipt("r1")]);
        assert_eq!(inserted, 2);
        let ids: Vec<&str> = store.receipts().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r3", "r1", "r2"]);

        let before = store.version();
        assert_eq!(store.merge_receipt_snapshot(vec![receipt("r1")]), 0);
        assert_eq!(store.version(), before);
    }

    #[test]
    fn test_receipt_snapshot_matches_secondary_id() {
        let mut store = store();
        let mut live = receipt("r1");
        live.receipt_id = Some("rcpt-1".to_string());
        store.record_receipt(live);
        assert_eq!(store.merge_receipt_snapshot(vec![receipt("rcpt-1")]), 0);
        assert!(store.find_receipt("rcpt-1").is_some());
    }

    #[test]
    fn test_current_root_changes_bump_version() {
        let mut store = store();
        assert!(store.set_current_root("aa".to_string()));
        let v = store.version();
        assert!(!store.set_current_root("aa".to_string()));
        assert!(!store.set_current_root(String::new()));
        assert_eq!(store.version(), v);
        assert_eq!(store.current_root(), Some("aa"));
    }

    #[test]
    fn test_guardians_follow_store_contents() {
        let mut store = store();
        store.record_event(event("e1", Severity::Critical, Some("g1")));
        store.apply_action(patch("a1", ActionStatus::Requested, Some("g1")));
        {
            let g = store.guardians();
            assert_eq!(g.len(), 1);
            assert_eq!((g[0].events, g[0].actions), (1, 1));
        }

        // Evicting every g1 event drops its counter but keeps the guardian
        for i in 0..5 {
            store.record_event(event(&format!("x{i}"), Severity::Low, Some("g2")));
        }
        let g = store.guardians();
        assert_eq!(g.len(), 2);
        assert_eq!(g[0].id, "g1");
        assert_eq!(g[0].events, 0);
        assert_eq!(g[1].events, 5);
    }

    fn status_strategy() -> impl Strategy<Value = ActionStatus> {
        prop_oneof![
            Just(ActionStatus::Pending),
            Just(ActionStatus::Requested),
            Just(ActionStatus::Accepted),
            Just(ActionStatus::Applied),
            Just(ActionStatus::Executed),
            Just(ActionStatus::Failed),
            Just(ActionStatus::Denied),
        ]
    }

    proptest! {
        #[test]
        fn prop_last_processed_status_wins(
            updates in prop::collection::vec((0u8..8, status_strategy()), 1..60),
        ) {
            let mut store = EventStore::new(&ConsoleConfig::default());
            let mut last = HashMap::new();
            for (id, status) in updates {
                let id = format!("a{id}");
                store.apply_action(patch(&id, status.clone(), None));
                last.insert(id, status);
            }

            prop_assert!(invariant_unique_actions(store.actions().iter()));
            prop_assert!(invariant_within_capacity(
                store.actions().len(),
                store.actions().capacity()
            ));
            prop_assert_eq!(store.actions().len(), last.len());
            for (id, status) in &last {
                let record = store.find_action(id).expect("record kept");
                prop_assert_eq!(&record.status, status);
            }
        }
    }
}
