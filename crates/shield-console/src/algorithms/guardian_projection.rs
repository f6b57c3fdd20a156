//! # Guardian Projection
//!
//! Derives the guardian view from the stored collections. Nothing here is
//! state: counters come from the records every time.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{ActionRecord, Guardian, GuardianScope, Receipt, ThreatEvent};

/// Project guardians from `known` ids and the current records.
///
/// `known` carries ids seen earlier in the session whose records may since
/// have been evicted; they stay listed with zero counters. Ids present on
/// records are always included.
pub fn project_guardians<'a>(
    known: &BTreeSet<String>,
    events: impl IntoIterator<Item = &'a ThreatEvent>,
    actions: impl IntoIterator<Item = &'a ActionRecord>,
    receipts: impl IntoIterator<Item = &'a Receipt>,
) -> Vec<Guardian> {
    let mut view: BTreeMap<&str, Guardian> = known
        .iter()
        .map(|id| (id.as_str(), Guardian::new(id.clone())))
        .collect();

    for event in events {
        if let Some(id) = event.guardian_id.as_deref() {
            let g = view.entry(id).or_insert_with(|| Guardian::new(id));
            g.events += 1;
            g.tags.extend(event.guardian_tags.iter().cloned());
            g.observe(Some(event.timestamp));
        }
    }

    for action in actions {
        if let Some(id) = action.guardian_id.as_deref() {
            let g = view.entry(id).or_insert_with(|| Guardian::new(id));
            g.actions += 1;
            g.tags.extend(action.guardian_tags.iter().cloned());
            g.observe(action.last_activity());
        }
    }

    for receipt in receipts {
        if let Some(id) = receipt.attributed_guardian() {
            let g = view.entry(id).or_insert_with(|| Guardian::new(id));
            g.receipts += 1;
            g.observe(receipt.issued_at());
        }
    }

    view.into_values().collect()
}

/// Event scope: attributed to the guardian, or naming it as affected.
pub fn event_in_scope(scope: &GuardianScope, event: &ThreatEvent) -> bool {
    match scope {
        GuardianScope::All => true,
        GuardianScope::Only(id) => {
            event.guardian_id.as_deref() == Some(id.as_str()) || event.affected.contains(id)
        }
    }
}

pub fn action_in_scope(scope: &GuardianScope, action: &ActionRecord) -> bool {
    scope.admits(action.guardian_id.as_deref())
}

pub fn receipt_in_scope(scope: &GuardianScope, receipt: &Receipt) -> bool {
    scope.admits(receipt.attributed_guardian())
}

/// First affected target of the newest in-scope event that has one.
///
/// `events` must be ordered newest first.
pub fn suggested_target<'a>(
    scope: &GuardianScope,
    events: impl IntoIterator<Item = &'a ThreatEvent>,
) -> Option<&'a str> {
    events
        .into_iter()
        .filter(|e| event_in_scope(scope, e))
        .find_map(|e| e.affected.first().map(String::as_str))
}
