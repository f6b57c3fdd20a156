//! # Domain Invariants
//!
//! Retention constants and the rules the store must keep true.

use std::collections::HashSet;

use super::entities::ActionRecord;

/// Threat events retained.
pub const DEFAULT_EVENT_CAPACITY: usize = 50;

/// Action records retained.
pub const DEFAULT_ACTION_CAPACITY: usize = 50;

/// Receipts retained.
pub const DEFAULT_RECEIPT_CAPACITY: usize = 50;

/// Mesh proof pointers retained.
pub const DEFAULT_MESH_PROOF_CAPACITY: usize = 100;

/// Root of an empty tree: 32 zero bytes in hex.
pub const EMPTY_ROOT: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Invariant: action identity is unique within the store.
pub fn invariant_unique_actions<'a>(actions: impl IntoIterator<Item = &'a ActionRecord>) -> bool {
    let mut seen = HashSet::new();
    actions.into_iter().all(|a| seen.insert(a.id.as_str()))
}

/// Invariant: a buffer never holds more than its capacity.
pub fn invariant_within_capacity(len: usize, capacity: usize) -> bool {
    len <= capacity
}
