//! # Algorithms Module
//!
//! Pure functions: proof verification, action merge, guardian projection
//! and reconnect backoff.

pub mod action_merge;
pub mod backoff;
pub mod guardian_projection;
pub mod merkle_verifier;

pub use action_merge::{merge_action, ActionPatch};
pub use backoff::{backoff_delay, ReconnectTracker};
pub use guardian_projection::{
    action_in_scope, event_in_scope, project_guardians, receipt_in_scope, suggested_target,
};
pub use merkle_verifier::{
    build_merkle_path, check_anchor, compute_merkle_root, compute_root, hash_pair, verify_bundle,
    verify_proof,
};
