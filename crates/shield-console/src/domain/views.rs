//! # Read-only Views
//!
//! What the presentation layer consumes: snapshots, change notices and
//! inspected mesh proofs.

use serde::{Deserialize, Serialize};

use super::entities::{
    ActionRecord, AnchorEvent, Guardian, MeshProofReceived, MeshRootAnnounce, Receipt, ThreatEvent,
};
use super::value_objects::{ConnectionState, GuardianScope, ProofBundle, VerificationReport};
use crate::algorithms::guardian_projection::{
    action_in_scope, event_in_scope, receipt_in_scope, suggested_target,
};

/// Collection or flag touched by a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Event,
    Action,
    Receipt,
    Anchor,
    MeshRoot,
    MeshProof,
    CurrentRoot,
    ActiveDefense,
    Connection,
    Scope,
}

/// Broadcast after every applied mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeNotice {
    /// Store version after the mutation.
    pub version: u64,
    pub kind: ChangeKind,
}

/// Point-in-time copy of the console state. Collections are newest first.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConsoleSnapshot {
    pub version: u64,
    pub connection: ConnectionState,
    pub active_defense: bool,
    pub current_root: Option<String>,
    pub last_anchor: Option<AnchorEvent>,
    pub scope: GuardianScope,
    pub events: Vec<ThreatEvent>,
    pub actions: Vec<ActionRecord>,
    pub receipts: Vec<Receipt>,
    /// Sorted by guardian id.
    pub guardians: Vec<Guardian>,
    /// Latest announcement per peer, sorted by peer id.
    pub mesh_roots: Vec<MeshRootAnnounce>,
    pub mesh_proofs: Vec<MeshProofReceived>,
}

impl ConsoleSnapshot {
    /// Events inside the snapshot's scope.
    pub fn scoped_events(&self) -> impl Iterator<Item = &ThreatEvent> {
        self.events.iter().filter(|e| event_in_scope(&self.scope, e))
    }

    /// Actions inside the snapshot's scope.
    pub fn scoped_actions(&self) -> impl Iterator<Item = &ActionRecord> {
        self.actions.iter().filter(|a| action_in_scope(&self.scope, a))
    }

    /// Receipts inside the snapshot's scope.
    pub fn scoped_receipts(&self) -> impl Iterator<Item = &Receipt> {
        self.receipts.iter().filter(|r| receipt_in_scope(&self.scope, r))
    }

    /// Target to prefill an operator action with.
    pub fn suggested_target(&self) -> Option<&str> {
        suggested_target(&self.scope, &self.events)
    }

    pub fn guardian(&self, id: &str) -> Option<&Guardian> {
        self.guardians.iter().find(|g| g.id == id)
    }

    pub fn mesh_root(&self, peer_id: &str) -> Option<&MeshRootAnnounce> {
        self.mesh_roots.iter().find(|r| r.peer_id == peer_id)
    }
}

/// A remote proof fetched for a pointer and verified locally.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InspectedProof {
    pub pointer: MeshProofReceived,
    pub bundle: ProofBundle,
    pub report: VerificationReport,
    /// Fetched bundle claims the root the pointer announced.
    pub root_matches_pointer: bool,
}

impl InspectedProof {
    /// Fold valid, anchor acceptable and root as announced.
    pub fn is_trusted(&self) -> bool {
        self.report.is_fully_verified() && self.root_matches_pointer
    }
}
