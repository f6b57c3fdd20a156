//! # Console Engine
//!
//! Owns the dispatcher, event store and mesh tracker, and applies every
//! mutation in the order it is handed in.
//!
//! Lifecycle: `new -> ingest* -> snapshot/subscribe -> dispose`. After
//! dispose every mutating call is refused and late fetch results are
//! discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::algorithms::{verify_bundle, ActionPatch};
use crate::application::connection::FeedEvent;
use crate::application::dispatcher::{DispatchOutcome, DispatchStats, Dispatcher};
use crate::application::event_store::EventStore;
use crate::application::mesh_tracker::{self, MeshTracker};
use crate::config::ConsoleConfig;
use crate::domain::{
    ChangeKind, ChangeNotice, ConnectionState, ConsoleError, ConsoleSnapshot, GuardianScope,
    InboundMessage, InspectedProof, MeshProofReceived, ProofBundle, Receipt, VerificationReport,
};

const NOTICE_BUFFER: usize = 256;

/// Shared liveness flag, checked before applying late results.
#[derive(Clone, Debug)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn is_live(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ConsoleEngine {
    dispatcher: Dispatcher,
    store: EventStore,
    mesh: MeshTracker,
    connection: ConnectionState,
    scope: GuardianScope,
    live: Arc<AtomicBool>,
    notices: broadcast::Sender<ChangeNotice>,
}

impl ConsoleEngine {
    /// Create an engine for a validated configuration.
    pub fn new(config: &ConsoleConfig) -> Result<Self, ConsoleError> {
        config.validate()?;
        let (notices, _) = broadcast::channel(NOTICE_BUFFER);
        Ok(Self {
            dispatcher: Dispatcher::new(),
            store: EventStore::new(config),
            mesh: MeshTracker::new(config.mesh_proof_capacity),
            connection: ConnectionState::Disconnected,
            scope: GuardianScope::All,
            live: Arc::new(AtomicBool::new(true)),
            notices,
        })
    }

    fn ensure_live(&self) -> Result<(), ConsoleError> {
        if self.is_live() {
            Ok(())
        } else {
            Err(ConsoleError::Disposed)
        }
    }

    fn notify(&self, kind: ChangeKind) {
        // No subscribers is not an error
        let _ = self.notices.send(ChangeNotice {
            version: self.store.version(),
            kind,
        });
    }

    /// Classify and apply one raw feed frame.
    pub fn ingest(&mut self, raw: &str) -> Result<DispatchOutcome, ConsoleError> {
        self.ensure_live()?;
        let outcome = self.dispatcher.classify(raw);
        if let DispatchOutcome::Routed(msg) = &outcome {
            self.apply(msg.clone());
        }
        Ok(outcome)
    }

    /// Apply an already decoded message. Returns false after dispose.
    pub fn apply(&mut self, msg: InboundMessage) -> bool {
        if !self.is_live() {
            return false;
        }

        let kind = match msg {
            InboundMessage::ThreatEvent(event) | InboundMessage::CapabilityDenied(event) => {
                if self.store.record_event(event) {
                    self.notify(ChangeKind::ActiveDefense);
                }
                ChangeKind::Event
            }
            InboundMessage::ActionUpdate(record) => {
                self.store.apply_action(ActionPatch::from(record));
                ChangeKind::Action
            }
            InboundMessage::ActionRequested(msg) => {
                self.store.apply_action(ActionPatch::from(msg));
                ChangeKind::Action
            }
            InboundMessage::ActionResult(msg) => {
                self.store.apply_action(ActionPatch::from(msg));
                ChangeKind::Action
            }
            InboundMessage::Receipt(receipt) => {
                self.store.record_receipt(receipt);
                ChangeKind::Receipt
            }
            InboundMessage::Anchor(anchor) => {
                self.mesh.record_anchor(anchor);
                self.store.touch();
                ChangeKind::Anchor
            }
            InboundMessage::MeshRootAnnounce(announce) => {
                if !self.mesh.record_root(announce) {
                    return true;
                }
                self.store.touch();
                ChangeKind::MeshRoot
            }
            InboundMessage::MeshProofReceived(pointer) => {
                self.mesh.record_pointer(pointer);
                self.store.touch();
                ChangeKind::MeshProof
            }
            InboundMessage::Unknown { .. } => return true,
        };
        self.notify(kind);
        true
    }

    /// React to a connection manager event.
    pub fn handle_feed_event(&mut self, event: FeedEvent) {
        if !self.is_live() {
            return;
        }
        let state = match event {
            FeedEvent::Message(raw) => {
                let _ = self.ingest(&raw);
                return;
            }
            FeedEvent::Connected => ConnectionState::Connected,
            FeedEvent::Disconnected { .. } => ConnectionState::Disconnected,
            FeedEvent::GaveUp { .. } => ConnectionState::Exhausted,
        };
        self.set_connection(state);
    }

    pub fn set_connection(&mut self, state: ConnectionState) {
        if self.connection != state {
            debug!(state = ?state, "[shield] Connection state changed");
            self.connection = state;
            self.notify(ChangeKind::Connection);
        }
    }

    /// Apply a fetched root. False after dispose or when unchanged.
    pub fn apply_current_root(&mut self, root: String) -> bool {
        if !self.is_live() || !self.store.set_current_root(root) {
            return false;
        }
        self.notify(ChangeKind::CurrentRoot);
        true
    }

    /// Merge a fetched receipt listing. False after dispose.
    pub fn apply_receipt_snapshot(&mut self, receipts: Vec<Receipt>) -> bool {
        if !self.is_live() {
            return false;
        }
        if self.store.merge_receipt_snapshot(receipts) > 0 {
            self.notify(ChangeKind::Receipt);
        }
        true
    }

    pub fn set_scope(&mut self, scope: GuardianScope) {
        if self.scope != scope {
            self.scope = scope;
            self.notify(ChangeKind::Scope);
        }
    }

    pub fn scope(&self) -> &GuardianScope {
        &self.scope
    }

    /// Operator reset of the active-defense indicator.
    pub fn reset_active_defense(&mut self) -> Result<bool, ConsoleError> {
        self.ensure_live()?;
        let cleared = self.store.reset_active_defense();
        if cleared {
            self.notify(ChangeKind::ActiveDefense);
        }
        Ok(cleared)
    }

    /// Read-only copy of the current state.
    pub fn snapshot(&mut self) -> ConsoleSnapshot {
        let guardians = self.store.guardians().to_vec();
        ConsoleSnapshot {
            version: self.store.version(),
            connection: self.connection,
            active_defense: self.store.active_defense(),
            current_root: self.store.current_root().map(str::to_string),
            last_anchor: self.mesh.anchor().cloned(),
            scope: self.scope.clone(),
            events: self.store.events().to_vec(),
            actions: self.store.actions().to_vec(),
            receipts: self.store.receipts().to_vec(),
            guardians,
            mesh_roots: self.mesh.roots().cloned().collect(),
            mesh_proofs: self.mesh.pointers().to_vec(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.notices.subscribe()
    }

    /// Sender side of the notices, for handles created before the loop runs.
    pub fn notice_sender(&self) -> broadcast::Sender<ChangeNotice> {
        self.notices.clone()
    }

    /// Portable bundle for a stored receipt.
    pub fn export_receipt_bundle(&self, id: &str) -> Result<ProofBundle, ConsoleError> {
        let receipt = self
            .store
            .find_receipt(id)
            .ok_or_else(|| ConsoleError::ReceiptNotFound(id.to_string()))?;
        Ok(ProofBundle::from_receipt(
            receipt,
            self.store.current_root(),
            self.mesh.anchor(),
        ))
    }

    /// Verify a stored receipt against the published root.
    pub fn verify_receipt(&self, id: &str) -> Result<VerificationReport, ConsoleError> {
        let bundle = self.export_receipt_bundle(id)?;
        verify_bundle(&bundle)
    }

    /// Retained pointer for `(peer, receipt)`.
    pub fn mesh_pointer(
        &self,
        peer_id: &str,
        receipt_id: &str,
    ) -> Result<MeshProofReceived, ConsoleError> {
        self.mesh.find_pointer(peer_id, receipt_id).cloned()
    }

    /// Verify a bundle fetched for a retained pointer.
    pub fn inspect_mesh_proof(
        &self,
        pointer: MeshProofReceived,
        bundle: ProofBundle,
    ) -> Result<InspectedProof, ConsoleError> {
        mesh_tracker::inspect(pointer, bundle)
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    pub fn version(&self) -> u64 {
        self.store.version()
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Flag for tasks started by the engine's owner.
    pub fn liveness(&self) -> Liveness {
        Liveness(self.live.clone())
    }

    /// Tear down. Idempotent.
    pub fn dispose(&mut self) {
        if self.live.swap(false, Ordering::SeqCst) {
            info!("[shield] Console engine disposed");
            self.connection = ConnectionState::Shutdown;
        }
    }
}
