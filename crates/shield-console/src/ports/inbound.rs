//! # Inbound Ports
//!
//! API trait defining what an operator surface can ask of the console.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{
    ActionSubmission, ChangeNotice, ConsoleError, ConsoleSnapshot, GuardianScope, InspectedProof,
    ProofBundle, VerificationReport,
};

/// Shield console API - inbound port.
#[async_trait]
pub trait ConsoleApi: Send + Sync {
    /// Current state.
    async fn snapshot(&self) -> Result<ConsoleSnapshot, ConsoleError>;

    /// Change notifications from now on.
    fn subscribe(&self) -> broadcast::Receiver<ChangeNotice>;

    /// Submit an operator action. Failure affects this submission only.
    async fn submit_action(
        &self,
        submission: ActionSubmission,
    ) -> Result<serde_json::Value, ConsoleError>;

    /// Fetch a named proof bundle and verify it.
    async fn fetch_proof(&self, id: &str)
        -> Result<(ProofBundle, VerificationReport), ConsoleError>;

    /// Fetch and verify the bundle behind a retained mesh pointer.
    async fn inspect_mesh_proof(
        &self,
        peer_id: &str,
        receipt_id: &str,
    ) -> Result<InspectedProof, ConsoleError>;

    /// Verify a stored receipt against the published root.
    async fn verify_receipt(&self, id: &str) -> Result<VerificationReport, ConsoleError>;

    /// Export a stored receipt as a portable bundle.
    async fn export_receipt_bundle(&self, id: &str) -> Result<ProofBundle, ConsoleError>;

    /// Scope the operator view and the receipt refresh to one guardian.
    async fn select_scope(&self, scope: GuardianScope) -> Result<(), ConsoleError>;

    /// Clear the active-defense indicator.
    async fn reset_active_defense(&self) -> Result<(), ConsoleError>;

    /// Restart the live feed after the retry ceiling was reached.
    /// Returns false when a connection loop is already running.
    async fn reconnect(&self) -> Result<bool, ConsoleError>;

    /// Tear the console down.
    async fn shutdown(&self) -> Result<(), ConsoleError>;
}
