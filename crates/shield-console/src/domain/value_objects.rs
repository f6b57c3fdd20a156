//! # Domain Value Objects
//!
//! Immutable value types shared by the store, the verifier and the mesh tracker.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Threat severity, ordered `Low < Medium < High < Critical`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Low,
    /// Needs attention.
    Medium,
    /// Likely hostile.
    High,
    /// Highest tier; raises the active-defense indicator.
    Critical,
}

impl Severity {
    /// True for the tier that escalates the console into active defense.
    pub fn escalates(self) -> bool {
        self == Severity::Critical
    }
}

/// Lifecycle status of a response action.
///
/// Unrecognised wire values are kept verbatim in [`ActionStatus::Other`] so a
/// newer backend never causes an action update to be rejected.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionStatus {
    /// Queued, not yet requested.
    Pending,
    /// Requested by an operator or detector.
    Requested,
    /// Accepted by the guardian.
    Accepted,
    /// Applied on the target.
    Applied,
    /// Executed on the target.
    Executed,
    /// Execution failed.
    Failed,
    /// Refused by capability checks.
    Denied,
    /// Any other status string.
    Other(String),
}

impl ActionStatus {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            ActionStatus::Pending => "pending",
            ActionStatus::Requested => "requested",
            ActionStatus::Accepted => "accepted",
            ActionStatus::Applied => "applied",
            ActionStatus::Executed => "executed",
            ActionStatus::Failed => "failed",
            ActionStatus::Denied => "denied",
            ActionStatus::Other(s) => s,
        }
    }

    /// Terminal statuses end the lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Applied | ActionStatus::Executed | ActionStatus::Failed | ActionStatus::Denied
        )
    }
}

impl From<String> for ActionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => ActionStatus::Pending,
            "requested" => ActionStatus::Requested,
            "accepted" => ActionStatus::Accepted,
            "applied" => ActionStatus::Applied,
            "executed" => ActionStatus::Executed,
            "failed" => ActionStatus::Failed,
            "denied" => ActionStatus::Denied,
            _ => ActionStatus::Other(value),
        }
    }
}

impl From<ActionStatus> for String {
    fn from(value: ActionStatus) -> Self {
        match value {
            ActionStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a sibling in a Merkle path step.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Sibling is on the left: `H(sibling || current)`.
    Left,
    /// Sibling is on the right: `H(current || sibling)`.
    Right,
}

/// One step of a Merkle path.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PathElement {
    /// Hex digest of the sibling node.
    pub sibling: String,
    /// Side the sibling sits on.
    pub position: Position,
}

impl PathElement {
    /// Create a left sibling step.
    pub fn left(sibling: impl Into<String>) -> Self {
        Self {
            sibling: sibling.into(),
            position: Position::Left,
        }
    }

    /// Create a right sibling step.
    pub fn right(sibling: impl Into<String>) -> Self {
        Self {
            sibling: sibling.into(),
            position: Position::Right,
        }
    }
}

/// Commitment status of an externally anchored root.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnchorStatus {
    /// Committed on the external ledger.
    Anchored,
    /// Submitted, not yet committed.
    Pending,
    /// Commitment failed.
    Error,
}

impl AnchorStatus {
    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            AnchorStatus::Anchored => "anchored",
            AnchorStatus::Pending => "pending",
            AnchorStatus::Error => "error",
        }
    }
}

/// Anchor information embedded in a proof bundle.
///
/// Every field is optional: bundles produced by peers may carry partial
/// anchor data and still need to round-trip unchanged.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofAnchor {
    /// Anchored root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    /// Anchor timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    /// Chain identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    /// Transaction identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    /// Commitment status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Portable, independently re-verifiable proof artifact.
///
/// Field names are a compatibility surface: exported files must be readable
/// by any verifier that understands `leaf`/`path`/`root`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProofBundle {
    /// Leaf hash (receipt content hash).
    pub leaf: String,
    /// Ordered sibling path from leaf to root.
    #[serde(default)]
    pub path: Vec<PathElement>,
    /// Claimed root.
    pub root: String,
    /// Optional anchor the root was committed under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<ProofAnchor>,
    /// Originating receipt.
    #[serde(
        default,
        rename = "receiptId",
        skip_serializing_if = "Option::is_none"
    )]
    pub receipt_id: Option<String>,
    /// Originating event type.
    #[serde(
        default,
        rename = "eventType",
        skip_serializing_if = "Option::is_none"
    )]
    pub event_type: Option<String>,
    /// Receipt timestamp, kept as the producer wrote it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}

/// Outcome of checking a bundle's anchor against its root.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnchorCheck {
    /// Bundle carries no anchor.
    NotPresent,
    /// Anchor root equals bundle root.
    Matches,
    /// Anchor root differs from bundle root.
    Mismatch,
    /// Anchor present without a root.
    MissingRoot,
}

impl AnchorCheck {
    /// False only when an anchor is present and does not back the root.
    pub fn is_acceptable(self) -> bool {
        matches!(self, AnchorCheck::NotPresent | AnchorCheck::Matches)
    }
}

/// Result of recomputing a root from a leaf and path.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationReport {
    /// Root produced by folding the path.
    pub computed_root: String,
    /// Root the proof claimed.
    pub expected_root: String,
    /// Number of path steps consumed.
    pub steps: usize,
    /// `computed_root == expected_root`.
    pub valid: bool,
    /// Anchor comparison.
    pub anchor: AnchorCheck,
}

impl VerificationReport {
    /// Valid fold and an acceptable anchor.
    pub fn is_fully_verified(&self) -> bool {
        self.valid && self.anchor.is_acceptable()
    }
}

/// Live channel state as seen by observers.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No channel and no connection attempt in flight.
    #[default]
    Disconnected,
    /// Attempting to open the channel.
    Connecting,
    /// Channel open and delivering.
    Connected,
    /// Retry ceiling reached; a caller may restart manually.
    Exhausted,
    /// Explicitly shut down; no further reconnection.
    Shutdown,
}

impl ConnectionState {
    /// True when the manager will not reconnect on its own.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Exhausted | ConnectionState::Shutdown)
    }
}

/// Which guardian an operator view is scoped to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardianScope {
    /// Every guardian.
    #[default]
    All,
    /// A single guardian id.
    Only(String),
}

impl GuardianScope {
    /// Scope for an optional guardian id.
    pub fn from_option(id: Option<String>) -> Self {
        match id {
            Some(id) => GuardianScope::Only(id),
            None => GuardianScope::All,
        }
    }

    /// The guardian id, if scoped.
    pub fn guardian_id(&self) -> Option<&str> {
        match self {
            GuardianScope::All => None,
            GuardianScope::Only(id) => Some(id),
        }
    }

    /// Does an optional attributed guardian id fall inside this scope?
    pub fn admits(&self, guardian_id: Option<&str>) -> bool {
        match self {
            GuardianScope::All => true,
            GuardianScope::Only(id) => guardian_id == Some(id.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
        assert!(Severity::Critical.escalates());
        assert!(!Severity::High.escalates());
    }

    #[test]
    fn test_severity_rejects_unknown() {
        assert!(serde_json::from_str::<Severity>("\"catastrophic\"").is_err());
        assert_eq!(
            serde_json::from_str::<Severity>("\"critical\"").unwrap(),
            Severity::Critical
        );
    }

    #[test]
    fn test_action_status_keeps_unknown_values() {
        let status: ActionStatus = serde_json::from_str("\"rolled_back\"").unwrap();
        assert_eq!(status, ActionStatus::Other("rolled_back".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"rolled_back\"");
        assert!(!status.is_terminal());
    }

    #[test]
    fn test_action_status_terminal() {
        assert!(ActionStatus::Applied.is_terminal());
        assert!(ActionStatus::Denied.is_terminal());
        assert!(!ActionStatus::Requested.is_terminal());
        assert_eq!(ActionStatus::from("executed".to_string()), ActionStatus::Executed);
    }

    #[test]
    fn test_bundle_field_names() {
        let bundle = ProofBundle {
            leaf: "aa".to_string(),
            path: vec![PathElement::left("bb")],
            root: "cc".to_string(),
            anchor: None,
            receipt_id: Some("r1".to_string()),
            event_type: Some("offsec.action.result".to_string()),
            ts: None,
        };
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json["receiptId"], "r1");
        assert_eq!(json["eventType"], "offsec.action.result");
        assert_eq!(json["path"][0]["position"], "left");
        assert!(json.get("anchor").is_none());
        assert!(json.get("ts").is_none());
    }

    #[test]
    fn test_anchor_check_acceptable() {
        assert!(AnchorCheck::NotPresent.is_acceptable());
        assert!(AnchorCheck::Matches.is_acceptable());
        assert!(!AnchorCheck::Mismatch.is_acceptable());
        assert!(!AnchorCheck::MissingRoot.is_acceptable());
    }

    #[test]
    fn test_guardian_scope_admits() {
        let scope = GuardianScope::Only("g1".to_string());
        assert!(scope.admits(Some("g1")));
        assert!(!scope.admits(Some("g2")));
        assert!(!scope.admits(None));
        assert!(GuardianScope::All.admits(None));
    }

    #[test]
    fn test_connection_state_terminal() {
        assert!(ConnectionState::Shutdown.is_terminal());
        assert!(ConnectionState::Exhausted.is_terminal());
        assert!(!ConnectionState::Disconnected.is_terminal());
    }
}
