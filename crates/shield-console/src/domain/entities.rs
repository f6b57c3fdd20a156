//! # Domain Entities
//!
//! Records held by the event store and mesh tracker, plus the derived
//! [`Guardian`] view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::value_objects::{
    ActionStatus, AnchorStatus, PathElement, ProofAnchor, ProofBundle, Severity,
};

/// Intrusion or threat detection. Immutable once received.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ThreatEvent {
    /// Event identifier.
    pub id: String,
    /// Detection time.
    pub timestamp: DateTime<Utc>,
    /// Severity tier.
    pub severity: Severity,
    /// Detector-specific type (`brute_force`, `port_scan`, ...).
    pub event_type: String,
    /// Source identifier (usually an address).
    pub source: String,
    /// Host the source resolved to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_host: Option<String>,
    /// Role of the source host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_role: Option<String>,
    /// Guardian that raised the detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_id: Option<String>,
    /// Tags of the raising guardian.
    #[serde(default)]
    pub guardian_tags: Vec<String>,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Affected targets, most relevant first.
    #[serde(default)]
    pub affected: Vec<String>,
    /// Detector metadata, passed through untouched.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Lifecycle record of one response action, keyed by `id`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionRecord {
    /// Authoritative dedup key.
    pub id: String,
    /// Action type (`block_ip`, `offsec.action.block_ip`, ...).
    #[serde(rename = "action")]
    pub action_type: String,
    /// Current lifecycle status.
    pub status: ActionStatus,
    /// When the action was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the action reached a result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    /// Guardian executing the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_id: Option<String>,
    /// Tags of the executing guardian.
    #[serde(default)]
    pub guardian_tags: Vec<String>,
}

impl ActionRecord {
    /// Most recent timestamp carried by the record.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.executed_at.max(self.created_at)
    }
}

/// Hashed audit record used as a Merkle leaf. Immutable once received.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    /// Receipt identifier.
    pub id: String,
    /// Secondary identifier; either may be used to look the receipt up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_id: Option<String>,
    /// Content hash (the Merkle leaf).
    pub hash: String,
    /// Merkle path at issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle_path: Option<Vec<PathElement>>,
    /// Merkle root at issuance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merkle_root: Option<String>,
    /// Issuance time as sent. Kept verbatim for export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    /// Issuance time under the older field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Event type the receipt covers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// Action the receipt covers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    /// Guardian that issued the receipt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_id: Option<String>,
    /// Agent that issued the receipt (older producers).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl Receipt {
    /// Does `id` name this receipt by either identifier?
    pub fn matches_id(&self, id: &str) -> bool {
        self.id == id || self.receipt_id.as_deref() == Some(id)
    }

    /// Do two receipts share any identifier?
    pub fn same_receipt(&self, other: &Receipt) -> bool {
        self.matches_id(&other.id)
            || other
                .receipt_id
                .as_deref()
                .is_some_and(|id| self.matches_id(id))
    }

    /// Raw issuance time: `ts`, else `timestamp`.
    pub fn issued(&self) -> Option<&str> {
        self.ts.as_deref().or(self.timestamp.as_deref())
    }

    /// Issuance time, when it parses as RFC 3339.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }

    /// Guardian the receipt is attributed to: `guardian_id`, else `agent_id`.
    pub fn attributed_guardian(&self) -> Option<&str> {
        self.guardian_id.as_deref().or(self.agent_id.as_deref())
    }
}

impl ProofBundle {
    /// Bundle for a locally stored receipt.
    ///
    /// The root is the current published root when one is known, else the
    /// root the receipt was issued under.
    pub fn from_receipt(
        receipt: &Receipt,
        current_root: Option<&str>,
        anchor: Option<&AnchorEvent>,
    ) -> Self {
        let root = current_root
            .filter(|r| !r.is_empty())
            .or(receipt.merkle_root.as_deref())
            .unwrap_or_default()
            .to_string();
        Self {
            leaf: receipt.hash.clone(),
            path: receipt.merkle_path.clone().unwrap_or_default(),
            root,
            anchor: anchor.map(AnchorEvent::to_proof_anchor),
            receipt_id: Some(receipt.receipt_id.clone().unwrap_or_else(|| receipt.id.clone())),
            event_type: receipt.event_type.clone(),
            ts: receipt.issued().map(str::to_string),
        }
    }
}

/// Latest externally committed root.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnchorEvent {
    /// Anchored root.
    pub root: String,
    /// Anchor time.
    pub ts: DateTime<Utc>,
    /// Chain identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    /// Transaction identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    /// Commitment status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AnchorStatus>,
}

impl AnchorEvent {
    /// True when committed on the external ledger.
    pub fn is_anchored(&self) -> bool {
        self.status == Some(AnchorStatus::Anchored)
    }

    /// Bundle representation.
    pub fn to_proof_anchor(&self) -> ProofAnchor {
        ProofAnchor {
            root: Some(self.root.clone()),
            ts: Some(rfc3339(self.ts)),
            chain: self.chain.clone(),
            txid: self.txid.clone(),
            status: self.status.map(|s| s.as_str().to_string()),
        }
    }
}

/// Derived presence and activity of one guardian.
///
/// Always recomputed from the store; never mutated on its own.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Guardian {
    /// Guardian identifier.
    pub id: String,
    /// Union of tags seen on records attributed to this guardian.
    pub tags: BTreeSet<String>,
    /// Presence in the live feed.
    pub online: bool,
    /// Stored threat events attributed to this guardian.
    pub events: usize,
    /// Stored actions attributed to this guardian.
    pub actions: usize,
    /// Stored receipts attributed to this guardian.
    pub receipts: usize,
    /// Newest timestamp across attributed records.
    pub last_seen: Option<DateTime<Utc>>,
}

impl Guardian {
    /// Fresh guardian with zeroed counters.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tags: BTreeSet::new(),
            online: true,
            events: 0,
            actions: 0,
            receipts: 0,
            last_seen: None,
        }
    }

    pub(crate) fn observe(&mut self, ts: Option<DateTime<Utc>>) {
        if ts > self.last_seen {
            self.last_seen = ts;
        }
    }
}

/// Root announcement from a federation peer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeshRootAnnounce {
    /// Announcing peer.
    #[serde(rename = "from")]
    pub peer_id: String,
    /// Announced root.
    pub root: String,
    /// Announcement time.
    pub ts: DateTime<Utc>,
    /// Anchor backing the root, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<AnchorEvent>,
}

/// Pointer to a proof held by a remote peer. The bundle is fetched lazily.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeshProofReceived {
    /// Peer holding the proof.
    #[serde(rename = "from")]
    pub peer_id: String,
    /// Receipt the proof covers.
    #[serde(rename = "receiptId")]
    pub receipt_id: String,
    /// Event type of the receipt.
    #[serde(rename = "eventType")]
    pub event_type: String,
    /// Root the peer claims the receipt is under.
    pub root: String,
    /// Pointer time.
    pub ts: DateTime<Utc>,
}

/// Request body for applying an action.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActionSubmission {
    /// Client-generated action identifier.
    pub action_id: String,
    /// Action type.
    pub action_type: String,
    /// Target selector (`{"ip": "203.0.113.42"}`).
    pub target: serde_json::Value,
    /// Operator-supplied reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Requesting principal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
    /// Request time.
    pub ts: DateTime<Utc>,
    /// Guardian that should execute the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_id: Option<String>,
    /// Tags of that guardian.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_tags: Option<Vec<String>>,
}

impl ActionSubmission {
    /// Operator block of an address, optionally routed to one guardian.
    pub fn block_ip(ip: impl Into<String>, guardian_id: Option<String>) -> Self {
        Self {
            action_id: format!("act-{}", uuid::Uuid::new_v4()),
            action_type: "offsec.action.block_ip".to_string(),
            target: serde_json::json!({ "ip": ip.into() }),
            reason: Some("Operator block from UI".to_string()),
            requested_by: Some("operator-ui".to_string()),
            ts: Utc::now(),
            guardian_id,
            guardian_tags: None,
        }
    }
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(id: &str, receipt_id: Option<&str>) -> Receipt {
        Receipt {
            id: id.to_string(),
            receipt_id: receipt_id.map(str::to_string),
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
    fn test_threat_event_decodes_minimal_shape() {
        let json = r#"{
            "id": "e1",
            "timestamp": "2025-01-01T00:00:00Z",
            "severity": "critical",
            "event_type": "brute_force",
            "source": "203.0.113.9"
        }"#;
        let event: ThreatEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.severity, Severity::Critical);
        assert!(event.affected.is_empty());
        assert!(event.guardian_id.is_none());
    }

    #[test]
    fn test_receipt_issued_prefers_ts() {
        let json = r#"{"id": "r1", "hash": "ab", "ts": "2025-01-01T00:00:00Z"}"#;
        let r: Receipt = serde_json::from_str(json).unwrap();
        assert_eq!(r.issued(), Some("2025-01-01T00:00:00Z"));
        assert!(r.issued_at().is_some());

        let json = r#"{"id": "r1", "hash": "ab", "ts": "2025-01-01T01:00:00+01:00", "timestamp": "older"}"#;
        let r: Receipt = serde_json::from_str(json).unwrap();
        assert_eq!(r.issued(), Some("2025-01-01T01:00:00+01:00"));
        assert_eq!(r.issued_at(), "2025-01-01T00:00:00Z".parse().ok());

        let json = r#"{"id": "r1", "hash": "ab", "timestamp": "not a time"}"#;
        let r: Receipt = serde_json::from_str(json).unwrap();
        assert_eq!(r.issued(), Some("not a time"));
        assert!(r.issued_at().is_none());
    }

    #[test]
    fn test_bundle_keeps_receipt_time_verbatim() {
        let mut r = receipt("r1", None);
        r.ts = Some("2025-03-01T12:00:00+00:00".to_string());
        let bundle = ProofBundle::from_receipt(&r, Some("cc"), None);
        assert_eq!(bundle.ts.as_deref(), Some("2025-03-01T12:00:00+00:00"));

        let mut r = receipt("r2", None);
        r.timestamp = Some("2025-03-01T12:00:00.500Z".to_string());
        let bundle = ProofBundle::from_receipt(&r, Some("cc"), None);
        assert_eq!(bundle.ts.as_deref(), Some("2025-03-01T12:00:00.500Z"));
    }

    #[test]
    fn test_receipt_identity_by_either_key() {
        let a = receipt("r1", Some("rcpt-1"));
        assert!(a.matches_id("r1"));
        assert!(a.matches_id("rcpt-1"));
        assert!(!a.matches_id("r2"));

        let b = receipt("rcpt-1", None);
        assert!(a.same_receipt(&b));
        assert!(b.same_receipt(&a));
        assert!(!b.same_receipt(&receipt("r3", None)));
    }

    #[test]
    fn test_receipt_attribution_falls_back_to_agent() {
        let mut r = receipt("r1", None);
        r.agent_id = Some("agent-7".to_string());
        assert_eq!(r.attributed_guardian(), Some("agent-7"));
        r.guardian_id = Some("g1".to_string());
        assert_eq!(r.attributed_guardian(), Some("g1"));
    }

    #[test]
    fn test_mesh_pointer_wire_names() {
        let json = r#"{
            "from": "p1",
            "receiptId": "r1",
            "eventType": "offsec.action.result",
            "root": "cc",
            "ts": "2025-01-01T00:00:00Z"
        }"#;
        let p: MeshProofReceived = serde_json::from_str(json).unwrap();
        assert_eq!(p.peer_id, "p1");
        assert_eq!(p.receipt_id, "r1");
    }

    #[test]
    fn test_block_ip_submission() {
        let sub = ActionSubmission::block_ip("203.0.113.42", Some("g1".to_string()));
        assert!(sub.action_id.starts_with("act-"));
        assert_eq!(sub.target["ip"], "203.0.113.42");
        assert_eq!(sub.requested_by.as_deref(), Some("operator-ui"));
        let json = serde_json::to_value(&sub).unwrap();
        assert!(json.get("guardian_tags").is_none());
        assert_eq!(json["guardian_id"], "g1");
    }

    #[test]
    fn test_anchor_to_proof_anchor() {
        let anchor = AnchorEvent {
            root: "cc".to_string(),
            ts: "2025-01-01T00:00:00Z".parse().unwrap(),
            chain: Some("eth".to_string()),
            txid: Some("0x1".to_string()),
            status: Some(AnchorStatus::Anchored),
        };
        assert!(anchor.is_anchored());
        let pa = anchor.to_proof_anchor();
        assert_eq!(pa.root.as_deref(), Some("cc"));
        assert_eq!(pa.status.as_deref(), Some("anchored"));
        assert_eq!(pa.ts.as_deref(), Some("2025-01-01T00:00:00Z"));
    }

    #[test]
    fn test_bundle_from_receipt_prefers_current_root() {
        let mut r = receipt("r1", None);
        r.merkle_root = Some("old".to_string());
        r.merkle_path = Some(vec![PathElement::left("bb")]);

        let bundle = ProofBundle::from_receipt(&r, Some("cur"), None);
        assert_eq!(bundle.root, "cur");
        assert_eq!(bundle.leaf, "ab");
        assert_eq!(bundle.path.len(), 1);
        assert_eq!(bundle.receipt_id.as_deref(), Some("r1"));

        let bundle = ProofBundle::from_receipt(&r, Some(""), None);
        assert_eq!(bundle.root, "old");

        let bundle = ProofBundle::from_receipt(&receipt("r2", None), None, None);
        assert_eq!(bundle.root, "");
        assert!(bundle.path.is_empty());
    }
}
