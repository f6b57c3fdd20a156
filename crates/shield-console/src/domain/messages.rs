//! # Inbound Messages
//!
//! The live feed delivers `{ "type": <tag>, "data": <payload> }` envelopes.
//! [`InboundMessage`] is the closed union of every recognised tag plus an
//! [`InboundMessage::Unknown`] variant that keeps the raw data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::entities::{
    ActionRecord, AnchorEvent, MeshProofReceived, MeshRootAnnounce, Receipt, ThreatEvent,
};
use super::errors::ConsoleError;
use super::value_objects::ActionStatus;

/// Raw envelope before tag discrimination.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    /// Message tag.
    #[serde(rename = "type")]
    pub tag: String,
    /// Tag-specific payload.
    #[serde(default)]
    pub data: Value,
}

/// Payload of `offsec.action.requested`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActionRequested {
    pub action_id: String,
    pub action_type: String,
    #[serde(default)]
    pub target: Option<Value>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub requested_by: Option<String>,
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub receipt_id: Option<String>,
    #[serde(default)]
    pub guardian_id: Option<String>,
    #[serde(default)]
    pub guardian_tags: Vec<String>,
}

/// Payload of `offsec.action.result`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    pub action_id: String,
    pub action_type: String,
    pub status: ActionStatus,
    #[serde(default)]
    pub details: Option<Value>,
    #[serde(default)]
    pub ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub receipt_id: Option<String>,
    #[serde(default)]
    pub guardian_id: Option<String>,
    #[serde(default)]
    pub guardian_tags: Vec<String>,
}

/// Recognised message tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    ThreatEvent,
    CapabilityDenied,
    ActionUpdate,
    ActionRequested,
    ActionResult,
    Receipt,
    Anchor,
    MeshRootAnnounce,
    MeshProofReceived,
}

impl MessageKind {
    /// Every recognised kind.
    pub const ALL: [MessageKind; 9] = [
        MessageKind::ThreatEvent,
        MessageKind::CapabilityDenied,
        MessageKind::ActionUpdate,
        MessageKind::ActionRequested,
        MessageKind::ActionResult,
        MessageKind::Receipt,
        MessageKind::Anchor,
        MessageKind::MeshRootAnnounce,
        MessageKind::MeshProofReceived,
    ];

    /// Wire tag.
    pub fn tag(self) -> &'static str {
        match self {
            MessageKind::ThreatEvent => "threat_event",
            MessageKind::CapabilityDenied => "capability_denied",
            MessageKind::ActionUpdate => "action_update",
            MessageKind::ActionRequested => "offsec.action.requested",
            MessageKind::ActionResult => "offsec.action.result",
            MessageKind::Receipt => "receipt",
            MessageKind::Anchor => "offsec.anchor",
            MessageKind::MeshRootAnnounce => "mesh.root_announce",
            MessageKind::MeshProofReceived => "mesh.proof_received",
        }
    }

    /// Kind for a wire tag, `None` when unrecognised.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }
}

/// One decoded inbound message.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundMessage {
    ThreatEvent(ThreatEvent),
    /// Capability refusal, carried as a threat event.
    CapabilityDenied(ThreatEvent),
    ActionUpdate(ActionRecord),
    ActionRequested(ActionRequested),
    ActionResult(ActionResult),
    Receipt(Receipt),
    Anchor(AnchorEvent),
    MeshRootAnnounce(MeshRootAnnounce),
    MeshProofReceived(MeshProofReceived),
    /// Unrecognised tag; accepted and ignored.
    Unknown { tag: String, data: Value },
}

impl InboundMessage {
    /// Decode a raw text frame.
    ///
    /// Fails with [`ConsoleError::MalformedMessage`] when the frame is not an
    /// envelope or when a recognised tag carries data of the wrong shape.
    pub fn decode(raw: &str) -> Result<Self, ConsoleError> {
        let envelope: Envelope = serde_json::from_str(raw)
            .map_err(|e| ConsoleError::MalformedMessage(format!("invalid envelope: {e}")))?;
        Self::from_envelope(envelope)
    }

    /// Discriminate an already parsed envelope.
    pub fn from_envelope(envelope: Envelope) -> Result<Self, ConsoleError> {
        let Some(kind) = MessageKind::from_tag(&envelope.tag) else {
            return Ok(InboundMessage::Unknown {
                tag: envelope.tag,
                data: envelope.data,
            });
        };

        let data = envelope.data;
        let msg = match kind {
            MessageKind::ThreatEvent => InboundMessage::ThreatEvent(payload(kind, data)?),
            MessageKind::CapabilityDenied => {
                InboundMessage::CapabilityDenied(payload(kind, data)?)
            }
            MessageKind::ActionUpdate => InboundMessage::ActionUpdate(payload(kind, data)?),
            MessageKind::ActionRequested => InboundMessage::ActionRequested(payload(kind, data)?),
            MessageKind::ActionResult => InboundMessage::ActionResult(payload(kind, data)?),
            MessageKind::Receipt => InboundMessage::Receipt(payload(kind, data)?),
            MessageKind::Anchor => InboundMessage::Anchor(payload(kind, data)?),
            MessageKind::MeshRootAnnounce => {
                InboundMessage::MeshRootAnnounce(payload(kind, data)?)
            }
            MessageKind::MeshProofReceived => {
                InboundMessage::MeshProofReceived(payload(kind, data)?)
            }
        };
        Ok(msg)
    }

    /// Kind of the message, `None` for [`InboundMessage::Unknown`].
    pub fn kind(&self) -> Option<MessageKind> {
        Some(match self {
            InboundMessage::ThreatEvent(_) => MessageKind::ThreatEvent,
            InboundMessage::CapabilityDenied(_) => MessageKind::CapabilityDenied,
            InboundMessage::ActionUpdate(_) => MessageKind::ActionUpdate,
            InboundMessage::ActionRequested(_) => MessageKind::ActionRequested,
            InboundMessage::ActionResult(_) => MessageKind::ActionResult,
            InboundMessage::Receipt(_) => MessageKind::Receipt,
            InboundMessage::Anchor(_) => MessageKind::Anchor,
            InboundMessage::MeshRootAnnounce(_) => MessageKind::MeshRootAnnounce,
            InboundMessage::MeshProofReceived(_) => MessageKind::MeshProofReceived,
            InboundMessage::Unknown { .. } => return None,
        })
    }
}

fn payload<T: serde::de::DeserializeOwned>(kind: MessageKind, data: Value) -> Result<T, ConsoleError> {
    serde_json::from_value(data)
        .map_err(|e| ConsoleError::MalformedMessage(format!("{} payload: {e}", kind.tag())))
}
