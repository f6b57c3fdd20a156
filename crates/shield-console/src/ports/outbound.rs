//! # Outbound Ports
//!
//! Traits for the console's external collaborators: the live feed transport
//! and the OffSec HTTP API.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::domain::{ActionSubmission, ConsoleError, ProofBundle, Receipt};

/// One open live channel.
#[async_trait]
pub trait FeedChannel: Send {
    /// Next text frame.
    ///
    /// `None` when the peer closed the channel, `Some(Err(_))` when it
    /// failed. Either ends the channel.
    async fn next_frame(&mut self) -> Option<Result<String, ConsoleError>>;

    /// Close the channel from our side.
    async fn close(&mut self);
}

/// Live feed transport - outbound port.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Open a channel to `url`.
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedChannel>, ConsoleError>;
}

/// OffSec HTTP API - outbound port.
///
/// Every call is a single request; failures surface to the caller only.
#[async_trait]
pub trait OffsecApi: Send + Sync {
    /// Current published Merkle root.
    async fn fetch_current_root(&self) -> Result<String, ConsoleError>;

    /// Recent receipts, optionally scoped to one guardian.
    async fn fetch_receipts(&self, guardian_id: Option<&str>) -> Result<Vec<Receipt>, ConsoleError>;

    /// Submit an action. Returns the response body (`Null` when empty).
    async fn apply_action(
        &self,
        submission: &ActionSubmission,
    ) -> Result<serde_json::Value, ConsoleError>;

    /// Proof bundle by identifier.
    async fn fetch_proof(&self, id: &str) -> Result<ProofBundle, ConsoleError>;

    /// Proof bundle held by a mesh peer.
    async fn fetch_mesh_proof(
        &self,
        peer_id: &str,
        receipt_id: &str,
    ) -> Result<ProofBundle, ConsoleError>;
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

type FrameResult = Result<String, String>;

/// Sending side of a scripted mock channel. Dropping it closes the channel.
#[derive(Clone)]
pub struct MockFeedSender {
    tx: mpsc::UnboundedSender<FrameResult>,
}

impl MockFeedSender {
    /// Deliver a text frame. False once the channel is gone.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.tx.send(Ok(text.into())).is_ok()
    }

    /// Fail the channel with a transport error.
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.tx.send(Err(reason.into())).is_ok()
    }

    /// True once the consumer closed or dropped the channel.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

enum Scripted {
    Refuse(String),
    Accept(mpsc::UnboundedReceiver<FrameResult>),
}

struct MockChannel {
    rx: mpsc::UnboundedReceiver<FrameResult>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl FeedChannel for MockChannel {
    async fn next_frame(&mut self) -> Option<Result<String, ConsoleError>> {
        match self.rx.recv().await? {
            Ok(text) => Some(Ok(text)),
            Err(reason) => Some(Err(ConsoleError::Transport(reason))),
        }
    }

    async fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
        self.rx.close();
    }
}

/// Scripted transport for testing.
///
/// Each connect pops the next scripted outcome; an empty script refuses.
#[derive(Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    attempts: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next connect fails.
    pub fn push_refuse(&self, reason: impl Into<String>) {
        self.script.lock().push_back(Scripted::Refuse(reason.into()));
    }

    /// Next connect succeeds; frames are fed through the returned sender.
    pub fn push_accept(&self) -> MockFeedSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.script.lock().push_back(Scripted::Accept(rx));
        MockFeedSender { tx }
    }

    /// Next connect succeeds, delivers `frames`, then closes.
    pub fn push_frames<I, S>(&self, frames: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sender = self.push_accept();
        for frame in frames {
            sender.send_text(frame);
        }
    }

    /// Connect calls made so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Channels closed from the consumer side.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedTransport for MockTransport {
    async fn connect(&self, _url: &str) -> Result<Box<dyn FeedChannel>, ConsoleError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().pop_front() {
            Some(Scripted::Accept(rx)) => Ok(Box::new(MockChannel {
                rx,
                closed: self.closed.clone(),
            })),
            Some(Scripted::Refuse(reason)) => Err(ConsoleError::Transport(reason)),
            None => Err(ConsoleError::Transport("connection refused".to_string())),
        }
    }
}

/// In-memory OffSec API for testing.
#[derive(Default)]
pub struct MockOffsecApi {
    /// Returned by `fetch_current_root`.
    pub root: Mutex<String>,
    /// Returned by `fetch_receipts`, filtered by attributed guardian.
    pub receipts: Mutex<Vec<Receipt>>,
    /// Bundles by proof id.
    pub proofs: Mutex<HashMap<String, ProofBundle>>,
    /// Bundles by `(peer, receipt_id)`.
    pub mesh_proofs: Mutex<HashMap<(String, String), ProofBundle>>,
    /// Every accepted submission, in order.
    pub submitted: Mutex<Vec<ActionSubmission>>,
    /// Status returned for every call when set.
    pub fail_status: Mutex<Option<u16>>,
    calls: AtomicUsize,
}

impl MockOffsecApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(self, root: impl Into<String>) -> Self {
        *self.root.lock() = root.into();
        self
    }

    pub fn with_receipts(self, receipts: Vec<Receipt>) -> Self {
        *self.receipts.lock() = receipts;
        self
    }

    pub fn with_proof(self, id: impl Into<String>, bundle: ProofBundle) -> Self {
        self.proofs.lock().insert(id.into(), bundle);
        self
    }

    pub fn with_mesh_proof(
        self,
        peer: impl Into<String>,
        receipt_id: impl Into<String>,
        bundle: ProofBundle,
    ) -> Self {
        self.mesh_proofs
            .lock()
            .insert((peer.into(), receipt_id.into()), bundle);
        self
    }

    /// Calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn begin(&self, endpoint: &str) -> Result<(), ConsoleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match *self.fail_status.lock() {
            Some(status) => Err(ConsoleError::RequestStatus {
                endpoint: endpoint.to_string(),
                status,
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OffsecApi for MockOffsecApi {
    async fn fetch_current_root(&self) -> Result<String, ConsoleError> {
        self.begin("/root")?;
        Ok(self.root.lock().clone())
    }

    async fn fetch_receipts(&self, guardian_id: Option<&str>) -> Result<Vec<Receipt>, ConsoleError> {
        self.begin("/receipts")?;
        Ok(self
            .receipts
            .lock()
            .iter()
            .filter(|r| guardian_id.is_none() || r.attributed_guardian() == guardian_id)
            .cloned()
            .collect())
    }

    async fn apply_action(
        &self,
        submission: &ActionSubmission,
    ) -> Result<serde_json::Value, ConsoleError> {
        self.begin("/action/apply")?;
        self.submitted.lock().push(submission.clone());
        Ok(serde_json::json!({ "status": "accepted", "action_id": submission.action_id }))
    }

    async fn fetch_proof(&self, id: &str) -> Result<ProofBundle, ConsoleError> {
        let endpoint = format!("/proof/{id}");
        self.begin(&endpoint)?;
        self.proofs
            .lock()
            .get(id)
            .cloned()
            .ok_or(ConsoleError::RequestStatus {
                endpoint,
                status: 404,
            })
    }

    async fn fetch_mesh_proof(
        &self,
        peer_id: &str,
        receipt_id: &str,
    ) -> Result<ProofBundle, ConsoleError> {
        let endpoint = format!("/mesh/proof/{peer_id}/{receipt_id}");
        self.begin(&endpoint)?;
        self.mesh_proofs
            .lock()
            .get(&(peer_id.to_string(), receipt_id.to_string()))
            .cloned()
            .ok_or(ConsoleError::RequestStatus {
                endpoint,
                status: 404,
            })
    }
}
