//! # Shield Console
//!
//! Core of the OffSec Shield operator console: reconciles the live
//! security feed into bounded in-memory state and verifies Merkle proofs
//! for receipts, published roots and federation peers.
//!
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Components
//!
//! | Component | Role |
//! |-----------|------|
//! | Proof Verifier | Fold a leaf and path into a root, check anchors |
//! | Connection Manager | One live channel, exponential backoff reconnect |
//! | Message Dispatcher | Classify frames, drop malformed ones |
//! | Event Store | Bounded events, actions and receipts, active defense |
//! | Guardian Aggregator | Per-guardian view derived from the store |
//! | Mesh Tracker | Latest root per peer, remote proof pointers |
//!
//! ## Module Structure
//!
//! ```text
//! shield-console/
//! ├── domain/          # Records, proof types, message union, errors
//! ├── algorithms/      # Merkle fold and tree, action merge, projection, backoff
//! ├── ports/           # ConsoleApi (inbound) + feed/HTTP traits (outbound)
//! ├── adapters/        # tokio-tungstenite feed, reqwest API client
//! ├── application/     # Reconcilers, engine, ConsoleService loop
//! └── config.rs        # ConsoleConfig
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

// Re-exports
pub use adapters::{HttpOffsecApi, WsFeedTransport};
pub use algorithms::{
    build_merkle_path, check_anchor, compute_merkle_root, compute_root, hash_pair, verify_bundle,
    verify_proof,
};
pub use application::{
    ConnectionManager, ConsoleEngine, ConsoleHandle, ConsoleService, DispatchOutcome, FeedEvent,
};
pub use config::{ConsoleConfig, ReconnectPolicy};
pub use domain::{
    ActionRecord, ActionStatus, ActionSubmission, AnchorCheck, AnchorEvent, ChangeKind,
    ChangeNotice, ConnectionState, ConsoleError, ConsoleSnapshot, Guardian, GuardianScope,
    InboundMessage, InspectedProof, MeshProofReceived, MeshRootAnnounce, PathElement, Position,
    ProofAnchor, ProofBundle, Receipt, Severity, ThreatEvent, VerificationReport, EMPTY_ROOT,
};
pub use ports::{ConsoleApi, FeedChannel, FeedTransport, OffsecApi};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
