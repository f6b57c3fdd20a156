//! # Mesh Federation Tracker
//!
//! Latest root per peer, a bounded list of remote proof pointers, and the
//! latest local anchor.

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::algorithms::verify_bundle;
use crate::domain::{
    AnchorEvent, BoundedBuffer, ConsoleError, InspectedProof, MeshProofReceived, MeshRootAnnounce,
    ProofBundle,
};

pub struct MeshTracker {
    roots: BTreeMap<String, MeshRootAnnounce>,
    pointers: BoundedBuffer<MeshProofReceived>,
    anchor: Option<AnchorEvent>,
}

impl MeshTracker {
    pub fn new(pointer_capacity: usize) -> Self {
        Self {
            roots: BTreeMap::new(),
            pointers: BoundedBuffer::new(pointer_capacity),
            anchor: None,
        }
    }

    /// Keep `announce` if it is at least as recent as the peer's current
    /// root. Equal timestamps: the later processed announcement wins.
    pub fn record_root(&mut self, announce: MeshRootAnnounce) -> bool {
        if let Some(current) = self.roots.get(&announce.peer_id) {
            if announce.ts < current.ts {
                debug!(
                    peer = %announce.peer_id,
                    "[shield] Ignoring stale root announcement"
                );
                return false;
            }
        }
        self.roots.insert(announce.peer_id.clone(), announce);
        true
    }

    pub fn record_pointer(&mut self, pointer: MeshProofReceived) {
        self.pointers.push_front(pointer);
    }

    /// Replace the latest anchor.
    pub fn record_anchor(&mut self, anchor: AnchorEvent) {
        info!(
            root = %anchor.root,
            status = ?anchor.status,
            "[shield] Anchor received"
        );
        self.anchor = Some(anchor);
    }

    /// Newest retained pointer for `(peer, receipt)`.
    pub fn find_pointer(
        &self,
        peer_id: &str,
        receipt_id: &str,
    ) -> Result<&MeshProofReceived, ConsoleError> {
        self.pointers
            .find(|p| p.peer_id == peer_id && p.receipt_id == receipt_id)
            .ok_or_else(|| ConsoleError::PointerNotFound {
                peer: peer_id.to_string(),
                receipt_id: receipt_id.to_string(),
            })
    }

    pub fn latest_root(&self, peer_id: &str) -> Option<&MeshRootAnnounce> {
        self.roots.get(peer_id)
    }

    /// Latest root per peer, by peer id.
    pub fn roots(&self) -> impl Iterator<Item = &MeshRootAnnounce> {
        self.roots.values()
    }

    pub fn pointers(&self) -> &BoundedBuffer<MeshProofReceived> {
        &self.pointers
    }

    pub fn anchor(&self) -> Option<&AnchorEvent> {
        self.anchor.as_ref()
    }
}

/// Verify a bundle fetched for `pointer`.
pub fn inspect(
    pointer: MeshProofReceived,
    bundle: ProofBundle,
) -> Result<InspectedProof, ConsoleError> {
    let report = verify_bundle(&bundle)?;
    let root_matches_pointer = bundle.root.eq_ignore_ascii_case(&pointer.root);
    if !report.valid || !root_matches_pointer {
        info!(
            peer = %pointer.peer_id,
            receipt_id = %pointer.receipt_id,
            valid = report.valid,
            root_matches_pointer,
            "[shield] Remote proof did not verify"
        );
    }
    Ok(InspectedProof {
        pointer,
        bundle,
        report,
        root_matches_pointer,
    })
}
