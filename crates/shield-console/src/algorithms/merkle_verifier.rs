//! # Merkle Proof Verification
//!
//! Recomputes a root from a leaf and an ordered sibling path.
//!
//! # Algorithm
//!
//! 1. Start with the leaf as the current node
//! 2. For each step in the path:
//!    - sibling on the left: current = BLAKE2b-256(sibling || current)
//!    - sibling on the right: current = BLAKE2b-256(current || sibling)
//! 3. The final node is the computed root
//!
//! Nodes are lowercase hex strings and the digest input is their UTF-8
//! bytes, so a bundle can be re-verified with any BLAKE2b tool set to a
//! 32-byte output.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

use crate::domain::{
    AnchorCheck, ConsoleError, PathElement, Position, ProofBundle, VerificationReport, EMPTY_ROOT,
};

type Blake2b256 = Blake2b<U32>;

/// Hash two hex nodes together.
pub fn hash_pair(left: &str, right: &str) -> String {
    let mut hasher = Blake2b256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    hex::encode(hasher.finalize())
}

/// Validate a hex field and return its canonical (lowercase) form.
fn canonical_hex(field: impl FnOnce() -> String, value: &str) -> Result<String, ConsoleError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ConsoleError::encoding(field(), value));
    }
    Ok(value.to_ascii_lowercase())
}

/// Fold `leaf` through `path` and return the computed root.
///
/// # Time Complexity: O(path length)
pub fn compute_root(leaf: &str, path: &[PathElement]) -> Result<String, ConsoleError> {
    let mut current = canonical_hex(|| "leaf".to_string(), leaf)?;

    for (i, step) in path.iter().enumerate() {
        let sibling = canonical_hex(|| format!("path[{i}].sibling"), &step.sibling)?;
        current = match step.position {
            Position::Left => hash_pair(&sibling, &current),
            Position::Right => hash_pair(&current, &sibling),
        };
    }

    Ok(current)
}

/// Verify that `leaf` folds through `path` to `expected_root`.
///
/// A mismatch is a report with `valid == false`, never an error. An empty
/// path is valid only when the leaf equals the root.
pub fn verify_proof(
    leaf: &str,
    path: &[PathElement],
    expected_root: &str,
) -> Result<VerificationReport, ConsoleError> {
    let expected = canonical_hex(|| "root".to_string(), expected_root)?;
    let computed = compute_root(leaf, path)?;

    Ok(VerificationReport {
        valid: computed == expected,
        computed_root: computed,
        expected_root: expected,
        steps: path.len(),
        anchor: AnchorCheck::NotPresent,
    })
}

/// Compare a bundle's anchor with its root.
pub fn check_anchor(bundle: &ProofBundle) -> Result<AnchorCheck, ConsoleError> {
    let Some(anchor) = &bundle.anchor else {
        return Ok(AnchorCheck::NotPresent);
    };
    let Some(anchor_root) = anchor.root.as_deref() else {
        return Ok(AnchorCheck::MissingRoot);
    };

    let anchor_root = canonical_hex(|| "anchor.root".to_string(), anchor_root)?;
    if anchor_root == bundle.root.to_ascii_lowercase() {
        Ok(AnchorCheck::Matches)
    } else {
        Ok(AnchorCheck::Mismatch)
    }
}

/// Verify a complete bundle: the Merkle fold and the anchor.
pub fn verify_bundle(bundle: &ProofBundle) -> Result<VerificationReport, ConsoleError> {
    let mut report = verify_proof(&bundle.leaf, &bundle.path, &bundle.root)?;
    report.anchor = check_anchor(bundle)?;
    Ok(report)
}

fn next_level(level: &[String]) -> Vec<String> {
    level
        .chunks(2)
        .map(|chunk| {
            let left = &chunk[0];
            let right = chunk.get(1).unwrap_or(left); // Duplicate last if odd
            hash_pair(left, right)
        })
        .collect()
}

/// Build a tree over `leaves` and return its root.
///
/// Zero leaves give [`EMPTY_ROOT`]; a single leaf is its own root.
pub fn compute_merkle_root<S: AsRef<str>>(leaves: &[S]) -> String {
    if leaves.is_empty() {
        return EMPTY_ROOT.to_string();
    }

    let mut level: Vec<String> = leaves
        .iter()
        .map(|l| l.as_ref().to_ascii_lowercase())
        .collect();
    while level.len() > 1 {
        level = next_level(&level);
    }
    level.swap_remove(0)
}

/// Build the path for the leaf at `index`. `None` when out of range.
pub fn build_merkle_path<S: AsRef<str>>(leaves: &[S], index: usize) -> Option<Vec<PathElement>> {
    if index >= leaves.len() {
        return None;
    }

    let mut path = Vec::new();
    let mut level: Vec<String> = leaves
        .iter()
        .map(|l| l.as_ref().to_ascii_lowercase())
        .collect();
    let mut index = index;

    while level.len() > 1 {
        let sibling_index = index ^ 1;
        let step = match level.get(sibling_index) {
            Some(sibling) if index % 2 == 0 => PathElement::right(sibling.clone()),
            Some(sibling) => PathElement::left(sibling.clone()),
            // Last node of an odd level pairs with itself
            None => PathElement::right(level[index].clone()),
        };
        path.push(step);

        level = next_level(&level);
        index /= 2;
    }

    Some(path)
}
