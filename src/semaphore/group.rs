// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Semaphore group reconstruction from `MemberAdded` events.
//!
//! The member list is rebuilt by replaying events, then checked two ways:
//! event indices must form the exact sequence `0..n`, and the LeanIMT root
//! recomputed from the commitments must match the root the contract reports.
//! A proof built against anything else would be rejected on-chain.

use alloy::primitives::{uint, U256};
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};

/// BN254 scalar field modulus. Commitments and roots live below it.
pub const SNARK_SCALAR_FIELD: U256 =
    uint!(21888242871839275222246405745257275088548364400416034343698204186575808495617_U256);

/// One decoded `MemberAdded` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberEvent {
    pub block_number: u64,
    pub log_index: u64,
    pub index: U256,
    pub commitment: U256,
    pub merkle_tree_root: U256,
}

/// Group members in insertion order, validated against their events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSet {
    pub commitments: Vec<U256>,
    /// Root reported by the most recent event.
    pub last_event_root: U256,
    /// Root recomputed locally from `commitments`.
    pub root: U256,
}

impl MemberSet {
    pub fn len(&self) -> usize {
        self.commitments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commitments.is_empty()
    }

    pub fn depth(&self) -> usize {
        tree_depth(self.commitments.len())
    }

    pub fn contains(&self, commitment: U256) -> bool {
        self.commitments.contains(&commitment)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    #[error("No members found in group")]
    Empty,

    #[error("Member set has a gap: expected index {expected}, found {found}")]
    MemberSetGap { expected: U256, found: U256 },

    #[error("Conflicting events for member index {0}")]
    ConflictingEvents(U256),

    #[error("Value is outside the SNARK scalar field: {0}")]
    OutOfField(U256),

    #[error("Stale root: computed {computed:#x}, expected {expected:#x}")]
    StaleRoot { computed: U256, expected: U256 },

    #[error("Poseidon error: {0}")]
    Poseidon(String),
}

/// Order, deduplicate and validate replayed events into a member set.
///
/// Events may arrive unordered and with duplicates when fetch ranges
/// overlap; both are normalized. A missing or conflicting index is an error.
pub fn assemble_members(mut events: Vec<MemberEvent>) -> Result<MemberSet, GroupError> {
    events.sort_by_key(|e| (e.block_number, e.log_index));
    events.dedup_by_key(|e| (e.block_number, e.log_index));

    let mut commitments = Vec::with_capacity(events.len());
    for event in &events {
        let expected = U256::from(commitments.len());
        if event.index < expected {
            return Err(GroupError::ConflictingEvents(event.index));
        }
        if event.index != expected {
            return Err(GroupError::MemberSetGap {
                expected,
                found: event.index,
            });
        }
        commitments.push(event.commitment);
    }

    let last_event_root = events
        .last()
        .map(|e| e.merkle_tree_root)
        .ok_or(GroupError::Empty)?;
    let root = lean_imt_root(&commitments)?;

    if root != last_event_root {
        return Err(GroupError::StaleRoot {
            computed: root,
            expected: last_event_root,
        });
    }

    Ok(MemberSet {
        commitments,
        last_event_root,
        root,
    })
}

/// Poseidon hash of two field elements (circom parameters).
pub fn poseidon2(left: U256, right: U256) -> Result<U256, GroupError> {
    let mut hasher =
        Poseidon::<Fr>::new_circom(2).map_err(|e| GroupError::Poseidon(e.to_string()))?;
    let out = hasher
        .hash(&[to_field(left)?, to_field(right)?])
        .map_err(|e| GroupError::Poseidon(e.to_string()))?;
    Ok(from_field(&out))
}

/// Root of a Lean incremental Merkle tree.
///
/// Nodes are hashed pairwise level by level; a node without a right sibling
/// is carried up unchanged. A single leaf is its own root.
pub fn lean_imt_root(leaves: &[U256]) -> Result<U256, GroupError> {
    if leaves.is_empty() {
        return Err(GroupError::Empty);
    }

    let mut level = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        for pair in level.chunks(2) {
            match *pair {
                [left, right] => next.push(poseidon2(left, right)?),
                _ => next.push(pair[0]),
            }
        }
        level = next;
    }
    Ok(level[0])
}

/// Depth of a LeanIMT holding `size` leaves.
pub fn tree_depth(size: usize) -> usize {
    if size <= 1 {
        0
    } else {
        (usize::BITS - (size - 1).leading_zeros()) as usize
    }
}

pub(crate) fn to_field(value: U256) -> Result<Fr, GroupError> {
    if value >= SNARK_SCALAR_FIELD {
        return Err(GroupError::OutOfField(value));
    }
    Ok(Fr::from_be_bytes_mod_order(&value.to_be_bytes::<32>()))
}

pub(crate) fn from_field(value: &Fr) -> U256 {
    U256::from_be_slice(&value.into_bigint().to_bytes_be())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(block: u64, log: u64, index: u64, commitment: U256, root: U256) -> MemberEvent {
        MemberEvent {
            block_number: block,
            log_index: log,
            index: U256::from(index),
            commitment,
            merkle_tree_root: root,
        }
    }

    /// Events for members `commitments`, one per block, each carrying the
    /// root of the tree after its insertion.
    fn scenario(commitments: &[U256]) -> Vec<MemberEvent> {
        (0..commitments.len())
            .map(|i| {
                let root = lean_imt_root(&commitments[..=i]).unwrap();
                event(100 + i as u64, 0, i as u64, commitments[i], root)
            })
            .collect()
    }

    fn members(n: u64) -> Vec<U256> {
        (1..=n).map(|i| U256::from(i * 1000 + 7)).collect()
    }

    #[test]
    fn poseidon_matches_circom_vector() {
        let h = poseidon2(U256::from(1u64), U256::from(2u64)).unwrap();
        assert_eq!(
            h,
            uint!(0x115cc0f5e7d690413df64c6b9662e9cf2a3617f2743245519e19607a4417189a_U256)
        );
    }

    #[test]
    fn lean_imt_roots_for_small_groups() {
        let (a, b, c) = (U256::from(1u64), U256::from(2u64), U256::from(3u64));
        assert_eq!(lean_imt_root(&[a]).unwrap(), a);
        assert_eq!(lean_imt_root(&[a, b]).unwrap(), poseidon2(a, b).unwrap());
        assert_eq!(
            lean_imt_root(&[a, b, c]).unwrap(),
            poseidon2(poseidon2(a, b).unwrap(), c).unwrap()
        );
        assert!(matches!(lean_imt_root(&[]), Err(GroupError::Empty)));
    }

    #[test]
    fn depth_grows_with_log2() {
        assert_eq!(tree_depth(1), 0);
        assert_eq!(tree_depth(2), 1);
        assert_eq!(tree_depth(3), 2);
        assert_eq!(tree_depth(4), 2);
        assert_eq!(tree_depth(5), 3);
    }

    #[test]
    fn replaying_three_joins_yields_three_members() {
        let commitments = members(3);
        let set = assemble_members(scenario(&commitments)).unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.commitments, commitments);
        assert_eq!(set.root, set.last_event_root);
        assert_eq!(set.depth(), 2);
    }

    #[test]
    fn unordered_and_duplicated_events_are_normalized() {
        let commitments = members(4);
        let mut events = scenario(&commitments);
        events.reverse();
        events.push(events[1].clone());

        let set = assemble_members(events).unwrap();
        assert_eq!(set.commitments, commitments);
    }

    #[test]
    fn missing_event_is_a_gap() {
        let mut events = scenario(&members(3));
        events.remove(1);
        assert!(matches!(
            assemble_members(events),
            Err(GroupError::MemberSetGap { .. })
        ));
    }

    #[test]
    fn truncated_replay_is_a_gap() {
        // Range started after the first join.
        let events = scenario(&members(3)).split_off(1);
        assert!(matches!(
            assemble_members(events),
            Err(GroupError::MemberSetGap { .. })
        ));
    }

    #[test]
    fn wrong_event_root_is_stale() {
        let mut events = scenario(&members(2));
        events[1].merkle_tree_root = U256::from(42u64);
        assert!(matches!(
            assemble_members(events),
            Err(GroupError::StaleRoot { .. })
        ));
    }

    #[test]
    fn empty_replay_is_rejected() {
        assert!(matches!(assemble_members(vec![]), Err(GroupError::Empty)));
    }

    #[test]
    fn out_of_field_values_are_rejected() {
        assert!(matches!(
            poseidon2(SNARK_SCALAR_FIELD, U256::from(1u64)),
            Err(GroupError::OutOfField(_))
        ));
    }
}
