// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Semaphore group membership for paymaster-gated sponsorship.

pub mod group;
pub mod identity;
pub mod paymaster;
pub mod prover;

pub use group::{assemble_members, lean_imt_root, poseidon2, GroupError, MemberEvent, MemberSet};
pub use identity::{SemaphoreIdentity, SEMAPHORE_IDENTITY_MESSAGE};
pub use paymaster::{
    encode_paymaster_data, PaymasterError, PaymasterProofAssembler, SemaphoreConfig,
};
pub use prover::{HttpMembershipProver, MembershipProver, ProverError, SemaphoreProof};
