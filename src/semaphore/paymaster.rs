// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Semaphore-gated paymaster sponsorship.
//!
//! Builds the `paymasterData` a Semaphore paymaster expects: the owner's
//! identity is registered in the group (once, with a deposit), the group is
//! rebuilt from chain events, and a membership proof scoped to the sending
//! account is generated, verified and ABI-encoded.

use std::time::Duration;

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    rpc::types::{Filter, TransactionRequest},
    sol,
    sol_types::{SolCall, SolEvent, SolValue},
};
use tracing::{debug, info};

use super::group::{assemble_members, GroupError, MemberEvent, MemberSet};
use super::identity::{SemaphoreIdentity, SEMAPHORE_IDENTITY_MESSAGE};
use super::prover::{MembershipProver, ProverError, SemaphoreProof};
use crate::aa::PaymasterInfo;
use crate::blockchain::{ChainClient, ChainClientError};

sol! {
    #[sol(rpc)]
    interface ISemaphoreAdmin {
        function joinGroup(uint256 groupId, address semaphore, uint256 identityCommitment) external payable;
        function isMember(uint256 commitment) external view returns (bool);
    }

    #[sol(rpc)]
    interface ISemaphore {
        event MemberAdded(uint256 indexed groupId, uint256 index, uint256 identityCommitment, uint256 merkleTreeRoot);
        function getMerkleTreeRoot(uint256 groupId) external view returns (uint256);
    }

    /// Proof as laid out in the paymaster's calldata.
    struct PaymasterProof {
        uint256 merkleTreeDepth;
        uint256 merkleTreeRoot;
        uint256 nullifier;
        uint256 message;
        uint256 scope;
        uint256[8] points;
    }

    /// `paymasterData`: `(groupId, proof)`.
    struct PaymasterPayload {
        uint256 groupId;
        PaymasterProof proof;
    }
}

/// Deployment and tuning of the Semaphore paymaster.
#[derive(Debug, Clone)]
pub struct SemaphoreConfig {
    /// Group admin contract (`joinGroup`, `isMember`).
    pub admin: Address,
    /// Paymaster; also the Semaphore contract emitting `MemberAdded`.
    pub paymaster: Address,
    pub group_id: U256,
    /// Value sent with `joinGroup`.
    pub deposit_wei: U256,
    /// First block of the paymaster deployment.
    pub start_block: u64,
    /// Block span per `eth_getLogs` request.
    pub log_chunk_size: u64,
    /// `isMember` polls after a join before giving up.
    pub membership_retries: u32,
    /// First delay between membership polls; doubled each attempt.
    pub membership_backoff: Duration,
}

impl SemaphoreConfig {
    pub const DEFAULT_LOG_CHUNK_SIZE: u64 = 50_000;
    pub const DEFAULT_MEMBERSHIP_RETRIES: u32 = 6;
    pub const DEFAULT_MEMBERSHIP_BACKOFF: Duration = Duration::from_millis(500);
}

#[derive(Debug, thiserror::Error)]
pub enum PaymasterError {
    #[error(transparent)]
    Chain(#[from] ChainClientError),

    #[error(transparent)]
    Prover(#[from] ProverError),

    #[error(transparent)]
    Group(#[from] GroupError),

    #[error("Join transaction {0} reverted")]
    JoinReverted(String),

    #[error("Membership not confirmed after {attempts} attempts")]
    MembershipNotConfirmed { attempts: u32 },

    #[error("Identity commitment {0:#x} missing from replayed member set")]
    IdentityNotInGroup(U256),

    #[error("MemberAdded log {0} has no block position")]
    UnminedLog(String),

    #[error("Stale root: replayed {replayed:#x}, on-chain {onchain:#x}")]
    StaleRoot { replayed: U256, onchain: U256 },

    #[error("Proof failed local verification")]
    ProofRejected,
}

/// Assembles Semaphore paymaster sponsorship for one transfer.
pub struct PaymasterProofAssembler<P> {
    config: SemaphoreConfig,
    prover: P,
}

impl<P: MembershipProver> PaymasterProofAssembler<P> {
    pub fn new(config: SemaphoreConfig, prover: P) -> Self {
        Self { config, prover }
    }

    pub fn config(&self) -> &SemaphoreConfig {
        &self.config
    }

    /// Full pipeline: identity, membership, replay, proof.
    pub async fn build(
        &self,
        chain: &ChainClient,
        sender: Address,
    ) -> Result<PaymasterInfo, PaymasterError> {
        let identity = self.identity(chain)?;
        let commitment = self.prover.commitment(&identity).await?;
        debug!(commitment = %commitment, "Derived Semaphore identity");

        self.ensure_membership(chain, commitment).await?;
        let members = self.fetch_members(chain).await?;
        if !members.contains(commitment) {
            return Err(PaymasterError::IdentityNotInGroup(commitment));
        }

        self.prove(&identity, &members, sender).await
    }

    /// Identity derived from the owner's signature.
    pub fn identity(&self, chain: &ChainClient) -> Result<SemaphoreIdentity, PaymasterError> {
        let signature = chain.sign_owner_message(SEMAPHORE_IDENTITY_MESSAGE.as_bytes())?;
        Ok(SemaphoreIdentity::from_signature(&signature))
    }

    /// Join the group if needed and wait until membership is visible.
    ///
    /// Returns `true` if a join transaction was sent.
    pub async fn ensure_membership(
        &self,
        chain: &ChainClient,
        commitment: U256,
    ) -> Result<bool, PaymasterError> {
        if self.is_member(chain, commitment).await? {
            return Ok(false);
        }

        info!(
            group_id = %self.config.group_id,
            deposit_wei = %self.config.deposit_wei,
            "Identity not in group, joining"
        );

        let call = ISemaphoreAdmin::joinGroupCall {
            groupId: self.config.group_id,
            semaphore: self.config.paymaster,
            identityCommitment: commitment,
        };
        let tx = TransactionRequest::default()
            .to(self.config.admin)
            .value(self.config.deposit_wei)
            .input(Bytes::from(call.abi_encode()).into());

        let receipt = chain.send_owner_transaction(tx).await?;
        if !receipt.success {
            return Err(PaymasterError::JoinReverted(receipt.tx_hash.to_string()));
        }

        let mut delay = self.config.membership_backoff;
        for attempt in 1..=self.config.membership_retries {
            if self.is_member(chain, commitment).await? {
                info!(attempts = attempt, "Group membership confirmed");
                return Ok(true);
            }
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Membership not visible yet");
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
        }

        Err(PaymasterError::MembershipNotConfirmed {
            attempts: self.config.membership_retries,
        })
    }

    async fn is_member(&self, chain: &ChainClient, commitment: U256) -> Result<bool, PaymasterError> {
        ISemaphoreAdmin::new(self.config.admin, chain.provider().clone())
            .isMember(commitment)
            .call()
            .await
            .map_err(|e| ChainClientError::ContractError(e.to_string()).into())
    }

    /// Replay `MemberAdded` events from the start block to the current head
    /// and check the result against the contract's root at that head.
    pub async fn fetch_members(&self, chain: &ChainClient) -> Result<MemberSet, PaymasterError> {
        let head = chain.get_block_number().await?;
        let mut events = Vec::new();

        for (from, to) in block_chunks(self.config.start_block, head, self.config.log_chunk_size) {
            let filter = Filter::new()
                .address(self.config.paymaster)
                .event_signature(ISemaphore::MemberAdded::SIGNATURE_HASH)
                .topic1(B256::from(self.config.group_id))
                .from_block(from)
                .to_block(to);

            for log in chain.get_logs(&filter).await? {
                let (Some(block_number), Some(log_index)) = (log.block_number, log.log_index) else {
                    let tx = log
                        .transaction_hash
                        .map(|hash| hash.to_string())
                        .unwrap_or_else(|| "without hash".to_string());
                    return Err(PaymasterError::UnminedLog(tx));
                };
                let decoded = log
                    .log_decode::<ISemaphore::MemberAdded>()
                    .map_err(|e| ChainClientError::ContractError(e.to_string()))?;
                let event = decoded.inner.data;
                events.push(MemberEvent {
                    block_number,
                    log_index,
                    index: event.index,
                    commitment: event.identityCommitment,
                    merkle_tree_root: event.merkleTreeRoot,
                });
            }
        }

        let members = assemble_members(events)?;

        let onchain = ISemaphore::new(self.config.paymaster, chain.provider().clone())
            .getMerkleTreeRoot(self.config.group_id)
            .block(head.into())
            .call()
            .await
            .map_err(|e| ChainClientError::ContractError(e.to_string()))?;
        if onchain != members.root {
            return Err(PaymasterError::StaleRoot {
                replayed: members.root,
                onchain,
            });
        }

        info!(members = members.len(), root = %members.root, "Replayed Semaphore group");
        Ok(members)
    }

    /// Generate, verify and encode a proof for `sender`.
    pub async fn prove(
        &self,
        identity: &SemaphoreIdentity,
        members: &MemberSet,
        sender: Address,
    ) -> Result<PaymasterInfo, PaymasterError> {
        let message = U256::from_be_slice(sender.as_slice());
        let proof = self
            .prover
            .generate_proof(identity, &members.commitments, message, self.config.group_id)
            .await?;

        if proof.merkle_tree_root != members.root {
            return Err(PaymasterError::StaleRoot {
                replayed: members.root,
                onchain: proof.merkle_tree_root,
            });
        }
        if !self.prover.verify_proof(&proof).await? {
            return Err(PaymasterError::ProofRejected);
        }

        Ok(PaymasterInfo::with_cushion(
            self.config.paymaster,
            encode_paymaster_data(self.config.group_id, &proof),
        ))
    }
}

/// ABI-encode `(groupId, (depth, root, nullifier, message, scope, points))`.
pub fn encode_paymaster_data(group_id: U256, proof: &SemaphoreProof) -> Bytes {
    PaymasterPayload {
        groupId: group_id,
        proof: PaymasterProof {
            merkleTreeDepth: U256::from(proof.merkle_tree_depth),
            merkleTreeRoot: proof.merkle_tree_root,
            nullifier: proof.nullifier,
            message: proof.message,
            scope: proof.scope,
            points: proof.points,
        },
    }
    .abi_encode()
    .into()
}

/// Split `[from, to]` into contiguous, non-overlapping inclusive ranges.
fn block_chunks(from: u64, to: u64, size: u64) -> Vec<(u64, u64)> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = from;
    while start <= to {
        let end = start.saturating_add(size - 1).min(to);
        chunks.push((start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }
    chunks
}
