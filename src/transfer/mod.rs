// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! USDC sweeps from stealth Kernel accounts.
//!
//! A sweep is assembled synchronously (so "nothing to transfer" can be
//! reported immediately) and then driven to a terminal state by
//! [`run_sweep`] in a background task.

pub mod assembler;
pub mod state;
pub mod submitter;

use std::sync::Arc;

use alloy::primitives::{Address, B256};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::semaphore::MembershipProver;
use crate::store::TransferStore;

pub use assembler::{assemble, prepare_sweep, TransferCall};
pub use state::{TransferEvent, TransferRecord, TransferStatus};
pub use submitter::{
    Sponsorship, SubmitError, SubmitOutcome, SubmitReport, TransactionSubmitter,
    DEFAULT_CONFIRMATION_TIMEOUT,
};

/// Everything a background sweep needs, owned.
pub struct SweepJob {
    pub id: Uuid,
    /// Stealth address owning the Kernel account.
    pub owner: Address,
    pub signing_key: B256,
    pub call: TransferCall,
}

/// Drive an assembled sweep through submission to a terminal state.
///
/// The record must already be in `Assembling`.
pub async fn run_sweep<P: MembershipProver>(
    submitter: Arc<TransactionSubmitter<P>>,
    store: Arc<RwLock<TransferStore>>,
    job: SweepJob,
) {
    let id = job.id;
    match drive(&submitter, &store, &job).await {
        Ok(report) => {
            let event = match report.outcome {
                SubmitOutcome::Confirmed {
                    tx_hash,
                    block_number,
                } => {
                    info!(transfer_id = %id, tx_hash = %tx_hash, block_number, "Sweep confirmed");
                    TransferEvent::Confirmed {
                        tx_hash: format!("{tx_hash:#x}"),
                        block_number,
                        tx_url: submitter
                            .chain()
                            .network()
                            .tx_url(&format!("{tx_hash:#x}")),
                    }
                }
                SubmitOutcome::Reverted { reason } => {
                    warn!(transfer_id = %id, reason = ?reason, "Sweep reverted");
                    TransferEvent::Reverted { reason }
                }
                SubmitOutcome::TimedOut => {
                    warn!(
                        transfer_id = %id,
                        user_op_hash = %report.user_op_hash,
                        "Sweep not included before timeout"
                    );
                    TransferEvent::TimedOut
                }
            };
            record(&store, &id, event).await;
        }
        Err(e) => {
            error!(transfer_id = %id, error = %e, "Sweep failed");
            record(
                &store,
                &id,
                TransferEvent::Failed {
                    error: e.to_string(),
                },
            )
            .await;
        }
    }
}

async fn drive<P: MembershipProver>(
    submitter: &TransactionSubmitter<P>,
    store: &RwLock<TransferStore>,
    job: &SweepJob,
) -> Result<SubmitReport, SubmitError> {
    if submitter.sponsorship().requires_proof() {
        record(store, &job.id, TransferEvent::ProofRequested).await;
    }

    let mut op = submitter.build_user_op(job.owner, &job.call).await?;
    submitter.sponsor_and_estimate(&mut op).await?;

    record(store, &job.id, TransferEvent::Submitting).await;
    let user_op_hash = submitter
        .sign_and_send(op, job.owner, &job.signing_key)
        .await?;

    let explorer_url = submitter
        .chain()
        .network()
        .user_op_url(&format!("{user_op_hash:#x}"));
    record(
        store,
        &job.id,
        TransferEvent::Sent {
            user_op_hash: format!("{user_op_hash:#x}"),
            explorer_url,
        },
    )
    .await;

    submitter.await_inclusion(user_op_hash).await
}

async fn record(store: &RwLock<TransferStore>, id: &Uuid, event: TransferEvent) {
    if let Err(e) = store.write().await.apply(id, event) {
        warn!(transfer_id = %id, error = %e.message, "Dropped transfer event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aa::BundlerClient;
    use crate::blockchain::{ChainClient, NetworkConfig, SEPOLIA_CHAIN_ID};
    use crate::kernel::KernelConfig;
    use crate::semaphore::HttpMembershipProver;
    use alloy::primitives::{Bytes, U256};
    use std::time::Duration;

    #[tokio::test]
    async fn unreachable_chain_fails_the_sweep() {
        let network = NetworkConfig {
            name: "local".to_string(),
            chain_id: SEPOLIA_CHAIN_ID,
            rpc_url: "http://127.0.0.1:9".parse().unwrap(),
            explorer_url: "http://explorer.local".to_string(),
            user_op_explorer_url: "http://ops.local".to_string(),
        };
        let kernel = KernelConfig::default();
        let submitter: Arc<TransactionSubmitter<HttpMembershipProver>> =
            Arc::new(TransactionSubmitter::new(
                Arc::new(ChainClient::new(network, None)),
                BundlerClient::new("http://127.0.0.1:9".parse().unwrap(), kernel.entry_point),
                kernel,
                Sponsorship::None,
            ));

        let store = Arc::new(RwLock::new(TransferStore::new()));
        let mut rec = TransferRecord::new(
            "0xk".into(),
            "0xs".into(),
            "0xd".into(),
            "0xt".into(),
            "none".into(),
        );
        rec.apply(TransferEvent::Start).unwrap();
        let id = store.write().await.insert(rec).unwrap();

        let job = SweepJob {
            id,
            owner: Address::repeat_byte(0x01),
            signing_key: B256::repeat_byte(0x07),
            call: TransferCall {
                kernel: Address::repeat_byte(0x4b),
                token: Address::repeat_byte(0x1c),
                to: Address::repeat_byte(0xde),
                amount: U256::from(1u64),
                call_data: Bytes::new(),
            },
        };

        tokio::time::timeout(Duration::from_secs(30), run_sweep(submitter, store.clone(), job))
            .await
            .unwrap();

        let rec = store.read().await.get(&id).unwrap();
        assert_eq!(rec.status, TransferStatus::Failed);
        assert!(rec.error.is_some());
        assert!(rec.user_op_hash.is_none());
    }
}
