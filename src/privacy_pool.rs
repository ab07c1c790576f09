// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Privacy-pool deposits.
//!
//! A deposit commits to a random `(nullifier, secret)` pair through
//! `Poseidon(nullifier, secret)`. The note is returned to the caller and
//! never stored: losing it forfeits the deposit.

use alloy::{
    primitives::{Address, Bytes, U256},
    rpc::types::TransactionRequest,
    sol,
    sol_types::SolCall,
};
use ark_ff::PrimeField;
use rand::RngCore;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::blockchain::{ChainClient, ChainClientError};
use crate::semaphore::group::{from_field, poseidon2, GroupError};

sol! {
    interface IPrivacyPoolEntrypoint {
        function deposit(uint256 precommitmentHash) external payable;
    }
}

/// Secret material of one deposit.
#[derive(Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct DepositNote {
    /// Decimal nullifier.
    pub nullifier: String,
    /// Decimal secret.
    pub secret: String,
    /// `Poseidon(nullifier, secret)` as 0x-hex.
    pub precommitment: String,
    #[serde(skip)]
    precommitment_value: U256,
}

impl std::fmt::Debug for DepositNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepositNote")
            .field("precommitment", &self.precommitment)
            .finish_non_exhaustive()
    }
}

impl DepositNote {
    pub fn from_parts(nullifier: U256, secret: U256) -> Result<Self, DepositError> {
        let precommitment = poseidon2(nullifier, secret)?;
        Ok(Self {
            nullifier: nullifier.to_string(),
            secret: secret.to_string(),
            precommitment: format!("{precommitment:#x}"),
            precommitment_value: precommitment,
        })
    }

    /// Fresh note with nullifier and secret sampled below the BN254 field.
    pub fn random() -> Result<Self, DepositError> {
        Self::from_parts(random_field_element(), random_field_element())
    }

    pub fn precommitment_value(&self) -> U256 {
        self.precommitment_value
    }
}

/// Result of a mined deposit.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DepositReceipt {
    pub tx_hash: String,
    pub explorer_url: String,
    pub block_number: u64,
    pub value_wei: String,
    pub note: DepositNote,
}

#[derive(Debug, thiserror::Error)]
pub enum DepositError {
    #[error(transparent)]
    Chain(#[from] ChainClientError),

    #[error("Precommitment hashing failed: {0}")]
    Hash(#[from] GroupError),

    #[error("Deposit transaction {0} reverted")]
    Reverted(String),
}

/// Owner-funded deposits into the privacy pool entrypoint.
pub struct PrivacyPool {
    entrypoint: Address,
    deposit_wei: U256,
}

impl PrivacyPool {
    pub fn new(entrypoint: Address, deposit_wei: U256) -> Self {
        Self {
            entrypoint,
            deposit_wei,
        }
    }

    /// Calldata for `deposit(precommitment)`.
    pub fn deposit_calldata(precommitment: U256) -> Bytes {
        IPrivacyPoolEntrypoint::depositCall {
            precommitmentHash: precommitment,
        }
        .abi_encode()
        .into()
    }

    /// Create a note, send the deposit from the owner and wait for the receipt.
    pub async fn deposit(&self, chain: &ChainClient) -> Result<DepositReceipt, DepositError> {
        let note = DepositNote::random()?;
        let tx = TransactionRequest::default()
            .to(self.entrypoint)
            .value(self.deposit_wei)
            .input(Self::deposit_calldata(note.precommitment_value()).into());

        let receipt = chain.send_owner_transaction(tx).await?;
        let tx_hash = format!("{:#x}", receipt.tx_hash);
        if !receipt.success {
            return Err(DepositError::Reverted(tx_hash));
        }

        info!(tx_hash = %tx_hash, block_number = receipt.block_number, "Privacy pool deposit mined");
        Ok(DepositReceipt {
            explorer_url: chain.network().tx_url(&tx_hash),
            tx_hash,
            block_number: receipt.block_number,
            value_wei: self.deposit_wei.to_string(),
            note,
        })
    }
}

fn random_field_element() -> U256 {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    let field = ark_bn254::Fr::from_be_bytes_mod_order(&bytes);
    from_field(&field)
}
