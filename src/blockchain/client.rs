// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ethereum JSON-RPC client for chain reads and owner-signed transactions.

use std::time::Duration;

use alloy::{
    network::EthereumWallet,
    primitives::{Address, Bytes, Signature, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{Filter, Log, TransactionRequest},
    signers::{local::PrivateKeySigner, SignerSync},
};

use super::erc20::Erc20Contract;
use super::types::*;

/// Default interval between receipt polls for owner transactions.
const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default bound on waiting for an owner transaction to be mined.
const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(180);

/// Chain client.
///
/// Holds a read-only provider and, when an owner key is configured, a second
/// provider with a wallet filler for transactions signed by the owner.
pub struct ChainClient {
    /// Network configuration
    network: NetworkConfig,
    /// Read-only provider
    provider: DynProvider,
    /// Owner signer and its wallet-enabled provider
    owner: Option<(PrivateKeySigner, DynProvider)>,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl ChainClient {
    /// Create a new client for the specified network.
    pub fn new(network: NetworkConfig, owner: Option<PrivateKeySigner>) -> Self {
        let provider = ProviderBuilder::new()
            .connect_http(network.rpc_url.clone())
            .erased();

        let owner = owner.map(|signer| {
            let wallet = EthereumWallet::from(signer.clone());
            let provider = ProviderBuilder::new()
                .wallet(wallet)
                .connect_http(network.rpc_url.clone())
                .erased();
            (signer, provider)
        });

        Self {
            network,
            provider,
            owner,
            receipt_poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    /// Override receipt polling for owner transactions.
    pub fn with_receipt_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self.receipt_timeout = timeout;
        self
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Read-only provider.
    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    /// Provider that signs with the owner key.
    pub fn owner_provider(&self) -> Result<&DynProvider, ChainClientError> {
        self.owner
            .as_ref()
            .map(|(_, provider)| provider)
            .ok_or(ChainClientError::NoOwnerSigner)
    }

    /// Address of the configured owner key, if any.
    pub fn owner_address(&self) -> Option<Address> {
        self.owner.as_ref().map(|(signer, _)| signer.address())
    }

    /// EIP-191 sign a message with the owner key.
    pub fn sign_owner_message(&self, message: &[u8]) -> Result<Signature, ChainClientError> {
        let (signer, _) = self.owner.as_ref().ok_or(ChainClientError::NoOwnerSigner)?;
        signer
            .sign_message_sync(message)
            .map_err(|e| ChainClientError::SigningFailed(e.to_string()))
    }

    /// Get the current block number.
    pub async fn get_block_number(&self) -> Result<u64, ChainClientError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainClientError::RpcError(e.to_string()))
    }

    /// Whether an address has deployed code.
    pub async fn is_deployed(&self, address: Address) -> Result<bool, ChainClientError> {
        let code: Bytes = self
            .provider
            .get_code_at(address)
            .await
            .map_err(|e| ChainClientError::RpcError(e.to_string()))?;
        Ok(!code.is_empty())
    }

    /// Raw ERC-20 balance of `account`.
    pub async fn token_balance(
        &self,
        token: Address,
        account: Address,
    ) -> Result<U256, ChainClientError> {
        Erc20Contract::new(&self.provider, token)
            .balance_of(account)
            .await
    }

    /// Fetch logs matching a filter.
    pub async fn get_logs(&self, filter: &Filter) -> Result<Vec<Log>, ChainClientError> {
        self.provider
            .get_logs(filter)
            .await
            .map_err(|e| ChainClientError::RpcError(e.to_string()))
    }

    /// Current EIP-1559 fees as `(max_fee_per_gas, max_priority_fee_per_gas)`.
    pub async fn fee_estimate(&self) -> Result<(u128, u128), ChainClientError> {
        let fees = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(|e| ChainClientError::RpcError(format!("Fee estimation failed: {}", e)))?;
        Ok((fees.max_fee_per_gas, fees.max_priority_fee_per_gas))
    }

    /// Send a transaction signed by the owner key and wait for its receipt.
    ///
    /// Nonce, gas and fees are filled here, so the send itself is a single
    /// `eth_sendRawTransaction`. A mined but reverted transaction is returned
    /// with `success: false`; one not mined before the timeout is an error.
    pub async fn send_owner_transaction(
        &self,
        tx: TransactionRequest,
    ) -> Result<TxReceipt, ChainClientError> {
        let owner_provider = self.owner_provider()?;
        let from = self.owner_address().ok_or(ChainClientError::NoOwnerSigner)?;

        let mut tx = tx.from(from);
        tx.chain_id = Some(self.network.chain_id);
        tx.nonce = Some(
            self.provider
                .get_transaction_count(from)
                .pending()
                .await
                .map_err(|e| ChainClientError::RpcError(format!("Nonce lookup failed: {}", e)))?,
        );
        tx.gas = Some(
            self.provider
                .estimate_gas(tx.clone())
                .await
                .map_err(|e| ChainClientError::TransactionFailed(format!("Gas estimation failed: {}", e)))?,
        );
        let (max_fee, priority_fee) = self.fee_estimate().await?;
        tx.max_fee_per_gas = Some(max_fee);
        tx.max_priority_fee_per_gas = Some(priority_fee);

        let pending = owner_provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainClientError::TransactionFailed(format!("Failed to send: {}", e)))?;

        let tx_hash = *pending.tx_hash();
        tracing::info!(tx_hash = %tx_hash, "Owner transaction sent");

        let deadline = tokio::time::Instant::now() + self.receipt_timeout;
        loop {
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .map_err(|e| {
                    ChainClientError::RpcError(format!("Failed to get receipt for {}: {}", tx_hash, e))
                })?;

            if let Some(receipt) = receipt {
                return Ok(TxReceipt {
                    tx_hash,
                    block_number: receipt.block_number.unwrap_or(0),
                    success: receipt.status(),
                });
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(ChainClientError::TransactionFailed(format!(
                    "{} not mined within {}s",
                    tx_hash,
                    self.receipt_timeout.as_secs()
                )));
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }

    /// Create a signer from a private key (hex string, with or without 0x prefix).
    pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, ChainClientError> {
        let key_bytes = alloy::hex::decode(private_key_hex.trim())
            .map_err(|e| ChainClientError::InvalidPrivateKey(e.to_string()))?;

        PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| ChainClientError::InvalidPrivateKey(e.to_string()))
    }
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainClientError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("No owner signer configured")]
    NoOwnerSigner,

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Contract error: {0}")]
    ContractError(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}
