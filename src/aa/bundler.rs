// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERC-4337 bundler JSON-RPC client.

use std::time::Duration;

use alloy::{
    primitives::{Address, B256, U256, U64},
    providers::{DynProvider, Provider, ProviderBuilder},
};
use serde::Deserialize;
use url::Url;

use super::user_op::UserOperation;

/// Default interval between `eth_getUserOperationReceipt` polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Gas limits returned by `eth_estimateUserOperationGas`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOpGasEstimate {
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
    #[serde(default)]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default)]
    pub paymaster_post_op_gas_limit: Option<U256>,
}

impl UserOpGasEstimate {
    /// Copy the estimated limits onto an operation. Paymaster limits already
    /// set by the sponsor are kept when they are larger.
    pub fn apply(&self, op: &mut UserOperation) {
        op.pre_verification_gas = self.pre_verification_gas;
        op.verification_gas_limit = self.verification_gas_limit;
        op.call_gas_limit = self.call_gas_limit;

        if op.paymaster.is_some() {
            op.paymaster_verification_gas_limit = max_opt(
                op.paymaster_verification_gas_limit,
                self.paymaster_verification_gas_limit,
            );
            op.paymaster_post_op_gas_limit = max_opt(
                op.paymaster_post_op_gas_limit,
                self.paymaster_post_op_gas_limit,
            );
        }
    }
}

fn max_opt(a: Option<U256>, b: Option<U256>) -> Option<U256> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Inner transaction receipt of an included user operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InclusionReceipt {
    pub transaction_hash: B256,
    pub block_number: U64,
}

/// Result of `eth_getUserOperationReceipt`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOpReceipt {
    pub user_op_hash: B256,
    pub success: bool,
    #[serde(default)]
    pub reason: Option<String>,
    pub receipt: InclusionReceipt,
}

/// Bundler client bound to one EntryPoint.
pub struct BundlerClient {
    provider: DynProvider,
    entry_point: Address,
    poll_interval: Duration,
}

impl BundlerClient {
    /// Create a client for the bundler at `url`.
    pub fn new(url: Url, entry_point: Address) -> Self {
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Self {
            provider,
            entry_point,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the receipt polling interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn entry_point(&self) -> Address {
        self.entry_point
    }

    /// `eth_estimateUserOperationGas`.
    pub async fn estimate_gas(
        &self,
        op: &UserOperation,
    ) -> Result<UserOpGasEstimate, BundlerError> {
        self.provider
            .raw_request(
                "eth_estimateUserOperationGas".into(),
                (op.clone(), self.entry_point),
            )
            .await
            .map_err(|e| BundlerError::Estimate(e.to_string()))
    }

    /// `eth_sendUserOperation`; returns the user operation hash.
    pub async fn send(&self, op: &UserOperation) -> Result<B256, BundlerError> {
        self.provider
            .raw_request(
                "eth_sendUserOperation".into(),
                (op.clone(), self.entry_point),
            )
            .await
            .map_err(|e| BundlerError::Rejected(e.to_string()))
    }

    /// `eth_getUserOperationReceipt`; `None` while the operation is pending.
    pub async fn get_receipt(&self, hash: B256) -> Result<Option<UserOpReceipt>, BundlerError> {
        self.provider
            .raw_request("eth_getUserOperationReceipt".into(), (hash,))
            .await
            .map_err(|e| BundlerError::Rpc(e.to_string()))
    }

    /// Poll for a receipt until it appears or `timeout` elapses.
    ///
    /// Returns `Ok(None)` on timeout: the operation may still be included
    /// later. Transient RPC errors while polling are logged and retried.
    pub async fn wait_for_receipt(
        &self,
        hash: B256,
        timeout: Duration,
    ) -> Result<Option<UserOpReceipt>, BundlerError> {
        let poll = async {
            loop {
                match self.get_receipt(hash).await {
                    Ok(Some(receipt)) => return receipt,
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(user_op_hash = %hash, error = %e, "Receipt poll failed, will retry");
                    }
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(receipt) => Ok(Some(receipt)),
            Err(_) => Ok(None),
        }
    }
}

/// Errors returned by the bundler.
#[derive(Debug, thiserror::Error)]
pub enum BundlerError {
    #[error("Gas estimation failed: {0}")]
    Estimate(String),

    #[error("Bundler rejected user operation: {0}")]
    Rejected(String),

    #[error("Bundler RPC error: {0}")]
    Rpc(String),
}
