// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Paymaster sponsorship data and the ERC-7677 paymaster service client.
//!
//! ERC-7677 is a two-step exchange: `pm_getPaymasterStubData` supplies
//! placeholder sponsorship so the bundler can simulate and estimate a
//! sponsored operation, then `pm_getPaymasterData` signs over the final
//! gas limits. A stub marked `isFinal` is already the real sponsorship.

use alloy::{
    primitives::{Address, Bytes, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
};
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::user_op::UserOperation;

/// Gas cushion applied to paymaster verification and post-op phases.
pub const PAYMASTER_GAS_CUSHION: u64 = 2_000_000;

/// Sponsorship attached to a user operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymasterInfo {
    pub paymaster: Address,
    pub data: Bytes,
    pub verification_gas_limit: U256,
    pub post_op_gas_limit: U256,
}

impl PaymasterInfo {
    /// Sponsorship with the fixed gas cushions.
    pub fn with_cushion(paymaster: Address, data: Bytes) -> Self {
        Self {
            paymaster,
            data,
            verification_gas_limit: U256::from(PAYMASTER_GAS_CUSHION),
            post_op_gas_limit: U256::from(PAYMASTER_GAS_CUSHION),
        }
    }

    /// Write the paymaster fields of an operation.
    pub fn apply(&self, op: &mut UserOperation) {
        op.paymaster = Some(self.paymaster);
        op.paymaster_data = Some(self.data.clone());
        op.paymaster_verification_gas_limit = Some(self.verification_gas_limit);
        op.paymaster_post_op_gas_limit = Some(self.post_op_gas_limit);
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymasterDataResponse {
    paymaster: Address,
    paymaster_data: Bytes,
    #[serde(default)]
    paymaster_verification_gas_limit: Option<U256>,
    #[serde(default)]
    paymaster_post_op_gas_limit: Option<U256>,
    #[serde(default)]
    is_final: bool,
}

impl PaymasterDataResponse {
    /// Limits missing from the response keep the operation's current ones,
    /// else the cushion.
    fn into_info(self, op: &UserOperation) -> PaymasterInfo {
        let cushion = U256::from(PAYMASTER_GAS_CUSHION);
        PaymasterInfo {
            paymaster: self.paymaster,
            data: self.paymaster_data,
            verification_gas_limit: self
                .paymaster_verification_gas_limit
                .or(op.paymaster_verification_gas_limit)
                .unwrap_or(cushion),
            post_op_gas_limit: self
                .paymaster_post_op_gas_limit
                .or(op.paymaster_post_op_gas_limit)
                .unwrap_or(cushion),
        }
    }
}

/// Placeholder sponsorship from `pm_getPaymasterStubData`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymasterStub {
    pub info: PaymasterInfo,
    /// The stub is the final sponsorship; skip `pm_getPaymasterData`.
    pub is_final: bool,
}

/// Client for an ERC-7677 paymaster web service.
pub struct Erc7677Client {
    provider: DynProvider,
    entry_point: Address,
    chain_id: u64,
}

impl Erc7677Client {
    pub fn new(url: Url, entry_point: Address, chain_id: u64) -> Self {
        Self {
            provider: ProviderBuilder::new().connect_http(url).erased(),
            entry_point,
            chain_id,
        }
    }

    async fn request(
        &self,
        method: &'static str,
        op: &UserOperation,
    ) -> Result<PaymasterDataResponse, PaymasterServiceError> {
        let params = (
            op.clone(),
            self.entry_point,
            format!("{:#x}", self.chain_id),
            json!({}),
        );
        self.provider
            .raw_request(method.into(), params)
            .await
            .map_err(|e| PaymasterServiceError::Rpc(format!("{method}: {e}")))
    }

    /// `pm_getPaymasterStubData` for an operation about to be estimated.
    pub async fn get_paymaster_stub_data(
        &self,
        op: &UserOperation,
    ) -> Result<PaymasterStub, PaymasterServiceError> {
        let resp = self.request("pm_getPaymasterStubData", op).await?;
        let is_final = resp.is_final;
        Ok(PaymasterStub {
            info: resp.into_info(op),
            is_final,
        })
    }

    /// `pm_getPaymasterData` for a gas-estimated operation.
    pub async fn get_paymaster_data(
        &self,
        op: &UserOperation,
    ) -> Result<PaymasterInfo, PaymasterServiceError> {
        Ok(self.request("pm_getPaymasterData", op).await?.into_info(op))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaymasterServiceError {
    #[error("Paymaster service error: {0}")]
    Rpc(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_sets_all_paymaster_fields() {
        let info = PaymasterInfo::with_cushion(Address::repeat_byte(0xba), Bytes::from(vec![1, 2]));
        let mut op = UserOperation::new(Address::ZERO, U256::ZERO, Bytes::new());
        info.apply(&mut op);

        assert_eq!(op.paymaster, Some(Address::repeat_byte(0xba)));
        assert_eq!(op.paymaster_data, Some(Bytes::from(vec![1, 2])));
        assert_eq!(op.paymaster_verification_gas_limit, Some(U256::from(2_000_000u64)));
        assert_eq!(op.paymaster_post_op_gas_limit, Some(U256::from(2_000_000u64)));
    }

    #[test]
    fn service_response_falls_back_to_cushion() {
        let resp: PaymasterDataResponse = serde_json::from_value(serde_json::json!({
            "paymaster": "0x00000000000000000000000000000000000000ba",
            "paymasterData": "0xdeadbeef",
            "paymasterPostOpGasLimit": "0x1"
        }))
        .unwrap();
        assert!(!resp.is_final);
        let op = UserOperation::new(Address::ZERO, U256::ZERO, Bytes::new());
        let info = resp.into_info(&op);
        assert_eq!(info.data, Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(info.verification_gas_limit, U256::from(PAYMASTER_GAS_CUSHION));
        assert_eq!(info.post_op_gas_limit, U256::from(1u64));
    }

    #[test]
    fn final_data_keeps_estimated_limits() {
        let resp: PaymasterDataResponse = serde_json::from_value(serde_json::json!({
            "paymaster": "0x00000000000000000000000000000000000000ba",
            "paymasterData": "0x02"
        }))
        .unwrap();
        let mut op = UserOperation::new(Address::ZERO, U256::ZERO, Bytes::new());
        op.paymaster_verification_gas_limit = Some(U256::from(70_000u64));
        op.paymaster_post_op_gas_limit = Some(U256::from(30_000u64));

        let info = resp.into_info(&op);
        assert_eq!(info.verification_gas_limit, U256::from(70_000u64));
        assert_eq!(info.post_op_gas_limit, U256::from(30_000u64));
    }
}
