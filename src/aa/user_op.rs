// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EntryPoint v0.7 user operations.
//!
//! The bundler RPC speaks the unpacked JSON form; the EntryPoint hashes the
//! packed form, where `initCode`, `accountGasLimits`, `gasFees` and
//! `paymasterAndData` are concatenations of the unpacked fields.

use alloy::{
    primitives::{hex, keccak256, Address, Bytes, B256, U256},
    sol_types::SolValue,
};
use serde::{Deserialize, Serialize};

/// Placeholder ECDSA signature accepted by the Kernel validator during gas
/// estimation.
pub const DUMMY_ECDSA_SIGNATURE: [u8; 65] = hex!(
    "fffffffffffffffffffffffffffffff000000000000000000000000000000000"
    "7aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
    "1c"
);

/// Unpacked v0.7 user operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    pub signature: Bytes,
}

impl UserOperation {
    /// New operation with zeroed gas fields and the dummy signature.
    pub fn new(sender: Address, nonce: U256, call_data: Bytes) -> Self {
        Self {
            sender,
            nonce,
            factory: None,
            factory_data: None,
            call_data,
            call_gas_limit: U256::ZERO,
            verification_gas_limit: U256::ZERO,
            pre_verification_gas: U256::ZERO,
            max_fee_per_gas: U256::ZERO,
            max_priority_fee_per_gas: U256::ZERO,
            paymaster: None,
            paymaster_verification_gas_limit: None,
            paymaster_post_op_gas_limit: None,
            paymaster_data: None,
            signature: Bytes::from_static(&DUMMY_ECDSA_SIGNATURE),
        }
    }

    /// `factory || factoryData`, empty for deployed accounts.
    pub fn init_code(&self) -> Bytes {
        match self.factory {
            Some(factory) => {
                let mut code = factory.to_vec();
                if let Some(data) = &self.factory_data {
                    code.extend_from_slice(data);
                }
                code.into()
            }
            None => Bytes::new(),
        }
    }

    /// `verificationGasLimit (16 bytes) || callGasLimit (16 bytes)`.
    pub fn account_gas_limits(&self) -> B256 {
        pack_u128_pair(self.verification_gas_limit, self.call_gas_limit)
    }

    /// `maxPriorityFeePerGas (16 bytes) || maxFeePerGas (16 bytes)`.
    pub fn gas_fees(&self) -> B256 {
        pack_u128_pair(self.max_priority_fee_per_gas, self.max_fee_per_gas)
    }

    /// `paymaster || verificationGas (16) || postOpGas (16) || data`.
    pub fn paymaster_and_data(&self) -> Bytes {
        let Some(paymaster) = self.paymaster else {
            return Bytes::new();
        };

        let mut out = paymaster.to_vec();
        out.extend_from_slice(&u128_bytes(
            self.paymaster_verification_gas_limit.unwrap_or_default(),
        ));
        out.extend_from_slice(&u128_bytes(
            self.paymaster_post_op_gas_limit.unwrap_or_default(),
        ));
        if let Some(data) = &self.paymaster_data {
            out.extend_from_slice(data);
        }
        out.into()
    }

    /// The hash the account signs: binds the operation to an EntryPoint and chain.
    pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
        let packed = (
            self.sender,
            self.nonce,
            keccak256(self.init_code()),
            keccak256(&self.call_data),
            self.account_gas_limits(),
            self.pre_verification_gas,
            self.gas_fees(),
            keccak256(self.paymaster_and_data()),
        )
            .abi_encode();

        keccak256((keccak256(packed), entry_point, U256::from(chain_id)).abi_encode())
    }
}

fn u128_bytes(value: U256) -> [u8; 16] {
    value.saturating_to::<u128>().to_be_bytes()
}

fn pack_u128_pair(high: U256, low: U256) -> B256 {
    let mut word = [0u8; 32];
    word[..16].copy_from_slice(&u128_bytes(high));
    word[16..].copy_from_slice(&u128_bytes(low));
    B256::from(word)
}
