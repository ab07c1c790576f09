// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Counterfactual Kernel v3.1 account addresses.
//!
//! The factory deploys an ERC-1967 proxy with CREATE2 using
//! `keccak256(initData || bytes32(index))` as salt, so the address of a
//! Kernel owned by an ECDSA key is known before deployment.

use alloy::primitives::{address, hex, keccak256, Address, Bytes, FixedBytes, B256, U256};
use alloy::sol_types::SolCall;

use super::abi::IKernel;

/// Kernel v3.1 ECDSA validator (root validator).
pub const ECDSA_VALIDATOR_ADDRESS: Address = address!("845ADb2C711129d4f3966735eD98a9F09fC4cE57");
/// Kernel v3.1 account implementation.
pub const KERNEL_IMPLEMENTATION_ADDRESS: Address =
    address!("BAC849bB641841b44E965fB01A4Bf5F074f84b4D");
/// Kernel v3.1 factory.
pub const KERNEL_FACTORY_ADDRESS: Address = address!("aac5D4240AF87249B3f71BC8E4A2cae074A3E419");
/// ERC-4337 EntryPoint v0.7.
pub const ENTRY_POINT_V07_ADDRESS: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");

/// Validator type byte for a plain validator module.
const VALIDATION_TYPE_VALIDATOR: u8 = 0x01;

/// ERC-1967 proxy creation code surrounding the implementation address.
const ERC1967_PREFIX: [u8; 9] = hex!("603d3d8160223d3973");
const ERC1967_SUFFIX: [u8; 66] = hex!(
    "60095155f3363d3d373d3d363d7f360894a13ba1a3210667c828492db98dca3e2076cc"
    "3735a920a3ca505d382bbc545af43d6000803e6038573d6000fd5b3d6000f3"
);

/// Addresses that pin down a Kernel deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    pub factory: Address,
    pub implementation: Address,
    pub ecdsa_validator: Address,
    pub entry_point: Address,
}

impl Default for KernelConfig {
    /// Kernel v3.1 on EntryPoint v0.7.
    fn default() -> Self {
        Self {
            factory: KERNEL_FACTORY_ADDRESS,
            implementation: KERNEL_IMPLEMENTATION_ADDRESS,
            ecdsa_validator: ECDSA_VALIDATOR_ADDRESS,
            entry_point: ENTRY_POINT_V07_ADDRESS,
        }
    }
}

impl KernelConfig {
    /// `0x01 || validator`: root validator identifier.
    pub fn root_validator(&self) -> FixedBytes<21> {
        let mut id = [0u8; 21];
        id[0] = VALIDATION_TYPE_VALIDATOR;
        id[1..].copy_from_slice(self.ecdsa_validator.as_slice());
        FixedBytes::from(id)
    }

    /// `initialize(...)` calldata installing `owner` on the ECDSA validator.
    pub fn init_data(&self, owner: Address) -> Bytes {
        IKernel::initializeCall {
            _rootValidator: self.root_validator(),
            hook: Address::ZERO,
            validatorData: Bytes::copy_from_slice(owner.as_slice()),
            hookData: Bytes::new(),
            initConfig: Vec::new(),
        }
        .abi_encode()
        .into()
    }

    /// CREATE2 salt used by the factory.
    pub fn salt(&self, owner: Address, index: u64) -> B256 {
        let mut preimage = self.init_data(owner).to_vec();
        preimage.extend_from_slice(&U256::from(index).to_be_bytes::<32>());
        keccak256(&preimage)
    }

    /// keccak256 of the ERC-1967 proxy creation code for the implementation.
    pub fn proxy_init_code_hash(&self) -> B256 {
        let mut code = Vec::with_capacity(95);
        code.extend_from_slice(&ERC1967_PREFIX);
        code.extend_from_slice(self.implementation.as_slice());
        code.extend_from_slice(&ERC1967_SUFFIX);
        keccak256(&code)
    }

    /// Kernel account address for an ECDSA owner and account index.
    pub fn account_address(&self, owner: Address, index: u64) -> Address {
        self.factory
            .create2(self.salt(owner, index), self.proxy_init_code_hash())
    }
}
