// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encoding of calls executed by a Kernel account.

use alloy::{
    primitives::{Address, Bytes, B256, U256},
    sol_types::{SolCall, SolValue},
};

use super::abi::{Execution, IKernel, IKernelFactory};
use super::address::KernelConfig;

/// ERC-7579 mode: single call, revert on failure.
pub const EXEC_MODE_SINGLE: B256 = B256::ZERO;

/// ERC-7579 mode: batch call, revert on failure.
pub const EXEC_MODE_BATCH: B256 = {
    let mut mode = [0u8; 32];
    mode[0] = 0x01;
    B256::new(mode)
};

/// One call to be executed by the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

/// Encode calls into the account's `execute` calldata.
///
/// A single call is packed as `target || value || data`; several calls are
/// ABI-encoded as `Execution[]` under the batch mode.
pub fn encode_calls(calls: &[Call]) -> Bytes {
    let (mode, execution) = match calls {
        [call] => {
            let mut packed = Vec::with_capacity(20 + 32 + call.data.len());
            packed.extend_from_slice(call.to.as_slice());
            packed.extend_from_slice(&call.value.to_be_bytes::<32>());
            packed.extend_from_slice(&call.data);
            (EXEC_MODE_SINGLE, packed)
        }
        _ => {
            let executions: Vec<Execution> = calls
                .iter()
                .map(|call| Execution {
                    target: call.to,
                    value: call.value,
                    callData: call.data.clone(),
                })
                .collect();
            (EXEC_MODE_BATCH, executions.abi_encode())
        }
    };

    IKernel::executeCall {
        execMode: mode,
        executionCalldata: execution.into(),
    }
    .abi_encode()
    .into()
}

/// `createAccount(initData, bytes32(index))` calldata for the factory.
pub fn factory_data(config: &KernelConfig, owner: Address, index: u64) -> Bytes {
    IKernelFactory::createAccountCall {
        data: config.init_data(owner),
        salt: B256::from(U256::from(index).to_be_bytes::<32>()),
    }
    .abi_encode()
    .into()
}
