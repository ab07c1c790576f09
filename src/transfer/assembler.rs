// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Full-balance token sweeps out of a Kernel account.

use alloy::primitives::{Address, Bytes, U256};

use crate::blockchain::{transfer_calldata, ChainClient, ChainClientError};
use crate::kernel::{encode_calls, Call};

/// A ready-to-submit sweep of a Kernel account's whole token balance.
///
/// Owns everything needed for submission; nothing is re-read later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCall {
    /// Sending Kernel account.
    pub kernel: Address,
    pub token: Address,
    pub to: Address,
    /// Balance at assembly time.
    pub amount: U256,
    /// Kernel `execute` calldata.
    pub call_data: Bytes,
}

/// Build the sweep for a known balance.
///
/// A zero balance means there is nothing to transfer and yields `None`.
pub fn assemble(kernel: Address, token: Address, balance: U256, to: Address) -> Option<TransferCall> {
    if balance.is_zero() {
        return None;
    }

    let call = Call {
        to: token,
        value: U256::ZERO,
        data: transfer_calldata(to, balance),
    };

    Some(TransferCall {
        kernel,
        token,
        to,
        amount: balance,
        call_data: encode_calls(&[call]),
    })
}

/// Read the account's balance now and build the sweep.
pub async fn prepare_sweep(
    chain: &ChainClient,
    kernel: Address,
    token: Address,
    to: Address,
) -> Result<Option<TransferCall>, ChainClientError> {
    let balance = chain.token_balance(token, kernel).await?;
    tracing::debug!(kernel = %kernel, balance = %balance, "Read balance for sweep");
    Ok(assemble(kernel, token, balance, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::erc20::IERC20;
    use crate::kernel::abi::IKernel;
    use crate::kernel::calls::EXEC_MODE_SINGLE;
    use alloy::sol_types::SolCall;

    const KERNEL: Address = Address::new([0x4b; 20]);
    const TOKEN: Address = Address::new([0x1c; 20]);
    const DEST: Address = Address::new([0xde; 20]);

    #[test]
    fn sweep_of_100_units_is_one_transfer_to_destination() {
        let sweep = assemble(KERNEL, TOKEN, U256::from(100u64), DEST).unwrap();
        assert_eq!(sweep.amount, U256::from(100u64));
        assert_eq!(sweep.kernel, KERNEL);

        let execute = IKernel::executeCall::abi_decode(&sweep.call_data).unwrap();
        assert_eq!(execute.execMode, EXEC_MODE_SINGLE);

        let packed = execute.executionCalldata;
        assert_eq!(&packed[..20], TOKEN.as_slice());
        assert_eq!(U256::from_be_slice(&packed[20..52]), U256::ZERO);

        let transfer = IERC20::transferCall::abi_decode(&packed[52..]).unwrap();
        assert_eq!(transfer.to, DEST);
        assert_eq!(transfer.amount, U256::from(100u64));
    }

    #[test]
    fn zero_balance_is_nothing_to_transfer() {
        assert!(assemble(KERNEL, TOKEN, U256::ZERO, DEST).is_none());
    }

    #[test]
    fn sweep_is_independent_of_later_balance_changes() {
        let mut balance = U256::from(5u64);
        let sweep = assemble(KERNEL, TOKEN, balance, DEST).unwrap();
        balance += U256::from(1u64);
        assert_ne!(sweep.amount, balance);

        let again = assemble(KERNEL, TOKEN, U256::from(5u64), DEST).unwrap();
        assert_eq!(sweep, again);
    }
}
