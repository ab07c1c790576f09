// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERC-4337 account abstraction: user operations, bundler and paymaster
//! services.

pub mod bundler;
pub mod paymaster;
pub mod user_op;

pub use bundler::{BundlerClient, BundlerError, UserOpGasEstimate, UserOpReceipt};
pub use paymaster::{
    Erc7677Client, PaymasterInfo, PaymasterServiceError, PaymasterStub, PAYMASTER_GAS_CUSHION,
};
pub use user_op::UserOperation;
