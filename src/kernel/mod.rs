// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ZeroDev Kernel v3.1 smart accounts: counterfactual addresses and call
//! encoding.

pub mod abi;
pub mod address;
pub mod calls;

pub use address::{KernelConfig, ENTRY_POINT_V07_ADDRESS};
pub use calls::{encode_calls, factory_data, Call};
