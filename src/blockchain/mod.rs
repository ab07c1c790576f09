// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration module for Ethereum (Sepolia).
//!
//! This module provides functionality for:
//! - Querying ERC-20 token balances (USDC)
//! - Log queries and code lookups
//! - Owner key loading and owner-signed transactions

pub mod client;
pub mod erc20;
pub mod signing;
pub mod types;

pub use client::{ChainClient, ChainClientError};
pub use erc20::{format_token_balance, token_balance, transfer_calldata};
pub use signing::{signer_from_pem, signer_from_pem_file};
pub use types::*;
