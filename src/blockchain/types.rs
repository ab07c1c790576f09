// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain types and constants.

use alloy::primitives::{address, Address, B256};
use serde::{Deserialize, Serialize};
use url::Url;
use utoipa::ToSchema;

/// Ethereum network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: String,
    /// Chain ID
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: Url,
    /// Block explorer URL (transactions)
    pub explorer_url: String,
    /// User operation explorer URL (ERC-4337)
    pub user_op_explorer_url: String,
}

impl NetworkConfig {
    /// Explorer link for a plain transaction hash.
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }

    /// Explorer link for a user operation hash.
    pub fn user_op_url(&self, user_op_hash: &str) -> String {
        format!(
            "{}/{}",
            self.user_op_explorer_url.trim_end_matches('/'),
            user_op_hash
        )
    }
}

/// Ethereum Sepolia chain ID.
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Public Sepolia RPC used when `RPC_URL` is unset.
pub const SEPOLIA_RPC_URL: &str = "https://ethereum-sepolia-rpc.publicnode.com";

/// Sepolia Etherscan.
pub const SEPOLIA_EXPLORER_URL: &str = "https://sepolia.etherscan.io";

/// User operation explorer.
pub const USER_OP_EXPLORER_URL: &str = "https://jiffyscan.xyz/userOpHash";

/// ERC-20 token metadata.
#[derive(Debug, Clone)]
pub struct Erc20Token {
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
}

/// USDC (Circle's test token on Sepolia).
pub const USDC_TOKEN: Erc20Token = Erc20Token {
    symbol: "USDC",
    name: "USD Coin",
    decimals: 6,
};

/// Circle's USDC deployment on Sepolia.
pub const USDC_SEPOLIA_ADDRESS: Address = address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238");

/// Receipt of an owner-signed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: B256,
    pub block_number: u64,
    pub success: bool,
}

/// Token balance information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenBalance {
    /// Token symbol (e.g., "USDC")
    pub symbol: String,
    /// Balance in the token's smallest unit
    pub balance_raw: String,
    /// Balance formatted with decimals
    pub balance_formatted: String,
    /// Number of decimals
    pub decimals: u8,
    /// Contract address
    pub contract_address: String,
}
