// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stealth Sweep - Stealth Address & Kernel Account Service
//!
//! Derives batches of stealth addresses from one seed signature, resolves the
//! ERC-4337 Kernel account each of them owns, and sweeps an account's USDC
//! through a user operation that may be sponsored by a paymaster.
//!
//! ## Modules
//!
//! - `stealth` - Stealth key derivation (secp256k1)
//! - `kernel` - Kernel v3.1 counterfactual addresses and call encoding
//! - `accounts` - Stealth accounts and concurrent balance reads
//! - `aa` - EntryPoint v0.7 user operations, bundler and ERC-7677 clients
//! - `semaphore` - Group replay, membership proofs and paymaster payloads
//! - `transfer` - Sweep assembly, submission and the transfer state machine
//! - `privacy_pool` - Owner-funded privacy pool deposits
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Operator bearer-token guard for owner-key operations
//! - `blockchain` - Ethereum JSON-RPC client and ERC-20 helpers

pub mod aa;
pub mod accounts;
pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod kernel;
pub mod privacy_pool;
pub mod semaphore;
pub mod state;
pub mod stealth;
pub mod store;
pub mod transfer;

#[cfg(test)]
pub(crate) mod test_support;
