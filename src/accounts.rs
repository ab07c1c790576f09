// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stealth accounts and their token balances.
//!
//! Each stealth address owns a Kernel account at a deterministic address.
//! Balances are read concurrently; one failed read marks only its own
//! account and never fails the batch.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use alloy::primitives::{Address, U256};
use lru::LruCache;
use serde::Serialize;
use tokio::task::JoinSet;
use utoipa::ToSchema;

use crate::blockchain::{token_balance, ChainClient, Erc20Token, TokenBalance};
use crate::kernel::KernelConfig;

/// Kernel index used for every stealth owner.
pub const KERNEL_ACCOUNT_INDEX: u64 = 0;

/// A stealth address, its Kernel account and that account's balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StealthAccount {
    pub stealth_address: String,
    pub kernel_address: String,
    /// Absent when the balance read failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<TokenBalance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cached balance: raw value + insertion timestamp.
struct CacheEntry {
    balance: U256,
    inserted_at: Instant,
}

/// Short-lived cache of display balances keyed by Kernel address.
///
/// Only listing endpoints read through it; sweeps always read fresh.
pub struct BalanceCache {
    cache: Mutex<LruCache<Address, CacheEntry>>,
    ttl: Duration,
}

impl BalanceCache {
    pub const DEFAULT_CAPACITY: usize = 1024;
    pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Cached balance, or `None` if absent or expired.
    pub fn get(&self, kernel: &Address) -> Option<U256> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(kernel) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.balance);
            }
            cache.pop(kernel);
        }
        None
    }

    pub fn put(&self, kernel: Address, balance: U256) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                kernel,
                CacheEntry {
                    balance,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    pub fn invalidate(&self, kernel: &Address) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(kernel);
        }
    }
}

impl Default for BalanceCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_TTL)
    }
}

/// Resolves stealth addresses to Kernel accounts with balances.
#[derive(Clone)]
pub struct BalanceQuery {
    chain: Arc<ChainClient>,
    kernel: KernelConfig,
    token_address: Address,
    token: Erc20Token,
    cache: Arc<BalanceCache>,
}

impl BalanceQuery {
    pub fn new(
        chain: Arc<ChainClient>,
        kernel: KernelConfig,
        token_address: Address,
        token: Erc20Token,
        cache: Arc<BalanceCache>,
    ) -> Self {
        Self {
            chain,
            kernel,
            token_address,
            token,
            cache,
        }
    }

    pub fn kernel_address(&self, stealth_address: Address) -> Address {
        self.kernel
            .account_address(stealth_address, KERNEL_ACCOUNT_INDEX)
    }

    /// Drop the cached balance of a Kernel account about to change.
    pub fn invalidate(&self, kernel: Address) {
        self.cache.invalidate(&kernel);
    }

    /// Resolve every address; output order equals input order.
    pub async fn resolve_accounts(&self, stealth_addresses: &[Address]) -> Vec<StealthAccount> {
        let mut tasks = JoinSet::new();
        for (position, &stealth) in stealth_addresses.iter().enumerate() {
            let query = self.clone();
            tasks.spawn(async move { (position, query.resolve_one(stealth).await) });
        }

        let mut resolved: Vec<Option<StealthAccount>> = vec![None; stealth_addresses.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, account)) => resolved[position] = Some(account),
                Err(e) => tracing::error!(error = %e, "Balance task panicked"),
            }
        }

        resolved
            .into_iter()
            .zip(stealth_addresses)
            .map(|(account, &stealth)| {
                account.unwrap_or_else(|| self.failed(stealth, "balance task aborted".to_string()))
            })
            .collect()
    }

    async fn resolve_one(&self, stealth: Address) -> StealthAccount {
        let kernel = self.kernel_address(stealth);

        let balance = match self.cache.get(&kernel) {
            Some(balance) => Ok(balance),
            None => self
                .chain
                .token_balance(self.token_address, kernel)
                .await
                .inspect(|balance| self.cache.put(kernel, *balance)),
        };

        match balance {
            Ok(balance) => StealthAccount {
                stealth_address: stealth.to_checksum(None),
                kernel_address: kernel.to_checksum(None),
                balance: Some(token_balance(&self.token, self.token_address, balance)),
                error: None,
            },
            Err(e) => {
                tracing::warn!(kernel = %kernel, error = %e, "Balance read failed");
                self.failed(stealth, e.to_string())
            }
        }
    }

    fn failed(&self, stealth: Address, error: String) -> StealthAccount {
        StealthAccount {
            stealth_address: stealth.to_checksum(None),
            kernel_address: self.kernel_address(stealth).to_checksum(None),
            balance: None,
            error: Some(error),
        }
    }
}
