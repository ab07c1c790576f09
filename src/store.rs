// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory transfer store.
//!
//! Every mutation goes through [`TransferStore::apply`], which delegates to
//! the transfer reducer. The store is bounded: terminal records are dropped
//! once older than the retention window, and when the store is full the
//! oldest terminal record makes room. A store full of in-flight transfers
//! refuses new ones.

use std::collections::HashMap;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::ApiError;
use crate::transfer::state::{TransferEvent, TransferRecord};

pub struct TransferStore {
    transfers: HashMap<Uuid, TransferRecord>,
    capacity: usize,
    retention: Duration,
}

impl Default for TransferStore {
    fn default() -> Self {
        Self::with_limits(Self::DEFAULT_CAPACITY, Self::DEFAULT_RETENTION)
    }
}

impl TransferStore {
    pub const DEFAULT_CAPACITY: usize = 10_000;
    pub const DEFAULT_RETENTION: Duration = Duration::hours(24);

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(capacity: usize, retention: Duration) -> Self {
        Self {
            transfers: HashMap::new(),
            capacity: capacity.max(1),
            retention,
        }
    }

    pub fn len(&self) -> usize {
        self.transfers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transfers.is_empty()
    }

    pub fn insert(&mut self, record: TransferRecord) -> Result<Uuid, ApiError> {
        self.prune(Utc::now());

        if self.transfers.len() >= self.capacity {
            let oldest_terminal = self
                .transfers
                .values()
                .filter(|r| r.status.is_terminal())
                .min_by_key(|r| r.updated_at)
                .map(|r| r.id);
            match oldest_terminal {
                Some(id) => {
                    self.transfers.remove(&id);
                }
                None => {
                    tracing::warn!(capacity = self.capacity, "Transfer store full");
                    return Err(ApiError::new(
                        StatusCode::TOO_MANY_REQUESTS,
                        "Too many transfers in progress",
                    ));
                }
            }
        }

        let id = record.id;
        self.transfers.insert(id, record);
        Ok(id)
    }

    /// Drop terminal records last updated before `now - retention`.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.retention;
        let before = self.transfers.len();
        self.transfers
            .retain(|_, r| !(r.status.is_terminal() && r.updated_at < cutoff));
        before - self.transfers.len()
    }

    pub fn get(&self, id: &Uuid) -> Result<TransferRecord, ApiError> {
        self.transfers
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Transfer not found"))
    }

    /// All transfers, newest first.
    pub fn list(&self) -> Vec<TransferRecord> {
        let mut records: Vec<_> = self.transfers.values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records
    }

    pub fn apply(&mut self, id: &Uuid, event: TransferEvent) -> Result<TransferRecord, ApiError> {
        let Some(record) = self.transfers.get_mut(id) else {
            return Err(ApiError::not_found("Transfer not found"));
        };

        record
            .apply(event)
            .map_err(|e| ApiError::unprocessable(e.to_string()))?;
        Ok(record.clone())
    }
}
