// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Transfer lifecycle.
//!
//! ```text
//! Idle -> Assembling -> (ProofPending ->) Submitting -> AwaitingInclusion
//!      -> Confirmed | TimedOut | Reverted | Failed
//! ```
//!
//! Records change only through [`TransferRecord::apply`]. Terminal states
//! are final: a new attempt is a new transfer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle state of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Idle,
    Assembling,
    ProofPending,
    Submitting,
    AwaitingInclusion,
    Confirmed,
    TimedOut,
    Reverted,
    Failed,
}

impl TransferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Confirmed | Self::TimedOut | Self::Reverted | Self::Failed
        )
    }
}

/// Input to the transfer reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Start,
    /// Balance read and calldata built.
    Assembled { amount: String },
    ProofRequested,
    Submitting,
    Sent {
        user_op_hash: String,
        explorer_url: String,
    },
    Confirmed {
        tx_hash: String,
        block_number: u64,
        tx_url: String,
    },
    Reverted { reason: Option<String> },
    TimedOut,
    Failed { error: String },
}

impl TransferEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Assembled { .. } => "assembled",
            Self::ProofRequested => "proof_requested",
            Self::Submitting => "submitting",
            Self::Sent { .. } => "sent",
            Self::Confirmed { .. } => "confirmed",
            Self::Reverted { .. } => "reverted",
            Self::TimedOut => "timed_out",
            Self::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid transfer transition: {event} in state {from:?}")]
pub struct TransitionError {
    pub from: TransferStatus,
    pub event: &'static str,
}

/// One sweep attempt as reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferRecord {
    pub id: Uuid,
    pub status: TransferStatus,
    /// Sending Kernel account.
    pub kernel_address: String,
    pub stealth_address: String,
    pub to: String,
    pub token: String,
    /// Raw amount swept, known once assembled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    /// Sponsorship mode used (`none`, `erc7677`, `semaphore`).
    pub sponsorship: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_op_hash: Option<String>,
    /// User operation explorer link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explorer_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    /// Revert reason or failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TransferRecord {
    pub fn new(
        kernel_address: String,
        stealth_address: String,
        to: String,
        token: String,
        sponsorship: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: TransferStatus::Idle,
            kernel_address,
            stealth_address,
            to,
            token,
            amount: None,
            sponsorship,
            user_op_hash: None,
            explorer_url: None,
            tx_hash: None,
            tx_url: None,
            block_number: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance the record by one event.
    ///
    /// On error the record is left unchanged.
    pub fn apply(&mut self, event: TransferEvent) -> Result<(), TransitionError> {
        use TransferStatus as S;

        let next = match (self.status, &event) {
            (from, _) if from.is_terminal() => None,
            (S::Idle, TransferEvent::Start) => Some(S::Assembling),
            (S::Assembling, TransferEvent::Assembled { .. }) => Some(S::Assembling),
            (S::Assembling, TransferEvent::ProofRequested) => Some(S::ProofPending),
            (S::Assembling | S::ProofPending, TransferEvent::Submitting) => Some(S::Submitting),
            (S::Submitting, TransferEvent::Sent { .. }) => Some(S::AwaitingInclusion),
            (S::AwaitingInclusion, TransferEvent::Confirmed { .. }) => Some(S::Confirmed),
            (S::AwaitingInclusion, TransferEvent::Reverted { .. }) => Some(S::Reverted),
            (S::AwaitingInclusion, TransferEvent::TimedOut) => Some(S::TimedOut),
            (_, TransferEvent::Failed { .. }) => Some(S::Failed),
            _ => None,
        };

        let Some(next) = next else {
            return Err(TransitionError {
                from: self.status,
                event: event.name(),
            });
        };

        match event {
            TransferEvent::Assembled { amount } => self.amount = Some(amount),
            TransferEvent::Sent {
                user_op_hash,
                explorer_url,
            } => {
                self.user_op_hash = Some(user_op_hash);
                self.explorer_url = Some(explorer_url);
            }
            TransferEvent::Confirmed {
                tx_hash,
                block_number,
                tx_url,
            } => {
                self.tx_hash = Some(tx_hash);
                self.block_number = Some(block_number);
                self.tx_url = Some(tx_url);
            }
            TransferEvent::Reverted { reason } => self.error = reason,
            TransferEvent::Failed { error } => self.error = Some(error),
            TransferEvent::Start
            | TransferEvent::ProofRequested
            | TransferEvent::Submitting
            | TransferEvent::TimedOut => {}
        }

        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
