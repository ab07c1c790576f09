// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stealth account generation endpoints.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    accounts::StealthAccount,
    auth::Operator,
    error::ApiError,
    state::AppState,
    stealth::{StealthMetaKeys, STEALTH_SEED_MESSAGE},
};

/// Accounts generated when `count` is omitted.
pub const DEFAULT_ACCOUNT_COUNT: u64 = 10;

/// Upper bound on accounts per request.
pub const MAX_ACCOUNT_COUNT: u64 = 100;

/// Request to derive a batch of stealth accounts.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StealthAccountsRequest {
    /// 65-byte hex signature over the seed message. When omitted the
    /// configured owner key signs it.
    pub seed_signature: Option<String>,
    /// Number of accounts to derive (default 10).
    pub count: Option<u64>,
    /// First nonce of the batch (default 0).
    pub start_nonce: Option<u64>,
}

/// One generated account.
#[derive(Debug, Serialize, ToSchema)]
pub struct GeneratedAccount {
    pub nonce: u64,
    /// Ephemeral key for this nonce; with the spending key it recovers the
    /// stealth signing key.
    pub ephemeral_private_key: String,
    #[serde(flatten)]
    pub account: StealthAccount,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StealthAccountsResponse {
    /// Uncompressed spending public key (0x04...).
    pub spending_public_key: String,
    pub accounts: Vec<GeneratedAccount>,
}

/// Meta-keys from an explicit seed signature or, failing that, the owner key.
///
/// The owner fallback needs an authenticated operator.
pub(crate) fn meta_keys(
    state: &AppState,
    seed_signature: Option<&str>,
    operator: Option<Operator>,
) -> Result<StealthMetaKeys, ApiError> {
    match seed_signature {
        Some(signature) => Ok(StealthMetaKeys::from_signature_hex(signature)?),
        None => {
            state.auth.require(operator)?;
            let signature = state
                .chain
                .sign_owner_message(STEALTH_SEED_MESSAGE.as_bytes())?;
            Ok(StealthMetaKeys::from_signature(&signature.as_bytes())?)
        }
    }
}

/// Derive stealth accounts and read their Kernel balances.
#[utoipa::path(
    post,
    path = "/v1/stealth/accounts",
    tag = "Stealth",
    request_body = StealthAccountsRequest,
    responses(
        (status = 200, description = "Accounts derived", body = StealthAccountsResponse),
        (status = 400, description = "Invalid signature or count"),
        (status = 401, description = "No seed signature and no operator token"),
        (status = 503, description = "No seed signature and no owner key or API token configured")
    )
)]
pub async fn generate_accounts(
    State(state): State<AppState>,
    operator: Option<Operator>,
    Json(request): Json<StealthAccountsRequest>,
) -> Result<Json<StealthAccountsResponse>, ApiError> {
    let count = request.count.unwrap_or(DEFAULT_ACCOUNT_COUNT);
    if count == 0 || count > MAX_ACCOUNT_COUNT {
        return Err(ApiError::bad_request(format!(
            "count must be between 1 and {MAX_ACCOUNT_COUNT}"
        )));
    }
    let start = request.start_nonce.unwrap_or(0);
    let end = start
        .checked_add(count)
        .ok_or_else(|| ApiError::bad_request("start_nonce is too large"))?;

    let keys = meta_keys(&state, request.seed_signature.as_deref(), operator)?;
    let batch = keys.generate(state.chain.network().chain_id, start..end)?;

    let addresses: Vec<_> = batch.iter().map(|m| m.stealth_address).collect();
    let accounts = state.balances.resolve_accounts(&addresses).await;
    tracing::info!(count, start_nonce = start, "Generated stealth accounts");

    Ok(Json(StealthAccountsResponse {
        spending_public_key: keys.spending_public_hex(),
        accounts: batch
            .into_iter()
            .zip(accounts)
            .map(|(material, account)| GeneratedAccount {
                nonce: material.nonce,
                ephemeral_private_key: format!("{:#x}", material.ephemeral_private_key),
                account,
            })
            .collect(),
    }))
}
