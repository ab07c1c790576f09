// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance lookup for known stealth addresses.

use alloy::primitives::Address;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{accounts::StealthAccount, error::ApiError, state::AppState};

use super::stealth::MAX_ACCOUNT_COUNT;

#[derive(Debug, Deserialize, ToSchema)]
pub struct BalancesRequest {
    /// Stealth (owner) addresses; each maps to one Kernel account.
    pub addresses: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BalancesResponse {
    /// Same order as the request.
    pub accounts: Vec<StealthAccount>,
}

/// Resolve Kernel accounts and USDC balances for stealth addresses.
///
/// A failed read marks only its own account.
#[utoipa::path(
    post,
    path = "/v1/balances",
    tag = "Stealth",
    request_body = BalancesRequest,
    responses(
        (status = 200, description = "Balances resolved", body = BalancesResponse),
        (status = 400, description = "Malformed address or too many addresses")
    )
)]
pub async fn query_balances(
    State(state): State<AppState>,
    Json(request): Json<BalancesRequest>,
) -> Result<Json<BalancesResponse>, ApiError> {
    if request.addresses.len() as u64 > MAX_ACCOUNT_COUNT {
        return Err(ApiError::bad_request(format!(
            "at most {MAX_ACCOUNT_COUNT} addresses per request"
        )));
    }

    let addresses = request
        .addresses
        .iter()
        .map(|raw| {
            raw.trim()
                .parse::<Address>()
                .map_err(|_| ApiError::bad_request(format!("Invalid address: {raw}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(BalancesResponse {
        accounts: state.balances.resolve_accounts(&addresses).await,
    }))
}
