// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Privacy-pool deposits funded by the owner key.

use axum::{extract::State, http::StatusCode, Json};

use crate::{auth::Operator, error::ApiError, privacy_pool::DepositReceipt, state::AppState};

/// Deposit the configured ETH amount into the privacy pool.
///
/// The returned note is the only copy of the deposit secrets.
#[utoipa::path(
    post,
    path = "/v1/deposits",
    tag = "Privacy Pool",
    responses(
        (status = 201, description = "Deposit mined", body = DepositReceipt),
        (status = 401, description = "Missing or invalid operator token"),
        (status = 502, description = "Deposit failed or reverted"),
        (status = 503, description = "No owner key or API token configured")
    )
)]
pub async fn create_deposit(
    _operator: Operator,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<DepositReceipt>), ApiError> {
    let receipt = state.privacy_pool.deposit(&state.chain).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}
