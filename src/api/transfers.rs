// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! USDC sweep endpoints.

use alloy::primitives::{Address, B256};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::Operator,
    error::ApiError,
    state::AppState,
    stealth::{
        derive_signing_key, keys::secret_to_b256, parse_private_key, parse_public_key,
        secret_address,
    },
    transfer::{prepare_sweep, run_sweep, Sponsorship, SweepJob, TransferEvent, TransferRecord},
};

use super::stealth::meta_keys;

/// Start a sweep of one Kernel account.
///
/// The stealth key comes either from `nonce` (plus `seed_signature`, or the
/// owner key) or from explicit ephemeral and spending keys.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateTransferRequest {
    /// Destination of the full USDC balance.
    pub to: String,
    pub nonce: Option<u64>,
    pub seed_signature: Option<String>,
    pub ephemeral_private_key: Option<String>,
    pub spending_private_key: Option<String>,
    pub spending_public_key: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateTransferResponse {
    pub message: String,
    pub kernel_address: String,
    /// Absent when there was nothing to transfer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<TransferRecord>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferListResponse {
    pub transfers: Vec<TransferRecord>,
}

/// Stealth owner address and its signing key.
fn resolve_signer(
    state: &AppState,
    request: &CreateTransferRequest,
    operator: Option<Operator>,
) -> Result<(Address, B256), ApiError> {
    if let Some(ephemeral) = &request.ephemeral_private_key {
        let (Some(spending_private), Some(spending_public)) =
            (&request.spending_private_key, &request.spending_public_key)
        else {
            return Err(ApiError::bad_request(
                "spending_private_key and spending_public_key are required with ephemeral_private_key",
            ));
        };
        let signing = derive_signing_key(
            &parse_private_key(ephemeral)?,
            &parse_private_key(spending_private)?,
            &parse_public_key(spending_public)?,
        )?;
        return Ok((secret_address(&signing), secret_to_b256(&signing)));
    }

    let Some(nonce) = request.nonce else {
        return Err(ApiError::bad_request(
            "either nonce or ephemeral_private_key must be provided",
        ));
    };
    let keys = meta_keys(state, request.seed_signature.as_deref(), operator)?;
    let material = keys.derive(state.chain.network().chain_id, nonce)?;
    Ok((material.stealth_address, material.signing_key))
}

/// Sweep the full USDC balance of a stealth Kernel account.
///
/// The balance is read and the call assembled before responding; submission
/// continues in the background. Poll `GET /v1/transfers/{id}` for progress.
///
/// Owner-derived keys and Semaphore sponsorship (which joins the group with
/// the owner's ETH) both require the operator token.
#[utoipa::path(
    post,
    path = "/v1/transfers",
    tag = "Transfers",
    request_body = CreateTransferRequest,
    responses(
        (status = 202, description = "Sweep started", body = CreateTransferResponse),
        (status = 200, description = "Nothing to transfer", body = CreateTransferResponse),
        (status = 400, description = "Invalid destination or key material"),
        (status = 401, description = "Owner key needed and no operator token given"),
        (status = 429, description = "Too many transfers in progress"),
        (status = 502, description = "Balance read failed"),
        (status = 503, description = "No seed signature and no owner key configured")
    )
)]
pub async fn create_transfer(
    State(state): State<AppState>,
    operator: Option<Operator>,
    Json(request): Json<CreateTransferRequest>,
) -> Result<(StatusCode, Json<CreateTransferResponse>), ApiError> {
    let to: Address = request
        .to
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid destination: {}", request.to)))?;

    let (owner, signing_key) = resolve_signer(&state, &request, operator)?;
    if matches!(state.submitter.sponsorship(), Sponsorship::Semaphore(_)) {
        state.auth.require(operator)?;
    }
    let kernel = state.balances.kernel_address(owner);

    let Some(call) = prepare_sweep(&state.chain, kernel, state.usdc_address, to).await? else {
        tracing::info!(kernel = %kernel, "Nothing to transfer");
        return Ok((
            StatusCode::OK,
            Json(CreateTransferResponse {
                message: "Nothing to transfer".to_string(),
                kernel_address: kernel.to_checksum(None),
                transfer: None,
            }),
        ));
    };

    let mut record = TransferRecord::new(
        kernel.to_checksum(None),
        owner.to_checksum(None),
        to.to_checksum(None),
        state.usdc_address.to_checksum(None),
        state.submitter.sponsorship().name().to_string(),
    );
    record
        .apply(TransferEvent::Start)
        .and_then(|_| {
            record.apply(TransferEvent::Assembled {
                amount: call.amount.to_string(),
            })
        })
        .map_err(|e| ApiError::unprocessable(e.to_string()))?;

    let id = state.store.write().await.insert(record.clone())?;
    state.balances.invalidate(kernel);
    tracing::info!(transfer_id = %id, kernel = %kernel, amount = %call.amount, "Sweep assembled");

    tokio::spawn(run_sweep(
        state.submitter.clone(),
        state.store.clone(),
        SweepJob {
            id,
            owner,
            signing_key,
            call,
        },
    ));

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateTransferResponse {
            message: "Transfer started".to_string(),
            kernel_address: kernel.to_checksum(None),
            transfer: Some(record),
        }),
    ))
}

/// List transfers, newest first. Operator only.
#[utoipa::path(
    get,
    path = "/v1/transfers",
    tag = "Transfers",
    responses(
        (status = 200, description = "Transfers", body = TransferListResponse),
        (status = 401, description = "Missing or invalid operator token")
    )
)]
pub async fn list_transfers(
    _operator: Operator,
    State(state): State<AppState>,
) -> Json<TransferListResponse> {
    Json(TransferListResponse {
        transfers: state.store.read().await.list(),
    })
}

/// One transfer. The random id is the only credential needed.
#[utoipa::path(
    get,
    path = "/v1/transfers/{transfer_id}",
    tag = "Transfers",
    params(("transfer_id" = Uuid, Path, description = "Transfer ID")),
    responses(
        (status = 200, description = "Transfer", body = TransferRecord),
        (status = 404, description = "Transfer not found")
    )
)]
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> Result<Json<TransferRecord>, ApiError> {
    let record = state.store.read().await.get(&transfer_id)?;
    Ok(Json(record))
}
