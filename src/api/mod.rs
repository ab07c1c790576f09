// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    accounts::StealthAccount,
    blockchain::TokenBalance,
    privacy_pool::{DepositNote, DepositReceipt},
    state::AppState,
    transfer::{TransferRecord, TransferStatus},
};

pub mod balances;
pub mod deposits;
pub mod health;
pub mod stealth;
pub mod transfers;

/// Cross-origin access only for configured origins; none by default.
fn cors_layer(origins: &[HeaderValue]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins.iter().cloned()))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_allowed_origins);
    let v1_routes = Router::new()
        .route("/stealth/accounts", post(stealth::generate_accounts))
        .route("/balances", post(balances::query_balances))
        .route(
            "/transfers",
            get(transfers::list_transfers).post(transfers::create_transfer),
        )
        .route("/transfers/{transfer_id}", get(transfers::get_transfer))
        .route("/deposits", post(deposits::create_deposit));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        stealth::generate_accounts,
        balances::query_balances,
        transfers::create_transfer,
        transfers::list_transfers,
        transfers::get_transfer,
        deposits::create_deposit
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            stealth::StealthAccountsRequest,
            stealth::StealthAccountsResponse,
            stealth::GeneratedAccount,
            balances::BalancesRequest,
            balances::BalancesResponse,
            transfers::CreateTransferRequest,
            transfers::CreateTransferResponse,
            transfers::TransferListResponse,
            StealthAccount,
            TokenBalance,
            TransferRecord,
            TransferStatus,
            DepositNote,
            DepositReceipt
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Stealth", description = "Stealth account derivation and balances"),
        (name = "Transfers", description = "USDC sweeps through user operations"),
        (name = "Privacy Pool", description = "Owner-funded privacy pool deposits")
    )
)]
struct ApiDoc;
