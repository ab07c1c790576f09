// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::blockchain::ChainClientError;
use crate::privacy_pool::DepositError;
use crate::stealth::StealthError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    /// An upstream dependency (RPC, bundler, prover) failed.
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    /// A required dependency is not configured or not reachable.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::new(err.status_code(), err.to_string())
    }
}

impl From<StealthError> for ApiError {
    fn from(err: StealthError) -> Self {
        match err {
            StealthError::DegenerateKey => Self::unprocessable(err.to_string()),
            _ => Self::bad_request(err.to_string()),
        }
    }
}

impl From<ChainClientError> for ApiError {
    fn from(err: ChainClientError) -> Self {
        match err {
            ChainClientError::InvalidAddress(_) | ChainClientError::InvalidPrivateKey(_) => {
                Self::bad_request(err.to_string())
            }
            ChainClientError::NoOwnerSigner => Self::service_unavailable(err.to_string()),
            _ => Self::bad_gateway(err.to_string()),
        }
    }
}

impl From<DepositError> for ApiError {
    fn from(err: DepositError) -> Self {
        match err {
            DepositError::Chain(inner) => inner.into(),
            DepositError::Hash(_) => Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            DepositError::Reverted(_) => Self::bad_gateway(err.to_string()),
        }
    }
}
