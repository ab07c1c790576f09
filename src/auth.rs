// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Operator authentication.
//!
//! Anything that makes the server act with its owner key (owner-derived
//! stealth seeds, Semaphore joins, privacy-pool deposits) requires the
//! operator bearer token:
//!
//! ```text
//! Authorization: Bearer <API_TOKEN>
//! ```
//!
//! Without a configured `API_TOKEN` those operations are refused outright.
//!
//! Handlers that always need the owner take [`Operator`]; handlers that only
//! need it on some inputs take `Option<Operator>` and call
//! [`AuthConfig::require`] on that path.

use alloy::primitives::keccak256;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::state::AppState;

/// Shortest accepted operator token.
pub const MIN_TOKEN_LENGTH: usize = 16;

/// Operator bearer token.
#[derive(Clone)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compare digests so the timing does not depend on a shared prefix.
    fn matches(&self, presented: &str) -> bool {
        keccak256(self.0.as_bytes()) == keccak256(presented.as_bytes())
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

/// Authentication settings held in [`AppState`].
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    token: Option<ApiToken>,
}

impl AuthConfig {
    pub fn new(token: Option<ApiToken>) -> Self {
        Self { token }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    fn verify(&self, presented: &str) -> Result<Operator, AuthError> {
        let token = self.token.as_ref().ok_or(AuthError::NotConfigured)?;
        if token.matches(presented) {
            Ok(Operator)
        } else {
            Err(AuthError::InvalidToken)
        }
    }

    fn missing_credentials(&self) -> AuthError {
        if self.is_enabled() {
            AuthError::MissingAuthHeader
        } else {
            AuthError::NotConfigured
        }
    }

    /// Turn an optional extraction into a hard requirement.
    pub fn require(&self, operator: Option<Operator>) -> Result<Operator, AuthError> {
        operator.ok_or_else(|| self.missing_credentials())
    }
}

/// Caller presented the operator token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator;

impl FromRequestParts<AppState> for Operator {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| state.auth.missing_credentials())?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidAuthHeader)?;

        state.auth.verify(token.trim())
    }
}

/// Absent header yields `None`; a present but wrong header is still rejected.
impl OptionalFromRequestParts<AppState> for Operator {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(None);
        }
        <Self as FromRequestParts<AppState>>::from_request_parts(parts, state)
            .await
            .map(Some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingAuthHeader,

    #[error("Invalid authorization header format (expected 'Bearer <token>')")]
    InvalidAuthHeader,

    #[error("Invalid operator token")]
    InvalidToken,

    #[error("Owner-key operations are disabled: no API_TOKEN configured")]
    NotConfigured,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: &'static str,
}

impl AuthError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::InvalidToken => "invalid_token",
            AuthError::NotConfigured => "auth_not_configured",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code(),
        });
        (self.status_code(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn enabled() -> AuthConfig {
        AuthConfig::new(Some(ApiToken::new("operator-token-0123456789")))
    }

    #[test]
    fn verify_accepts_only_the_configured_token() {
        assert_eq!(enabled().verify("operator-token-0123456789"), Ok(Operator));
        assert_eq!(
            enabled().verify("operator-token-012345678"),
            Err(AuthError::InvalidToken)
        );
        assert_eq!(
            AuthConfig::default().verify("anything"),
            Err(AuthError::NotConfigured)
        );
    }

    #[test]
    fn require_distinguishes_missing_from_disabled() {
        assert_eq!(enabled().require(Some(Operator)), Ok(Operator));
        assert_eq!(enabled().require(None), Err(AuthError::MissingAuthHeader));
        assert_eq!(
            AuthConfig::default().require(None),
            Err(AuthError::NotConfigured)
        );
    }

    #[test]
    fn token_is_redacted_in_debug() {
        let config = enabled();
        assert!(!format!("{config:?}").contains("operator-token"));
    }

    #[tokio::test]
    async fn missing_auth_returns_401_with_code() {
        let response = AuthError::MissingAuthHeader.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error_code"], "missing_auth_header");
    }

    #[test]
    fn disabled_auth_is_unavailable_not_unauthorized() {
        assert_eq!(
            AuthError::NotConfigured.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
