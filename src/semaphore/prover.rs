// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Semaphore proving collaborator.
//!
//! Identity commitments, proof generation and proof verification run in an
//! external proving service. [`MembershipProver`] is the seam; the HTTP
//! implementation talks to the service and tests substitute doubles.

use std::future::Future;
use std::time::Duration;

use alloy::primitives::U256;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::identity::SemaphoreIdentity;

/// A Semaphore v4 group-membership proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemaphoreProof {
    pub merkle_tree_depth: u64,
    pub merkle_tree_root: U256,
    pub nullifier: U256,
    pub message: U256,
    pub scope: U256,
    pub points: [U256; 8],
}

/// Generates and verifies membership proofs.
pub trait MembershipProver: Send + Sync {
    /// Public identity commitment of `identity`.
    fn commitment(
        &self,
        identity: &SemaphoreIdentity,
    ) -> impl Future<Output = Result<U256, ProverError>> + Send;

    /// Prove `identity` is one of `members` for `message` under `scope`.
    fn generate_proof(
        &self,
        identity: &SemaphoreIdentity,
        members: &[U256],
        message: U256,
        scope: U256,
    ) -> impl Future<Output = Result<SemaphoreProof, ProverError>> + Send;

    fn verify_proof(
        &self,
        proof: &SemaphoreProof,
    ) -> impl Future<Output = Result<bool, ProverError>> + Send;
}

#[derive(Debug, thiserror::Error)]
pub enum ProverError {
    #[error("Prover request failed: {0}")]
    Request(String),

    #[error("Prover returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid prover response: {0}")]
    InvalidResponse(String),

    #[error("Identity is not a member of the group")]
    NotAMember,
}

#[derive(Serialize)]
struct CommitmentRequest<'a> {
    identity: &'a str,
}

#[derive(Deserialize)]
struct CommitmentResponse {
    commitment: U256,
}

#[derive(Serialize)]
struct ProofRequest<'a> {
    identity: &'a str,
    members: &'a [U256],
    message: U256,
    scope: U256,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    proof: &'a SemaphoreProof,
}

#[derive(Deserialize)]
struct VerifyResponse {
    valid: bool,
}

/// [`MembershipProver`] backed by a proving service over HTTP.
///
/// Endpoints, relative to the base URL: `POST commitment`, `POST proof`
/// and `POST verify`.
#[derive(Clone)]
pub struct HttpMembershipProver {
    http: Client,
    base_url: Url,
}

impl HttpMembershipProver {
    /// Proof generation can take tens of seconds on the service side.
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new(base_url: Url) -> Result<Self, ProverError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProverError::Request(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProverError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{path}")).map_err(|e| ProverError::Request(e.to_string()))
    }

    async fn post<Req: Serialize, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, ProverError> {
        let response = self
            .http
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await
            .map_err(|e| ProverError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProverError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProverError::InvalidResponse(e.to_string()))
    }
}

impl MembershipProver for HttpMembershipProver {
    async fn commitment(&self, identity: &SemaphoreIdentity) -> Result<U256, ProverError> {
        let resp: CommitmentResponse = self
            .post(
                "commitment",
                &CommitmentRequest {
                    identity: identity.secret(),
                },
            )
            .await?;
        Ok(resp.commitment)
    }

    async fn generate_proof(
        &self,
        identity: &SemaphoreIdentity,
        members: &[U256],
        message: U256,
        scope: U256,
    ) -> Result<SemaphoreProof, ProverError> {
        self.post(
            "proof",
            &ProofRequest {
                identity: identity.secret(),
                members,
                message,
                scope,
            },
        )
        .await
    }

    async fn verify_proof(&self, proof: &SemaphoreProof) -> Result<bool, ProverError> {
        let resp: VerifyResponse = self.post("verify", &VerifyRequest { proof }).await?;
        Ok(resp.valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_join_without_double_slash() {
        let prover = HttpMembershipProver::new("http://prover.local/api/".parse().unwrap()).unwrap();
        assert_eq!(
            prover.endpoint("proof").unwrap().as_str(),
            "http://prover.local/api/proof"
        );
    }

    #[test]
    fn proof_deserializes_from_service_json() {
        let points: Vec<String> = (1..=8).map(|i| format!("{i:#x}")).collect();
        let proof: SemaphoreProof = serde_json::from_value(serde_json::json!({
            "merkleTreeDepth": 2,
            "merkleTreeRoot": "0x10",
            "nullifier": "0x20",
            "message": "0x30",
            "scope": "0x0",
            "points": points,
        }))
        .unwrap();
        assert_eq!(proof.merkle_tree_depth, 2);
        assert_eq!(proof.merkle_tree_root, U256::from(16u64));
        assert_eq!(proof.points[7], U256::from(8u64));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_request_error() {
        let prover = HttpMembershipProver::new("http://127.0.0.1:9".parse().unwrap()).unwrap();
        let identity = {
            use alloy::signers::{local::PrivateKeySigner, SignerSync};
            let signer = PrivateKeySigner::from_slice(&[0x22; 32]).unwrap();
            SemaphoreIdentity::from_signature(&signer.sign_message_sync(b"x").unwrap())
        };
        assert!(matches!(
            prover.commitment(&identity).await,
            Err(ProverError::Request(_))
        ));
    }
}
