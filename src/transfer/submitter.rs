// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Submission of sweeps as ERC-4337 user operations.

use std::sync::Arc;
use std::time::Duration;

use alloy::{
    primitives::{aliases::U192, Address, Bytes, B256, U256},
    signers::{local::PrivateKeySigner, SignerSync},
    sol,
};
use tracing::{debug, info};

use super::assembler::TransferCall;
use crate::aa::{
    BundlerClient, BundlerError, Erc7677Client, PaymasterInfo, PaymasterServiceError,
    UserOperation,
};
use crate::accounts::KERNEL_ACCOUNT_INDEX;
use crate::blockchain::{ChainClient, ChainClientError};
use crate::kernel::{factory_data, KernelConfig};
use crate::semaphore::{MembershipProver, PaymasterError, PaymasterProofAssembler};

sol! {
    #[sol(rpc)]
    interface IEntryPoint {
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
    }
}

/// Default bound on waiting for inclusion.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(90);

/// How a user operation's gas is paid for.
pub enum Sponsorship<P> {
    /// The account pays its own gas.
    None,
    /// ERC-7677 paymaster web service.
    Erc7677(Erc7677Client),
    /// Semaphore paymaster gated by a group-membership proof.
    Semaphore(PaymasterProofAssembler<P>),
}

impl<P> Sponsorship<P> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Erc7677(_) => "erc7677",
            Self::Semaphore(_) => "semaphore",
        }
    }

    pub fn requires_proof(&self) -> bool {
        matches!(self, Self::Semaphore(_))
    }
}

/// Result of waiting for a sent operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Confirmed { tx_hash: B256, block_number: u64 },
    Reverted { reason: Option<String> },
    /// Not included before the deadline. It may still land later.
    TimedOut,
}

/// Outcome of a sent operation with its lookup handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReport {
    pub user_op_hash: B256,
    pub explorer_url: String,
    pub outcome: SubmitOutcome,
}

/// Failure before or while handing the operation to the bundler.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Chain(#[from] ChainClientError),

    #[error(transparent)]
    Bundler(#[from] BundlerError),

    #[error(transparent)]
    Paymaster(#[from] PaymasterError),

    #[error(transparent)]
    PaymasterService(#[from] PaymasterServiceError),

    #[error("Invalid signing key: {0}")]
    InvalidSigningKey(String),

    #[error("Signing key controls {actual}, not the account owner {expected}")]
    OwnerMismatch { expected: Address, actual: Address },

    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Builds, sponsors, signs and sends user operations for Kernel accounts.
pub struct TransactionSubmitter<P> {
    chain: Arc<ChainClient>,
    bundler: BundlerClient,
    kernel: KernelConfig,
    sponsorship: Sponsorship<P>,
    timeout: Duration,
}

impl<P: MembershipProver> TransactionSubmitter<P> {
    pub fn new(
        chain: Arc<ChainClient>,
        bundler: BundlerClient,
        kernel: KernelConfig,
        sponsorship: Sponsorship<P>,
    ) -> Self {
        Self {
            chain,
            bundler,
            kernel,
            sponsorship,
            timeout: DEFAULT_CONFIRMATION_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn sponsorship(&self) -> &Sponsorship<P> {
        &self.sponsorship
    }

    pub fn kernel(&self) -> &KernelConfig {
        &self.kernel
    }

    pub fn chain(&self) -> &ChainClient {
        &self.chain
    }

    /// Unsigned operation for a sweep: nonce, optional factory data and fees.
    pub async fn build_user_op(
        &self,
        owner: Address,
        call: &TransferCall,
    ) -> Result<UserOperation, SubmitError> {
        let entry_point = IEntryPoint::new(self.kernel.entry_point, self.chain.provider().clone());
        let nonce = entry_point
            .getNonce(call.kernel, U192::ZERO)
            .call()
            .await
            .map_err(|e| ChainClientError::ContractError(e.to_string()))?;

        let mut op = UserOperation::new(call.kernel, nonce, call.call_data.clone());

        if !self.chain.is_deployed(call.kernel).await? {
            debug!(kernel = %call.kernel, "Account not deployed, attaching factory data");
            op.factory = Some(self.kernel.factory);
            op.factory_data = Some(factory_data(&self.kernel, owner, KERNEL_ACCOUNT_INDEX));
        }

        let (max_fee, priority_fee) = self.chain.fee_estimate().await?;
        op.max_fee_per_gas = U256::from(max_fee);
        op.max_priority_fee_per_gas = U256::from(priority_fee);

        Ok(op)
    }

    /// Attach sponsorship and gas limits.
    ///
    /// The bundler always estimates a sponsored operation: the Semaphore
    /// proof or the ERC-7677 stub is attached first. The ERC-7677 service
    /// then signs over the estimated limits unless its stub was final.
    pub async fn sponsor_and_estimate(&self, op: &mut UserOperation) -> Result<(), SubmitError> {
        let mut needs_final_data = false;
        match &self.sponsorship {
            Sponsorship::None => {}
            Sponsorship::Semaphore(assembler) => {
                let info: PaymasterInfo = assembler.build(&self.chain, op.sender).await?;
                info.apply(op);
            }
            Sponsorship::Erc7677(client) => {
                let stub = client.get_paymaster_stub_data(op).await?;
                stub.info.apply(op);
                needs_final_data = !stub.is_final;
            }
        }

        let estimate = self.bundler.estimate_gas(op).await?;
        estimate.apply(op);

        if let (Sponsorship::Erc7677(client), true) = (&self.sponsorship, needs_final_data) {
            let info = client.get_paymaster_data(op).await?;
            info.apply(op);
        }

        Ok(())
    }

    /// Sign with the stealth signing key and hand to the bundler.
    pub async fn sign_and_send(
        &self,
        mut op: UserOperation,
        owner: Address,
        signing_key: &B256,
    ) -> Result<B256, SubmitError> {
        let signer = PrivateKeySigner::from_bytes(signing_key)
            .map_err(|e| SubmitError::InvalidSigningKey(e.to_string()))?;
        if signer.address() != owner {
            return Err(SubmitError::OwnerMismatch {
                expected: owner,
                actual: signer.address(),
            });
        }

        let hash = op.hash(self.kernel.entry_point, self.chain.network().chain_id);
        let signature = signer
            .sign_message_sync(hash.as_slice())
            .map_err(|e| SubmitError::Signing(e.to_string()))?;
        op.signature = Bytes::from(signature.as_bytes().to_vec());

        let user_op_hash = self.bundler.send(&op).await?;
        info!(
            kernel = %op.sender,
            user_op_hash = %user_op_hash,
            sponsorship = self.sponsorship.name(),
            "User operation sent"
        );
        Ok(user_op_hash)
    }

    /// Wait for inclusion up to the configured timeout.
    pub async fn await_inclusion(&self, user_op_hash: B256) -> Result<SubmitReport, SubmitError> {
        let explorer_url = self
            .chain
            .network()
            .user_op_url(&format!("{user_op_hash:#x}"));

        let outcome = match self
            .bundler
            .wait_for_receipt(user_op_hash, self.timeout)
            .await?
        {
            Some(receipt) if receipt.success => SubmitOutcome::Confirmed {
                tx_hash: receipt.receipt.transaction_hash,
                block_number: receipt.receipt.block_number.to::<u64>(),
            },
            Some(receipt) => SubmitOutcome::Reverted {
                reason: receipt.reason,
            },
            None => SubmitOutcome::TimedOut,
        };

        Ok(SubmitReport {
            user_op_hash,
            explorer_url,
            outcome,
        })
    }

    /// Build, sponsor, sign, send and wait in one call.
    pub async fn submit(
        &self,
        owner: Address,
        signing_key: &B256,
        call: &TransferCall,
    ) -> Result<SubmitReport, SubmitError> {
        let mut op = self.build_user_op(owner, call).await?;
        self.sponsor_and_estimate(&mut op).await?;
        let user_op_hash = self.sign_and_send(op, owner, signing_key).await?;
        self.await_inclusion(user_op_hash).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{
        NetworkConfig, SEPOLIA_CHAIN_ID, SEPOLIA_EXPLORER_URL, USER_OP_EXPLORER_URL,
    };
    use crate::semaphore::HttpMembershipProver;
    use crate::test_support::MockRpc;
    use serde_json::json;
    use url::Url;

    fn submitter_with(
        bundler_url: Url,
        sponsorship: Sponsorship<HttpMembershipProver>,
    ) -> TransactionSubmitter<HttpMembershipProver> {
        let network = NetworkConfig {
            name: "Sepolia".to_string(),
            chain_id: SEPOLIA_CHAIN_ID,
            rpc_url: "http://127.0.0.1:9".parse().unwrap(),
            explorer_url: SEPOLIA_EXPLORER_URL.to_string(),
            user_op_explorer_url: USER_OP_EXPLORER_URL.to_string(),
        };
        let kernel = KernelConfig::default();
        let bundler = BundlerClient::new(bundler_url, kernel.entry_point)
            .with_poll_interval(Duration::from_millis(10));
        TransactionSubmitter::new(
            Arc::new(ChainClient::new(network, None)),
            bundler,
            kernel,
            sponsorship,
        )
        .with_timeout(Duration::from_millis(50))
    }

    fn submitter() -> TransactionSubmitter<HttpMembershipProver> {
        submitter_with("http://127.0.0.1:9".parse().unwrap(), Sponsorship::None)
    }

    /// Paymaster service and bundler behind one endpoint. Estimation fails
    /// like a bundler would for an unfunded, unsponsored account.
    async fn erc7677_service(stub_is_final: bool) -> MockRpc {
        let paymaster = Address::repeat_byte(0xba);
        MockRpc::start(move |method, params| match method {
            "pm_getPaymasterStubData" => Ok(json!({
                "paymaster": paymaster,
                "paymasterData": "0x01",
                "paymasterVerificationGasLimit": "0x11170",
                "paymasterPostOpGasLimit": "0x7530",
                "isFinal": stub_is_final,
            })),
            "eth_estimateUserOperationGas" => {
                if params[0]["paymaster"].is_null() {
                    return Err("AA21 didn't pay prefund".to_string());
                }
                Ok(json!({
                    "preVerificationGas": "0xc350",
                    "verificationGasLimit": "0x30d40",
                    "callGasLimit": "0x186a0",
                    "paymasterVerificationGasLimit": "0x9c40",
                }))
            }
            "pm_getPaymasterData" => Ok(json!({
                "paymaster": paymaster,
                "paymasterData": "0x02",
            })),
            other => Err(format!("unexpected method {other}")),
        })
        .await
    }

    fn erc7677_submitter(rpc: &MockRpc) -> TransactionSubmitter<HttpMembershipProver> {
        let client = Erc7677Client::new(
            rpc.url.clone(),
            KernelConfig::default().entry_point,
            SEPOLIA_CHAIN_ID,
        );
        submitter_with(rpc.url.clone(), Sponsorship::Erc7677(client))
    }

    #[tokio::test]
    async fn erc7677_stub_precedes_estimation_and_final_data_follows() {
        let rpc = erc7677_service(false).await;
        let mut op = UserOperation::new(Address::repeat_byte(0x4b), U256::ZERO, Bytes::new());

        erc7677_submitter(&rpc)
            .sponsor_and_estimate(&mut op)
            .await
            .unwrap();

        assert_eq!(
            rpc.methods(),
            vec![
                "pm_getPaymasterStubData",
                "eth_estimateUserOperationGas",
                "pm_getPaymasterData"
            ]
        );
        let estimated = &rpc.params("eth_estimateUserOperationGas")[0][0];
        assert_eq!(estimated["paymasterData"], "0x01");

        assert_eq!(op.paymaster, Some(Address::repeat_byte(0xba)));
        assert_eq!(op.paymaster_data, Some(Bytes::from(vec![0x02])));
        assert_eq!(op.call_gas_limit, U256::from(0x186a0u64));
        // Stub limit is larger than the estimate and survives both steps.
        assert_eq!(op.paymaster_verification_gas_limit, Some(U256::from(0x11170u64)));
        assert_eq!(op.paymaster_post_op_gas_limit, Some(U256::from(0x7530u64)));
    }

    #[tokio::test]
    async fn final_erc7677_stub_skips_paymaster_data() {
        let rpc = erc7677_service(true).await;
        let mut op = UserOperation::new(Address::repeat_byte(0x4b), U256::ZERO, Bytes::new());

        erc7677_submitter(&rpc)
            .sponsor_and_estimate(&mut op)
            .await
            .unwrap();

        assert_eq!(
            rpc.methods(),
            vec!["pm_getPaymasterStubData", "eth_estimateUserOperationGas"]
        );
        assert_eq!(op.paymaster_data, Some(Bytes::from(vec![0x01])));
    }

    #[tokio::test]
    async fn paymaster_service_errors_name_the_method() {
        let rpc = MockRpc::start(|_, _| Err("sponsorship denied".to_string())).await;
        let mut op = UserOperation::new(Address::repeat_byte(0x4b), U256::ZERO, Bytes::new());

        let err = erc7677_submitter(&rpc)
            .sponsor_and_estimate(&mut op)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::PaymasterService(_)));
        assert!(err.to_string().contains("pm_getPaymasterStubData"));
        assert_eq!(rpc.count("eth_estimateUserOperationGas"), 0);
    }

    #[tokio::test]
    async fn signing_key_must_control_the_owner() {
        let key = B256::repeat_byte(0x07);
        let op = UserOperation::new(Address::ZERO, U256::ZERO, Bytes::new());
        let err = submitter()
            .sign_and_send(op, Address::repeat_byte(0x01), &key)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::OwnerMismatch { .. }));
    }

    #[tokio::test]
    async fn unanswered_operation_times_out_with_explorer_link() {
        let hash = B256::repeat_byte(0xaa);
        let report = submitter().await_inclusion(hash).await.unwrap();
        assert_eq!(report.outcome, SubmitOutcome::TimedOut);
        assert_eq!(report.user_op_hash, hash);
        assert!(report
            .explorer_url
            .starts_with("https://jiffyscan.xyz/userOpHash/0xaaaa"));
    }

    #[test]
    fn sponsorship_names() {
        assert_eq!(Sponsorship::<HttpMembershipProver>::None.name(), "none");
        assert!(!Sponsorship::<HttpMembershipProver>::None.requires_proof());
    }
}
