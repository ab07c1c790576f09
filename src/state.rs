// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use alloy::primitives::Address;
use axum::http::HeaderValue;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::accounts::{BalanceCache, BalanceQuery};
use crate::aa::{BundlerClient, Erc7677Client};
use crate::auth::AuthConfig;
use crate::blockchain::{ChainClient, USDC_TOKEN};
use crate::config::{AppConfig, ConfigError, PROVER_URL_ENV};
use crate::privacy_pool::PrivacyPool;
use crate::semaphore::{HttpMembershipProver, PaymasterProofAssembler};
use crate::store::TransferStore;
use crate::transfer::{Sponsorship, TransactionSubmitter};

/// Submitter type used by the HTTP service.
pub type Submitter = TransactionSubmitter<HttpMembershipProver>;

#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<ChainClient>,
    pub balances: BalanceQuery,
    pub store: Arc<RwLock<TransferStore>>,
    pub submitter: Arc<Submitter>,
    pub privacy_pool: Arc<PrivacyPool>,
    pub usdc_address: Address,
    pub auth: AuthConfig,
    pub cors_allowed_origins: Vec<HeaderValue>,
}

impl AppState {
    /// Wire every collaborator from configuration.
    ///
    /// Sponsorship is Semaphore-gated when a prover and an owner key are both
    /// configured, ERC-7677 when only a paymaster service is, otherwise none.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let owner = config.owner_signer()?;
        let has_owner = owner.is_some();
        let chain = Arc::new(ChainClient::new(config.network.clone(), owner));

        let sponsorship = match (&config.prover_url, &config.paymaster_url) {
            (Some(prover_url), _) if has_owner => {
                let prover = HttpMembershipProver::new(prover_url.clone()).map_err(|e| {
                    ConfigError::Invalid {
                        name: PROVER_URL_ENV,
                        reason: e.to_string(),
                    }
                })?;
                Sponsorship::Semaphore(PaymasterProofAssembler::new(
                    config.semaphore.clone(),
                    prover,
                ))
            }
            (prover_url, paymaster_url) => {
                if prover_url.is_some() {
                    warn!("PROVER_URL set without an owner key; Semaphore sponsorship disabled");
                }
                match paymaster_url {
                    Some(url) => Sponsorship::Erc7677(Erc7677Client::new(
                        url.clone(),
                        config.kernel.entry_point,
                        config.network.chain_id,
                    )),
                    None => Sponsorship::None,
                }
            }
        };
        info!(sponsorship = sponsorship.name(), "Configured user operation sponsorship");

        let auth = AuthConfig::new(config.api_token.clone());
        if has_owner && !auth.is_enabled() {
            warn!("Owner key loaded without API_TOKEN; owner-key operations are refused");
        }

        let submitter = TransactionSubmitter::new(
            chain.clone(),
            BundlerClient::new(config.bundler_url.clone(), config.kernel.entry_point),
            config.kernel.clone(),
            sponsorship,
        )
        .with_timeout(config.confirmation_timeout);

        let balances = BalanceQuery::new(
            chain.clone(),
            config.kernel.clone(),
            config.usdc_address,
            USDC_TOKEN,
            Arc::new(BalanceCache::default()),
        );

        Ok(Self {
            chain,
            balances,
            store: Arc::new(RwLock::new(TransferStore::new())),
            submitter: Arc::new(submitter),
            privacy_pool: Arc::new(PrivacyPool::new(
                config.privacy_pool_entrypoint,
                config.privacy_pool_deposit_wei,
            )),
            usdc_address: config.usdc_address,
            auth,
            cors_allowed_origins: config.cors_allowed_origins.clone(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Owner key used across router tests.
    pub(crate) const OWNER_KEY: &str =
        "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

    /// Operator token configured by [`offline_config`].
    pub(crate) const API_TOKEN: &str = "test-operator-token-0123456789";

    /// Configuration whose every endpoint is unreachable.
    pub(crate) fn offline_config(vars: &[(&str, &str)]) -> AppConfig {
        let mut env: HashMap<String, String> = HashMap::from([
            ("RPC_URL".to_string(), "http://127.0.0.1:9".to_string()),
            ("CONFIRMATION_TIMEOUT_SECS".to_string(), "1".to_string()),
            ("API_TOKEN".to_string(), API_TOKEN.to_string()),
        ]);
        for (name, value) in vars {
            if value.is_empty() {
                env.remove(*name);
            } else {
                env.insert(name.to_string(), value.to_string());
            }
        }
        AppConfig::from_lookup(|name| env.get(name).cloned()).unwrap()
    }

    pub(crate) fn offline_state() -> AppState {
        AppState::from_config(&offline_config(&[("OWNER_PRIVATE_KEY", OWNER_KEY)])).unwrap()
    }

    #[test]
    fn sponsorship_defaults_to_none() {
        let state = AppState::from_config(&offline_config(&[])).unwrap();
        assert_eq!(state.submitter.sponsorship().name(), "none");
        assert!(state.chain.owner_address().is_none());
    }

    #[test]
    fn paymaster_url_selects_erc7677() {
        let state = AppState::from_config(&offline_config(&[(
            "PAYMASTER_URL",
            "http://127.0.0.1:9/pm",
        )]))
        .unwrap();
        assert_eq!(state.submitter.sponsorship().name(), "erc7677");
    }

    #[test]
    fn prover_needs_an_owner_for_semaphore() {
        let without_owner = AppState::from_config(&offline_config(&[(
            "PROVER_URL",
            "http://127.0.0.1:9/",
        )]))
        .unwrap();
        assert_eq!(without_owner.submitter.sponsorship().name(), "none");

        let with_owner = AppState::from_config(&offline_config(&[
            ("PROVER_URL", "http://127.0.0.1:9/"),
            ("OWNER_PRIVATE_KEY", OWNER_KEY),
        ]))
        .unwrap();
        assert_eq!(with_owner.submitter.sponsorship().name(), "semaphore");
        assert!(with_owner.chain.owner_address().is_some());
    }

    #[test]
    fn api_token_enables_operator_auth() {
        assert!(offline_state().auth.is_enabled());
        let without = AppState::from_config(&offline_config(&[("API_TOKEN", "")])).unwrap();
        assert!(!without.auth.is_enabled());
    }

    #[test]
    fn invalid_owner_key_is_a_config_error() {
        let config = offline_config(&[("OWNER_PRIVATE_KEY", "0x1234")]);
        assert!(matches!(
            AppState::from_config(&config),
            Err(ConfigError::OwnerKey(_))
        ));
    }
}
