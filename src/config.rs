// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup by [`AppConfig::from_env`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `RPC_URL` | Ethereum JSON-RPC endpoint | `https://ethereum-sepolia-rpc.publicnode.com` |
//! | `CHAIN_ID` | Chain ID | `11155111` |
//! | `EXPLORER_URL` | Transaction explorer | `https://sepolia.etherscan.io` |
//! | `USEROP_EXPLORER_URL` | User operation explorer | `https://jiffyscan.xyz/userOpHash` |
//! | `BUNDLER_URL` | ERC-4337 bundler RPC | `RPC_URL` |
//! | `PAYMASTER_URL` | ERC-7677 paymaster service | Optional |
//! | `PROVER_URL` | Semaphore proving service; enables gated sponsorship | Optional |
//! | `OWNER_PRIVATE_KEY` | Owner key (hex) for seeds, joins and deposits | Optional |
//! | `OWNER_KEY_PEM` | Path to a PEM owner key, used if no hex key is set | Optional |
//! | `API_TOKEN` | Operator bearer token for owner-key operations (16+ chars) | Optional; owner-key routes refused |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated origins allowed cross-origin | None (same-origin only) |
//! | `USDC_ADDRESS` | Swept token | Sepolia USDC |
//! | `ENTRY_POINT_ADDRESS` | EntryPoint v0.7 | `0x0000000071727De22E5E9d8BAf0edAc6f37da032` |
//! | `KERNEL_FACTORY_ADDRESS` | Kernel v3.1 factory | `0xaac5D4240AF87249B3f71BC8E4A2cae074A3E419` |
//! | `KERNEL_IMPLEMENTATION_ADDRESS` | Kernel v3.1 implementation | `0xBAC849bB641841b44E965fB01A4Bf5F074f84b4D` |
//! | `ECDSA_VALIDATOR_ADDRESS` | Kernel ECDSA validator | `0x845ADb2C711129d4f3966735eD98a9F09fC4cE57` |
//! | `SEMAPHORE_ADMIN_ADDRESS` | Group admin contract | `0x4Cd39b36ae99C2c4DAE1f6af989feC0E34bf67f2` |
//! | `SEMAPHORE_PAYMASTER_ADDRESS` | Semaphore paymaster | `0xDA79AD2A2afBE758d3F015720F4841754833922c` |
//! | `SEMAPHORE_GROUP_ID` | Group id | `0` |
//! | `SEMAPHORE_DEPOSIT_WEI` | Join deposit | `1000000000000000` |
//! | `SEMAPHORE_START_BLOCK` | First block for event replay | `8553079` |
//! | `PRIVACY_POOL_ENTRYPOINT` | Privacy pool entrypoint | `0x0e95a2ac10745cad4fdf00394cb6419ed24374f7` |
//! | `PRIVACY_POOL_DEPOSIT_WEI` | Deposit value | `1000000000000000` |
//! | `CONFIRMATION_TIMEOUT_SECS` | User operation inclusion timeout | `90` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use alloy::primitives::{address, Address, U256};
use alloy::signers::local::PrivateKeySigner;
use axum::http::HeaderValue;
use url::Url;

use crate::auth::{ApiToken, MIN_TOKEN_LENGTH};
use crate::blockchain::{
    signer_from_pem_file, ChainClient, NetworkConfig, SEPOLIA_CHAIN_ID, SEPOLIA_EXPLORER_URL,
    SEPOLIA_RPC_URL, USDC_SEPOLIA_ADDRESS, USER_OP_EXPLORER_URL,
};
use crate::kernel::KernelConfig;
use crate::semaphore::SemaphoreConfig;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const EXPLORER_URL_ENV: &str = "EXPLORER_URL";
pub const USEROP_EXPLORER_URL_ENV: &str = "USEROP_EXPLORER_URL";
pub const BUNDLER_URL_ENV: &str = "BUNDLER_URL";
pub const PAYMASTER_URL_ENV: &str = "PAYMASTER_URL";
pub const PROVER_URL_ENV: &str = "PROVER_URL";
pub const OWNER_PRIVATE_KEY_ENV: &str = "OWNER_PRIVATE_KEY";
pub const OWNER_KEY_PEM_ENV: &str = "OWNER_KEY_PEM";
pub const USDC_ADDRESS_ENV: &str = "USDC_ADDRESS";
pub const ENTRY_POINT_ADDRESS_ENV: &str = "ENTRY_POINT_ADDRESS";
pub const KERNEL_FACTORY_ADDRESS_ENV: &str = "KERNEL_FACTORY_ADDRESS";
pub const KERNEL_IMPLEMENTATION_ADDRESS_ENV: &str = "KERNEL_IMPLEMENTATION_ADDRESS";
pub const ECDSA_VALIDATOR_ADDRESS_ENV: &str = "ECDSA_VALIDATOR_ADDRESS";
pub const SEMAPHORE_ADMIN_ADDRESS_ENV: &str = "SEMAPHORE_ADMIN_ADDRESS";
pub const SEMAPHORE_PAYMASTER_ADDRESS_ENV: &str = "SEMAPHORE_PAYMASTER_ADDRESS";
pub const SEMAPHORE_GROUP_ID_ENV: &str = "SEMAPHORE_GROUP_ID";
pub const SEMAPHORE_DEPOSIT_WEI_ENV: &str = "SEMAPHORE_DEPOSIT_WEI";
pub const SEMAPHORE_START_BLOCK_ENV: &str = "SEMAPHORE_START_BLOCK";
pub const PRIVACY_POOL_ENTRYPOINT_ENV: &str = "PRIVACY_POOL_ENTRYPOINT";
pub const PRIVACY_POOL_DEPOSIT_WEI_ENV: &str = "PRIVACY_POOL_DEPOSIT_WEI";
pub const CONFIRMATION_TIMEOUT_SECS_ENV: &str = "CONFIRMATION_TIMEOUT_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const API_TOKEN_ENV: &str = "API_TOKEN";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";

/// Semaphore group admin on Sepolia.
pub const SEMAPHORE_ADMIN_ADDRESS: Address = address!("4Cd39b36ae99C2c4DAE1f6af989feC0E34bf67f2");
/// Semaphore paymaster on Sepolia.
pub const SEMAPHORE_PAYMASTER_ADDRESS: Address =
    address!("DA79AD2A2afBE758d3F015720F4841754833922c");
/// First block of the Semaphore paymaster deployment.
pub const SEMAPHORE_START_BLOCK: u64 = 8_553_079;
/// Privacy pool entrypoint on Sepolia.
pub const PRIVACY_POOL_ENTRYPOINT: Address = address!("0e95a2ac10745cad4fdf00394cb6419ed24374f7");
/// 0.001 ETH.
pub const DEFAULT_DEPOSIT_WEI: u64 = 1_000_000_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Failed to load owner key: {0}")]
    OwnerKey(String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Where the owner key comes from.
#[derive(Clone)]
pub enum OwnerKeySource {
    Hex(String),
    PemFile(PathBuf),
}

impl std::fmt::Debug for OwnerKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hex(_) => f.write_str("Hex(<redacted>)"),
            Self::PemFile(path) => f.debug_tuple("PemFile").field(path).finish(),
        }
    }
}

/// Parsed service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub network: NetworkConfig,
    pub bundler_url: Url,
    pub paymaster_url: Option<Url>,
    pub prover_url: Option<Url>,
    pub owner_key: Option<OwnerKeySource>,
    pub api_token: Option<ApiToken>,
    pub cors_allowed_origins: Vec<HeaderValue>,
    pub usdc_address: Address,
    pub kernel: KernelConfig,
    pub semaphore: SemaphoreConfig,
    pub privacy_pool_entrypoint: Address,
    pub privacy_pool_deposit_wei: U256,
    pub confirmation_timeout: Duration,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let host = env.string(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = env.parse_or(PORT_ENV, 8080)?;
        let bind_addr = format!("{host}:{port}")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: HOST_ENV,
                reason: e.to_string(),
            })?;

        let rpc_url: Url = env.parse_or_else(RPC_URL_ENV, SEPOLIA_RPC_URL)?;
        let network = NetworkConfig {
            name: "Sepolia".to_string(),
            chain_id: env.parse_or(CHAIN_ID_ENV, SEPOLIA_CHAIN_ID)?,
            rpc_url: rpc_url.clone(),
            explorer_url: env
                .string(EXPLORER_URL_ENV)
                .unwrap_or_else(|| SEPOLIA_EXPLORER_URL.to_string()),
            user_op_explorer_url: env
                .string(USEROP_EXPLORER_URL_ENV)
                .unwrap_or_else(|| USER_OP_EXPLORER_URL.to_string()),
        };

        let defaults = KernelConfig::default();
        let kernel = KernelConfig {
            factory: env.parse_or(KERNEL_FACTORY_ADDRESS_ENV, defaults.factory)?,
            implementation: env
                .parse_or(KERNEL_IMPLEMENTATION_ADDRESS_ENV, defaults.implementation)?,
            ecdsa_validator: env.parse_or(ECDSA_VALIDATOR_ADDRESS_ENV, defaults.ecdsa_validator)?,
            entry_point: env.parse_or(ENTRY_POINT_ADDRESS_ENV, defaults.entry_point)?,
        };

        let semaphore = SemaphoreConfig {
            admin: env.parse_or(SEMAPHORE_ADMIN_ADDRESS_ENV, SEMAPHORE_ADMIN_ADDRESS)?,
            paymaster: env.parse_or(SEMAPHORE_PAYMASTER_ADDRESS_ENV, SEMAPHORE_PAYMASTER_ADDRESS)?,
            group_id: env.parse_or(SEMAPHORE_GROUP_ID_ENV, U256::ZERO)?,
            deposit_wei: env.parse_or(SEMAPHORE_DEPOSIT_WEI_ENV, U256::from(DEFAULT_DEPOSIT_WEI))?,
            start_block: env.parse_or(SEMAPHORE_START_BLOCK_ENV, SEMAPHORE_START_BLOCK)?,
            log_chunk_size: SemaphoreConfig::DEFAULT_LOG_CHUNK_SIZE,
            membership_retries: SemaphoreConfig::DEFAULT_MEMBERSHIP_RETRIES,
            membership_backoff: SemaphoreConfig::DEFAULT_MEMBERSHIP_BACKOFF,
        };

        let api_token = env.string(API_TOKEN_ENV).map(ApiToken::new);
        if let Some(token) = &api_token {
            if token.len() < MIN_TOKEN_LENGTH {
                return Err(ConfigError::Invalid {
                    name: API_TOKEN_ENV,
                    reason: format!("must be at least {MIN_TOKEN_LENGTH} characters"),
                });
            }
        }

        let cors_allowed_origins = env
            .string(CORS_ALLOWED_ORIGINS_ENV)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(|origin| {
                        HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                            name: CORS_ALLOWED_ORIGINS_ENV,
                            reason: e.to_string(),
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        let log_format = match env.string(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        Ok(Self {
            bind_addr,
            bundler_url: env.parse_or(BUNDLER_URL_ENV, rpc_url)?,
            network,
            paymaster_url: env.parse_opt(PAYMASTER_URL_ENV)?,
            prover_url: env.parse_opt(PROVER_URL_ENV)?,
            owner_key: env
                .string(OWNER_PRIVATE_KEY_ENV)
                .map(OwnerKeySource::Hex)
                .or_else(|| {
                    env.string(OWNER_KEY_PEM_ENV)
                        .map(|path| OwnerKeySource::PemFile(PathBuf::from(path)))
                }),
            api_token,
            cors_allowed_origins,
            usdc_address: env.parse_or(USDC_ADDRESS_ENV, USDC_SEPOLIA_ADDRESS)?,
            kernel,
            semaphore,
            privacy_pool_entrypoint: env
                .parse_or(PRIVACY_POOL_ENTRYPOINT_ENV, PRIVACY_POOL_ENTRYPOINT)?,
            privacy_pool_deposit_wei: env
                .parse_or(PRIVACY_POOL_DEPOSIT_WEI_ENV, U256::from(DEFAULT_DEPOSIT_WEI))?,
            confirmation_timeout: Duration::from_secs(env.parse_or(
                CONFIRMATION_TIMEOUT_SECS_ENV,
                crate::transfer::DEFAULT_CONFIRMATION_TIMEOUT.as_secs(),
            )?),
            log_format,
        })
    }

    /// Owner signer from `OWNER_PRIVATE_KEY`, else `OWNER_KEY_PEM`.
    pub fn owner_signer(&self) -> Result<Option<PrivateKeySigner>, ConfigError> {
        let signer = match &self.owner_key {
            None => return Ok(None),
            Some(OwnerKeySource::Hex(key)) => ChainClient::create_signer(key),
            Some(OwnerKeySource::PemFile(path)) => signer_from_pem_file(path),
        };
        signer
            .map(Some)
            .map_err(|e| ConfigError::OwnerKey(e.to_string()))
    }
}

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_opt<T>(&self, name: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.string(name)
            .map(|raw| {
                raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                    name,
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    fn parse_or<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse_opt(name)?.unwrap_or(default))
    }

    fn parse_or_else<T>(&self, name: &'static str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.string(name).unwrap_or_else(|| default.to_string());
        raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_target_sepolia() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.network.chain_id, 11_155_111);
        assert_eq!(config.bundler_url, config.network.rpc_url);
        assert_eq!(config.kernel, KernelConfig::default());
        assert_eq!(config.semaphore.group_id, U256::ZERO);
        assert_eq!(config.semaphore.start_block, 8_553_079);
        assert_eq!(
            config.semaphore.deposit_wei,
            U256::from(1_000_000_000_000_000u64)
        );
        assert_eq!(config.confirmation_timeout, Duration::from_secs(90));
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.prover_url.is_none());
        assert!(config.owner_signer().unwrap().is_none());
        assert!(config.api_token.is_none());
        assert!(config.cors_allowed_origins.is_empty());
        assert_eq!(config.usdc_address, USDC_SEPOLIA_ADDRESS);
        assert_eq!(
            config.usdc_address.to_string().to_lowercase(),
            "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238"
        );
    }

    #[test]
    fn overrides_are_parsed_into_typed_values() {
        let config = load(&[
            ("PORT", "9000"),
            ("BUNDLER_URL", "https://bundler.example/rpc"),
            ("SEMAPHORE_GROUP_ID", "3"),
            ("CONFIRMATION_TIMEOUT_SECS", "30"),
            ("LOG_FORMAT", "json"),
            ("USDC_ADDRESS", "0x1111111111111111111111111111111111111111"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.bundler_url.as_str(), "https://bundler.example/rpc");
        assert_eq!(config.semaphore.group_id, U256::from(3u64));
        assert_eq!(config.confirmation_timeout, Duration::from_secs(30));
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.usdc_address, Address::repeat_byte(0x11));
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = load(&[("SEMAPHORE_PAYMASTER_ADDRESS", "0x1234")]).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                name: "SEMAPHORE_PAYMASTER_ADDRESS",
                ..
            }
        ));

        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));

        assert!(load(&[("LOG_FORMAT", "xml")]).is_err());
    }

    #[test]
    fn api_token_and_cors_origins() {
        let config = load(&[
            ("API_TOKEN", "operator-token-0123456789"),
            (
                "CORS_ALLOWED_ORIGINS",
                "https://wallet.example, https://admin.example",
            ),
        ])
        .unwrap();
        assert!(config.api_token.is_some());
        assert!(!format!("{config:?}").contains("operator-token"));
        assert_eq!(config.cors_allowed_origins.len(), 2);
        assert_eq!(config.cors_allowed_origins[1], "https://admin.example");

        let err = load(&[("API_TOKEN", "short")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "API_TOKEN", .. }));
    }

    #[test]
    fn owner_key_is_loaded_from_hex() {
        let config = load(&[(
            "OWNER_PRIVATE_KEY",
            "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
        )])
        .unwrap();
        assert!(config.owner_signer().unwrap().is_some());
        assert!(!format!("{config:?}").contains("4c0883a6"));

        let bad = load(&[("OWNER_PRIVATE_KEY", "0x12")]).unwrap();
        assert!(matches!(bad.owner_signer(), Err(ConfigError::OwnerKey(_))));
    }
}
