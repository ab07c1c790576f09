// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Owner key loading.
//!
//! The owner key signs the stealth seed message, the Semaphore identity
//! message, group joins and privacy-pool deposits. It is read once at
//! startup either as raw hex or from a PEM file (SEC1 or PKCS#8).

use std::path::Path;

use alloy::signers::local::PrivateKeySigner;
use k256::SecretKey;

use super::client::{ChainClient, ChainClientError};

/// Parse a private key from PEM format to hex string.
///
/// # Returns
/// * `Ok(String)` - Hex-encoded private key (64 characters, no 0x prefix)
/// * `Err(ChainClientError)` - If PEM parsing fails
pub fn pem_to_hex(pem_bytes: &[u8]) -> Result<String, ChainClientError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| ChainClientError::InvalidPrivateKey(format!("Invalid UTF-8: {}", e)))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| ChainClientError::InvalidPrivateKey(format!("Invalid PEM: {}", e)))?;

    let secret_key = SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| parse_pkcs8_to_secret_key(pem.contents()))
        .map_err(|e| ChainClientError::InvalidPrivateKey(format!("Invalid key format: {}", e)))?;

    Ok(alloy::hex::encode(secret_key.to_bytes()))
}

fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}

/// Create a signer from PEM-encoded private key bytes.
pub fn signer_from_pem(pem_bytes: &[u8]) -> Result<PrivateKeySigner, ChainClientError> {
    let hex_key = pem_to_hex(pem_bytes)?;
    ChainClient::create_signer(&hex_key)
}

/// Load a signer from a PEM file on disk.
pub fn signer_from_pem_file(path: &Path) -> Result<PrivateKeySigner, ChainClientError> {
    let bytes = std::fs::read(path).map_err(|e| {
        ChainClientError::InvalidPrivateKey(format!("Cannot read {}: {}", path.display(), e))
    })?;
    signer_from_pem(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use k256::pkcs8::{EncodePrivateKey, LineEnding};

    fn test_pem() -> String {
        let secret = SecretKey::from_slice(&[0x42u8; 32]).unwrap();
        secret.to_pkcs8_pem(LineEnding::LF).unwrap().to_string()
    }

    #[test]
    fn test_pem_to_hex() {
        let hex = pem_to_hex(test_pem().as_bytes()).unwrap();
        assert_eq!(hex, "42".repeat(32));
    }

    #[test]
    fn test_signer_from_pem_matches_hex_signer() {
        let from_pem = signer_from_pem(test_pem().as_bytes()).unwrap();
        let from_hex = ChainClient::create_signer(&"42".repeat(32)).unwrap();
        assert_eq!(from_pem.address(), from_hex.address());
    }

    #[test]
    fn test_signer_from_pem_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(test_pem().as_bytes()).unwrap();
        assert!(signer_from_pem_file(file.path()).is_ok());
    }

    #[test]
    fn test_rejects_non_pem() {
        assert!(matches!(
            signer_from_pem(b"not a pem"),
            Err(ChainClientError::InvalidPrivateKey(_))
        ));
    }
}
