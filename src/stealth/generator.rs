// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Signature-seeded stealth meta-keys and per-nonce batch generation.

use alloy::primitives::{keccak256, Address, B256};
use k256::{
    elliptic_curve::ops::Reduce, FieldBytes, NonZeroScalar, PublicKey, Scalar, SecretKey,
};

use super::keys::{derive_signing_key, secret_address, secret_to_b256, StealthError};

/// Message the owner signs to seed the stealth meta-keys.
pub const STEALTH_SEED_MESSAGE: &str =
    "Sign this message to derive your stealth address keys.\n\nOnly sign it on a trusted device.";

/// One derivable stealth (address, key) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StealthKeyMaterial {
    pub nonce: u64,
    pub ephemeral_private_key: B256,
    pub stealth_address: Address,
    pub signing_key: B256,
}

/// Spending and viewing keys derived from a seed signature.
#[derive(Clone)]
pub struct StealthMetaKeys {
    spending: SecretKey,
    viewing: SecretKey,
}

impl std::fmt::Debug for StealthMetaKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StealthMetaKeys")
            .field("spending_public", &self.spending_public_hex())
            .finish_non_exhaustive()
    }
}

impl StealthMetaKeys {
    /// Split a 65-byte `r || s || v` signature: spending = keccak256(r),
    /// viewing = keccak256(s).
    pub fn from_signature(signature: &[u8]) -> Result<Self, StealthError> {
        if signature.len() != 65 {
            return Err(StealthError::InvalidSignature(format!(
                "expected 65 bytes, got {}",
                signature.len()
            )));
        }

        let spending = secret_from_hash(keccak256(&signature[..32]))?;
        let viewing = secret_from_hash(keccak256(&signature[32..64]))?;
        Ok(Self { spending, viewing })
    }

    /// Parse a 0x-prefixed hex signature.
    pub fn from_signature_hex(signature: &str) -> Result<Self, StealthError> {
        let bytes = alloy::hex::decode(signature.trim())
            .map_err(|e| StealthError::InvalidSignature(e.to_string()))?;
        Self::from_signature(&bytes)
    }

    pub fn spending_public(&self) -> PublicKey {
        self.spending.public_key()
    }

    pub fn spending_public_hex(&self) -> String {
        use k256::elliptic_curve::sec1::ToEncodedPoint;
        alloy::hex::encode_prefixed(self.spending_public().to_encoded_point(false).as_bytes())
    }

    /// Ephemeral key for `nonce`: keccak256(viewing || chain_id || nonce) mod n.
    pub fn ephemeral_key(&self, chain_id: u64, nonce: u64) -> Result<SecretKey, StealthError> {
        let mut preimage = Vec::with_capacity(32 + 16);
        preimage.extend_from_slice(self.viewing.to_bytes().as_slice());
        preimage.extend_from_slice(&chain_id.to_be_bytes());
        preimage.extend_from_slice(&nonce.to_be_bytes());
        secret_from_hash(keccak256(&preimage))
    }

    /// Derive the stealth key material for a single nonce.
    pub fn derive(&self, chain_id: u64, nonce: u64) -> Result<StealthKeyMaterial, StealthError> {
        let ephemeral = self.ephemeral_key(chain_id, nonce)?;
        let signing = derive_signing_key(&ephemeral, &self.spending, &self.spending_public())?;

        Ok(StealthKeyMaterial {
            nonce,
            ephemeral_private_key: secret_to_b256(&ephemeral),
            stealth_address: secret_address(&signing),
            signing_key: secret_to_b256(&signing),
        })
    }

    /// Derive key material for every nonce in order.
    pub fn generate(
        &self,
        chain_id: u64,
        nonces: impl IntoIterator<Item = u64>,
    ) -> Result<Vec<StealthKeyMaterial>, StealthError> {
        nonces
            .into_iter()
            .map(|nonce| self.derive(chain_id, nonce))
            .collect()
    }
}

fn secret_from_hash(hash: B256) -> Result<SecretKey, StealthError> {
    let scalar = <Scalar as Reduce<k256::U256>>::reduce_bytes(&FieldBytes::from(hash.0));
    let scalar: Option<NonZeroScalar> = NonZeroScalar::new(scalar).into();
    scalar.map(SecretKey::from).ok_or(StealthError::DegenerateKey)
}
