// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stealth signing-key derivation over secp256k1.
//!
//! For an ephemeral key `e` and a recipient spending key pair `(s, S = s·G)`:
//!
//! ```text
//! P = e·S                      shared point
//! h = keccak256(P.x || P.y)    uncompressed, without the 0x04 prefix
//! k = s·h mod n                stealth signing key
//! ```
//!
//! The stealth address is the Ethereum address of `k·G`, which the sender can
//! compute without `s` as `h·S`.

use alloy::primitives::{keccak256, Address, B256};
use k256::{
    elliptic_curve::{ops::Reduce, sec1::ToEncodedPoint},
    AffinePoint, FieldBytes, NonZeroScalar, ProjectivePoint, PublicKey, Scalar, SecretKey,
};

/// Errors produced while parsing or deriving stealth keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StealthError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Spending public key does not belong to the spending private key")]
    KeyMismatch,

    #[error("Invalid seed signature: {0}")]
    InvalidSignature(String),

    #[error("Derivation produced a degenerate key")]
    DegenerateKey,
}

/// Parse a 32-byte private key from 0x-prefixed (or bare) hex.
pub fn parse_private_key(hex_key: &str) -> Result<SecretKey, StealthError> {
    let bytes = decode_hex(hex_key, "private key")?;
    if bytes.len() != 32 {
        return Err(StealthError::InvalidKey(format!(
            "private key must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    SecretKey::from_slice(&bytes)
        .map_err(|_| StealthError::InvalidKey("private key is zero or exceeds the curve order".into()))
}

/// Parse a SEC1 public key (33-byte compressed or 65-byte uncompressed).
pub fn parse_public_key(hex_key: &str) -> Result<PublicKey, StealthError> {
    let bytes = decode_hex(hex_key, "public key")?;
    if bytes.len() != 33 && bytes.len() != 65 {
        return Err(StealthError::InvalidKey(format!(
            "public key must be 33 or 65 bytes, got {}",
            bytes.len()
        )));
    }
    PublicKey::from_sec1_bytes(&bytes)
        .map_err(|_| StealthError::InvalidKey("public key is not a point on secp256k1".into()))
}

fn decode_hex(value: &str, what: &str) -> Result<Vec<u8>, StealthError> {
    alloy::hex::decode(value.trim())
        .map_err(|e| StealthError::InvalidKey(format!("{what} is not valid hex: {e}")))
}

/// `keccak256(x || y)` of the ECDH point `secret · public`, reduced to a scalar.
pub fn shared_secret_scalar(secret: &SecretKey, public: &PublicKey) -> Result<Scalar, StealthError> {
    let point = public.to_projective() * *secret.to_nonzero_scalar();
    let affine: AffinePoint = point.into();
    let shared = PublicKey::from_affine(affine).map_err(|_| StealthError::DegenerateKey)?;

    let encoded = shared.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    Ok(<Scalar as Reduce<k256::U256>>::reduce_bytes(&FieldBytes::from(hash.0)))
}

/// Derive the private key controlling a stealth address.
///
/// Fails with [`StealthError::KeyMismatch`] when `spending_public` is not
/// `spending_private·G`, since the result would control nothing.
pub fn derive_signing_key(
    ephemeral_private: &SecretKey,
    spending_private: &SecretKey,
    spending_public: &PublicKey,
) -> Result<SecretKey, StealthError> {
    if spending_private.public_key() != *spending_public {
        return Err(StealthError::KeyMismatch);
    }

    let hashed = shared_secret_scalar(ephemeral_private, spending_public)?;
    let product = *spending_private.to_nonzero_scalar() * hashed;

    let scalar: Option<NonZeroScalar> = NonZeroScalar::new(product).into();
    scalar.map(SecretKey::from).ok_or(StealthError::DegenerateKey)
}

/// Hex convenience wrapper around [`derive_signing_key`].
///
/// Returns the signing key as 0x-prefixed, zero-padded 32-byte hex.
pub fn derive_signing_key_hex(
    ephemeral_private: &str,
    spending_private: &str,
    spending_public: &str,
) -> Result<String, StealthError> {
    let key = derive_signing_key(
        &parse_private_key(ephemeral_private)?,
        &parse_private_key(spending_private)?,
        &parse_public_key(spending_public)?,
    )?;
    Ok(format!("{:#x}", secret_to_b256(&key)))
}

/// Stealth address as computed by a sender, who knows only `S`.
pub fn stealth_address(
    ephemeral_private: &SecretKey,
    spending_public: &PublicKey,
) -> Result<Address, StealthError> {
    let hashed = shared_secret_scalar(ephemeral_private, spending_public)?;
    let point: ProjectivePoint = spending_public.to_projective() * hashed;
    let affine: AffinePoint = point.into();
    let stealth_public = PublicKey::from_affine(affine).map_err(|_| StealthError::DegenerateKey)?;
    Ok(public_key_address(&stealth_public))
}

/// Ethereum address of a public key.
pub fn public_key_address(public: &PublicKey) -> Address {
    let encoded = public.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    Address::from_slice(&hash[12..])
}

/// Ethereum address controlled by a private key.
pub fn secret_address(secret: &SecretKey) -> Address {
    public_key_address(&secret.public_key())
}

/// Big-endian, zero-padded 32-byte form of a private key.
pub fn secret_to_b256(secret: &SecretKey) -> B256 {
    B256::from_slice(secret.to_bytes().as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> SecretKey {
        SecretKey::from_slice(&[byte; 32]).unwrap()
    }

    fn pub_hex(secret: &SecretKey, compressed: bool) -> String {
        alloy::hex::encode_prefixed(secret.public_key().to_encoded_point(compressed).as_bytes())
    }

    #[test]
    fn derivation_is_deterministic() {
        let ephemeral = key(0x11);
        let spending = key(0x22);

        let a = derive_signing_key(&ephemeral, &spending, &spending.public_key()).unwrap();
        let b = derive_signing_key(&ephemeral, &spending, &spending.public_key()).unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn sender_and_recipient_agree_on_address() {
        let ephemeral = key(0x33);
        let spending = key(0x44);

        let signing = derive_signing_key(&ephemeral, &spending, &spending.public_key()).unwrap();
        let from_sender = stealth_address(&ephemeral, &spending.public_key()).unwrap();
        assert_eq!(secret_address(&signing), from_sender);
    }

    #[test]
    fn different_ephemeral_keys_give_different_signing_keys() {
        let spending = key(0x44);
        let a = derive_signing_key(&key(0x01), &spending, &spending.public_key()).unwrap();
        let b = derive_signing_key(&key(0x02), &spending, &spending.public_key()).unwrap();
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn hex_wrapper_is_zero_padded_and_accepts_both_encodings() {
        let ephemeral = alloy::hex::encode_prefixed([0x55u8; 32]);
        let spending = key(0x66);
        let spending_hex = alloy::hex::encode_prefixed([0x66u8; 32]);

        let compressed =
            derive_signing_key_hex(&ephemeral, &spending_hex, &pub_hex(&spending, true)).unwrap();
        let uncompressed =
            derive_signing_key_hex(&ephemeral, &spending_hex, &pub_hex(&spending, false)).unwrap();

        assert_eq!(compressed, uncompressed);
        assert_eq!(compressed.len(), 2 + 64);
        assert!(compressed.starts_with("0x"));
    }

    #[test]
    fn malformed_inputs_fail_fast() {
        let good_priv = alloy::hex::encode_prefixed([0x66u8; 32]);
        let good_pub = pub_hex(&key(0x66), false);

        // Too short.
        assert!(matches!(
            derive_signing_key_hex("0x1234", &good_priv, &good_pub),
            Err(StealthError::InvalidKey(_))
        ));
        // Not hex.
        assert!(matches!(
            derive_signing_key_hex(&good_priv, "0xzz", &good_pub),
            Err(StealthError::InvalidKey(_))
        ));
        // Zero scalar.
        let zero = alloy::hex::encode_prefixed([0u8; 32]);
        assert!(matches!(
            derive_signing_key_hex(&zero, &good_priv, &good_pub),
            Err(StealthError::InvalidKey(_))
        ));
        // Not on the curve.
        let mut bogus = [0u8; 65];
        bogus[0] = 0x04;
        bogus[1] = 0x01;
        assert!(matches!(
            derive_signing_key_hex(&good_priv, &good_priv, &alloy::hex::encode_prefixed(bogus)),
            Err(StealthError::InvalidKey(_))
        ));
    }

    #[test]
    fn mismatched_spending_pair_is_rejected() {
        let result = derive_signing_key(&key(0x01), &key(0x02), &key(0x03).public_key());
        assert_eq!(result.unwrap_err(), StealthError::KeyMismatch);
    }

    #[test]
    fn signing_key_authorizes_its_stealth_address() {
        use alloy::signers::{local::PrivateKeySigner, SignerSync};

        let ephemeral = key(0x77);
        let spending = key(0x12);
        let signing = derive_signing_key(&ephemeral, &spending, &spending.public_key()).unwrap();
        let address = stealth_address(&ephemeral, &spending.public_key()).unwrap();

        let signer = PrivateKeySigner::from_bytes(&secret_to_b256(&signing)).unwrap();
        let signature = signer.sign_message_sync(b"authorize").unwrap();
        assert_eq!(
            signature.recover_address_from_msg(b"authorize").unwrap(),
            address
        );
    }
}
