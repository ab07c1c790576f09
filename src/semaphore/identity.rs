// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deterministic Semaphore identity derived from an owner signature.

use std::fmt;

use alloy::primitives::{hex, Signature};

/// Message the owner signs to seed its Semaphore identity.
pub const SEMAPHORE_IDENTITY_MESSAGE: &str = "Creating a new Semaphore identity!!";

/// Semaphore identity secret.
///
/// The secret is the owner's signature over [`SEMAPHORE_IDENTITY_MESSAGE`]:
/// the same signer always yields the same identity, and nobody can build it
/// without the signer.
#[derive(Clone, PartialEq, Eq)]
pub struct SemaphoreIdentity {
    secret: String,
}

impl SemaphoreIdentity {
    pub fn from_signature(signature: &Signature) -> Self {
        Self {
            secret: hex::encode_prefixed(signature.as_bytes()),
        }
    }

    /// Secret in the 0x-hex form the proving service expects.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for SemaphoreIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemaphoreIdentity")
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::signers::{local::PrivateKeySigner, SignerSync};

    #[test]
    fn identity_is_deterministic_per_signer() {
        let signer = PrivateKeySigner::from_slice(&[0x11; 32]).unwrap();
        let a = signer
            .sign_message_sync(SEMAPHORE_IDENTITY_MESSAGE.as_bytes())
            .unwrap();
        let b = signer
            .sign_message_sync(SEMAPHORE_IDENTITY_MESSAGE.as_bytes())
            .unwrap();
        assert_eq!(
            SemaphoreIdentity::from_signature(&a),
            SemaphoreIdentity::from_signature(&b)
        );

        let other = signer.sign_message_sync(b"another message").unwrap();
        assert_ne!(
            SemaphoreIdentity::from_signature(&a),
            SemaphoreIdentity::from_signature(&other)
        );
    }

    #[test]
    fn debug_hides_secret() {
        let signer = PrivateKeySigner::from_slice(&[0x11; 32]).unwrap();
        let sig = signer.sign_message_sync(b"x").unwrap();
        let identity = SemaphoreIdentity::from_signature(&sig);
        let printed = format!("{identity:?}");
        assert!(!printed.contains(&identity.secret()[2..10]));
        assert_eq!(identity.secret().len(), 2 + 130);
    }
}
