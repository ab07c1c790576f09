// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Stealth address key derivation.

pub mod generator;
pub mod keys;

pub use generator::{StealthKeyMaterial, StealthMetaKeys, STEALTH_SEED_MESSAGE};
pub use keys::{
    derive_signing_key, derive_signing_key_hex, parse_private_key, parse_public_key,
    secret_address, stealth_address, StealthError,
};
