//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Argon2id key derivation.
//!
//! Derives the 32-byte AEAD key from a passphrase and the per-container salt.
//! Tuning parameters travel with the scheme descriptor; the header records
//! only the difficulty selector, so the parameter tables are part of the wire
//! contract and must not change for registered schemes.

use argon2::{Algorithm, Argon2, Params as Argon2Params, Version};
use zeroize::Zeroizing;

use crate::error::{CryptitError, Result};

/// Output size (bytes) of the KDF; every registered cipher takes a 256-bit key.
pub const KEY_LENGTH: usize = 32;

/// Argon2id tuning parameters for one difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub time_cost: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl KdfParams {
    pub const fn new(time_cost: u32, memory_kib: u32, parallelism: u32) -> Self {
        Self {
            time_cost,
            memory_kib,
            parallelism,
        }
    }

    /// Deliberately weak parameters for test registries. Never register
    /// these outside a test.
    pub fn for_tests() -> Self {
        Self {
            time_cost: 1,
            memory_kib: 8 * 1024,
            parallelism: 1,
        }
    }

    fn to_argon2(self) -> Result<Argon2Params> {
        Argon2Params::new(
            self.memory_kib,
            self.time_cost,
            self.parallelism,
            Some(KEY_LENGTH),
        )
        .map_err(|e| CryptitError::KeyDerivation(format!("invalid argon2 parameters: {e}")))
    }
}

/// Derive a 32-byte key from `passphrase` and `salt` with Argon2id.
///
/// The caller owns the passphrase lifecycle; the engine wipes it as soon as
/// this returns. The derived key is zeroized when the returned buffer drops.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
    params: KdfParams,
) -> Result<Zeroizing<[u8; KEY_LENGTH]>> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.to_argon2()?);

    let mut out = Zeroizing::new([0u8; KEY_LENGTH]);
    argon2
        .hash_password_into(passphrase, salt, out.as_mut())
        .map_err(|e| CryptitError::KeyDerivation(format!("argon2id failed: {e}")))?;
    Ok(out)
}
