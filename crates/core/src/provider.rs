//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Platform crypto capability trait and the default OS-backed provider.
//!
//! A [`CryptoProvider`] supplies the strong CSPRNG, the AES-256-GCM
//! primitive, and raw-key import/export. XChaCha20-Poly1305 is *not* a
//! provider capability; that cipher runs in pure code against a raw key
//! exported from an extractable [`KeyHandle`].
//!
//! Every provider instance carries a stable identity token so that engine
//! caches can key on provider identity without holding references.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

use crate::error::{CryptitError, Result};

/// AES-256-GCM initialization vector length (bytes).
pub const AES_GCM_IV_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length (bytes).
pub const AES_GCM_TAG_LENGTH: usize = 16;

/// An imported symmetric key.
///
/// The raw material zeroizes on drop. [`CryptoProvider::export_raw_key`]
/// refuses handles that were imported non-extractable; the AES-GCM scheme
/// relies on that to keep its key inside the provider boundary.
pub struct KeyHandle {
    material: Zeroizing<Vec<u8>>,
    extractable: bool,
}

impl KeyHandle {
    pub fn extractable(&self) -> bool {
        self.extractable
    }

    pub fn len(&self) -> usize {
        self.material.len()
    }

    pub fn is_empty(&self) -> bool {
        self.material.is_empty()
    }

    fn material(&self) -> &[u8] {
        &self.material
    }
}

impl fmt::Debug for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyHandle([REDACTED], {} bytes, extractable: {})",
            self.material.len(),
            self.extractable
        )
    }
}

/// Platform crypto capabilities required by the engine layer.
pub trait CryptoProvider: Send + Sync {
    /// Stable identity token for engine-cache keying.
    fn instance_id(&self) -> u64;

    /// `n` bytes from a cryptographically strong RNG.
    fn random_bytes(&self, n: usize) -> Result<Vec<u8>>;

    /// Wrap raw key material in a handle.
    fn import_raw_key(&self, material: &[u8], extractable: bool) -> Result<KeyHandle>;

    /// Recover raw key material from an extractable handle.
    fn export_raw_key(&self, handle: &KeyHandle) -> Result<Zeroizing<Vec<u8>>>;

    /// AES-256-GCM encryption with explicit IV and AAD; returns `ct ‖ tag`.
    fn aead_encrypt(
        &self,
        key: &KeyHandle,
        iv: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>>;

    /// AES-256-GCM decryption with explicit IV and AAD over `ct ‖ tag`.
    fn aead_decrypt(
        &self,
        key: &KeyHandle,
        iv: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>>;
}

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(1);

/// Default provider backed by the OS CSPRNG and the pure-Rust AES-GCM
/// implementation.
pub struct OsProvider {
    id: u64,
}

impl OsProvider {
    pub fn new() -> Self {
        Self {
            id: NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl Default for OsProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for OsProvider {
    fn instance_id(&self) -> u64 {
        self.id
    }

    fn random_bytes(&self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| CryptitError::Encryption(format!("system rng failure: {e}")))?;
        Ok(buf)
    }

    fn import_raw_key(&self, material: &[u8], extractable: bool) -> Result<KeyHandle> {
        if material.len() != 32 {
            return Err(CryptitError::Encryption(format!(
                "raw key must be 32 bytes, got {}",
                material.len()
            )));
        }
        Ok(KeyHandle {
            material: Zeroizing::new(material.to_vec()),
            extractable,
        })
    }

    fn export_raw_key(&self, handle: &KeyHandle) -> Result<Zeroizing<Vec<u8>>> {
        if !handle.extractable {
            return Err(CryptitError::Encryption(
                "key handle is not extractable".into(),
            ));
        }
        Ok(Zeroizing::new(handle.material().to_vec()))
    }

    fn aead_encrypt(
        &self,
        key: &KeyHandle,
        iv: &[u8],
        plaintext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        if iv.len() != AES_GCM_IV_LENGTH {
            return Err(CryptitError::Encryption(format!(
                "AES-GCM iv must be {AES_GCM_IV_LENGTH} bytes, got {}",
                iv.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key.material())
            .map_err(|e| CryptitError::Encryption(format!("AES-GCM key setup failed: {e}")))?;
        cipher
            .encrypt(
                Nonce::from_slice(iv),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CryptitError::Encryption("AES-GCM encryption failed".into()))
    }

    fn aead_decrypt(
        &self,
        key: &KeyHandle,
        iv: &[u8],
        ciphertext: &[u8],
        aad: &[u8],
    ) -> Result<Vec<u8>> {
        if iv.len() != AES_GCM_IV_LENGTH {
            return Err(CryptitError::decrypt_failed());
        }
        let cipher = Aes256Gcm::new_from_slice(key.material())
            .map_err(|_| CryptitError::decrypt_failed())?;
        cipher
            .decrypt(
                Nonce::from_slice(iv),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|_| CryptitError::decrypt_failed())
    }
}
