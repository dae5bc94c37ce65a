//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! XChaCha20-Poly1305 primitive (scheme 1).
//!
//! Providers only expose AES-GCM, so this cipher imports its key
//! extractable, exports the raw 32 bytes once at `set_key`, and keeps the
//! single in-memory copy in a zeroizing buffer until `zero_key`.

use std::sync::Arc;

use aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use zeroize::Zeroizing;

use crate::cipher::AeadPrimitive;
use crate::error::{CryptitError, Result};
use crate::provider::{CryptoProvider, KeyHandle};

/// XChaCha20-Poly1305 extended nonce length (bytes).
pub const XCHACHA_NONCE_LENGTH: usize = 24;

/// Poly1305 tag length (bytes).
pub const XCHACHA_TAG_LENGTH: usize = 16;

pub struct XChaChaCipher {
    provider: Arc<dyn CryptoProvider>,
    key: Option<Zeroizing<Vec<u8>>>,
}

impl XChaChaCipher {
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self {
            provider,
            key: None,
        }
    }

    /// Constructor shape used by scheme descriptors.
    pub fn boxed(provider: Arc<dyn CryptoProvider>) -> Box<dyn AeadPrimitive> {
        Box::new(Self::new(provider))
    }

    fn cipher(&self) -> Result<XChaCha20Poly1305> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| CryptitError::Encryption("cipher has no key installed".into()))?;
        XChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| CryptitError::Encryption("invalid XChaCha20 key length".into()))
    }
}

impl AeadPrimitive for XChaChaCipher {
    fn name(&self) -> &'static str {
        "XChaCha20-Poly1305"
    }

    fn iv_length(&self) -> usize {
        XCHACHA_NONCE_LENGTH
    }

    fn tag_length(&self) -> usize {
        XCHACHA_TAG_LENGTH
    }

    fn key_extractable(&self) -> bool {
        true
    }

    fn set_key(&mut self, key: KeyHandle) -> Result<()> {
        // Export once, then let the handle drop; the raw copy below is the
        // only one this cipher holds.
        let raw = self.provider.export_raw_key(&key)?;
        if raw.len() != 32 {
            return Err(CryptitError::Encryption(format!(
                "XChaCha20 key must be 32 bytes, got {}",
                raw.len()
            )));
        }
        self.key = Some(raw);
        Ok(())
    }

    fn zero_key(&mut self) {
        // Zeroizing wipes the raw key on drop.
        self.key = None;
    }

    fn has_key(&self) -> bool {
        self.key.is_some()
    }

    fn encrypt_with_aad(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let cipher = self.cipher()?;
        let nonce = self.provider.random_bytes(XCHACHA_NONCE_LENGTH)?;

        let ct = cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CryptitError::Encryption("XChaCha20-Poly1305 encryption failed".into()))?;

        let mut out = Vec::with_capacity(XCHACHA_NONCE_LENGTH + ct.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ct);
        Ok(out)
    }

    fn decrypt_with_aad(&self, data: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        if data.len() < XCHACHA_NONCE_LENGTH + XCHACHA_TAG_LENGTH {
            return Err(CryptitError::Decryption("ciphertext too short".into()));
        }
        let cipher = match self.cipher() {
            Ok(c) => c,
            Err(_) => return Err(CryptitError::decrypt_failed()),
        };
        let (nonce, ct) = data.split_at(XCHACHA_NONCE_LENGTH);
        cipher
            .decrypt(XNonce::from_slice(nonce), Payload { msg: ct, aad })
            .map_err(|_| CryptitError::decrypt_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OsProvider;

    fn keyed_cipher() -> XChaChaCipher {
        let provider: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());
        let key = provider
            .import_raw_key(&provider.random_bytes(32).unwrap(), true)
            .unwrap();
        let mut cipher = XChaChaCipher::new(provider);
        cipher.set_key(key).unwrap();
        cipher
    }

    #[test]
    fn test_frame_layout() {
        let cipher = keyed_cipher();
        let ct = cipher.encrypt_with_aad(b"hello", b"aad").unwrap();
        assert_eq!(ct.len(), XCHACHA_NONCE_LENGTH + 5 + XCHACHA_TAG_LENGTH);
    }

    #[test]
    fn test_round_trip_with_aad() {
        let cipher = keyed_cipher();
        let ct = cipher.encrypt_with_aad(b"X", b"hdr").unwrap();
        assert_eq!(cipher.decrypt_with_aad(&ct, b"hdr").unwrap(), b"X");
        assert!(cipher.decrypt_with_aad(&ct, b"other").is_err());
    }

    #[test]
    fn test_requires_extractable_handle() {
        let provider: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());
        let sealed = provider
            .import_raw_key(&provider.random_bytes(32).unwrap(), false)
            .unwrap();

        let mut cipher = XChaChaCipher::new(provider);
        assert!(cipher.key_extractable());
        assert!(cipher.set_key(sealed).is_err());
    }

    #[test]
    fn test_zero_key_drops_material() {
        let mut cipher = keyed_cipher();
        assert!(cipher.has_key());
        cipher.zero_key();
        assert!(!cipher.has_key());
        assert!(cipher.encrypt_with_aad(b"x", b"").is_err());
    }
}
