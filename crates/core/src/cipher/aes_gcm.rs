//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! AES-256-GCM primitive (scheme 0).
//!
//! The key stays inside the provider boundary as a non-extractable handle;
//! every call goes through [`CryptoProvider::aead_encrypt`] /
//! [`CryptoProvider::aead_decrypt`] with a fresh random 12-byte IV.

use std::sync::Arc;

use crate::cipher::AeadPrimitive;
use crate::error::{CryptitError, Result};
use crate::provider::{CryptoProvider, KeyHandle, AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH};

pub struct AesGcmCipher {
    provider: Arc<dyn CryptoProvider>,
    key: Option<KeyHandle>,
}

impl AesGcmCipher {
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

    fn key(&self) -> Result<&KeyHandle> {
        self.key
            .as_ref()
            .ok_or_else(|| CryptitError::Encryption("cipher has no key installed".into()))
    }
}

impl AeadPrimitive for AesGcmCipher {
    fn name(&self) -> &'static str {
        "AES-256-GCM"
    }

    fn iv_length(&self) -> usize {
        AES_GCM_IV_LENGTH
    }

    fn tag_length(&self) -> usize {
        AES_GCM_TAG_LENGTH
    }

    fn set_key(&mut self, key: KeyHandle) -> Result<()> {
        self.key = Some(key);
        Ok(())
    }

    fn zero_key(&mut self) {
        // KeyHandle zeroizes its material on drop.
        self.key = None;
    }

    fn has_key(&self) -> bool {
        self.key.is_some()
    }

    fn encrypt_with_aad(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let key = self.key()?;
        let iv = self.provider.random_bytes(AES_GCM_IV_LENGTH)?;
        let ct = self.provider.aead_encrypt(key, &iv, plaintext, aad)?;

        let mut out = Vec::with_capacity(AES_GCM_IV_LENGTH + ct.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ct);
        Ok(out)
    }

    fn decrypt_with_aad(&self, data: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| CryptitError::decrypt_failed())?;
        if data.len() < AES_GCM_IV_LENGTH + AES_GCM_TAG_LENGTH {
            return Err(CryptitError::Decryption("ciphertext too short".into()));
        }
        let (iv, ct) = data.split_at(AES_GCM_IV_LENGTH);
        self.provider.aead_decrypt(key, iv, ct, aad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OsProvider;

    fn keyed_cipher() -> (AesGcmCipher, Arc<dyn CryptoProvider>) {
        let provider: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());
        let key = provider
            .import_raw_key(&provider.random_bytes(32).unwrap(), false)
            .unwrap();
        let mut cipher = AesGcmCipher::new(provider.clone());
        cipher.set_key(key).unwrap();
        (cipher, provider)
    }

    #[test]
    fn test_frame_layout() {
        let (cipher, _) = keyed_cipher();
        let ct = cipher.encrypt_with_aad(b"hello", b"aad").unwrap();
        assert_eq!(ct.len(), AES_GCM_IV_LENGTH + 5 + AES_GCM_TAG_LENGTH);
    }

    #[test]
    fn test_round_trip_and_fresh_ivs() {
        let (cipher, _) = keyed_cipher();
        let a = cipher.encrypt_with_aad(b"msg", b"").unwrap();
        let b = cipher.encrypt_with_aad(b"msg", b"").unwrap();
        assert_ne!(a[..AES_GCM_IV_LENGTH], b[..AES_GCM_IV_LENGTH]);

        assert_eq!(cipher.decrypt_with_aad(&a, b"").unwrap(), b"msg");
        assert_eq!(cipher.decrypt_with_aad(&b, b"").unwrap(), b"msg");
    }

    #[test]
    fn test_no_key_fails() {
        let provider: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());
        let cipher = AesGcmCipher::new(provider);
        assert!(cipher.encrypt_with_aad(b"x", b"").is_err());
        assert!(cipher.decrypt_with_aad(&[0u8; 64], b"").is_err());
    }

    #[test]
    fn test_zero_key_drops_material() {
        let (mut cipher, _) = keyed_cipher();
        assert!(cipher.has_key());
        cipher.zero_key();
        assert!(!cipher.has_key());
        assert!(cipher.encrypt_with_aad(b"x", b"").is_err());
    }
}
