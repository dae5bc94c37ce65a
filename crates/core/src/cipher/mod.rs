//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Padding-aware AEAD core.
//!
//! [`Cipher`] owns the shared behavior — header AAD, padding policy, the
//! composed AAD, and the legacy fallback ladder — while the concrete
//! primitives ([`AesGcmCipher`], [`XChaChaCipher`]) implement only the key
//! hooks and the two data hooks `encrypt_with_aad` / `decrypt_with_aad`.
//!
//! Every AEAD call authenticates `header_bytes ‖ pad_aad`, binding both the
//! container metadata and the padding policy to the tag. Changing either
//! after the fact makes the ciphertext undecryptable.

mod aes_gcm;
mod xchacha;

pub use aes_gcm::AesGcmCipher;
pub use xchacha::{XChaChaCipher, XCHACHA_NONCE_LENGTH, XCHACHA_TAG_LENGTH};

use std::sync::Arc;

use zeroize::{Zeroize, Zeroizing};

use crate::error::{CryptitError, Result};
use crate::padding::PaddingScheme;
use crate::provider::{CryptoProvider, KeyHandle};

/// Domain tag of the padding-policy AAD fragment.
const PAD_AAD_TAG: &[u8; 4] = b"PAD1";

/// Version of the padding-policy AAD fragment.
const PAD_AAD_VERSION: u8 = 0x01;

/// Size of the padding-policy AAD fragment.
pub const PAD_AAD_LENGTH: usize = 8;

/// An authenticated cipher primitive framing its output as
/// `[IV/NONCE ‖ ct ‖ tag]`.
pub trait AeadPrimitive: Send {
    fn name(&self) -> &'static str;

    /// IV or nonce length prepended to every ciphertext.
    fn iv_length(&self) -> usize;

    /// Authentication tag length appended to every ciphertext.
    fn tag_length(&self) -> usize;

    /// Whether `set_key` needs an extractable handle (raw-key ciphers).
    fn key_extractable(&self) -> bool {
        false
    }

    fn set_key(&mut self, key: KeyHandle) -> Result<()>;

    fn zero_key(&mut self);

    fn has_key(&self) -> bool;

    /// Encrypt with a fresh random IV; returns `[IV ‖ ct ‖ tag]`.
    fn encrypt_with_aad(&self, plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt `[IV ‖ ct ‖ tag]`.
    fn decrypt_with_aad(&self, data: &[u8], aad: &[u8]) -> Result<Vec<u8>>;
}

/// Padding-policy selector for the AEAD core.
///
/// `Auto` resolves to `Require` when a padding scheme is configured and to
/// `Forbid` otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingMode {
    #[default]
    Auto,
    Require,
    Forbid,
}

/// Decrypt-time fallback for ciphertexts that predate the padding-policy
/// AAD.
///
/// When the composed-AAD attempt fails, the cipher retries with the header
/// bytes alone, and — only when `try_empty_aad` is set — once more with an
/// empty AAD for payloads that predate header binding entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyFallback {
    pub enabled: bool,
    pub policy: PaddingMode,
    pub try_empty_aad: bool,
}

impl Default for LegacyFallback {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: PaddingMode::Auto,
            try_empty_aad: false,
        }
    }
}

/// Build the fixed 8-byte padding-policy AAD fragment.
///
/// `"PAD1" ‖ version ‖ mode(0 = require, 1 = forbid) ‖ align ‖ reserved(0)`.
fn pad_aad(require: bool, align: u8) -> [u8; PAD_AAD_LENGTH] {
    let mut aad = [0u8; PAD_AAD_LENGTH];
    aad[..4].copy_from_slice(PAD_AAD_TAG);
    aad[4] = PAD_AAD_VERSION;
    aad[5] = if require { 0 } else { 1 };
    aad[6] = align;
    aad
}

/// The padding-aware AEAD core shared by all registered ciphers.
pub struct Cipher {
    primitive: Box<dyn AeadPrimitive>,
    provider: Arc<dyn CryptoProvider>,
    header_aad: Vec<u8>,
    padding: Option<PaddingScheme>,
    padding_mode: PaddingMode,
    padding_align: u8,
    legacy_fallback: LegacyFallback,
}

impl Cipher {
    pub fn new(primitive: Box<dyn AeadPrimitive>, provider: Arc<dyn CryptoProvider>) -> Self {
        Self {
            primitive,
            provider,
            header_aad: Vec::new(),
            padding: Some(PaddingScheme),
            padding_mode: PaddingMode::Auto,
            padding_align: 8,
            legacy_fallback: LegacyFallback::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.primitive.name()
    }

    pub fn iv_length(&self) -> usize {
        self.primitive.iv_length()
    }

    pub fn tag_length(&self) -> usize {
        self.primitive.tag_length()
    }

    /// Smallest ciphertext this cipher can produce.
    pub fn min_ciphertext_length(&self) -> usize {
        self.primitive.iv_length() + self.primitive.tag_length()
    }

    pub fn key_extractable(&self) -> bool {
        self.primitive.key_extractable()
    }

    /// Install the header bytes as associated data (copied).
    pub fn set_aad(&mut self, aad: &[u8]) {
        self.header_aad = aad.to_vec();
    }

    pub fn header_aad(&self) -> &[u8] {
        &self.header_aad
    }

    pub fn set_padding_scheme(&mut self, scheme: Option<PaddingScheme>) {
        self.padding = scheme;
    }

    pub fn set_padding_mode(&mut self, mode: PaddingMode) {
        self.padding_mode = mode;
    }

    /// Set the padding alignment. Zero is rejected; values above 248 are
    /// accepted here but fail at encrypt time when padding is required.
    pub fn set_padding_align(&mut self, align: u8) -> Result<()> {
        if align == 0 {
            return Err(CryptitError::MalformedPadding(
                "alignment must be at least 1".into(),
            ));
        }
        self.padding_align = align;
        Ok(())
    }

    pub fn set_legacy_fallback(&mut self, fallback: LegacyFallback) {
        self.legacy_fallback = fallback;
    }

    pub fn set_key(&mut self, key: KeyHandle) -> Result<()> {
        self.primitive.set_key(key)
    }

    pub fn zero_key(&mut self) {
        self.primitive.zero_key();
    }

    pub fn has_key(&self) -> bool {
        self.primitive.has_key()
    }

    /// Resolve `Auto` against the configured padding scheme.
    fn padding_required(&self, mode: PaddingMode) -> bool {
        match mode {
            PaddingMode::Require => true,
            PaddingMode::Forbid => false,
            PaddingMode::Auto => self.padding.is_some(),
        }
    }

    fn composed_aad(&self) -> Vec<u8> {
        let require = self.padding_required(self.padding_mode);
        let mut aad = Vec::with_capacity(self.header_aad.len() + PAD_AAD_LENGTH);
        aad.extend_from_slice(&self.header_aad);
        aad.extend_from_slice(&pad_aad(require, self.padding_align));
        aad
    }

    /// Encrypt one chunk under the composed AAD.
    ///
    /// The caller's plaintext buffer is overwritten with zeros before this
    /// returns, on success and on failure alike.
    pub fn encrypt_chunk(&self, plaintext: &mut [u8]) -> Result<Vec<u8>> {
        let result = self.encrypt_chunk_inner(plaintext);
        plaintext.zeroize();
        result
    }

    fn encrypt_chunk_inner(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let require = self.padding_required(self.padding_mode);
        let aad = self.composed_aad();

        if require {
            let scheme = self.padding.ok_or_else(|| {
                CryptitError::Encryption(
                    "padding required but no padding scheme configured".into(),
                )
            })?;
            let mut fill = |n: usize| self.provider.random_bytes(n);
            let padded = scheme.pad(plaintext, &mut fill, self.padding_align)?;
            self.primitive.encrypt_with_aad(&padded, &aad)
        } else {
            self.primitive.encrypt_with_aad(plaintext, &aad)
        }
    }

    /// Decrypt one chunk, enforcing the padding policy bound into the AAD.
    ///
    /// Tries the composed AAD first, then walks the legacy fallback ladder.
    /// Authentication failures are indistinguishable from wrong-key
    /// failures.
    pub fn decrypt_chunk(&self, data: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if data.len() < self.min_ciphertext_length() {
            return Err(CryptitError::Decryption("ciphertext too short".into()));
        }

        match self.primitive.decrypt_with_aad(data, &self.composed_aad()) {
            Ok(plain) => {
                return self.apply_policy(Zeroizing::new(plain), self.padding_mode);
            }
            Err(_) if self.legacy_fallback.enabled => {}
            Err(_) => return Err(CryptitError::decrypt_failed()),
        }

        // Legacy ladder: header-only AAD, then (opt-in) empty AAD.
        if !self.header_aad.is_empty() {
            if let Ok(plain) = self.primitive.decrypt_with_aad(data, &self.header_aad) {
                return self.apply_policy(Zeroizing::new(plain), self.legacy_fallback.policy);
            }
        }
        if self.legacy_fallback.try_empty_aad {
            if let Ok(plain) = self.primitive.decrypt_with_aad(data, &[]) {
                return self.apply_policy(Zeroizing::new(plain), self.legacy_fallback.policy);
            }
        }

        Err(CryptitError::decrypt_failed())
    }

    fn apply_policy(
        &self,
        plain: Zeroizing<Vec<u8>>,
        mode: PaddingMode,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let scheme = self.padding.unwrap_or(PaddingScheme);
        let unpadded = scheme.try_unpad(&plain);

        match mode {
            PaddingMode::Require if !unpadded.used => Err(CryptitError::Decryption(
                "expected padding trailer not found".into(),
            )),
            PaddingMode::Forbid if unpadded.used => Err(CryptitError::Decryption(
                "padding forbidden by policy".into(),
            )),
            PaddingMode::Forbid => Ok(plain),
            // Require with a valid trailer, or Auto: strip when present.
            _ if unpadded.used => {
                let stripped = Zeroizing::new(unpadded.plain.to_vec());
                Ok(stripped)
            }
            _ => Ok(plain),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OsProvider;

    fn cipher_pair() -> (Cipher, Cipher) {
        let provider: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());
        let key = provider.random_bytes(32).unwrap();

        let mut enc = Cipher::new(AesGcmCipher::boxed(provider.clone()), provider.clone());
        enc.set_key(provider.import_raw_key(&key, false).unwrap())
            .unwrap();

        let mut dec = Cipher::new(AesGcmCipher::boxed(provider.clone()), provider.clone());
        dec.set_key(provider.import_raw_key(&key, false).unwrap())
            .unwrap();

        (enc, dec)
    }

    #[test]
    fn test_pad_aad_layout() {
        let aad = pad_aad(true, 8);
        assert_eq!(&aad, &[b'P', b'A', b'D', b'1', 0x01, 0x00, 0x08, 0x00]);
        let aad = pad_aad(false, 32);
        assert_eq!(&aad, &[b'P', b'A', b'D', b'1', 0x01, 0x01, 0x20, 0x00]);
    }

    #[test]
    fn test_encrypt_decrypt_round_trip_with_padding() {
        let (enc, dec) = cipher_pair();
        let mut plain = b"hello world".to_vec();

        let ct = enc.encrypt_chunk(&mut plain).unwrap();
        assert!(plain.iter().all(|&b| b == 0), "plaintext not zeroized");

        let pt = dec.decrypt_chunk(&ct).unwrap();
        assert_eq!(pt.as_slice(), b"hello world");
    }

    #[test]
    fn test_padding_policy_mismatch_fails() {
        let (enc, mut dec) = cipher_pair();
        let ct = enc.encrypt_chunk(&mut b"data".to_vec()).unwrap();

        // Same key, but decrypting under `forbid` builds a different
        // composed AAD; the legacy ladder must not save it either.
        dec.set_padding_scheme(None);
        dec.set_legacy_fallback(LegacyFallback {
            enabled: false,
            ..LegacyFallback::default()
        });
        assert!(dec.decrypt_chunk(&ct).is_err());
    }

    #[test]
    fn test_align_mismatch_fails() {
        let (enc, mut dec) = cipher_pair();
        let ct = enc.encrypt_chunk(&mut b"data".to_vec()).unwrap();

        dec.set_padding_align(16).unwrap();
        dec.set_legacy_fallback(LegacyFallback {
            enabled: false,
            ..LegacyFallback::default()
        });
        assert!(dec.decrypt_chunk(&ct).is_err());
    }

    #[test]
    fn test_header_aad_mismatch_fails() {
        let (mut enc, mut dec) = cipher_pair();
        enc.set_aad(b"header-a");
        let ct = enc.encrypt_chunk(&mut b"data".to_vec()).unwrap();

        dec.set_aad(b"header-b");
        assert!(dec.decrypt_chunk(&ct).is_err());

        dec.set_aad(b"header-a");
        assert_eq!(dec.decrypt_chunk(&ct).unwrap().as_slice(), b"data");
    }

    #[test]
    fn test_legacy_fallback_header_only_aad() {
        let (mut enc, mut dec) = cipher_pair();

        // Simulate a legacy writer: header AAD only, no padding, no PAD
        // fragment.
        enc.set_aad(b"legacy-header");
        enc.set_padding_scheme(None);
        enc.set_padding_mode(PaddingMode::Forbid);
        let ct = {
            let aad = enc.header_aad.clone();
            enc.primitive.encrypt_with_aad(b"old data", &aad).unwrap()
        };

        dec.set_aad(b"legacy-header");
        let pt = dec.decrypt_chunk(&ct).unwrap();
        assert_eq!(pt.as_slice(), b"old data");

        // With the fallback disabled the same ciphertext must fail.
        dec.set_legacy_fallback(LegacyFallback {
            enabled: false,
            ..LegacyFallback::default()
        });
        assert!(dec.decrypt_chunk(&ct).is_err());
    }

    #[test]
    fn test_empty_aad_fallback_is_opt_in() {
        let (mut enc, mut dec) = cipher_pair();

        enc.set_aad(b"");
        let ct = enc.primitive.encrypt_with_aad(b"ancient", &[]).unwrap();

        dec.set_aad(b"some-header");
        assert!(dec.decrypt_chunk(&ct).is_err());

        dec.set_legacy_fallback(LegacyFallback {
            try_empty_aad: true,
            ..LegacyFallback::default()
        });
        assert_eq!(dec.decrypt_chunk(&ct).unwrap().as_slice(), b"ancient");
    }

    #[test]
    fn test_too_short_ciphertext_rejected_before_aead() {
        let (_, dec) = cipher_pair();
        let short = vec![0u8; dec.min_ciphertext_length() - 1];
        let err = dec.decrypt_chunk(&short).unwrap_err();
        assert!(matches!(err, CryptitError::Decryption(m) if m.contains("too short")));
    }

    #[test]
    fn test_require_mode_missing_trailer_fails() {
        let (mut enc, mut dec) = cipher_pair();

        // Writer claims `require` in the AAD but ships unpadded bytes.
        enc.set_padding_mode(PaddingMode::Require);
        let aad = enc.composed_aad();
        let ct = enc.primitive.encrypt_with_aad(b"no trailer", &aad).unwrap();

        dec.set_padding_mode(PaddingMode::Require);
        let err = dec.decrypt_chunk(&ct).unwrap_err();
        assert!(matches!(err, CryptitError::Decryption(m) if m.contains("trailer")));
    }

    #[test]
    fn test_tamper_detection() {
        let (enc, dec) = cipher_pair();
        let ct = enc.encrypt_chunk(&mut b"payload".to_vec()).unwrap();

        for i in 0..ct.len() {
            let mut corrupt = ct.clone();
            corrupt[i] ^= 0x01;
            assert!(dec.decrypt_chunk(&corrupt).is_err(), "byte {i} accepted");
        }
    }
}
