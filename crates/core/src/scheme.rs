//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Scheme registry: cipher + KDF presets + salt/chunk defaults per 3-bit id.
//!
//! Registration happens once at startup through an explicit constructor
//! ([`SchemeRegistry::builtin`]); the registry is immutable afterwards and
//! shared behind an `Arc`. The difficulty tables of the two built-in
//! schemes are part of the wire contract — existing ciphertexts record only
//! the difficulty selector, so the numbers here must never change.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::cipher::{
    AeadPrimitive, AesGcmCipher, XChaChaCipher, XCHACHA_NONCE_LENGTH, XCHACHA_TAG_LENGTH,
};
use crate::error::{CryptitError, Result};
use crate::kdf::KdfParams;
use crate::provider::{CryptoProvider, AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH};

/// Scheme id of AES-256-GCM, the current default.
pub const SCHEME_AES_256_GCM: u8 = 0;

/// Scheme id of XChaCha20-Poly1305.
pub const SCHEME_XCHACHA20_POLY1305: u8 = 1;

/// Largest representable scheme id (3 bits in the header info byte).
pub const MAX_SCHEME_ID: u8 = 7;

/// Default chunk size for both built-in schemes (512 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 512 * 1024;

/// Argon2id difficulty selector recorded in the header info byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Low,
    Middle,
    High,
}

impl Difficulty {
    /// Two-bit wire code.
    pub fn code(self) -> u8 {
        match self {
            Difficulty::Low => 0,
            Difficulty::Middle => 1,
            Difficulty::High => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Difficulty::Low),
            1 => Some(Difficulty::Middle),
            2 => Some(Difficulty::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Low => "low",
            Difficulty::Middle => "middle",
            Difficulty::High => "high",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = CryptitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(Difficulty::Low),
            "middle" => Ok(Difficulty::Middle),
            "high" => Ok(Difficulty::High),
            other => Err(CryptitError::Scheme(format!(
                "unknown difficulty '{other}'"
            ))),
        }
    }
}

/// Salt length selector recorded in the header info byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaltStrength {
    Low,
    High,
}

impl SaltStrength {
    /// Single wire bit; 1 means high.
    pub fn bit(self) -> u8 {
        match self {
            SaltStrength::Low => 0,
            SaltStrength::High => 1,
        }
    }

    pub fn from_bit(bit: u8) -> Self {
        if bit & 1 == 1 {
            SaltStrength::High
        } else {
            SaltStrength::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SaltStrength::Low => "low",
            SaltStrength::High => "high",
        }
    }
}

impl fmt::Display for SaltStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SaltStrength {
    type Err = CryptitError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "low" => Ok(SaltStrength::Low),
            "high" => Ok(SaltStrength::High),
            other => Err(CryptitError::Scheme(format!(
                "unknown salt strength '{other}'"
            ))),
        }
    }
}

/// Argon2id presets per difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyTable {
    pub low: KdfParams,
    pub middle: KdfParams,
    pub high: KdfParams,
}

impl DifficultyTable {
    pub fn get(&self, difficulty: Difficulty) -> KdfParams {
        match difficulty {
            Difficulty::Low => self.low,
            Difficulty::Middle => self.middle,
            Difficulty::High => self.high,
        }
    }

    /// Uniformly weak presets for test registries.
    pub fn for_tests() -> Self {
        let weak = KdfParams::for_tests();
        Self {
            low: weak,
            middle: weak,
            high: weak,
        }
    }
}

/// Salt lengths per strength selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaltLengths {
    pub low: usize,
    pub high: usize,
}

impl SaltLengths {
    pub fn get(&self, strength: SaltStrength) -> usize {
        match strength {
            SaltStrength::Low => self.low,
            SaltStrength::High => self.high,
        }
    }
}

/// Constructor shape for the scheme's cipher primitive.
pub type CipherCtor = fn(Arc<dyn CryptoProvider>) -> Box<dyn AeadPrimitive>;

/// Immutable description of one registered scheme.
#[derive(Clone)]
pub struct SchemeDescriptor {
    pub id: u8,
    pub name: &'static str,
    pub cipher_ctor: CipherCtor,
    /// IV/nonce length of the cipher; duplicated here so static container
    /// inspection works without instantiating a cipher.
    pub iv_length: usize,
    pub tag_length: usize,
    pub difficulties: DifficultyTable,
    pub salt_lengths: SaltLengths,
    pub default_chunk_size: usize,
}

impl SchemeDescriptor {
    /// Built-in scheme 0: AES-256-GCM.
    pub fn aes_256_gcm() -> Self {
        Self {
            id: SCHEME_AES_256_GCM,
            name: "AES-256-GCM",
            cipher_ctor: AesGcmCipher::boxed,
            iv_length: AES_GCM_IV_LENGTH,
            tag_length: AES_GCM_TAG_LENGTH,
            difficulties: DifficultyTable {
                low: KdfParams::new(5, 65_536, 1),
                middle: KdfParams::new(20, 65_536, 1),
                high: KdfParams::new(40, 65_536, 1),
            },
            salt_lengths: SaltLengths { low: 12, high: 16 },
            default_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Built-in scheme 1: XChaCha20-Poly1305.
    pub fn xchacha20_poly1305() -> Self {
        Self {
            id: SCHEME_XCHACHA20_POLY1305,
            name: "XChaCha20-Poly1305",
            cipher_ctor: XChaChaCipher::boxed,
            iv_length: XCHACHA_NONCE_LENGTH,
            tag_length: XCHACHA_TAG_LENGTH,
            difficulties: DifficultyTable {
                low: KdfParams::new(5, 65_536, 2),
                middle: KdfParams::new(10, 98_304, 4),
                high: KdfParams::new(20, 98_304, 4),
            },
            salt_lengths: SaltLengths { low: 12, high: 16 },
            default_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl fmt::Debug for SchemeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemeDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("iv_length", &self.iv_length)
            .field("tag_length", &self.tag_length)
            .field("default_chunk_size", &self.default_chunk_size)
            .finish()
    }
}

/// Ordered scheme-id → descriptor mapping, immutable after startup.
#[derive(Debug, Default)]
pub struct SchemeRegistry {
    schemes: BTreeMap<u8, SchemeDescriptor>,
}

impl SchemeRegistry {
    /// Empty registry for callers assembling their own scheme set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with both built-in schemes.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(SchemeDescriptor::aes_256_gcm())
            .expect("empty registry accepts scheme 0");
        registry
            .register(SchemeDescriptor::xchacha20_poly1305())
            .expect("empty registry accepts scheme 1");
        registry
    }

    /// The scheme used when the caller does not pick one.
    pub fn current_scheme(&self) -> u8 {
        SCHEME_AES_256_GCM
    }

    pub fn register(&mut self, descriptor: SchemeDescriptor) -> Result<()> {
        if descriptor.id > MAX_SCHEME_ID {
            return Err(CryptitError::Scheme(format!(
                "scheme id {} exceeds 3-bit range",
                descriptor.id
            )));
        }
        if self.schemes.contains_key(&descriptor.id) {
            return Err(CryptitError::Scheme(format!(
                "scheme {} already registered",
                descriptor.id
            )));
        }
        self.schemes.insert(descriptor.id, descriptor);
        Ok(())
    }

    pub fn get(&self, id: u8) -> Result<&SchemeDescriptor> {
        self.schemes
            .get(&id)
            .ok_or_else(|| CryptitError::Scheme(format!("unknown scheme id {id}")))
    }

    pub fn contains(&self, id: u8) -> bool {
        self.schemes.contains_key(&id)
    }

    /// Salt length for a scheme/strength pair.
    pub fn salt_length(&self, id: u8, strength: SaltStrength) -> Result<usize> {
        Ok(self.get(id)?.salt_lengths.get(strength))
    }

    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.schemes.keys().copied()
    }
}
