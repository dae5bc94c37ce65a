//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

#![forbid(unsafe_code)]

//! # cryptit-core
//!
//! Passphrase-protected authenticated encryption for text and file/stream
//! payloads, built around a small versioned container format.
//!
//! ## Key Features
//!
//! - **Versioned container format**: a 2-byte header plus salt whose raw
//!   bytes authenticate the protocol parameters on every AEAD call
//! - **Two registered schemes**: AES-256-GCM (scheme 0) and
//!   XChaCha20-Poly1305 (scheme 1), selected by a 3-bit id
//! - **Argon2id key derivation**: per-scheme difficulty presets, passphrases
//!   wiped the moment the KDF consumes them
//! - **Length hiding**: a CRC-guarded padding trailer whose policy and
//!   alignment are cryptographically bound into the AEAD associated data
//! - **Constant-memory streaming**: length-prefixed chunk frames with strict
//!   bounds, processed by push-style transforms that zeroize on completion
//! - **Memory safety**: key material and plaintext buffers are zeroized on
//!   every exit path
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cryptit_core::{CryptIt, Passphrase};
//!
//! # fn main() -> Result<(), cryptit_core::CryptitError> {
//! let cryptit = CryptIt::new();
//!
//! let mut plaintext = b"attack at dawn".to_vec();
//! let mut pass = Passphrase::from("correct horse battery staple");
//! let container = cryptit.encrypt_text(&mut plaintext, &mut pass)?;
//!
//! let mut pass = Passphrase::from("correct horse battery staple");
//! let decrypted = cryptit.decrypt_text(&container, &mut pass)?;
//! assert_eq!(decrypted.as_bytes()?, b"attack at dawn");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`processor`] - the public façade: text, byte, and stream operations
//! - [`cipher`] - padding-aware AEAD core and the concrete ciphers
//! - [`scheme`] - scheme registry (cipher + KDF presets + salt/chunk defaults)
//! - [`engine`] - per-provider engine cache and key lifecycle
//! - [`header`] - container header codec
//! - [`transform`] - push-style encrypt/decrypt chunk transforms
//! - [`padding`] - length-hiding trailer
//! - [`kdf`] - Argon2id derivation
//! - [`provider`] - platform crypto capability trait
//! - [`source`] - random-access byte views (memory, base64, file)
//! - [`secret`] - wipeable passphrase and plaintext containers

pub mod cipher;
pub mod engine;
pub mod error;
pub mod frame;
pub mod header;
pub mod kdf;
pub mod padding;
pub mod processor;
pub mod provider;
pub mod scheme;
pub mod secret;
pub mod source;
pub mod transform;

pub use cipher::{
    AeadPrimitive, AesGcmCipher, Cipher, LegacyFallback, PaddingMode, XChaChaCipher,
    PAD_AAD_LENGTH, XCHACHA_NONCE_LENGTH, XCHACHA_TAG_LENGTH,
};
pub use engine::{Engine, EngineManager};
pub use error::{CryptitError, Result, DECRYPT_FAILED_MSG};
pub use frame::{decode_len, encode_len, LEN_PREFIX, MAX_FRAME_BYTES};
pub use header::{
    decode_header, decode_info_byte, encode_header, pack_info_byte, HeaderInfo, HeaderOptions,
    HEADER_INFO_LENGTH, HEADER_START_BYTE,
};
pub use kdf::{derive_key, KdfParams, KEY_LENGTH};
pub use padding::{PaddingScheme, Unpadded, MAX_ALIGN, MIN_PAD, PAD_MAGIC, PAD_VERSION};
pub use processor::{
    CryptIt, CryptItOptions, DecryptionStream, EncryptionStream, PayloadInfo, PayloadLayout,
    HEADER_SCAN_MAX,
};
pub use provider::{
    CryptoProvider, KeyHandle, OsProvider, AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH,
};
pub use scheme::{
    Difficulty, DifficultyTable, SaltLengths, SaltStrength, SchemeDescriptor, SchemeRegistry,
    DEFAULT_CHUNK_SIZE, MAX_SCHEME_ID, SCHEME_AES_256_GCM, SCHEME_XCHACHA20_POLY1305,
};
pub use secret::{Passphrase, PlainBuffer};
pub use source::ByteSource;
pub use transform::{DecryptTransform, EncryptTransform};
