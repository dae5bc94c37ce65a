//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Unified error hierarchy for the cryptit workspace.
//!
//! One variant per conceptual failure kind of the container format. The
//! decrypt paths deliberately collapse most internal failures into
//! [`CryptitError::Decryption`] with a fixed message so that callers cannot
//! distinguish a wrong passphrase from tampered ciphertext.

use thiserror::Error;

/// Message used for every authentication-shaped decrypt failure.
pub const DECRYPT_FAILED_MSG: &str = "wrong passphrase or corrupted ciphertext";

/// Top-level error type for cryptit operations.
#[derive(Error, Debug)]
pub enum CryptitError {
    /// Bad magic byte, too-short container, or exceeded header-scan cap.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Structurally parseable header with semantically wrong contents
    /// (unknown scheme id, invalid difficulty code).
    #[error("header decode failed: {0}")]
    HeaderDecode(String),

    /// Malformed base64 input (bad alphabet, length, or stray whitespace).
    #[error("decoding failed: {0}")]
    Decoding(String),

    /// Internal encoder fault or access to a cleared buffer.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// Scheme registry misuse: duplicate registration or unknown lookup.
    #[error("scheme error: {0}")]
    Scheme(String),

    /// Argon2id backend failure.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Failure on the encrypt path (missing key, oversized input chunk,
    /// provider fault).
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// AEAD authentication failure, frame-bound violation, truncated
    /// stream, or padding-policy violation.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Path traversal rejection or missing/unwritable directory.
    #[error("filesystem error: {0}")]
    Filesystem(String),

    /// Padding constructor misuse by the caller (bad alignment, short RNG
    /// fill). Never produced while reading ciphertext.
    #[error("malformed padding: {0}")]
    MalformedPadding(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CryptitError {
    /// The oracle-free decrypt failure every authentication error maps to.
    pub fn decrypt_failed() -> Self {
        CryptitError::Decryption(DECRYPT_FAILED_MSG.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CryptitError>;
