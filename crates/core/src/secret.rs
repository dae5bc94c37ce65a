//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Secret-holding containers with forced wipe semantics.
//!
//! Provides two wrappers:
//! - [`Passphrase`] — the user secret handed to key derivation. Redacts the
//!   value in `Debug` output, zeroizes on drop, and exposes an explicit
//!   [`Passphrase::wipe`] that the key-derivation path invokes the moment the
//!   KDF has consumed the bytes.
//! - [`PlainBuffer`] — a decrypted payload whose typed views (`as_bytes`,
//!   `to_utf8`, `to_base64`) stop working once [`PlainBuffer::clear`] has run.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroize;

use crate::error::{CryptitError, Result};

/// A passphrase owned by the caller and consumed by key derivation.
///
/// The inner bytes are overwritten with zeros and truncated on [`wipe`],
/// and zeroized again on drop. `Debug` output always prints `[REDACTED]`.
///
/// [`wipe`]: Passphrase::wipe
pub struct Passphrase {
    bytes: Vec<u8>,
    wiped: bool,
}

impl Passphrase {
    /// Wrap passphrase material.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            wiped: false,
        }
    }

    /// Access the raw passphrase bytes.
    ///
    /// Returns an empty slice once the passphrase has been wiped.
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    /// Overwrite the passphrase with zeros and release the allocation.
    ///
    /// Idempotent. Key-derivation callers invoke this on every exit path,
    /// success or failure.
    pub fn wipe(&mut self) {
        self.bytes.zeroize();
        self.bytes = Vec::new();
        self.wiped = true;
    }

    /// Whether [`wipe`](Passphrase::wipe) has run.
    pub fn is_wiped(&self) -> bool {
        self.wiped
    }
}

impl From<&str> for Passphrase {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl From<String> for Passphrase {
    fn from(mut value: String) -> Self {
        let bytes = value.as_bytes().to_vec();
        value.zeroize();
        Self::new(bytes)
    }
}

impl From<Vec<u8>> for Passphrase {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Passphrase([REDACTED])")
    }
}

impl Drop for Passphrase {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// A decrypted payload with a forced-wipe lifecycle.
///
/// All views fail with [`CryptitError::Encoding`] after [`clear`] so that
/// stale plaintext cannot leak through a retained handle.
///
/// [`clear`]: PlainBuffer::clear
pub struct PlainBuffer {
    bytes: Vec<u8>,
    cleared: bool,
}

impl PlainBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            cleared: false,
        }
    }

    /// Borrow the plaintext bytes.
    pub fn as_bytes(&self) -> Result<&[u8]> {
        self.guard()?;
        Ok(&self.bytes)
    }

    /// View the plaintext as UTF-8 text.
    pub fn to_utf8(&self) -> Result<String> {
        self.guard()?;
        String::from_utf8(self.bytes.clone())
            .map_err(|e| CryptitError::Decoding(format!("plaintext is not valid UTF-8: {e}")))
    }

    /// View the plaintext as standard base64.
    pub fn to_base64(&self) -> Result<String> {
        self.guard()?;
        Ok(BASE64.encode(&self.bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Overwrite the plaintext with zeros; every later view fails.
    pub fn clear(&mut self) {
        self.bytes.zeroize();
        self.bytes = Vec::new();
        self.cleared = true;
    }

    fn guard(&self) -> Result<()> {
        if self.cleared {
            return Err(CryptitError::Encoding("buffer has been cleared".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for PlainBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cleared {
            f.write_str("PlainBuffer(<cleared>)")
        } else {
            write!(f, "PlainBuffer({} bytes)", self.bytes.len())
        }
    }
}

impl Drop for PlainBuffer {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passphrase_debug_redacted() {
        let pass = Passphrase::from("hunter2");
        let output = format!("{:?}", pass);
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("hunter2"));
    }

    #[test]
    fn test_passphrase_wipe() {
        let mut pass = Passphrase::from("secret");
        assert_eq!(pass.expose(), b"secret");
        assert!(!pass.is_wiped());

        pass.wipe();
        assert!(pass.is_wiped());
        assert!(pass.expose().is_empty());

        // Idempotent
        pass.wipe();
        assert!(pass.is_wiped());
    }

    #[test]
    fn test_plain_buffer_views() {
        let buf = PlainBuffer::new(b"hello".to_vec());
        assert_eq!(buf.as_bytes().unwrap(), b"hello");
        assert_eq!(buf.to_utf8().unwrap(), "hello");
        assert_eq!(buf.to_base64().unwrap(), "aGVsbG8=");
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_plain_buffer_views_fail_after_clear() {
        let mut buf = PlainBuffer::new(b"payload".to_vec());
        buf.clear();

        assert!(buf.as_bytes().is_err());
        assert!(buf.to_utf8().is_err());
        assert!(buf.to_base64().is_err());
    }

    #[test]
    fn test_plain_buffer_invalid_utf8() {
        let buf = PlainBuffer::new(vec![0xFF, 0xFE]);
        assert!(matches!(buf.to_utf8(), Err(CryptitError::Decoding(_))));
        assert!(buf.to_base64().is_ok());
    }
}
