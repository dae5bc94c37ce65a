//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Container header codec.
//!
//! A header is exactly `2 + salt_length` bytes:
//!
//! ```text
//! byte 0   0x01 format magic
//! byte 1   info: [7:5] scheme, [4:3] reserved (0), [2] salt strength, [1:0] difficulty
//! bytes 2… salt
//! ```
//!
//! The raw header bytes double as associated data on every AEAD call under
//! the derived key. The codec only returns bytes; the caller installs them
//! with `Cipher::set_aad` once the decrypting cipher exists, which keeps the
//! header ↔ cipher relationship acyclic.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{CryptitError, Result};
use crate::scheme::{Difficulty, SaltStrength, SchemeRegistry, MAX_SCHEME_ID};

/// Format magic in byte 0.
pub const HEADER_START_BYTE: u8 = 0x01;

/// Fixed prefix before the salt: magic + info byte.
pub const HEADER_INFO_LENGTH: usize = 2;

/// Decode-side strictness switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderOptions {
    /// Reject headers whose reserved bits [4:3] are non-zero. Off by
    /// default: tolerant decoding keeps room for future format revisions.
    pub strict_reserved_bits: bool,
}

/// Decoded header contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderInfo {
    pub scheme: u8,
    pub difficulty: Difficulty,
    pub salt_strength: SaltStrength,
    pub salt: Vec<u8>,
    /// Total header length, including magic and info byte.
    pub header_len: usize,
}

impl HeaderInfo {
    pub fn salt_base64(&self) -> String {
        BASE64.encode(&self.salt)
    }
}

/// Pack the info byte.
pub fn pack_info_byte(scheme: u8, difficulty: Difficulty, salt_strength: SaltStrength) -> u8 {
    (scheme << 5) | (salt_strength.bit() << 2) | difficulty.code()
}

/// Split the info byte into `(scheme, difficulty, salt_strength)`.
pub fn decode_info_byte(
    info: u8,
    options: HeaderOptions,
) -> Result<(u8, Difficulty, SaltStrength)> {
    let scheme = info >> 5;
    let reserved = (info >> 3) & 0b11;
    let salt_strength = SaltStrength::from_bit(info >> 2);
    let difficulty = Difficulty::from_code(info & 0b11).ok_or_else(|| {
        CryptitError::HeaderDecode(format!("invalid difficulty code {}", info & 0b11))
    })?;

    if options.strict_reserved_bits && reserved != 0 {
        return Err(CryptitError::HeaderDecode(format!(
            "reserved info bits set: {reserved:#04b}"
        )));
    }

    Ok((scheme, difficulty, salt_strength))
}

/// Encode a header from its parts.
///
/// The salt length must match the scheme's table for the chosen strength;
/// the caller generates the salt from the provider RNG.
pub fn encode_header(
    scheme: u8,
    difficulty: Difficulty,
    salt_strength: SaltStrength,
    salt: &[u8],
    registry: &SchemeRegistry,
) -> Result<Vec<u8>> {
    if scheme > MAX_SCHEME_ID {
        return Err(CryptitError::Scheme(format!(
            "scheme id {scheme} exceeds 3-bit range"
        )));
    }
    let expected = registry.salt_length(scheme, salt_strength)?;
    if salt.len() != expected {
        return Err(CryptitError::Encoding(format!(
            "salt must be {expected} bytes for scheme {scheme}, got {}",
            salt.len()
        )));
    }

    let mut header = Vec::with_capacity(HEADER_INFO_LENGTH + salt.len());
    header.push(HEADER_START_BYTE);
    header.push(pack_info_byte(scheme, difficulty, salt_strength));
    header.extend_from_slice(salt);
    Ok(header)
}

/// Decode a header from the front of `bytes`.
///
/// `bytes` may extend past the header; the payload starts at
/// `HeaderInfo::header_len`.
pub fn decode_header(
    bytes: &[u8],
    registry: &SchemeRegistry,
    options: HeaderOptions,
) -> Result<HeaderInfo> {
    if bytes.len() < HEADER_INFO_LENGTH {
        return Err(CryptitError::InvalidHeader(format!(
            "container too short: {} bytes",
            bytes.len()
        )));
    }
    if bytes[0] != HEADER_START_BYTE {
        return Err(CryptitError::InvalidHeader(format!(
            "unexpected start byte {:#04x}",
            bytes[0]
        )));
    }

    let (scheme, difficulty, salt_strength) = decode_info_byte(bytes[1], options)?;
    let salt_len = registry
        .salt_length(scheme, salt_strength)
        .map_err(|_| CryptitError::HeaderDecode(format!("unknown scheme id {scheme}")))?;

    let header_len = HEADER_INFO_LENGTH + salt_len;
    if bytes.len() < header_len {
        return Err(CryptitError::InvalidHeader(format!(
            "container shorter than header: {} < {header_len}",
            bytes.len()
        )));
    }

    Ok(HeaderInfo {
        scheme,
        difficulty,
        salt_strength,
        salt: bytes[HEADER_INFO_LENGTH..header_len].to_vec(),
        header_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::{SCHEME_AES_256_GCM, SCHEME_XCHACHA20_POLY1305};

    #[test]
    fn test_info_byte_layout() {
        let info = pack_info_byte(1, Difficulty::Middle, SaltStrength::High);
        assert_eq!(info, (1 << 5) | (1 << 2) | 1);

        let info = pack_info_byte(0, Difficulty::Low, SaltStrength::Low);
        assert_eq!(info, 0);

        let info = pack_info_byte(7, Difficulty::High, SaltStrength::High);
        assert_eq!(info, (7 << 5) | (1 << 2) | 2);
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let registry = SchemeRegistry::builtin();
        let salt: Vec<u8> = (0..16).collect();

        let header = encode_header(
            SCHEME_AES_256_GCM,
            Difficulty::Middle,
            SaltStrength::High,
            &salt,
            &registry,
        )
        .unwrap();
        assert_eq!(header.len(), 18);
        assert_eq!(header[0], HEADER_START_BYTE);

        let info = decode_header(&header, &registry, HeaderOptions::default()).unwrap();
        assert_eq!(info.scheme, SCHEME_AES_256_GCM);
        assert_eq!(info.difficulty, Difficulty::Middle);
        assert_eq!(info.salt_strength, SaltStrength::High);
        assert_eq!(info.salt, salt);
        assert_eq!(info.header_len, 18);
    }

    #[test]
    fn test_low_salt_strength_header_length() {
        let registry = SchemeRegistry::builtin();
        let salt = vec![9u8; 12];

        let header = encode_header(
            SCHEME_XCHACHA20_POLY1305,
            Difficulty::Low,
            SaltStrength::Low,
            &salt,
            &registry,
        )
        .unwrap();
        assert_eq!(header.len(), 14);

        let info = decode_header(&header, &registry, HeaderOptions::default()).unwrap();
        assert_eq!(info.header_len, 14);
        assert_eq!(info.salt.len(), 12);
    }

    #[test]
    fn test_wrong_salt_length_rejected() {
        let registry = SchemeRegistry::builtin();
        let err = encode_header(
            0,
            Difficulty::Low,
            SaltStrength::High,
            &[0u8; 12],
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, CryptitError::Encoding(_)));
    }

    #[test]
    fn test_bad_magic_rejected() {
        let registry = SchemeRegistry::builtin();
        let mut header = encode_header(
            0,
            Difficulty::Low,
            SaltStrength::High,
            &[0u8; 16],
            &registry,
        )
        .unwrap();
        header[0] = 0x02;

        let err = decode_header(&header, &registry, HeaderOptions::default()).unwrap_err();
        assert!(matches!(err, CryptitError::InvalidHeader(_)));
    }

    #[test]
    fn test_unknown_scheme_rejected() {
        let registry = SchemeRegistry::builtin();
        let header = [HEADER_START_BYTE, 5 << 5, 0, 0, 0, 0];
        let err = decode_header(&header, &registry, HeaderOptions::default()).unwrap_err();
        assert!(matches!(err, CryptitError::HeaderDecode(_)));
    }

    #[test]
    fn test_invalid_difficulty_code_rejected() {
        let registry = SchemeRegistry::builtin();
        let header = [HEADER_START_BYTE, 0b0000_0011, 0, 0];
        let err = decode_header(&header, &registry, HeaderOptions::default()).unwrap_err();
        assert!(matches!(err, CryptitError::HeaderDecode(_)));
    }

    #[test]
    fn test_truncated_header_rejected() {
        let registry = SchemeRegistry::builtin();
        let header = [HEADER_START_BYTE, pack_info_byte(0, Difficulty::Low, SaltStrength::High), 1, 2];
        let err = decode_header(&header, &registry, HeaderOptions::default()).unwrap_err();
        assert!(matches!(err, CryptitError::InvalidHeader(_)));
    }

    #[test]
    fn test_reserved_bits_tolerated_unless_strict() {
        let registry = SchemeRegistry::builtin();
        let mut header = vec![HEADER_START_BYTE, pack_info_byte(0, Difficulty::Low, SaltStrength::High)];
        header[1] |= 0b0001_1000; // reserved bits
        header.extend_from_slice(&[0u8; 16]);

        assert!(decode_header(&header, &registry, HeaderOptions::default()).is_ok());

        let strict = HeaderOptions {
            strict_reserved_bits: true,
        };
        let err = decode_header(&header, &registry, strict).unwrap_err();
        assert!(matches!(err, CryptitError::HeaderDecode(_)));
    }

    #[test]
    fn test_salt_base64_view() {
        let info = HeaderInfo {
            scheme: 0,
            difficulty: Difficulty::Low,
            salt_strength: SaltStrength::Low,
            salt: b"hello".to_vec(),
            header_len: 7,
        };
        assert_eq!(info.salt_base64(), "aGVsbG8=");
    }
}
