//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Length-hiding padding trailer (Magic40 + version + CRC-8).
//!
//! The trailer rides *inside* the AEAD, so its integrity comes from the
//! surrounding authentication tag. The magic/version/CRC triplet only guards
//! against accidentally mistaking legacy unpadded plaintext for padded
//! material; trailer recognition uses data-independent comparisons so that
//! `try_unpad` leaks nothing about near-miss inputs.
//!
//! Layout appended to a plaintext `P` for a chosen pad width `k`:
//!
//! ```text
//! P ‖ RND[k-8] ‖ MAGIC40(5) ‖ VER(1) ‖ LEN(1 = k) ‖ CRC8(1)
//! ```
//!
//! with `k ∈ [8, 8+align-1]` and `(len(P) + k) mod align == 0`.

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{CryptitError, Result};

/// Fixed 40-bit trailer magic.
pub const PAD_MAGIC: [u8; 5] = [0xC4, 0xE7, 0x9B, 0xAD, 0xF2];

/// Trailer format version.
pub const PAD_VERSION: u8 = 0x29;

/// The trailer occupies at least this many bytes.
pub const MIN_PAD: usize = 8;

/// Largest alignment for which `8 + align - 1` still fits the LEN byte.
pub const MAX_ALIGN: u8 = 248;

const CRC8_POLY: u8 = 0x07;

/// CRC-8 over the 7-byte `MAGIC40 ‖ VER ‖ LEN` prefix.
fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 0x80 != 0 {
                crc = (crc << 1) ^ CRC8_POLY;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

/// Source of random fill bytes for the `RND` section.
///
/// The cipher passes a provider-backed closure; `pad` validates that the
/// closure honored the requested length.
pub type RandomFill<'a> = &'a mut dyn FnMut(usize) -> Result<Vec<u8>>;

/// Result of [`PaddingScheme::try_unpad`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unpadded<'a> {
    /// Whether a valid trailer was recognized and stripped.
    pub used: bool,
    /// The plaintext without the trailer, or the input unchanged.
    pub plain: &'a [u8],
}

/// The Magic40+Ver+Crc8 trailer scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaddingScheme;

impl PaddingScheme {
    /// Append a trailer so that the padded length is a multiple of `align`.
    ///
    /// Picks the smallest feasible pad width `k`; input that is already
    /// aligned gains a full extra block. Fails with
    /// [`CryptitError::MalformedPadding`] when `align` is outside
    /// `[1, 248]` or the random source returns a wrong-sized fill.
    pub fn pad(&self, plain: &[u8], rng: RandomFill<'_>, align: u8) -> Result<Zeroizing<Vec<u8>>> {
        if align == 0 || align > MAX_ALIGN {
            return Err(CryptitError::MalformedPadding(format!(
                "alignment {align} outside [1, {MAX_ALIGN}]"
            )));
        }
        let align = align as usize;

        let rem = (plain.len() + MIN_PAD) % align;
        let k = if rem == 0 { MIN_PAD } else { MIN_PAD + align - rem };
        debug_assert!(k >= MIN_PAD && k <= MIN_PAD + align - 1);
        debug_assert_eq!((plain.len() + k) % align, 0);

        let rnd = rng(k - MIN_PAD)?;
        if rnd.len() != k - MIN_PAD {
            return Err(CryptitError::MalformedPadding(format!(
                "random fill returned {} bytes, expected {}",
                rnd.len(),
                k - MIN_PAD
            )));
        }

        let mut padded = Zeroizing::new(Vec::with_capacity(plain.len() + k));
        padded.extend_from_slice(plain);
        padded.extend_from_slice(&rnd);
        padded.extend_from_slice(&PAD_MAGIC);
        padded.push(PAD_VERSION);
        padded.push(k as u8);
        let crc = crc8(&padded[padded.len() - 7..]);
        padded.push(crc);
        Ok(padded)
    }

    /// Strip a trailer if one is present.
    ///
    /// Never fails: any mismatch in magic, version, CRC, or LEN range
    /// returns the input unchanged with `used == false`.
    pub fn try_unpad<'a>(&self, padded: &'a [u8]) -> Unpadded<'a> {
        if padded.len() < MIN_PAD {
            return Unpadded {
                used: false,
                plain: padded,
            };
        }

        let tail = &padded[padded.len() - MIN_PAD..];
        let magic_ok = tail[..5].ct_eq(&PAD_MAGIC);
        let version_ok = tail[5].ct_eq(&PAD_VERSION);
        let crc_ok = crc8(&tail[..7]).ct_eq(&tail[7]);
        let trailer_ok: bool = (magic_ok & version_ok & crc_ok).into();

        let k = tail[6] as usize;
        if !trailer_ok || k < MIN_PAD || k > padded.len() {
            return Unpadded {
                used: false,
                plain: padded,
            };
        }

        Unpadded {
            used: true,
            plain: &padded[..padded.len() - k],
        }
    }
}
