//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Push-style chunk transforms for the streaming pipeline.
//!
//! Both transforms hold a buffer of bytes that do not yet form a complete
//! unit of work, keeping memory constant regardless of stream length. The
//! engine key is zeroized on `finish` and, as a backstop for aborted
//! streams, on drop. Errors propagate to the caller; nothing is swallowed.

use std::sync::{Arc, Mutex};

use zeroize::Zeroizing;

use crate::engine::Engine;
use crate::error::{CryptitError, Result};
use crate::frame::{decode_len, encode_len, LEN_PREFIX, MAX_FRAME_BYTES};

/// Cap on a single `push` input for the encrypt side.
fn max_input_chunk(chunk_size: usize) -> usize {
    (4usize.saturating_mul(chunk_size)).min(MAX_FRAME_BYTES)
}

/// Buffers plaintext, emits `[LEN ‖ IV ‖ ct ‖ tag]` frames of one chunk
/// each.
pub struct EncryptTransform {
    engine: Arc<Mutex<Engine>>,
    chunk_size: usize,
    buffer: Zeroizing<Vec<u8>>,
    finished: bool,
}

impl EncryptTransform {
    pub fn new(engine: Arc<Mutex<Engine>>, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(CryptitError::Encryption(
                "chunk size must be positive".into(),
            ));
        }
        Ok(Self {
            engine,
            chunk_size,
            buffer: Zeroizing::new(Vec::new()),
            finished: false,
        })
    }

    /// Feed plaintext; returns any complete frames produced.
    pub fn push(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        if self.finished {
            return Err(CryptitError::Encryption(
                "transform already finished".into(),
            ));
        }
        if input.len() > max_input_chunk(self.chunk_size) {
            return Err(CryptitError::Encryption(format!(
                "input chunk of {} bytes exceeds limit {}",
                input.len(),
                max_input_chunk(self.chunk_size)
            )));
        }

        self.buffer.extend_from_slice(input);

        let mut out = Vec::new();
        while self.buffer.len() >= self.chunk_size {
            let mut block = Zeroizing::new(self.buffer[..self.chunk_size].to_vec());
            self.buffer.drain(..self.chunk_size);
            self.emit_frame(&mut block, &mut out)?;
        }
        Ok(out)
    }

    /// Encrypt any buffered remainder and release the key.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        if self.finished {
            return Ok(Vec::new());
        }
        self.finished = true;

        let mut out = Vec::new();
        let result = if self.buffer.is_empty() {
            Ok(())
        } else {
            let mut block = Zeroizing::new(std::mem::take(&mut *self.buffer));
            self.emit_frame(&mut block, &mut out)
        };

        self.zero_key();
        result.map(|_| out)
    }

    fn emit_frame(&self, block: &mut [u8], out: &mut Vec<u8>) -> Result<()> {
        let engine = self
            .engine
            .lock()
            .map_err(|_| CryptitError::Encryption("engine lock poisoned".into()))?;
        let ct = engine.cipher().encrypt_chunk(block)?;

        out.extend_from_slice(&encode_len(ct.len() as u32));
        out.extend_from_slice(&ct);
        Ok(())
    }

    fn zero_key(&self) {
        if let Ok(mut engine) = self.engine.lock() {
            engine.zero_key();
        }
    }
}

impl Drop for EncryptTransform {
    fn drop(&mut self) {
        if !self.finished {
            self.zero_key();
        }
    }
}

/// Buffers ciphertext, decrypts one length-prefixed frame at a time.
pub struct DecryptTransform {
    engine: Arc<Mutex<Engine>>,
    buffer: Vec<u8>,
    min_frame: usize,
    finished: bool,
}

impl DecryptTransform {
    pub fn new(engine: Arc<Mutex<Engine>>) -> Result<Self> {
        let min_frame = {
            let guard = engine
                .lock()
                .map_err(|_| CryptitError::Decryption("engine lock poisoned".into()))?;
            guard.cipher().min_ciphertext_length()
        };
        Ok(Self {
            engine,
            buffer: Vec::new(),
            min_frame,
            finished: false,
        })
    }

    /// Feed ciphertext; returns the plaintext of any complete frames.
    pub fn push(&mut self, input: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if self.finished {
            return Err(CryptitError::Decryption(
                "transform already finished".into(),
            ));
        }
        self.buffer.extend_from_slice(input);
        self.drain_frames()
    }

    /// Process a final pass and release the key.
    ///
    /// Leftover bytes that never formed a complete frame mean the stream
    /// was cut short.
    pub fn finish(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        if self.finished {
            return Ok(Zeroizing::new(Vec::new()));
        }
        self.finished = true;

        let result = self.drain_frames().and_then(|out| {
            if self.buffer.is_empty() {
                Ok(out)
            } else {
                Err(CryptitError::Decryption("truncated ciphertext".into()))
            }
        });

        self.zero_key();
        result
    }

    fn drain_frames(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let mut out = Zeroizing::new(Vec::new());

        while let Some(declared) = decode_len(&self.buffer, 0) {
            let frame_len = declared as usize;
            if frame_len < self.min_frame || frame_len > MAX_FRAME_BYTES {
                return Err(CryptitError::Decryption(format!(
                    "frame length {frame_len} out of bounds"
                )));
            }
            if self.buffer.len() < LEN_PREFIX + frame_len {
                break;
            }

            let plain = {
                let engine = self
                    .engine
                    .lock()
                    .map_err(|_| CryptitError::Decryption("engine lock poisoned".into()))?;
                engine
                    .cipher()
                    .decrypt_chunk(&self.buffer[LEN_PREFIX..LEN_PREFIX + frame_len])?
            };
            self.buffer.drain(..LEN_PREFIX + frame_len);
            out.extend_from_slice(&plain);
        }

        Ok(out)
    }

    fn zero_key(&self) {
        if let Ok(mut engine) = self.engine.lock() {
            engine.zero_key();
        }
    }
}

impl Drop for DecryptTransform {
    fn drop(&mut self) {
        if !self.finished {
            self.zero_key();
        }
    }
}
