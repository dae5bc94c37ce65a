//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Public façade: text, byte, and stream encryption over the container
//! format.
//!
//! [`CryptIt`] wires the provider, the scheme registry, and the engine
//! cache together. Text payloads go through a single AEAD call; byte and
//! stream payloads run the framed transform pipeline. Decryption recovers
//! the scheme from the header, re-binds the header bytes as AAD on the
//! engine that will actually decrypt, and surfaces only the error kinds the
//! format defines — everything else collapses into the generic
//! wrong-passphrase failure.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use zeroize::{Zeroize, Zeroizing};

use crate::cipher::{LegacyFallback, PaddingMode};
use crate::engine::{Engine, EngineManager};
use crate::error::{CryptitError, Result};
use crate::frame::{decode_len, LEN_PREFIX};
use crate::header::{self, HeaderInfo, HeaderOptions};
use crate::padding::PaddingScheme;
use crate::provider::{CryptoProvider, OsProvider};
use crate::scheme::{Difficulty, SaltStrength, SchemeRegistry, DEFAULT_CHUNK_SIZE};
use crate::secret::{Passphrase, PlainBuffer};
use crate::source::ByteSource;
use crate::transform::{DecryptTransform, EncryptTransform};

/// Cap on bytes scanned for a header before a decryption stream gives up.
pub const HEADER_SCAN_MAX: usize = 64 * 1024;

/// How many leading bytes a header peek reads; covers every registered
/// scheme's largest header.
const HEADER_PEEK_BYTES: usize = 64;

/// Façade configuration. The zero-value defaults mirror the format
/// defaults: scheme 0, middle difficulty, high salt strength, 512 KiB
/// chunks, padding on with alignment 8.
#[derive(Debug, Clone)]
pub struct CryptItOptions {
    pub scheme: u8,
    pub difficulty: Difficulty,
    pub salt_strength: SaltStrength,
    pub chunk_size: usize,
    pub use_padding: bool,
    pub padding_mode: PaddingMode,
    pub padding_align: u8,
    pub legacy_fallback: LegacyFallback,
    pub header_options: HeaderOptions,
}

impl Default for CryptItOptions {
    fn default() -> Self {
        Self {
            scheme: 0,
            difficulty: Difficulty::Middle,
            salt_strength: SaltStrength::High,
            chunk_size: DEFAULT_CHUNK_SIZE,
            use_padding: true,
            padding_mode: PaddingMode::Auto,
            padding_align: 8,
            legacy_fallback: LegacyFallback::default(),
            header_options: HeaderOptions::default(),
        }
    }
}

/// Shape of an encrypted payload as reported by [`CryptIt::decode_data`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadLayout {
    /// One or more length-prefixed frames.
    Chunked {
        frames: u64,
        /// Declared length of the first frame (IV + ciphertext + tag).
        frame_size: usize,
        /// Sum of all declared frame lengths.
        total_payload: u64,
    },
    /// A single `IV ‖ ct ‖ tag` text container.
    Single {
        iv_length: usize,
        ciphertext_length: usize,
        tag_length: usize,
    },
}

/// Container metadata recovered without decrypting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadInfo {
    pub header: HeaderInfo,
    pub layout: PayloadLayout,
}

/// The public text/bytes/stream encryption façade.
pub struct CryptIt {
    provider: Arc<dyn CryptoProvider>,
    registry: Arc<SchemeRegistry>,
    engines: EngineManager,
    options: CryptItOptions,
}

impl Default for CryptIt {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptIt {
    /// OS provider, built-in schemes, default options.
    pub fn new() -> Self {
        Self::with_options(CryptItOptions::default())
    }

    pub fn with_options(options: CryptItOptions) -> Self {
        Self::with_parts(
            Arc::new(OsProvider::new()),
            Arc::new(SchemeRegistry::builtin()),
            options,
        )
    }

    /// Full control over provider and registry; test registries with weak
    /// KDF tables go through here.
    pub fn with_parts(
        provider: Arc<dyn CryptoProvider>,
        registry: Arc<SchemeRegistry>,
        options: CryptItOptions,
    ) -> Self {
        Self {
            provider,
            registry,
            engines: EngineManager::new(),
            options,
        }
    }

    pub fn options(&self) -> &CryptItOptions {
        &self.options
    }

    pub fn registry(&self) -> &SchemeRegistry {
        &self.registry
    }

    // ── text path ────────────────────────────────────────────────────────

    /// Encrypt `plaintext` into `header ‖ IV ‖ ct ‖ tag`.
    ///
    /// The plaintext buffer is zeroized before this returns; the passphrase
    /// is wiped the moment the KDF has consumed it.
    pub fn encrypt_text(
        &self,
        plaintext: &mut [u8],
        passphrase: &mut Passphrase,
    ) -> Result<Vec<u8>> {
        let result = self.encrypt_text_inner(plaintext, passphrase);
        plaintext.zeroize();
        passphrase.wipe();
        result
    }

    fn encrypt_text_inner(
        &self,
        plaintext: &mut [u8],
        passphrase: &mut Passphrase,
    ) -> Result<Vec<u8>> {
        let engine_arc = self.checkout(self.options.scheme)?;
        let mut engine = lock(&engine_arc)?;
        self.configure(&mut engine)?;

        let (salt, header) = self.fresh_header(self.options.scheme)?;
        engine.derive_key(passphrase, &salt, self.options.difficulty)?;
        engine.cipher_mut().set_aad(&header);

        let result = engine.cipher().encrypt_chunk(plaintext);
        engine.zero_key();
        let ciphertext = result?;

        let mut out = header;
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a text container produced by [`CryptIt::encrypt_text`].
    pub fn decrypt_text(&self, data: &[u8], passphrase: &mut Passphrase) -> Result<PlainBuffer> {
        let result = self.decrypt_text_inner(data, passphrase);
        passphrase.wipe();
        result.map_err(surface_decrypt_error)
    }

    fn decrypt_text_inner(&self, data: &[u8], passphrase: &mut Passphrase) -> Result<PlainBuffer> {
        let info = header::decode_header(data, &self.registry, self.options.header_options)?;

        let engine_arc = self.checkout(info.scheme)?;
        let mut engine = lock(&engine_arc)?;
        self.configure(&mut engine)?;

        engine.derive_key(passphrase, &info.salt, info.difficulty)?;
        engine.cipher_mut().set_aad(&data[..info.header_len]);

        let result = engine.cipher().decrypt_chunk(&data[info.header_len..]);
        engine.zero_key();
        Ok(PlainBuffer::new(result?.to_vec()))
    }

    // ── byte-buffer path (file semantics) ────────────────────────────────

    /// Encrypt a whole buffer into a chunked container.
    ///
    /// Empty input produces a header-only container. The plaintext buffer
    /// is zeroized before this returns.
    pub fn encrypt_bytes(
        &self,
        plaintext: &mut [u8],
        passphrase: &mut Passphrase,
    ) -> Result<Vec<u8>> {
        let result = self.encrypt_bytes_inner(plaintext, passphrase);
        plaintext.zeroize();
        passphrase.wipe();
        result
    }

    fn encrypt_bytes_inner(
        &self,
        plaintext: &[u8],
        passphrase: &mut Passphrase,
    ) -> Result<Vec<u8>> {
        let engine_arc = self.checkout(self.options.scheme)?;
        let header = {
            let mut engine = lock(&engine_arc)?;
            self.configure(&mut engine)?;

            let (salt, header) = self.fresh_header(self.options.scheme)?;
            if plaintext.is_empty() {
                return Ok(header);
            }
            engine.derive_key(passphrase, &salt, self.options.difficulty)?;
            engine.cipher_mut().set_aad(&header);
            header
        };

        let mut transform = EncryptTransform::new(engine_arc, self.options.chunk_size)?;
        let mut out = header;
        for piece in plaintext.chunks(self.options.chunk_size) {
            out.extend_from_slice(&transform.push(piece)?);
        }
        out.extend_from_slice(&transform.finish()?);
        Ok(out)
    }

    /// Decrypt a chunked container produced by [`CryptIt::encrypt_bytes`]
    /// or the streaming writer.
    pub fn decrypt_bytes(&self, data: &[u8], passphrase: &mut Passphrase) -> Result<PlainBuffer> {
        let result = self.decrypt_bytes_inner(data, passphrase);
        passphrase.wipe();
        result.map_err(surface_decrypt_error)
    }

    fn decrypt_bytes_inner(&self, data: &[u8], passphrase: &mut Passphrase) -> Result<PlainBuffer> {
        let peek = &data[..data.len().min(HEADER_PEEK_BYTES)];
        let info = header::decode_header(peek, &self.registry, self.options.header_options)?;

        let engine_arc = self.checkout(info.scheme)?;
        {
            let mut engine = lock(&engine_arc)?;
            self.configure(&mut engine)?;
            engine.derive_key(passphrase, &info.salt, info.difficulty)?;
            // Second decode pass binds the header on the cipher that will
            // actually decrypt.
            engine.cipher_mut().set_aad(&data[..info.header_len]);

            if data.len() == info.header_len {
                engine.zero_key();
                return Ok(PlainBuffer::new(Vec::new()));
            }
        }

        let mut transform = DecryptTransform::new(engine_arc)?;
        let mut out = Zeroizing::new(Vec::new());
        out.extend_from_slice(&transform.push(&data[info.header_len..])?);
        out.extend_from_slice(&transform.finish()?);
        Ok(PlainBuffer::new(out.to_vec()))
    }

    /// Encrypt the contents of a [`ByteSource`].
    pub fn encrypt_source(
        &self,
        source: &mut ByteSource,
        passphrase: &mut Passphrase,
    ) -> Result<Vec<u8>> {
        let mut plaintext = Zeroizing::new(source.read_all()?);
        self.encrypt_bytes(&mut plaintext, passphrase)
    }

    /// Decrypt the contents of a [`ByteSource`].
    pub fn decrypt_source(
        &self,
        source: &mut ByteSource,
        passphrase: &mut Passphrase,
    ) -> Result<PlainBuffer> {
        let data = source.read_all().map_err(surface_decrypt_error)?;
        self.decrypt_bytes(&data, passphrase)
    }

    // ── stream path ──────────────────────────────────────────────────────

    /// Encrypt `reader` into `writer` with constant memory. Returns the
    /// number of ciphertext bytes written, header included.
    pub fn encrypt_stream<R: Read, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
        passphrase: &mut Passphrase,
    ) -> Result<u64> {
        let mut stream = self.encryption_stream(passphrase)?;
        let mut written = stream.header().len() as u64;
        writer.write_all(stream.header())?;

        let mut buf = Zeroizing::new(vec![0u8; self.options.chunk_size.min(1 << 20)]);
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            let out = stream.push(&buf[..n])?;
            written += out.len() as u64;
            writer.write_all(&out)?;
        }
        let out = stream.finish()?;
        written += out.len() as u64;
        writer.write_all(&out)?;
        writer.flush()?;
        Ok(written)
    }

    /// Decrypt `reader` into `writer` with constant memory. Returns the
    /// number of plaintext bytes written.
    pub fn decrypt_stream<R: Read, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
        passphrase: &mut Passphrase,
    ) -> Result<u64> {
        let mut stream = self.decryption_stream(passphrase);
        let mut written = 0u64;

        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            let out = stream.push(&buf[..n])?;
            written += out.len() as u64;
            writer.write_all(&out)?;
        }
        let out = stream.finish()?;
        written += out.len() as u64;
        writer.write_all(&out)?;
        writer.flush()?;
        Ok(written)
    }

    /// Push-style encryption handle. The caller must prepend
    /// [`EncryptionStream::header`] to the emitted ciphertext.
    pub fn encryption_stream(&self, passphrase: &mut Passphrase) -> Result<EncryptionStream> {
        let engine_arc = self.checkout(self.options.scheme)?;
        let header = {
            let mut engine = lock(&engine_arc)?;
            self.configure(&mut engine)?;

            let (salt, header) = self.fresh_header(self.options.scheme)?;
            engine.derive_key(passphrase, &salt, self.options.difficulty)?;
            engine.cipher_mut().set_aad(&header);
            header
        };

        Ok(EncryptionStream {
            header,
            transform: EncryptTransform::new(engine_arc, self.options.chunk_size)?,
        })
    }

    /// Push-style decryption handle with streaming header auto-detection.
    ///
    /// The caller's passphrase is wiped immediately; an internal copy lives
    /// until the header arrives and key derivation consumes it.
    pub fn decryption_stream(&self, passphrase: &mut Passphrase) -> DecryptionStream {
        let inner = Passphrase::new(passphrase.expose().to_vec());
        passphrase.wipe();

        DecryptionStream {
            provider: self.provider.clone(),
            registry: self.registry.clone(),
            engines: self.engines.clone(),
            options: self.options.clone(),
            passphrase: Some(inner),
            phase: Phase::Seeking { buf: Vec::new() },
        }
    }

    // ── inspection (no key material involved) ────────────────────────────

    /// Whether `input` starts with a decodable container header.
    pub fn is_encrypted(&self, input: &mut ByteSource) -> bool {
        self.decode_header(input).is_ok()
    }

    /// Decode the container header without touching the payload.
    pub fn decode_header(&self, input: &mut ByteSource) -> Result<HeaderInfo> {
        let peek = input.read_at(0, HEADER_PEEK_BYTES)?;
        header::decode_header(&peek, &self.registry, self.options.header_options)
    }

    /// Inspect container structure without decrypting anything.
    pub fn decode_data(&self, input: &mut ByteSource) -> Result<PayloadInfo> {
        let info = self.decode_header(input)?;
        let descriptor = self.registry.get(info.scheme)?;
        let total = input.len()?;
        let remaining = total - info.header_len as u64;

        // A chunked container opens with a plausible frame: the declared
        // length fits the remainder and covers at least IV + tag.
        let first_len = if remaining >= LEN_PREFIX as u64 {
            let prefix = input.read_at(info.header_len as u64, LEN_PREFIX)?;
            decode_len(&prefix, 0)
        } else {
            None
        };
        let chunked = first_len.is_some_and(|len| {
            len >= 28 && (len as u64 + LEN_PREFIX as u64) <= remaining
        });

        if chunked {
            let mut offset = info.header_len as u64;
            let mut frames = 0u64;
            let mut total_payload = 0u64;
            let mut frame_size = 0usize;

            while offset < total {
                let prefix = input.read_at(offset, LEN_PREFIX)?;
                let declared = decode_len(&prefix, 0).ok_or_else(|| {
                    CryptitError::InvalidHeader("truncated frame length prefix".into())
                })? as u64;
                if offset + LEN_PREFIX as u64 + declared > total {
                    return Err(CryptitError::InvalidHeader(
                        "frame overruns container".into(),
                    ));
                }
                if frames == 0 {
                    frame_size = declared as usize;
                }
                frames += 1;
                total_payload += declared;
                offset += LEN_PREFIX as u64 + declared;
            }

            return Ok(PayloadInfo {
                header: info,
                layout: PayloadLayout::Chunked {
                    frames,
                    frame_size,
                    total_payload,
                },
            });
        }

        // Single-block text container.
        let overhead = (descriptor.iv_length + descriptor.tag_length) as u64;
        if remaining < overhead {
            return Err(CryptitError::InvalidHeader(format!(
                "payload too short: {remaining} bytes"
            )));
        }
        Ok(PayloadInfo {
            header: info,
            layout: PayloadLayout::Single {
                iv_length: descriptor.iv_length,
                ciphertext_length: (remaining - overhead) as usize,
                tag_length: descriptor.tag_length,
            },
        })
    }

    // ── internals ────────────────────────────────────────────────────────

    fn checkout(&self, scheme: u8) -> Result<Arc<Mutex<Engine>>> {
        self.engines.get_engine(&self.provider, &self.registry, scheme)
    }

    /// Reset a cached engine to this façade's configuration. Engines are
    /// shared per provider identity, so stale state from a previous
    /// operation must never leak through.
    fn configure(&self, engine: &mut Engine) -> Result<()> {
        engine.set_chunk_size(self.options.chunk_size)?;
        let cipher = engine.cipher_mut();
        cipher.set_aad(&[]);
        cipher.set_padding_scheme(self.options.use_padding.then_some(PaddingScheme));
        cipher.set_padding_mode(self.options.padding_mode);
        cipher.set_padding_align(self.options.padding_align)?;
        cipher.set_legacy_fallback(self.options.legacy_fallback);
        Ok(())
    }

    fn fresh_header(&self, scheme: u8) -> Result<(Vec<u8>, Vec<u8>)> {
        let salt_len = self
            .registry
            .salt_length(scheme, self.options.salt_strength)?;
        let salt = self.provider.random_bytes(salt_len)?;
        let header = header::encode_header(
            scheme,
            self.options.difficulty,
            self.options.salt_strength,
            &salt,
            &self.registry,
        )?;
        Ok((salt, header))
    }
}

/// Pass the format's own error kinds through; collapse everything else
/// into the generic wrong-passphrase failure so decrypt errors carry no
/// oracle.
fn surface_decrypt_error(err: CryptitError) -> CryptitError {
    match err {
        CryptitError::Decryption(_)
        | CryptitError::InvalidHeader(_)
        | CryptitError::HeaderDecode(_)
        | CryptitError::Decoding(_)
        | CryptitError::KeyDerivation(_) => err,
        _ => CryptitError::decrypt_failed(),
    }
}

fn lock(engine: &Arc<Mutex<Engine>>) -> Result<std::sync::MutexGuard<'_, Engine>> {
    engine
        .lock()
        .map_err(|_| CryptitError::Encryption("engine lock poisoned".into()))
}

/// Push-style encryption handle returned by [`CryptIt::encryption_stream`].
pub struct EncryptionStream {
    header: Vec<u8>,
    transform: EncryptTransform,
}

impl EncryptionStream {
    /// The container header. Not part of the pushed output; the caller
    /// must prepend it.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    pub fn push(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.transform.push(plaintext)
    }

    pub fn finish(&mut self) -> Result<Vec<u8>> {
        self.transform.finish()
    }
}

enum Phase {
    Seeking { buf: Vec<u8> },
    Forwarding { transform: DecryptTransform },
}

/// Push-style decryption handle with header auto-detection, returned by
/// [`CryptIt::decryption_stream`].
///
/// Starts in a header-seeking state: bytes accumulate (capped at
/// [`HEADER_SCAN_MAX`]) until a full header is available, then the engine
/// is selected, the key derived, the header bound as AAD, and every
/// remaining byte forwarded into the frame pipeline.
pub struct DecryptionStream {
    provider: Arc<dyn CryptoProvider>,
    registry: Arc<SchemeRegistry>,
    engines: EngineManager,
    options: CryptItOptions,
    passphrase: Option<Passphrase>,
    phase: Phase,
}

impl DecryptionStream {
    pub fn push(&mut self, input: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let result = self.push_inner(input);
        if result.is_err() {
            self.wipe_passphrase();
        }
        result.map_err(surface_decrypt_error)
    }

    fn push_inner(&mut self, input: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match &mut self.phase {
            Phase::Forwarding { transform } => transform.push(input),
            Phase::Seeking { buf } => {
                buf.extend_from_slice(input);
                if buf.len() > HEADER_SCAN_MAX {
                    return Err(CryptitError::InvalidHeader(
                        "header not found within scan limit".into(),
                    ));
                }
                if buf.len() < header::HEADER_INFO_LENGTH {
                    return Ok(Zeroizing::new(Vec::new()));
                }

                // The info byte alone determines how long the header is.
                if buf[0] != header::HEADER_START_BYTE {
                    return Err(CryptitError::InvalidHeader(format!(
                        "unexpected start byte {:#04x}",
                        buf[0]
                    )));
                }
                let (scheme, _, salt_strength) =
                    header::decode_info_byte(buf[1], self.options.header_options)?;
                let salt_len = self
                    .registry
                    .salt_length(scheme, salt_strength)
                    .map_err(|_| {
                        CryptitError::HeaderDecode(format!("unknown scheme id {scheme}"))
                    })?;
                let header_len = header::HEADER_INFO_LENGTH + salt_len;
                if buf.len() < header_len {
                    return Ok(Zeroizing::new(Vec::new()));
                }

                let buf = std::mem::take(buf);
                self.attach_engine(&buf, header_len)
            }
        }
    }

    /// Header complete: select the engine, derive the key, bind the AAD,
    /// and forward the bytes past the header.
    fn attach_engine(&mut self, buf: &[u8], header_len: usize) -> Result<Zeroizing<Vec<u8>>> {
        let info = header::decode_header(buf, &self.registry, self.options.header_options)?;

        let engine_arc = self
            .engines
            .get_engine(&self.provider, &self.registry, info.scheme)?;
        {
            let mut engine = engine_arc
                .lock()
                .map_err(|_| CryptitError::Decryption("engine lock poisoned".into()))?;
            engine.set_chunk_size(self.options.chunk_size)?;
            let cipher = engine.cipher_mut();
            cipher.set_aad(&[]);
            cipher.set_padding_scheme(self.options.use_padding.then_some(PaddingScheme));
            cipher.set_padding_mode(self.options.padding_mode);
            cipher.set_padding_align(self.options.padding_align)?;
            cipher.set_legacy_fallback(self.options.legacy_fallback);

            let mut passphrase = self.passphrase.take().ok_or_else(|| {
                CryptitError::Decryption("passphrase already consumed".into())
            })?;
            let derived = engine.derive_key(&mut passphrase, &info.salt, info.difficulty);
            passphrase.wipe();
            derived?;

            engine.cipher_mut().set_aad(&buf[..header_len]);
        }

        let mut transform = DecryptTransform::new(engine_arc)?;
        let out = if buf.len() > header_len {
            transform.push(&buf[header_len..])?
        } else {
            Zeroizing::new(Vec::new())
        };
        self.phase = Phase::Forwarding { transform };
        Ok(out)
    }

    pub fn finish(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        let result = match &mut self.phase {
            Phase::Seeking { .. } => Err(CryptitError::InvalidHeader(
                "header not found before end of stream".into(),
            )),
            Phase::Forwarding { transform } => transform.finish(),
        };
        if result.is_err() {
            self.wipe_passphrase();
        }
        result.map_err(surface_decrypt_error)
    }

    fn wipe_passphrase(&mut self) {
        if let Some(mut pass) = self.passphrase.take() {
            pass.wipe();
        }
    }
}

impl Drop for DecryptionStream {
    fn drop(&mut self) {
        self.wipe_passphrase();
    }
}
