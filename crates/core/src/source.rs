//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Random-access byte views over memory, base64 text, or a file handle.
//!
//! The façade peeks container headers through this type without slurping
//! whole payloads. Base64 sources decode lazily on first access and cache
//! the decoded bytes; file sources seek per read and never buffer more than
//! the requested range.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::error::{CryptitError, Result};

#[derive(Debug)]
enum Inner {
    Memory(Vec<u8>),
    Base64 {
        encoded: String,
        decoded: Option<Vec<u8>>,
    },
    File {
        file: File,
        len: u64,
    },
}

/// A random-access byte source.
#[derive(Debug)]
pub struct ByteSource {
    inner: Inner,
}

impl ByteSource {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Inner::Memory(bytes.into()),
        }
    }

    /// Wrap standard base64 text; decoding is deferred until first access.
    pub fn from_base64(encoded: impl Into<String>) -> Self {
        Self {
            inner: Inner::Base64 {
                encoded: encoded.into(),
                decoded: None,
            },
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())
            .map_err(|e| CryptitError::Filesystem(format!("cannot open input: {e}")))?;
        let len = file
            .metadata()
            .map_err(|e| CryptitError::Filesystem(format!("cannot stat input: {e}")))?
            .len();
        Ok(Self {
            inner: Inner::File { file, len },
        })
    }

    pub fn len(&mut self) -> Result<u64> {
        if matches!(self.inner, Inner::Base64 { .. }) {
            return Ok(self.decoded()?.len() as u64);
        }
        match &self.inner {
            Inner::Memory(bytes) => Ok(bytes.len() as u64),
            Inner::File { len, .. } => Ok(*len),
            Inner::Base64 { .. } => unreachable!(),
        }
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Read up to `len` bytes at `offset`; short reads happen at EOF.
    pub fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        if matches!(self.inner, Inner::Base64 { .. }) {
            let decoded = self.decoded()?;
            return Ok(slice_at(decoded, offset, len));
        }
        match &mut self.inner {
            Inner::Memory(bytes) => Ok(slice_at(bytes, offset, len)),
            Inner::File { file, len: total } => {
                if offset >= *total {
                    return Ok(Vec::new());
                }
                file.seek(SeekFrom::Start(offset))?;
                let want = len.min((*total - offset) as usize);
                let mut buf = vec![0u8; want];
                file.read_exact(&mut buf)?;
                Ok(buf)
            }
            Inner::Base64 { .. } => unreachable!(),
        }
    }

    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let len = self.len()?;
        if len > usize::MAX as u64 {
            return Err(CryptitError::Filesystem("input too large".into()));
        }
        self.read_at(0, len as usize)
    }

    fn decoded(&mut self) -> Result<&[u8]> {
        if let Inner::Base64 { encoded, decoded } = &mut self.inner {
            if decoded.is_none() {
                let bytes = BASE64
                    .decode(encoded.trim())
                    .map_err(|e| CryptitError::Decoding(format!("invalid base64: {e}")))?;
                *decoded = Some(bytes);
            }
            Ok(decoded.as_deref().expect("just decoded"))
        } else {
            unreachable!("decoded() is only called for base64 sources")
        }
    }
}

fn slice_at(bytes: &[u8], offset: u64, len: usize) -> Vec<u8> {
    if offset >= bytes.len() as u64 {
        return Vec::new();
    }
    let start = offset as usize;
    let end = start.saturating_add(len).min(bytes.len());
    bytes[start..end].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_source() {
        let mut src = ByteSource::from_bytes(vec![1u8, 2, 3, 4, 5]);
        assert_eq!(src.len().unwrap(), 5);
        assert_eq!(src.read_at(1, 3).unwrap(), vec![2, 3, 4]);
        assert_eq!(src.read_at(3, 100).unwrap(), vec![4, 5]);
        assert!(src.read_at(10, 4).unwrap().is_empty());
        assert_eq!(src.read_all().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_base64_source_lazy_decode() {
        let mut src = ByteSource::from_base64("aGVsbG8=");
        assert_eq!(src.len().unwrap(), 5);
        assert_eq!(src.read_all().unwrap(), b"hello");
        assert_eq!(src.read_at(1, 2).unwrap(), b"el");
    }

    #[test]
    fn test_base64_source_rejects_garbage() {
        let mut src = ByteSource::from_base64("not*base64!");
        assert!(matches!(src.len(), Err(CryptitError::Decoding(_))));
    }

    #[test]
    fn test_file_source() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"file contents here").unwrap();
        tmp.flush().unwrap();

        let mut src = ByteSource::open(tmp.path()).unwrap();
        assert_eq!(src.len().unwrap(), 18);
        assert_eq!(src.read_at(5, 8).unwrap(), b"contents");
        assert_eq!(src.read_at(16, 64).unwrap(), b"re");
        assert!(src.read_at(100, 4).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_filesystem_error() {
        let err = ByteSource::open("/nonexistent/definitely-not-here").unwrap_err();
        assert!(matches!(err, CryptitError::Filesystem(_)));
    }
}
