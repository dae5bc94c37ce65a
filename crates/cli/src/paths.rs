//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Output path validation.
//!
//! Writes are confined to the current working directory tree. The target
//! directory must already exist; traversal via `..` or symlinked parents is
//! resolved through canonicalization before the containment check.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Validate `path` as an output target and return its canonical location.
pub fn resolve_output(path: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir()
        .context("cannot determine working directory")?
        .canonicalize()
        .context("cannot canonicalize working directory")?;

    let file_name = path
        .file_name()
        .with_context(|| format!("output path has no file name: {}", path.display()))?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p
            .canonicalize()
            .with_context(|| format!("output directory does not exist: {}", p.display()))?,
        _ => cwd.clone(),
    };

    if !parent.is_dir() {
        bail!("output target is not a directory: {}", parent.display());
    }
    if !parent.starts_with(&cwd) {
        bail!(
            "refusing to write outside the working directory: {}",
            path.display()
        );
    }

    Ok(parent.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_file_name_allowed() {
        let resolved = resolve_output(Path::new("out.bin")).unwrap();
        assert!(resolved.ends_with("out.bin"));
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(resolve_output(Path::new("../escape.bin")).is_err());
        assert!(resolve_output(Path::new("/tmp/absolute.bin")).is_err());
    }

    #[test]
    fn test_missing_directory_rejected() {
        assert!(resolve_output(Path::new("no/such/dir/out.bin")).is_err());
    }
}
