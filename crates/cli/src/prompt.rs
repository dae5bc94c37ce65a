//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Passphrase acquisition and stdin spooling.

use std::io::{IsTerminal, Read, Write};

use anyhow::{bail, Context, Result};
use cryptit_core::Passphrase;
use tempfile::NamedTempFile;
use zeroize::Zeroize;

/// Environment variable capping how much piped stdin `decode` will spool to
/// a temporary file.
pub const STDIN_MAX_BYTES_VAR: &str = "CRYPTIT_STDIN_MAX_BYTES";

const STDIN_MAX_BYTES_DEFAULT: u64 = 10 * 1024 * 1024 * 1024;

/// Resolve the passphrase from `-p`, or prompt on the terminal.
///
/// Prompting needs the terminal; when stdin carries piped payload data the
/// passphrase must come from the flag.
pub fn acquire(flag: Option<&str>, stdin_is_data: bool, confirm: bool) -> Result<Passphrase> {
    if let Some(pass) = flag {
        return Ok(Passphrase::from(pass));
    }
    if stdin_is_data || !std::io::stdin().is_terminal() {
        bail!("passphrase required: pass -p when input is piped");
    }

    let mut pass = rpassword::prompt_password("Passphrase: ").context("passphrase prompt")?;
    if confirm {
        let mut again =
            rpassword::prompt_password("Confirm passphrase: ").context("passphrase prompt")?;
        let matches = pass == again;
        again.zeroize();
        if !matches {
            pass.zeroize();
            bail!("passphrases do not match");
        }
    }
    Ok(Passphrase::from(pass))
}

/// Spool piped stdin into a temporary file for random-access decoding.
///
/// Bounded by [`STDIN_MAX_BYTES_VAR`] (default 10 GiB).
pub fn spool_stdin() -> Result<NamedTempFile> {
    let cap = std::env::var(STDIN_MAX_BYTES_VAR)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(STDIN_MAX_BYTES_DEFAULT);

    let mut tmp = NamedTempFile::new().context("create spool file")?;
    let mut stdin = std::io::stdin().lock();
    let mut buf = [0u8; 64 * 1024];
    let mut total: u64 = 0;

    loop {
        let n = stdin.read(&mut buf).context("read stdin")?;
        if n == 0 {
            break;
        }
        total += n as u64;
        if total > cap {
            bail!("stdin exceeds {STDIN_MAX_BYTES_VAR} ({cap} bytes)");
        }
        tmp.write_all(&buf[..n]).context("write spool file")?;
    }
    tmp.flush().context("flush spool file")?;
    Ok(tmp)
}
