//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

// Allow deprecated cargo_bin usage - the replacement cargo_bin_cmd! macro
// is not yet stable across all assert_cmd versions
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn cryptit() -> Command {
    Command::cargo_bin("cryptit").unwrap()
}

#[test]
fn test_encrypt_decrypt_text_round_trip() {
    let output = cryptit()
        .args(["encrypt-text", "hello from the cli", "-p", "pw", "-d", "low"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let encoded = String::from_utf8(output).unwrap();
    assert!(!encoded.trim().is_empty());

    cryptit()
        .args(["decrypt-text", encoded.trim(), "-p", "pw"])
        .assert()
        .success()
        .stdout(predicate::eq("hello from the cli"));
}

#[test]
fn test_decrypt_text_wrong_passphrase_fails() {
    let output = cryptit()
        .args(["encrypt-text", "secret", "-p", "right", "-d", "low"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let encoded = String::from_utf8(output).unwrap();

    cryptit()
        .args(["decrypt-text", encoded.trim(), "-p", "wrong"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("decryption failed"));
}

#[test]
fn test_file_round_trip() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input.bin");
    fs::write(&input, b"file payload for the round trip").unwrap();

    cryptit()
        .args(["encrypt", "input.bin", "-p", "pw", "-d", "low"])
        .current_dir(temp.path())
        .assert()
        .success();
    assert!(temp.path().join("input.bin.enc").exists());

    cryptit()
        .args([
            "decrypt",
            "input.bin.enc",
            "-p",
            "pw",
            "-o",
            "restored.bin",
        ])
        .current_dir(temp.path())
        .assert()
        .success();

    let restored = fs::read(temp.path().join("restored.bin")).unwrap();
    assert_eq!(restored, b"file payload for the round trip");
}

#[test]
fn test_stdin_stdout_piping() {
    let temp = TempDir::new().unwrap();

    let encrypted = cryptit()
        .args(["encrypt", "-", "-p", "pw", "-d", "low"])
        .current_dir(temp.path())
        .write_stdin("piped payload")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert!(!encrypted.is_empty());

    cryptit()
        .args(["decrypt", "-", "-p", "pw"])
        .current_dir(temp.path())
        .write_stdin(encrypted)
        .assert()
        .success()
        .stdout(predicate::eq("piped payload"));
}

#[test]
fn test_piped_input_requires_pass_flag() {
    cryptit()
        .args(["encrypt", "-"])
        .write_stdin("data")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("passphrase required"));
}

#[test]
fn test_output_path_traversal_rejected() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input.bin");
    fs::write(&input, b"data").unwrap();

    cryptit()
        .args([
            "encrypt",
            "input.bin",
            "-p",
            "pw",
            "-d",
            "low",
            "-o",
            "../escape.enc",
        ])
        .current_dir(temp.path())
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("outside the working directory"));
}

#[test]
fn test_decode_reports_container_structure() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("input.bin");
    fs::write(&input, vec![0x42u8; 4096]).unwrap();

    cryptit()
        .args(["encrypt", "input.bin", "-p", "pw", "-d", "low"])
        .current_dir(temp.path())
        .assert()
        .success();

    cryptit()
        .args(["decode", "input.bin.enc"])
        .current_dir(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Scheme: 0 (AES-256-GCM)"))
        .stdout(predicate::str::contains("Difficulty: low"))
        .stdout(predicate::str::contains("Salt Length: 16 bytes"));
}

#[test]
fn test_decode_json_from_stdin() {
    let encoded = cryptit()
        .args(["encrypt-text", "inspect me", "-p", "pw", "-d", "low"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let container = base64_decode(String::from_utf8(encoded).unwrap().trim());

    let output = cryptit()
        .args(["decode", "-", "--json"])
        .write_stdin(container)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["scheme"], 0);
    assert_eq!(report["cipher"], "AES-256-GCM");
    assert_eq!(report["layout"], "single");
    assert_eq!(report["salt_length"], 16);
    assert_eq!(report["iv_length"], 12);
    assert_eq!(report["tag_length"], 16);
}

#[test]
fn test_decode_rejects_garbage() {
    cryptit()
        .args(["decode", "-"])
        .write_stdin("this is not a container")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid header"));
}

#[test]
fn test_stdin_cap_enforced() {
    cryptit()
        .args(["decode", "-"])
        .env("CRYPTIT_STDIN_MAX_BYTES", "16")
        .write_stdin(vec![0u8; 64])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("CRYPTIT_STDIN_MAX_BYTES"));
}

#[test]
fn test_xchacha_scheme_flag() {
    let encoded = cryptit()
        .args(["encrypt-text", "X", "-p", "pw", "-d", "low", "-S", "1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let encoded = String::from_utf8(encoded).unwrap();

    cryptit()
        .args(["decrypt-text", encoded.trim(), "-p", "pw"])
        .assert()
        .success()
        .stdout(predicate::eq("X"));

    let container = base64_decode(encoded.trim());
    let output = cryptit()
        .args(["decode", "-", "--json"])
        .write_stdin(container)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["scheme"], 1);
    assert_eq!(report["cipher"], "XChaCha20-Poly1305");
}

#[test]
fn test_invalid_scheme_flag_rejected() {
    cryptit()
        .args(["encrypt-text", "x", "-p", "pw", "-S", "9"])
        .assert()
        .failure();
}

fn base64_decode(s: &str) -> Vec<u8> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.decode(s).unwrap()
}
