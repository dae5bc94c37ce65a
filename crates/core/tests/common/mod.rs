//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Shared helpers for the integration suites.
//!
//! The registries here carry the production cipher and salt tables but
//! test-sized Argon2 parameters, registered through the same public API a
//! downstream embedder would use.

use std::sync::Arc;

use cryptit_core::{
    CryptIt, CryptItOptions, DifficultyTable, OsProvider, SchemeDescriptor, SchemeRegistry,
};

pub fn test_registry() -> SchemeRegistry {
    let mut registry = SchemeRegistry::new();

    let mut aes = SchemeDescriptor::aes_256_gcm();
    aes.difficulties = DifficultyTable::for_tests();
    registry.register(aes).unwrap();

    let mut xchacha = SchemeDescriptor::xchacha20_poly1305();
    xchacha.difficulties = DifficultyTable::for_tests();
    registry.register(xchacha).unwrap();

    registry
}

pub fn cryptit_with(options: CryptItOptions) -> CryptIt {
    CryptIt::with_parts(
        Arc::new(OsProvider::new()),
        Arc::new(test_registry()),
        options,
    )
}

pub fn default_cryptit() -> CryptIt {
    cryptit_with(CryptItOptions::default())
}

/// Deterministic pseudo-random payload, fast to generate at any size.
pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) ^ (i >> 8)) as u8).collect()
}
