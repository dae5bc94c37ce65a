//
// Copyright (c) 2025 TRUSTEDGE LABS LLC
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: cryptit — Passphrase-protected authenticated encryption for text and streams.
//

//! Engine construction and the per-provider engine cache.
//!
//! An [`Engine`] pairs a scheme's cipher with its KDF presets and chunk
//! size. The [`EngineManager`] caches one engine per
//! `(provider identity, scheme id)` pair behind a mutex; identity comes from
//! [`CryptoProvider::instance_id`], never from reference identity, so the
//! cache works across clones of the same provider handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::cipher::Cipher;
use crate::error::{CryptitError, Result};
use crate::kdf;
use crate::provider::CryptoProvider;
use crate::scheme::{Difficulty, DifficultyTable, SchemeDescriptor, SchemeRegistry};
use crate::secret::Passphrase;

/// A scheme's cipher bound to one provider, with key lifecycle helpers.
pub struct Engine {
    scheme_id: u8,
    scheme_name: &'static str,
    cipher: Cipher,
    difficulties: DifficultyTable,
    chunk_size: usize,
    provider: Arc<dyn CryptoProvider>,
}

impl Engine {
    pub fn new(descriptor: &SchemeDescriptor, provider: Arc<dyn CryptoProvider>) -> Self {
        let primitive = (descriptor.cipher_ctor)(provider.clone());
        Self {
            scheme_id: descriptor.id,
            scheme_name: descriptor.name,
            cipher: Cipher::new(primitive, provider.clone()),
            difficulties: descriptor.difficulties,
            chunk_size: descriptor.default_chunk_size,
            provider,
        }
    }

    pub fn scheme_id(&self) -> u8 {
        self.scheme_id
    }

    pub fn scheme_name(&self) -> &'static str {
        self.scheme_name
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn set_chunk_size(&mut self, chunk_size: usize) -> Result<()> {
        if chunk_size == 0 {
            return Err(CryptitError::Encryption(
                "chunk size must be positive".into(),
            ));
        }
        self.chunk_size = chunk_size;
        Ok(())
    }

    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    pub fn cipher_mut(&mut self) -> &mut Cipher {
        &mut self.cipher
    }

    pub fn provider(&self) -> &Arc<dyn CryptoProvider> {
        &self.provider
    }

    /// Derive the scheme key from `passphrase` and install it on the cipher.
    ///
    /// The passphrase is wiped on every exit path, before any error
    /// propagates. Reconfiguring a keyed engine replaces (and zeroizes) the
    /// previous key.
    pub fn derive_key(
        &mut self,
        passphrase: &mut Passphrase,
        salt: &[u8],
        difficulty: Difficulty,
    ) -> Result<()> {
        let params = self.difficulties.get(difficulty);
        let derived = kdf::derive_key(passphrase.expose(), salt, params);
        passphrase.wipe();
        let key = derived?;

        let handle = self
            .provider
            .import_raw_key(key.as_ref(), self.cipher.key_extractable())
            .map_err(|e| CryptitError::KeyDerivation(e.to_string()))?;
        self.cipher
            .set_key(handle)
            .map_err(|e| CryptitError::KeyDerivation(e.to_string()))
    }

    pub fn zero_key(&mut self) {
        self.cipher.zero_key();
    }
}

/// Cache key: provider identity token + scheme id.
type EngineKey = (u64, u8);

/// Identity-keyed engine cache shared by façade instances.
///
/// Cloning the manager clones the *cache handle*; all clones observe the
/// same engines. Callers wanting key isolation use distinct providers (and
/// therefore distinct identity tokens) or construct engines directly.
#[derive(Clone, Default)]
pub struct EngineManager {
    engines: Arc<Mutex<HashMap<EngineKey, Arc<Mutex<Engine>>>>>,
}

impl EngineManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch or build the engine for `(provider, scheme_id)`.
    ///
    /// Idempotent for the same provider identity: repeated calls hand back
    /// the same engine slot.
    pub fn get_engine(
        &self,
        provider: &Arc<dyn CryptoProvider>,
        registry: &SchemeRegistry,
        scheme_id: u8,
    ) -> Result<Arc<Mutex<Engine>>> {
        let key = (provider.instance_id(), scheme_id);

        let mut engines = self
            .engines
            .lock()
            .map_err(|_| CryptitError::Encryption("engine cache poisoned".into()))?;
        if let Some(engine) = engines.get(&key) {
            return Ok(engine.clone());
        }

        let descriptor = registry.get(scheme_id)?;
        let engine = Arc::new(Mutex::new(Engine::new(descriptor, provider.clone())));
        engines.insert(key, engine.clone());
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::OsProvider;
    use crate::scheme::SaltStrength;

    fn weak_registry() -> SchemeRegistry {
        let mut registry = SchemeRegistry::new();
        let mut aes = SchemeDescriptor::aes_256_gcm();
        aes.difficulties = DifficultyTable::for_tests();
        registry.register(aes).unwrap();
        registry
    }

    #[test]
    fn test_engine_cache_idempotent() {
        let manager = EngineManager::new();
        let registry = weak_registry();
        let provider: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());

        let a = manager.get_engine(&provider, &registry, 0).unwrap();
        let b = manager.get_engine(&provider, &registry, 0).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_engine_cache_separates_providers() {
        let manager = EngineManager::new();
        let registry = weak_registry();
        let p1: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());
        let p2: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());

        let a = manager.get_engine(&p1, &registry, 0).unwrap();
        let b = manager.get_engine(&p2, &registry, 0).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_unknown_scheme_not_cached() {
        let manager = EngineManager::new();
        let registry = weak_registry();
        let provider: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());

        assert!(manager.get_engine(&provider, &registry, 3).is_err());
    }

    #[test]
    fn test_derive_key_wipes_passphrase() {
        let registry = weak_registry();
        let provider: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());
        let mut engine = Engine::new(registry.get(0).unwrap(), provider);

        let salt_len = registry.salt_length(0, SaltStrength::High).unwrap();
        let salt = vec![7u8; salt_len];
        let mut pass = Passphrase::from("secret");

        engine.derive_key(&mut pass, &salt, Difficulty::Middle).unwrap();
        assert!(pass.is_wiped());
        assert!(engine.cipher().has_key());

        engine.zero_key();
        assert!(!engine.cipher().has_key());
    }

    #[test]
    fn test_derive_key_wipes_passphrase_on_failure() {
        let registry = weak_registry();
        let provider: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());
        let mut engine = Engine::new(registry.get(0).unwrap(), provider);

        // Argon2 rejects salts shorter than 8 bytes.
        let mut pass = Passphrase::from("secret");
        let err = engine
            .derive_key(&mut pass, &[0u8; 4], Difficulty::Low)
            .unwrap_err();
        assert!(matches!(err, CryptitError::KeyDerivation(_)));
        assert!(pass.is_wiped());
    }

    #[test]
    fn test_chunk_size_validation() {
        let registry = weak_registry();
        let provider: Arc<dyn CryptoProvider> = Arc::new(OsProvider::new());
        let mut engine = Engine::new(registry.get(0).unwrap(), provider);

        assert_eq!(engine.chunk_size(), 524_288);
        engine.set_chunk_size(16_384).unwrap();
        assert_eq!(engine.chunk_size(), 16_384);
        assert!(engine.set_chunk_size(0).is_err());
    }
}
