// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Secure local key-value storage for enrollment records.
//
// On mobile the platform keychain is the backing store (`KeychainStore`).
// On desktop the record lives in a JSON map encrypted at rest with age
// passphrase encryption (`EncryptedFileStore`). `MemoryStore` is for tests.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use age::secrecy::SecretString;
use tracing::{debug, instrument};
use vaultgate_bridge::PlatformBridge;
use vaultgate_core::error::{GatewayError, Result};

/// String key-value store backed by platform-level encrypted storage.
pub trait SecureStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key succeeds.
    fn delete(&self, key: &str) -> Result<()>;

    /// Write several entries, in order.
    fn set_all(&self, entries: &[(String, String)]) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }

    /// Remove several keys, in order.
    fn delete_all(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl SecureStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Platform keychain
// ---------------------------------------------------------------------------

/// Adapter exposing a platform keychain as a `SecureStore`.
pub struct KeychainStore {
    bridge: Arc<dyn PlatformBridge>,
}

impl KeychainStore {
    pub fn new(bridge: Arc<dyn PlatformBridge>) -> Self {
        Self { bridge }
    }
}

impl SecureStore for KeychainStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        // Non UTF-8 bytes can only come from corruption; they are decoded
        // lossily so the record fails its checks instead of erroring out.
        Ok(self
            .bridge
            .load_secret(key)?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.bridge.store_secret(key, value.as_bytes())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.bridge.delete_secret(key)
    }
}

// ---------------------------------------------------------------------------
// age passphrase encryption
// ---------------------------------------------------------------------------

/// Passphrase-based encryption backed by the `age` crate.
///
/// Each encrypt/decrypt call is stateless. The passphrase is held only for
/// the lifetime of the `EncryptedStorage` value.
pub struct EncryptedStorage {
    /// Zeroised on drop.
    passphrase: SecretString,
}

impl EncryptedStorage {
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: SecretString::from(passphrase.into()),
        }
    }

    /// Encrypt `plaintext` into a complete age file (header + payload).
    #[instrument(skip_all, fields(plaintext_len = plaintext.len()))]
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let encryptor = age::Encryptor::with_user_passphrase(self.passphrase.clone());
        let mut ciphertext = Vec::new();

        let mut writer = encryptor
            .wrap_output(&mut ciphertext)
            .map_err(|e| GatewayError::Encryption(e.to_string()))?;

        writer
            .write_all(plaintext)
            .map_err(|e| GatewayError::Encryption(e.to_string()))?;

        writer
            .finish()
            .map_err(|e| GatewayError::Encryption(e.to_string()))?;

        debug!(ciphertext_len = ciphertext.len(), "encryption complete");
        Ok(ciphertext)
    }

    /// Decrypt a complete age file back into plaintext.
    #[instrument(skip_all, fields(ciphertext_len = ciphertext.len()))]
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let decryptor = age::Decryptor::new(ciphertext)
            .map_err(|e| GatewayError::Decryption(e.to_string()))?;

        let identity = age::scrypt::Identity::new(self.passphrase.clone());

        let mut reader = decryptor
            .decrypt(std::iter::once(&identity as &dyn age::Identity))
            .map_err(|e| GatewayError::Decryption(e.to_string()))?;

        let mut plaintext = Vec::new();
        reader
            .read_to_end(&mut plaintext)
            .map_err(|e| GatewayError::Decryption(e.to_string()))?;

        debug!(plaintext_len = plaintext.len(), "decryption complete");
        Ok(plaintext)
    }
}

// ---------------------------------------------------------------------------
// Encrypted file store
// ---------------------------------------------------------------------------

/// `SecureStore` persisted as one age-encrypted JSON file.
///
/// The whole map is rewritten on every mutation through a temporary file
/// and a rename, so a crash never leaves a half-written store behind.
/// Batch writes (`set_all`, `delete_all`) cost a single encryption.
pub struct EncryptedFileStore {
    path: PathBuf,
    crypto: EncryptedStorage,
    entries: Mutex<BTreeMap<String, String>>,
}

impl EncryptedFileStore {
    /// Open the store at `path`, decrypting it if it exists.
    #[instrument(skip(passphrase), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, passphrase: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let crypto = EncryptedStorage::new(passphrase);

        let entries = if path.exists() {
            let ciphertext = std::fs::read(&path)?;
            let plaintext = crypto.decrypt(&ciphertext)?;
            serde_json::from_slice(&plaintext)?
        } else {
            BTreeMap::new()
        };

        debug!(keys = entries.len(), "encrypted store opened");
        Ok(Self {
            path,
            crypto,
            entries: Mutex::new(entries),
        })
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` to a copy of the map, persist it, then publish it.
    /// A failed write leaves the in-memory view unchanged.
    fn mutate(&self, change: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<()> {
        let mut guard = self.entries();
        let mut next = guard.clone();
        change(&mut next);
        if next == *guard {
            return Ok(());
        }
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let plaintext = serde_json::to_vec(entries)?;
        let ciphertext = self.crypto.encrypt(&plaintext)?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, ciphertext)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(keys = entries.len(), "encrypted store persisted");
        Ok(())
    }
}

impl SecureStore for EncryptedFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.mutate(|map| {
            map.insert(key.to_owned(), value.to_owned());
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.mutate(|map| {
            map.remove(key);
        })
    }

    fn set_all(&self, entries: &[(String, String)]) -> Result<()> {
        self.mutate(|map| {
            for (key, value) in entries {
                map.insert(key.clone(), value.clone());
            }
        })
    }

    fn delete_all(&self, keys: &[String]) -> Result<()> {
        self.mutate(|map| {
            for key in keys {
                map.remove(key);
            }
        })
    }
}
