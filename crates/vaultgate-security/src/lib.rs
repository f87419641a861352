// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! vaultgate-security — the device-bound half of the gateway.
//!
//! This crate owns everything that must stay on the device: the biometric
//! enrollment and its fail-closed verification pipeline, the encrypted
//! stores that hold the enrollment secret, the local security audit log,
//! and the content-integrity comparison against the vault's hash record.

pub mod audit;
pub mod biometric;
pub mod device;
pub mod enrollment;
pub mod integrity;
pub mod storage;

// PUBLIC API: Re-export core security primitives
pub use audit::{AuditLog, SecurityEvent, SharedAuditLog};
pub use biometric::BiometricGate;
pub use device::device_fingerprint;
pub use enrollment::derive_verification_token;
pub use integrity::{
    HashRecordSource, IntegrityVerifier, digests_match, hash_bytes, hash_with, verify_hash,
};
pub use storage::{EncryptedFileStore, EncryptedStorage, KeychainStore, MemoryStore, SecureStore};
