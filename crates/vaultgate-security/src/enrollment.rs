// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Enrollment record persistence and verification-token derivation.
//
// A record is stored as one key per field under `enrollment:<user>:<field>`.
// `enabled` is written last and removed first, so a record interrupted
// half-way through either operation reads as not enrolled.

use chrono::{DateTime, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use tracing::debug;
use vaultgate_core::error::{GatewayError, Result};
use vaultgate_core::types::{BiometricEnrollment, UserId};

use crate::storage::SecureStore;

const TOKEN_DOMAIN: &[u8] = b"vaultgate:enrollment:v1";
const SALT_LEN: usize = 32;

pub const FIELD_DEVICE_FINGERPRINT: &str = "device_fingerprint";
pub const FIELD_VERIFICATION_TOKEN: &str = "verification_token";
pub const FIELD_SALT: &str = "salt";
pub const FIELD_ENROLLED_AT: &str = "enrolled_at";
pub const FIELD_ENABLED: &str = "enabled";

/// Storage key for one field of a user's enrollment.
pub fn field_key(user: &UserId, field: &str) -> String {
    format!("enrollment:{user}:{field}")
}

/// Derive the verification token binding `user` to a device and a salt.
pub fn derive_verification_token(user: &UserId, device_fingerprint: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(TOKEN_DOMAIN);
    for field in [user.as_str(), device_fingerprint, salt] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Fresh random enrollment salt, hex encoded.
pub fn generate_salt() -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| GatewayError::Encryption("system RNG unavailable".into()))?;
    Ok(hex::encode(salt))
}

/// Exact comparison without an early exit on equal-length inputs.
pub fn secrets_match(expected: &str, actual: &str) -> bool {
    let (a, b) = (expected.as_bytes(), actual.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// What the store holds for a user.
#[derive(Debug)]
pub enum StoredEnrollment {
    Absent,
    /// Marked enabled but with missing or unreadable fields.
    Malformed(String),
    Present(BiometricEnrollment),
}

/// Whether the `enabled` flag is set for `user`.
pub fn is_enabled(store: &dyn SecureStore, user: &UserId) -> Result<bool> {
    Ok(store.get(&field_key(user, FIELD_ENABLED))?.as_deref() == Some("true"))
}

/// Read a user's enrollment.
pub fn load(store: &dyn SecureStore, user: &UserId) -> Result<StoredEnrollment> {
    if !is_enabled(store, user)? {
        return Ok(StoredEnrollment::Absent);
    }

    let read = |field: &str| -> Result<std::result::Result<String, String>> {
        Ok(store
            .get(&field_key(user, field))?
            .filter(|value| !value.is_empty())
            .ok_or_else(|| format!("enrollment field '{field}' is missing")))
    };

    let device_fingerprint = match read(FIELD_DEVICE_FINGERPRINT)? {
        Ok(value) => value,
        Err(reason) => return Ok(StoredEnrollment::Malformed(reason)),
    };
    let verification_token = match read(FIELD_VERIFICATION_TOKEN)? {
        Ok(value) => value,
        Err(reason) => return Ok(StoredEnrollment::Malformed(reason)),
    };
    let salt = match read(FIELD_SALT)? {
        Ok(value) => value,
        Err(reason) => return Ok(StoredEnrollment::Malformed(reason)),
    };
    let enrolled_at = match read(FIELD_ENROLLED_AT)? {
        Ok(value) => match DateTime::parse_from_rfc3339(&value) {
            Ok(at) => at.with_timezone(&Utc),
            Err(e) => {
                return Ok(StoredEnrollment::Malformed(format!(
                    "enrollment timestamp unreadable: {e}"
                )));
            }
        },
        Err(reason) => return Ok(StoredEnrollment::Malformed(reason)),
    };

    Ok(StoredEnrollment::Present(BiometricEnrollment {
        user_id: user.clone(),
        device_fingerprint,
        verification_token,
        salt,
        enrolled_at,
        enabled: true,
    }))
}

/// Write a full record, `enabled` last.
pub fn persist(store: &dyn SecureStore, enrollment: &BiometricEnrollment) -> Result<()> {
    let user = &enrollment.user_id;
    let entries = vec![
        (
            field_key(user, FIELD_DEVICE_FINGERPRINT),
            enrollment.device_fingerprint.clone(),
        ),
        (
            field_key(user, FIELD_VERIFICATION_TOKEN),
            enrollment.verification_token.clone(),
        ),
        (field_key(user, FIELD_SALT), enrollment.salt.clone()),
        (
            field_key(user, FIELD_ENROLLED_AT),
            enrollment.enrolled_at.to_rfc3339(),
        ),
        (
            field_key(user, FIELD_ENABLED),
            if enrollment.enabled { "true" } else { "false" }.to_owned(),
        ),
    ];
    store.set_all(&entries)?;
    debug!(%user, "enrollment persisted");
    Ok(())
}

/// Delete every field of a user's record, `enabled` first. Idempotent.
pub fn erase(store: &dyn SecureStore, user: &UserId) -> Result<()> {
    let keys: Vec<String> = [
        FIELD_ENABLED,
        FIELD_VERIFICATION_TOKEN,
        FIELD_SALT,
        FIELD_DEVICE_FINGERPRINT,
        FIELD_ENROLLED_AT,
    ]
    .iter()
    .map(|field| field_key(user, field))
    .collect();
    store.delete_all(&keys)?;
    debug!(%user, "enrollment erased");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn user() -> UserId {
        UserId::new("a@x.com").unwrap()
    }

    fn sample() -> BiometricEnrollment {
        let salt = generate_salt().unwrap();
        BiometricEnrollment {
            user_id: user(),
            device_fingerprint: "fp".into(),
            verification_token: derive_verification_token(&user(), "fp", &salt),
            salt,
            enrolled_at: Utc::now(),
            enabled: true,
        }
    }

    #[test]
    fn token_is_stable_for_same_inputs() {
        let a = derive_verification_token(&user(), "fp", "salt");
        let b = derive_verification_token(&user(), "fp", "salt");
        assert_eq!(a, b);
        assert_ne!(a, derive_verification_token(&user(), "fp", "salt2"));
        assert_ne!(a, derive_verification_token(&user(), "fp2", "salt"));
    }

    #[test]
    fn salts_are_random() {
        let a = generate_salt().unwrap();
        assert_eq!(a.len(), SALT_LEN * 2);
        assert_ne!(a, generate_salt().unwrap());
    }

    #[test]
    fn secrets_compare_exactly() {
        assert!(secrets_match("abc", "abc"));
        assert!(!secrets_match("abc", "ABC"));
        assert!(!secrets_match("abc", "abcd"));
    }

    #[test]
    fn persist_then_load() {
        let store = MemoryStore::new();
        let enrollment = sample();
        persist(&store, &enrollment).unwrap();

        match load(&store, &user()).unwrap() {
            StoredEnrollment::Present(loaded) => {
                assert_eq!(loaded.verification_token, enrollment.verification_token);
                assert_eq!(loaded.salt, enrollment.salt);
                assert!(loaded.enabled);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_flag_reads_as_absent() {
        let store = MemoryStore::new();
        persist(&store, &sample()).unwrap();
        store.delete(&field_key(&user(), FIELD_ENABLED)).unwrap();
        assert!(matches!(load(&store, &user()).unwrap(), StoredEnrollment::Absent));
    }

    #[test]
    fn missing_field_reads_as_malformed() {
        let store = MemoryStore::new();
        persist(&store, &sample()).unwrap();
        store.delete(&field_key(&user(), FIELD_SALT)).unwrap();
        assert!(matches!(
            load(&store, &user()).unwrap(),
            StoredEnrollment::Malformed(_)
        ));
    }

    #[test]
    fn erase_twice_is_harmless() {
        let store = MemoryStore::new();
        persist(&store, &sample()).unwrap();
        erase(&store, &user()).unwrap();
        erase(&store, &user()).unwrap();
        assert!(store.is_empty());
    }
}
