// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Biometric gate — enrollment and fail-closed verification of a biometric
// credential bound to one user and one physical device.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};
use vaultgate_bridge::PlatformBridge;
use vaultgate_core::config::BiometricConfig;
use vaultgate_core::error::{GatewayError, Result};
use vaultgate_core::types::{
    BiometricEnrollment, Capability, EnrollmentOutcome, EnrollmentState, UserId,
    VerificationOutcome,
};

use crate::audit::{SharedAuditLog, actions};
use crate::device::device_fingerprint;
use crate::enrollment::{self, StoredEnrollment};
use crate::storage::SecureStore;

/// Manages per-user biometric enrollments.
///
/// `verify` runs an ordered pipeline where every step either passes or ends
/// the call:
///
/// 1. an enabled enrollment exists, else `NotEnrolled`;
/// 2. the stored device fingerprint matches this device, else the enrollment
///    is revoked and `SecurityError` returned;
/// 3. the user passes the sensor prompt, else `Failed`;
/// 4. the stored token matches the one recomputed from the stored salt, else
///    revoke and `SecurityError`.
///
/// Revocation and its audit record always happen before the violation is
/// returned.
pub struct BiometricGate {
    bridge: Arc<dyn PlatformBridge>,
    store: Arc<dyn SecureStore>,
    audit: SharedAuditLog,
    config: BiometricConfig,
}

impl BiometricGate {
    pub fn new(
        bridge: Arc<dyn PlatformBridge>,
        store: Arc<dyn SecureStore>,
        audit: SharedAuditLog,
        config: BiometricConfig,
    ) -> Self {
        Self {
            bridge,
            store,
            audit,
            config,
        }
    }

    /// Biometric support of this device, queried fresh each call.
    pub fn check_capability(&self) -> Capability {
        self.bridge.biometric_capability()
    }

    #[instrument(skip(self), fields(%user))]
    pub async fn enroll(&self, user: &UserId) -> EnrollmentOutcome {
        if self.check_capability() != Capability::Available {
            info!("enrollment refused: no biometric hardware");
            return EnrollmentOutcome::DeviceNotSupported;
        }

        match self.prompt(&self.config.enroll_reason).await {
            Ok(true) => {}
            Ok(false) => {
                info!("enrollment prompt declined");
                return EnrollmentOutcome::UserCancelled;
            }
            Err(e) => {
                error!("enrollment prompt failed: {e}");
                return EnrollmentOutcome::Error(e.to_string());
            }
        }

        match self.create_enrollment(user).await {
            Ok(()) => {
                info!("biometric enrollment created");
                self.audit
                    .record(actions::BIOMETRIC_ENROLLED, user.as_str(), true, None);
                EnrollmentOutcome::Success
            }
            Err(e) => {
                error!("failed to persist enrollment: {e}");
                EnrollmentOutcome::Error(e.to_string())
            }
        }
    }

    /// Replace any previous record with a fresh one.
    async fn create_enrollment(&self, user: &UserId) -> Result<()> {
        let fingerprint = device_fingerprint(&self.bridge.device_identifiers()?);
        let salt = enrollment::generate_salt()?;
        let record = BiometricEnrollment {
            user_id: user.clone(),
            verification_token: enrollment::derive_verification_token(user, &fingerprint, &salt),
            device_fingerprint: fingerprint,
            salt,
            enrolled_at: Utc::now(),
            enabled: true,
        };

        self.storage(move |store| {
            enrollment::erase(store, &record.user_id)?;
            enrollment::persist(store, &record)
        })
        .await
    }

    #[instrument(skip(self), fields(%user))]
    pub async fn verify(&self, user: &UserId) -> VerificationOutcome {
        let owner = user.clone();
        let loaded = self
            .storage(move |store| enrollment::load(store, &owner))
            .await;
        let record = match loaded {
            Ok(StoredEnrollment::Present(record)) => record,
            Ok(StoredEnrollment::Absent) => {
                debug!("no enabled enrollment");
                return VerificationOutcome::NotEnrolled;
            }
            Ok(StoredEnrollment::Malformed(reason)) => return self.violation(user, &reason).await,
            Err(e) => {
                error!("could not read enrollment: {e}");
                return VerificationOutcome::Error(e.to_string());
            }
        };

        let current = match self.bridge.device_identifiers() {
            Ok(ids) => device_fingerprint(&ids),
            Err(e) => {
                error!("could not read device identifiers: {e}");
                return VerificationOutcome::Error(e.to_string());
            }
        };
        if !enrollment::secrets_match(&record.device_fingerprint, &current) {
            return self.violation(user, "device fingerprint mismatch").await;
        }

        match self.prompt(&self.config.verify_reason).await {
            Ok(true) => {}
            Ok(false) => {
                info!("verification prompt declined");
                return VerificationOutcome::Failed;
            }
            Err(e) => {
                error!("verification prompt failed: {e}");
                return VerificationOutcome::Error(e.to_string());
            }
        }

        let expected =
            enrollment::derive_verification_token(user, &record.device_fingerprint, &record.salt);
        if !enrollment::secrets_match(&record.verification_token, &expected) {
            return self.violation(user, "verification token mismatch").await;
        }

        debug!("biometric verification passed");
        VerificationOutcome::Success
    }

    /// Revoke, record, then report. A failed revoke is logged; the caller
    /// still sees the violation.
    async fn violation(&self, user: &UserId, reason: &str) -> VerificationOutcome {
        warn!(reason, "enrollment failed integrity checks, revoking");
        let owner = user.clone();
        match self
            .storage(move |store| enrollment::erase(store, &owner))
            .await
        {
            Ok(()) => {
                self.audit
                    .record(actions::BIOMETRIC_REVOKED, user.as_str(), true, Some(reason));
            }
            Err(e) => {
                error!("revocation after security violation failed: {e}");
                self.audit.record(
                    actions::BIOMETRIC_REVOKED,
                    user.as_str(),
                    false,
                    Some(&e.to_string()),
                );
            }
        }
        self.audit
            .record(actions::SECURITY_VIOLATION, user.as_str(), false, Some(reason));
        VerificationOutcome::SecurityError(reason.to_owned())
    }

    /// Delete every persisted field of the user's enrollment. Idempotent.
    #[instrument(skip(self), fields(%user))]
    pub async fn revoke(&self, user: &UserId) -> Result<()> {
        let owner = user.clone();
        self.storage(move |store| enrollment::erase(store, &owner))
            .await?;
        info!("biometric enrollment revoked");
        self.audit
            .record(actions::BIOMETRIC_REVOKED, user.as_str(), true, None);
        Ok(())
    }

    /// User-initiated opt-out. Same end state as `revoke`.
    #[instrument(skip(self), fields(%user))]
    pub async fn disable(&self, user: &UserId) -> Result<()> {
        let owner = user.clone();
        self.storage(move |store| enrollment::erase(store, &owner))
            .await?;
        info!("biometric protection disabled");
        self.audit
            .record(actions::BIOMETRIC_DISABLED, user.as_str(), true, None);
        Ok(())
    }

    /// Whether biometric protection is on for `user`. Storage faults read as
    /// `false`; use `try_is_enabled` where a fault must abort.
    pub fn is_enabled(&self, user: &UserId) -> bool {
        self.try_is_enabled(user).unwrap_or_else(|e| {
            warn!(%user, "could not read enrollment flag: {e}");
            false
        })
    }

    pub fn try_is_enabled(&self, user: &UserId) -> Result<bool> {
        enrollment::is_enabled(self.store.as_ref(), user)
    }

    pub fn enrollment_state(&self, user: &UserId) -> EnrollmentState {
        if self.is_enabled(user) {
            EnrollmentState::Enrolled
        } else {
            EnrollmentState::Unenrolled
        }
    }

    /// When the current enrollment was created, if there is a readable one.
    pub fn enrolled_at(&self, user: &UserId) -> Result<Option<DateTime<Utc>>> {
        match enrollment::load(self.store.as_ref(), user)? {
            StoredEnrollment::Present(record) => Ok(Some(record.enrolled_at)),
            _ => Ok(None),
        }
    }

    /// Show the sensor prompt on a blocking thread.
    async fn prompt(&self, reason: &str) -> Result<bool> {
        let bridge = Arc::clone(&self.bridge);
        let reason = reason.to_owned();
        tokio::task::spawn_blocking(move || bridge.prompt_biometric(&reason))
            .await
            .map_err(|e| GatewayError::Biometric(format!("prompt task failed: {e}")))?
    }

    /// Run a store operation on a blocking thread. Keychain calls can block
    /// and every encrypted-file write runs scrypt.
    async fn storage<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SecureStore) -> Result<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| GatewayError::Keychain(format!("storage task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use vaultgate_bridge::{MockBridge, PromptScript};

    use super::*;
    use crate::audit::AuditLog;
    use crate::enrollment::{FIELD_DEVICE_FINGERPRINT, FIELD_VERIFICATION_TOKEN, field_key};
    use crate::storage::{KeychainStore, MemoryStore};

    struct Fixture {
        bridge: Arc<MockBridge>,
        store: Arc<MemoryStore>,
        audit: SharedAuditLog,
        gate: BiometricGate,
    }

    fn fixture() -> Fixture {
        let bridge = Arc::new(MockBridge::new());
        let store = Arc::new(MemoryStore::new());
        let audit = SharedAuditLog::new(AuditLog::open_in_memory().unwrap());
        let gate = BiometricGate::new(
            bridge.clone(),
            store.clone(),
            audit.clone(),
            BiometricConfig::default(),
        );
        Fixture {
            bridge,
            store,
            audit,
            gate,
        }
    }

    /// Memory store whose deletes can be switched off.
    #[derive(Default)]
    struct StuckStore {
        inner: MemoryStore,
        deletes_fail: AtomicBool,
    }

    impl SecureStore for StuckStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.inner.set(key, value)
        }

        fn delete(&self, key: &str) -> Result<()> {
            if self.deletes_fail.load(Ordering::SeqCst) {
                return Err(GatewayError::Keychain("keychain offline".into()));
            }
            self.inner.delete(key)
        }
    }

    fn user() -> UserId {
        UserId::new("a@x.com").unwrap()
    }

    fn audit_actions(audit: &SharedAuditLog) -> Vec<String> {
        audit
            .with_log(|log| log.entries_for_subject("a@x.com"))
            .unwrap()
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect()
    }

    #[tokio::test]
    async fn enroll_then_verify_succeeds() {
        let f = fixture();
        assert_eq!(f.gate.enroll(&user()).await, EnrollmentOutcome::Success);
        assert!(f.gate.is_enabled(&user()));
        assert_eq!(f.gate.enrollment_state(&user()), EnrollmentState::Enrolled);
        assert!(f.gate.enrolled_at(&user()).unwrap().is_some());
        assert_eq!(f.gate.verify(&user()).await, VerificationOutcome::Success);
        assert_eq!(f.bridge.prompts_shown(), 2);
    }

    #[tokio::test]
    async fn device_change_revokes_before_prompting() {
        let f = fixture();
        f.gate.enroll(&user()).await;
        f.bridge.set_device_id("another-device");

        let outcome = f.gate.verify(&user()).await;
        assert!(matches!(outcome, VerificationOutcome::SecurityError(_)));
        assert!(!f.gate.is_enabled(&user()));
        assert_eq!(f.bridge.prompts_shown(), 1);
        assert!(f.store.is_empty());

        let recorded = audit_actions(&f.audit);
        assert!(recorded.contains(&actions::BIOMETRIC_REVOKED.to_owned()));
        assert!(recorded.contains(&actions::SECURITY_VIOLATION.to_owned()));
    }

    #[tokio::test]
    async fn tampered_fingerprint_revokes() {
        let f = fixture();
        f.gate.enroll(&user()).await;
        f.store
            .set(&field_key(&user(), FIELD_DEVICE_FINGERPRINT), "0000")
            .unwrap();

        assert!(matches!(
            f.gate.verify(&user()).await,
            VerificationOutcome::SecurityError(_)
        ));
        assert!(!f.gate.is_enabled(&user()));
    }

    #[tokio::test]
    async fn corrupted_token_revokes_after_prompt() {
        let f = fixture();
        f.gate.enroll(&user()).await;
        f.store
            .set(&field_key(&user(), FIELD_VERIFICATION_TOKEN), "deadbeef")
            .unwrap();

        let outcome = f.gate.verify(&user()).await;
        assert_eq!(
            outcome,
            VerificationOutcome::SecurityError("verification token mismatch".into())
        );
        assert_eq!(f.bridge.prompts_shown(), 2);
        assert!(!f.gate.is_enabled(&user()));
    }

    #[tokio::test]
    async fn denied_prompt_leaves_enrollment_alone() {
        let f = fixture();
        f.gate.enroll(&user()).await;
        f.bridge.queue_answer(PromptScript::Deny);

        assert_eq!(f.gate.verify(&user()).await, VerificationOutcome::Failed);
        assert!(f.gate.is_enabled(&user()));
        assert_eq!(f.gate.verify(&user()).await, VerificationOutcome::Success);
    }

    #[tokio::test]
    async fn sensor_fault_is_an_error_not_a_violation() {
        let f = fixture();
        f.gate.enroll(&user()).await;
        f.bridge.queue_answer(PromptScript::Fault);

        assert!(matches!(
            f.gate.verify(&user()).await,
            VerificationOutcome::Error(_)
        ));
        assert!(f.gate.is_enabled(&user()));
    }

    #[tokio::test]
    async fn verify_without_enrollment() {
        let f = fixture();
        assert_eq!(f.gate.verify(&user()).await, VerificationOutcome::NotEnrolled);
        assert_eq!(f.bridge.prompts_shown(), 0);
    }

    #[tokio::test]
    async fn enroll_needs_hardware() {
        let f = fixture();
        f.bridge.set_capability(Capability::None);
        assert_eq!(
            f.gate.enroll(&user()).await,
            EnrollmentOutcome::DeviceNotSupported
        );
        assert_eq!(f.bridge.prompts_shown(), 0);
        assert!(!f.gate.is_enabled(&user()));
    }

    #[tokio::test]
    async fn enroll_cancelled_persists_nothing() {
        let f = fixture();
        f.bridge.queue_answer(PromptScript::Deny);
        assert_eq!(f.gate.enroll(&user()).await, EnrollmentOutcome::UserCancelled);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn re_enrollment_uses_fresh_salt() {
        let f = fixture();
        f.gate.enroll(&user()).await;
        let first = f.store.get(&field_key(&user(), "salt")).unwrap();
        f.gate.enroll(&user()).await;
        let second = f.store.get(&field_key(&user(), "salt")).unwrap();
        assert_ne!(first, second);
        assert_eq!(f.gate.verify(&user()).await, VerificationOutcome::Success);
    }

    #[tokio::test]
    async fn revoke_twice_is_idempotent() {
        let f = fixture();
        f.gate.enroll(&user()).await;
        f.gate.revoke(&user()).await.unwrap();
        f.gate.revoke(&user()).await.unwrap();
        assert!(!f.gate.is_enabled(&user()));
        assert!(f.store.is_empty());
        assert_eq!(f.gate.verify(&user()).await, VerificationOutcome::NotEnrolled);
    }

    #[tokio::test]
    async fn disable_removes_the_enrollment() {
        let f = fixture();
        f.gate.enroll(&user()).await;
        f.gate.disable(&user()).await.unwrap();
        assert_eq!(f.gate.enrollment_state(&user()), EnrollmentState::Unenrolled);
        assert!(audit_actions(&f.audit).contains(&actions::BIOMETRIC_DISABLED.to_owned()));
    }

    #[tokio::test]
    async fn concurrent_violations_converge() {
        let f = fixture();
        f.gate.enroll(&user()).await;
        f.bridge.set_device_id("stolen-device");

        let owner = user();
        let (a, b) = tokio::join!(f.gate.verify(&owner), f.gate.verify(&owner));
        for outcome in [a, b] {
            assert!(matches!(
                outcome,
                VerificationOutcome::SecurityError(_) | VerificationOutcome::NotEnrolled
            ));
        }
        assert!(!f.gate.is_enabled(&user()));
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn users_are_independent() {
        let f = fixture();
        let other = UserId::new("b@x.com").unwrap();
        f.gate.enroll(&user()).await;
        f.gate.enroll(&other).await;
        f.gate.revoke(&user()).await.unwrap();

        assert!(!f.gate.is_enabled(&user()));
        assert_eq!(f.gate.verify(&other).await, VerificationOutcome::Success);
    }

    #[tokio::test]
    async fn keychain_backed_gate_detects_tampering() {
        let bridge = Arc::new(MockBridge::new());
        let gate = BiometricGate::new(
            bridge.clone(),
            Arc::new(KeychainStore::new(bridge.clone())),
            SharedAuditLog::disabled(),
            BiometricConfig::default(),
        );
        gate.enroll(&user()).await;
        bridge.tamper_secret(&field_key(&user(), FIELD_VERIFICATION_TOKEN), &[0xff; 64]);

        assert!(matches!(
            gate.verify(&user()).await,
            VerificationOutcome::SecurityError(_)
        ));
        assert_eq!(bridge.secret_count(), 0);
    }

    #[tokio::test]
    async fn locked_keychain_is_an_error() {
        let bridge = Arc::new(MockBridge::new());
        let gate = BiometricGate::new(
            bridge.clone(),
            Arc::new(KeychainStore::new(bridge.clone())),
            SharedAuditLog::disabled(),
            BiometricConfig::default(),
        );
        gate.enroll(&user()).await;
        bridge.set_keychain_offline(true);

        assert!(matches!(
            gate.verify(&user()).await,
            VerificationOutcome::Error(_)
        ));
        assert!(gate.try_is_enabled(&user()).is_err());
        assert!(!gate.is_enabled(&user()));
    }

    #[tokio::test]
    async fn failed_revoke_still_reports_violation() {
        let bridge = Arc::new(MockBridge::new());
        let store = Arc::new(StuckStore::default());
        let audit = SharedAuditLog::new(AuditLog::open_in_memory().unwrap());
        let gate = BiometricGate::new(
            bridge.clone(),
            store.clone(),
            audit.clone(),
            BiometricConfig::default(),
        );
        gate.enroll(&user()).await;
        store.deletes_fail.store(true, Ordering::SeqCst);
        bridge.set_device_id("another-device");

        assert_eq!(
            gate.verify(&user()).await,
            VerificationOutcome::SecurityError("device fingerprint mismatch".into())
        );
        let events = audit
            .with_log(|log| log.entries_for_subject("a@x.com"))
            .unwrap()
            .unwrap();
        assert!(
            events
                .iter()
                .any(|e| e.action == actions::BIOMETRIC_REVOKED && !e.success)
        );
        assert!(events.iter().any(|e| e.action == actions::SECURITY_VIOLATION));
    }

    #[tokio::test]
    async fn broken_audit_log_does_not_change_outcomes() {
        let f = fixture();
        f.audit.with_log(|log| log.drop_table()).unwrap().unwrap();

        assert_eq!(f.gate.enroll(&user()).await, EnrollmentOutcome::Success);
        f.bridge.set_device_id("another-device");
        assert!(matches!(
            f.gate.verify(&user()).await,
            VerificationOutcome::SecurityError(_)
        ));
        assert!(f.store.is_empty());
    }
}
