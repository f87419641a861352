// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gateway configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::Operation;

/// Persistent gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Remote vault endpoint settings.
    pub vault: VaultConfig,
    /// Default `require_verification` flag per operation.
    pub policy: PolicyConfig,
    /// Biometric prompt wording.
    pub biometric: BiometricConfig,
    /// Record security events in the local audit database.
    pub audit_enabled: bool,
    /// Largest document accepted for upload, in bytes.
    pub max_upload_bytes: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            vault: VaultConfig::default(),
            policy: PolicyConfig::default(),
            biometric: BiometricConfig::default(),
            audit_enabled: true,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Where and how to reach the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Base URL the endpoint paths are appended to (no trailing slash needed).
    pub base_url: String,
    /// Header carrying the caller identity on GET/DELETE requests.
    pub identity_header: String,
    /// Per-request timeout. Expiry is reported as a transport error.
    pub request_timeout_secs: u64,
}

impl VaultConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/mcp".into(),
            identity_header: "user-email".into(),
            request_timeout_secs: 30,
        }
    }
}

/// Which operations ask for biometric verification unless the caller
/// escalates explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub store: bool,
    pub list: bool,
    pub download: bool,
    pub verify_integrity: bool,
    pub audit_trail: bool,
    pub delete: bool,
    pub metadata: bool,
}

impl PolicyConfig {
    /// Default `require_verification` flag for `operation`.
    pub fn requires_verification(&self, operation: Operation) -> bool {
        match operation {
            Operation::Store => self.store,
            Operation::List => self.list,
            Operation::Download => self.download,
            Operation::VerifyIntegrity => self.verify_integrity,
            Operation::AuditTrail => self.audit_trail,
            Operation::Delete => self.delete,
            Operation::Metadata => self.metadata,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            store: false,
            list: false,
            download: false,
            verify_integrity: false,
            audit_trail: true,
            delete: true,
            metadata: false,
        }
    }
}

/// Text shown by the platform biometric prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BiometricConfig {
    pub enroll_reason: String,
    pub verify_reason: String,
}

impl Default for BiometricConfig {
    fn default() -> Self {
        Self {
            enroll_reason: "Enable biometric protection for your documents".into(),
            verify_reason: "Verify your identity to access secure documents".into(),
        }
    }
}
