// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Vaultgate security gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// Maximum accepted length of a document identifier.
pub const MAX_DOCUMENT_ID_LEN: usize = 128;

/// Identity of the user on whose behalf an operation runs.
///
/// Passed explicitly through every gated call; there is no ambient
/// "current user".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::InvalidInput("user id must not be empty".into()));
        }
        if trimmed.chars().any(|c| c.is_control() || c == ':') {
            return Err(GatewayError::InvalidInput(format!(
                "user id '{trimmed}' contains a reserved character"
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Vault-assigned document identifier, safe to place in a URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(GatewayError::InvalidInput("document id must not be empty".into()));
        }
        if raw.len() > MAX_DOCUMENT_ID_LEN {
            return Err(GatewayError::InvalidInput(format!(
                "document id longer than {MAX_DOCUMENT_ID_LEN} bytes"
            )));
        }
        let bad = raw
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#' | '%'));
        if bad {
            return Err(GatewayError::InvalidInput(format!(
                "document id '{raw}' contains characters not allowed in a path segment"
            )));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for DocumentId {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DocumentId> for String {
    fn from(value: DocumentId) -> Self {
        value.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Biometric gate
// ---------------------------------------------------------------------------

/// Hardware/OS biometric support. Recomputed on demand, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    None,
    Available,
}

/// Result of an enrollment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    Success,
    DeviceNotSupported,
    UserCancelled,
    Error(String),
}

/// Result of a biometric verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Device binding, prompt and stored secret all checked out.
    Success,
    /// The user denied or cancelled the prompt. Enrollment is untouched.
    Failed,
    /// No enabled enrollment exists for the identity.
    NotEnrolled,
    /// Device or token mismatch. The enrollment has already been revoked.
    SecurityError(String),
    /// The check itself could not run (sensor or storage fault).
    Error(String),
}

/// Observable enrollment state. A revoked enrollment reads as `Unenrolled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentState {
    Unenrolled,
    Enrolled,
}

/// A persisted biometric enrollment, at most one per user.
#[derive(Clone, PartialEq, Eq)]
pub struct BiometricEnrollment {
    pub user_id: UserId,
    pub device_fingerprint: String,
    pub verification_token: String,
    /// Random value generated once at enrollment and reused to recompute
    /// the verification token.
    pub salt: String,
    pub enrolled_at: DateTime<Utc>,
    pub enabled: bool,
}

impl std::fmt::Debug for BiometricEnrollment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BiometricEnrollment")
            .field("user_id", &self.user_id)
            .field("device_fingerprint", &self.device_fingerprint)
            .field("verification_token", &"<redacted>")
            .field("salt", &"<redacted>")
            .field("enrolled_at", &self.enrolled_at)
            .field("enabled", &self.enabled)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

/// Content hash algorithms the vault may record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Canonical name as reported by the vault (e.g. `SHA-256`).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Length of the lowercase hex digest.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha384 => 96,
            Self::Sha512 => 128,
        }
    }

    /// Algorithm whose hex digest has `len` characters.
    pub fn from_hex_len(len: usize) -> Option<Self> {
        [Self::Sha256, Self::Sha384, Self::Sha512]
            .into_iter()
            .find(|algorithm| algorithm.hex_len() == len)
    }

    /// Parse a vault-reported algorithm name. Accepts `SHA-256`, `sha256`,
    /// `SHA_256` and the like; anything unknown is `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalised: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalised.as_str() {
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The vault's recorded hash for one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRecord {
    pub expected_hash: String,
    pub algorithm: HashAlgorithm,
    /// The vault's own verdict, when it reports one. Informational only.
    pub server_verdict: Option<bool>,
}

/// Outcome of comparing local bytes to the vault's recorded hash.
/// Computed fresh per call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub is_valid: bool,
    pub expected_hash: String,
    pub actual_hash: String,
    pub algorithm: HashAlgorithm,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Vault documents
// ---------------------------------------------------------------------------

/// Metadata of a document held by the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: DocumentId,
    pub title: String,
    pub file_name: String,
    pub file_type: String,
    pub document_type: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub content_hash: Option<String>,
    /// Whether the vault holds a tamper-evident hash record for the document.
    pub verified: bool,
}

/// One append-only entry of a document's server-side audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub hash: String,
    pub actor: String,
}

/// A document about to be stored in the vault.
#[derive(Clone)]
pub struct DocumentUpload {
    pub title: String,
    pub file_name: String,
    pub file_type: String,
    pub document_type: String,
    pub bytes: Vec<u8>,
    /// Text extracted by an upstream analysis step, stored alongside.
    pub extracted_text: Option<String>,
    /// Ask the vault to keep a tamper-evident hash record.
    pub secure_storage: bool,
}

impl std::fmt::Debug for DocumentUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentUpload")
            .field("title", &self.title)
            .field("file_name", &self.file_name)
            .field("file_type", &self.file_type)
            .field("document_type", &self.document_type)
            .field("len", &self.bytes.len())
            .field("secure_storage", &self.secure_storage)
            .finish()
    }
}

/// Vault operations that pass through the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Store,
    List,
    Download,
    VerifyIntegrity,
    AuditTrail,
    Delete,
    Metadata,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::List => "list",
            Self::Download => "download",
            Self::VerifyIntegrity => "verify_integrity",
            Self::AuditTrail => "audit_trail",
            Self::Delete => "delete",
            Self::Metadata => "metadata",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of errors for callers deciding whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Network blip or timeout. The same call may succeed later.
    Transient,
    /// The user must act (retry the prompt, re-enroll, fix input).
    UserAction,
    /// Retrying cannot help.
    Permanent,
}
