// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Vaultgate.

use thiserror::Error;

use crate::types::ErrorClass;

/// Top-level error type for all Vaultgate operations.
///
/// Expected outcomes of the biometric and integrity protocols (a denied
/// prompt, a missing enrollment, a hash mismatch during verification) are
/// modelled as result values elsewhere. The variants here are what a gated
/// operation aborts with.
#[derive(Debug, Error)]
pub enum GatewayError {
    // -- Biometric gate --
    #[error("biometric hardware is not available on this device")]
    DeviceNotSupported,

    #[error("biometric prompt was cancelled by the user")]
    UserCancelled,

    #[error("biometric authentication failed")]
    AuthenticationFailed,

    #[error("security violation: {0}")]
    SecurityViolation(String),

    #[error("no biometric enrollment for this identity")]
    NotEnrolled,

    #[error("biometric subsystem error: {0}")]
    Biometric(String),

    // -- Vault --
    #[error("vault request failed: {0}")]
    Transport(String),

    #[error("vault response violated the protocol: {0}")]
    Protocol(String),

    #[error("integrity check failed for {document}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        document: String,
        expected: String,
        actual: String,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- Local storage --
    #[error("secure storage error: {0}")]
    Keychain(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

impl GatewayError {
    /// Retryability of this error from the caller's point of view.
    ///
    /// The gateway itself never retries; this only tells the caller whether
    /// issuing the same call again can succeed.
    pub fn class(&self) -> ErrorClass {
        match self {
            GatewayError::Transport(_) | GatewayError::Database(_) | GatewayError::Io(_) => {
                ErrorClass::Transient
            }

            GatewayError::UserCancelled
            | GatewayError::AuthenticationFailed
            | GatewayError::NotEnrolled
            | GatewayError::InvalidInput(_)
            | GatewayError::Config(_) => ErrorClass::UserAction,

            GatewayError::DeviceNotSupported
            | GatewayError::SecurityViolation(_)
            | GatewayError::Biometric(_)
            | GatewayError::Protocol(_)
            | GatewayError::IntegrityMismatch { .. }
            | GatewayError::Keychain(_)
            | GatewayError::Encryption(_)
            | GatewayError::Decryption(_)
            | GatewayError::Serialization(_)
            | GatewayError::PlatformUnavailable => ErrorClass::Permanent,
        }
    }

    /// Whether this error means the device binding was torn down.
    pub fn is_security_violation(&self) -> bool {
        matches!(self, GatewayError::SecurityViolation(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GatewayError>;
