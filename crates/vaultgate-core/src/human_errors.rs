// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for presentation layers.
//
// Every technical error is mapped to plain English with a clear suggestion.
// Severity drives how loudly a front end should present the problem.

use crate::error::GatewayError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or timeout. Trying again later may work.
    Transient,
    /// User must do something (answer the prompt, re-enroll, pick another file).
    ActionRequired,
    /// Cannot be fixed by retrying.
    Permanent,
    /// Possible tampering. Must always be shown, never auto-dismissed.
    Security,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether trying the same action again can succeed.
    pub retriable: bool,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `GatewayError` into a `HumanError`.
pub fn humanize_error(err: &GatewayError) -> HumanError {
    match err {
        // -- Biometric gate --
        GatewayError::DeviceNotSupported => HumanError {
            message: "This device can't use fingerprint or face unlock.".into(),
            suggestion: "Biometric protection needs a device with a fingerprint reader or face recognition.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        GatewayError::UserCancelled => HumanError {
            message: "Verification was cancelled.".into(),
            suggestion: "Try again and confirm with your fingerprint or face when asked.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        GatewayError::AuthenticationFailed => HumanError {
            message: "We couldn't confirm it's you.".into(),
            suggestion: "Try again. Make sure your finger or face is clearly visible to the sensor.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        GatewayError::SecurityViolation(_) => HumanError {
            message: "Biometric protection was switched off for your safety.".into(),
            suggestion: "Something about this device or its secure storage changed. Set up biometric protection again from Settings.".into(),
            retriable: false,
            severity: Severity::Security,
        },

        GatewayError::NotEnrolled => HumanError {
            message: "Biometric protection isn't set up.".into(),
            suggestion: "Turn on biometric protection in Settings to use this feature.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        GatewayError::Biometric(_) => HumanError {
            message: "The fingerprint or face sensor had a problem.".into(),
            suggestion: "Try again. If this keeps happening, restart the device.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Vault --
        GatewayError::Transport(detail) => humanize_transport_error(detail),

        GatewayError::Protocol(_) => HumanError {
            message: "The document vault sent a reply we didn't understand.".into(),
            suggestion: "The app may need an update. If this keeps happening, please report it.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        GatewayError::IntegrityMismatch { .. } => HumanError {
            message: "This document has been changed since it was stored.".into(),
            suggestion: "The copy you have doesn't match the vault's record. Download the original again before relying on it.".into(),
            retriable: false,
            severity: Severity::Security,
        },

        GatewayError::InvalidInput(detail) => HumanError {
            message: "That request isn't valid.".into(),
            suggestion: format!("Check what you entered and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Local storage --
        GatewayError::Keychain(_) | GatewayError::Encryption(_) | GatewayError::Decryption(_) => {
            HumanError {
                message: "There was a problem with this device's secure storage.".into(),
                suggestion: "Turn biometric protection off and on again in Settings.".into(),
                retriable: false,
                severity: Severity::Permanent,
            }
        }

        GatewayError::Database(_) => HumanError {
            message: "The app's security log had a problem.".into(),
            suggestion: "Try closing and reopening the app.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        GatewayError::Config(detail) => HumanError {
            message: "The app's settings file couldn't be read.".into(),
            suggestion: format!("Fix or delete the settings file and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        GatewayError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The app doesn't have permission to use that file.".into(),
                    suggestion: "Check the file permissions, or copy the file somewhere else first.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your device's storage may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        GatewayError::Serialization(_) => HumanError {
            message: "The app had an internal data problem.".into(),
            suggestion: "Try again. If this keeps happening, please report it.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        GatewayError::PlatformUnavailable => HumanError {
            message: "This feature isn't available on your device.".into(),
            suggestion: "Some security features need a phone or tablet with secure hardware.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

/// Parse transport error details into human-readable messages.
fn humanize_transport_error(detail: &str) -> HumanError {
    let lower = detail.to_ascii_lowercase();

    if lower.contains("timed out") {
        HumanError {
            message: "The document vault didn't respond in time.".into(),
            suggestion: "Check your internet connection and try again.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("connection refused") || lower.contains("connect") {
        HumanError {
            message: "We couldn't reach the document vault.".into(),
            suggestion: "Check your internet connection. The vault may also be down for maintenance.".into(),
            retriable: true,
            severity: Severity::Transient,
        }
    } else if lower.contains("404") || lower.contains("not found") {
        HumanError {
            message: "That document isn't in the vault.".into(),
            suggestion: "It may have been deleted. Refresh your document list.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    } else {
        HumanError {
            message: "The document vault had a problem.".into(),
            suggestion: format!("Try again in a moment. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}
