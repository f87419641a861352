// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for native capabilities.
//
// The gateway depends on three collaborators it cannot implement portably:
// the biometric sensor prompt, encrypted key-value storage and stable device
// identifiers. Each is a trait; platforms without a capability return
// `GatewayError::PlatformUnavailable`.

use vaultgate_core::error::Result;
use vaultgate_core::types::Capability;

/// Unified bridge that groups all native capabilities the gateway needs.
pub trait PlatformBridge: NativeBiometric + NativeKeychain + NativeDeviceInfo + Send + Sync {
    /// Human-readable platform name (e.g. "iOS 17", "Android 14").
    fn platform_name(&self) -> &str;
}

/// Biometric sensor access.
pub trait NativeBiometric {
    /// Whether the device has usable biometric hardware with at least one
    /// enrolled finger or face. Must not prompt the user.
    fn biometric_capability(&self) -> Capability;

    /// Show the system biometric prompt with `reason` and block until the
    /// user answers.
    ///
    /// Returns `Ok(true)` when the user authenticated, `Ok(false)` when they
    /// denied, cancelled or failed the match.
    fn prompt_biometric(&self, reason: &str) -> Result<bool>;
}

/// Secure key storage in the platform keychain / keystore.
pub trait NativeKeychain {
    /// Store a secret under the given key, replacing any previous value.
    fn store_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret by key. Returns None if not found.
    fn load_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret by key. Deleting a missing key succeeds.
    fn delete_secret(&self, key: &str) -> Result<()>;
}

/// Stable identifiers of the physical device.
pub trait NativeDeviceInfo {
    /// Identifiers that stay the same across app restarts on this device and
    /// differ between devices.
    fn device_identifiers(&self) -> Result<DeviceIdentifiers>;
}

/// Raw device identifiers, hashed into a device fingerprint by the
/// security crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentifiers {
    /// Operating system family (e.g. "android", "ios", "linux").
    pub platform: String,
    /// Platform device identifier (Android ID, identifierForVendor, machine-id).
    pub device_id: String,
    /// Hardware model or host name.
    pub model: String,
}
