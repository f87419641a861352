// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Vaultgate — native platform bridge abstractions.
//!
//! The security core never talks to the biometric sensor, the platform
//! keychain or the device identity APIs directly. It goes through the
//! traits in [`traits`], implemented per target OS.

pub mod mock;
pub mod stub;
pub mod traits;

use std::sync::Arc;

pub use mock::{MockBridge, PromptScript};
pub use stub::StubBridge;
pub use traits::{
    DeviceIdentifiers, NativeBiometric, NativeDeviceInfo, NativeKeychain, PlatformBridge,
};

/// Returns the bridge implementation for the target operating system.
///
/// Only the desktop stub ships in this crate; mobile shells inject their own
/// `PlatformBridge` through the service layer.
pub fn platform_bridge() -> Arc<dyn PlatformBridge> {
    Arc::new(stub::StubBridge)
}
