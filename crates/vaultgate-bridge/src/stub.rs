// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub bridge for desktop/CI builds where native mobile APIs are unavailable.
//
// There is no biometric sensor and no keychain. Device identifiers come from
// the machine id and host name so the desktop still has a stable identity.

use vaultgate_core::error::{GatewayError, Result};
use vaultgate_core::types::Capability;

use crate::traits::*;

const MACHINE_ID_PATHS: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];

/// Bridge returned on non-mobile platforms.
pub struct StubBridge;

impl PlatformBridge for StubBridge {
    fn platform_name(&self) -> &str {
        "Desktop (stub)"
    }
}

impl NativeBiometric for StubBridge {
    fn biometric_capability(&self) -> Capability {
        Capability::None
    }

    fn prompt_biometric(&self, _reason: &str) -> Result<bool> {
        tracing::warn!("NativeBiometric::prompt_biometric called on stub bridge");
        Err(GatewayError::PlatformUnavailable)
    }
}

impl NativeKeychain for StubBridge {
    fn store_secret(&self, _key: &str, _value: &[u8]) -> Result<()> {
        tracing::warn!("NativeKeychain::store_secret called on stub bridge");
        Err(GatewayError::PlatformUnavailable)
    }

    fn load_secret(&self, _key: &str) -> Result<Option<Vec<u8>>> {
        tracing::warn!("NativeKeychain::load_secret called on stub bridge");
        Err(GatewayError::PlatformUnavailable)
    }

    fn delete_secret(&self, _key: &str) -> Result<()> {
        Err(GatewayError::PlatformUnavailable)
    }
}

impl NativeDeviceInfo for StubBridge {
    fn device_identifiers(&self) -> Result<DeviceIdentifiers> {
        let device_id = MACHINE_ID_PATHS
            .iter()
            .filter_map(|path| std::fs::read_to_string(path).ok())
            .map(|id| id.trim().to_owned())
            .find(|id| !id.is_empty())
            .ok_or(GatewayError::PlatformUnavailable)?;

        let model = std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
            .map(|name| name.trim().to_owned())
            .unwrap_or_default();

        Ok(DeviceIdentifiers {
            platform: std::env::consts::OS.to_owned(),
            device_id,
            model,
        })
    }
}
