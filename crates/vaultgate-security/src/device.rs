// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device fingerprint — binds an enrollment to one physical device.

use sha2::{Digest, Sha256};
use vaultgate_bridge::DeviceIdentifiers;

const FINGERPRINT_DOMAIN: &[u8] = b"vaultgate:device:v1";

/// Hash the device identifiers into a lowercase hex fingerprint.
///
/// Fields are length-prefixed so that moving characters between fields
/// changes the fingerprint.
pub fn device_fingerprint(ids: &DeviceIdentifiers) -> String {
    let mut hasher = Sha256::new();
    hasher.update(FINGERPRINT_DOMAIN);
    for field in [&ids.platform, &ids.device_id, &ids.model] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    hex::encode(hasher.finalize())
}
