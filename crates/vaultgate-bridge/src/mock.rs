// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scriptable in-memory bridge for tests and headless runs.
//
// Prompt answers are queued ahead of time; when the queue is empty the
// default answer is used. The keychain is a plain map that tests can
// inspect and corrupt directly.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use vaultgate_core::error::{GatewayError, Result};
use vaultgate_core::types::Capability;

use crate::traits::*;

/// A scripted answer to the next biometric prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptScript {
    Grant,
    Deny,
    /// The sensor itself fails.
    Fault,
}

struct MockState {
    capability: Capability,
    queued: VecDeque<PromptScript>,
    prompts_shown: usize,
    device: DeviceIdentifiers,
    keychain: HashMap<String, Vec<u8>>,
    keychain_offline: bool,
}

/// In-memory `PlatformBridge`.
pub struct MockBridge {
    state: Mutex<MockState>,
}

impl MockBridge {
    /// A device with biometric hardware that grants every prompt.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                capability: Capability::Available,
                queued: VecDeque::new(),
                prompts_shown: 0,
                device: DeviceIdentifiers {
                    platform: "mock".into(),
                    device_id: "mock-device-0001".into(),
                    model: "Mockphone 1".into(),
                },
                keychain: HashMap::new(),
                keychain_offline: false,
            }),
        }
    }

    /// A device without biometric hardware.
    pub fn without_biometrics() -> Self {
        let bridge = Self::new();
        bridge.set_capability(Capability::None);
        bridge
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_capability(&self, capability: Capability) {
        self.state().capability = capability;
    }

    /// Queue an answer for the next prompt.
    pub fn queue_answer(&self, answer: PromptScript) {
        self.state().queued.push_back(answer);
    }

    /// Number of prompts shown so far.
    pub fn prompts_shown(&self) -> usize {
        self.state().prompts_shown
    }

    /// Pretend the app now runs on a different physical device.
    pub fn set_device_id(&self, device_id: impl Into<String>) {
        self.state().device.device_id = device_id.into();
    }

    /// Make every keychain call fail, as when the keystore is locked.
    pub fn set_keychain_offline(&self, offline: bool) {
        self.state().keychain_offline = offline;
    }

    /// Raw keychain value, bypassing the offline switch.
    pub fn raw_secret(&self, key: &str) -> Option<Vec<u8>> {
        self.state().keychain.get(key).cloned()
    }

    /// Overwrite a keychain value directly, bypassing the offline switch.
    pub fn tamper_secret(&self, key: &str, value: &[u8]) {
        self.state().keychain.insert(key.to_owned(), value.to_vec());
    }

    /// Number of keys currently held.
    pub fn secret_count(&self) -> usize {
        self.state().keychain.len()
    }
}

impl Default for MockBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for MockBridge {
    fn platform_name(&self) -> &str {
        "Mock"
    }
}

impl NativeBiometric for MockBridge {
    fn biometric_capability(&self) -> Capability {
        self.state().capability
    }

    fn prompt_biometric(&self, reason: &str) -> Result<bool> {
        let mut state = self.state();
        state.prompts_shown += 1;
        let answer = state.queued.pop_front().unwrap_or(PromptScript::Grant);
        tracing::debug!(reason, ?answer, "mock biometric prompt");
        match answer {
            PromptScript::Grant => Ok(true),
            PromptScript::Deny => Ok(false),
            PromptScript::Fault => Err(GatewayError::Biometric("mock sensor fault".into())),
        }
    }
}

impl NativeKeychain for MockBridge {
    fn store_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut state = self.state();
        if state.keychain_offline {
            return Err(GatewayError::Keychain("mock keychain offline".into()));
        }
        state.keychain.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn load_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let state = self.state();
        if state.keychain_offline {
            return Err(GatewayError::Keychain("mock keychain offline".into()));
        }
        Ok(state.keychain.get(key).cloned())
    }

    fn delete_secret(&self, key: &str) -> Result<()> {
        let mut state = self.state();
        if state.keychain_offline {
            return Err(GatewayError::Keychain("mock keychain offline".into()));
        }
        state.keychain.remove(key);
        Ok(())
    }
}

impl NativeDeviceInfo for MockBridge {
    fn device_identifiers(&self) -> Result<DeviceIdentifiers> {
        Ok(self.state().device.clone())
    }
}
