// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! vaultgate-vault — the remote half of the gateway.
//!
//! [`SecureVaultClient`] runs every vault operation through the biometric
//! gate when the request asks for verification, then performs exactly one
//! request against a [`VaultApi`]. [`HttpVaultApi`] is the HTTP transport;
//! [`DocumentRegistry`] is the client-side view of the user's documents.

pub mod client;
pub mod http;
pub mod multipart;
pub mod registry;
pub mod transport;
pub mod wire;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{RequestContext, SecureVaultClient};
pub use http::HttpVaultApi;
pub use registry::{DocumentRegistry, SortMode, format_size};
pub use transport::{VaultApi, VaultHashRecords};
