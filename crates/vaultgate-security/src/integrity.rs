// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document integrity — content hashing and comparison against the hash the
// vault recorded when the document was stored.

use std::future::Future;

use chrono::Utc;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tracing::{debug, instrument, warn};
use vaultgate_core::error::{GatewayError, Result};
use vaultgate_core::types::{DocumentId, HashAlgorithm, HashRecord, VerificationResult};

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    hash_with(HashAlgorithm::Sha256, data)
}

/// Hash `data` with `algorithm`, lowercase hex.
pub fn hash_with(algorithm: HashAlgorithm, data: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => hex::encode(Sha256::digest(data)),
        HashAlgorithm::Sha384 => hex::encode(Sha384::digest(data)),
        HashAlgorithm::Sha512 => hex::encode(Sha512::digest(data)),
    }
}

/// Compare two hex digests, ignoring ASCII case.
///
/// Lengths are checked first; equal-length inputs are compared without an
/// early exit so the comparison time does not depend on where they differ.
pub fn digests_match(expected: &str, actual: &str) -> bool {
    let (a, b) = (expected.as_bytes(), actual.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b)
        .fold(0u8, |acc, (x, y)| {
            acc | (x.to_ascii_lowercase() ^ y.to_ascii_lowercase())
        })
        == 0
}

/// Verify that `data` hashes to `expected_hex` under `algorithm`.
///
/// Returns `Err(GatewayError::IntegrityMismatch)` naming `document` with the
/// expected and actual values when it does not.
pub fn verify_hash(
    document: &DocumentId,
    algorithm: HashAlgorithm,
    data: &[u8],
    expected_hex: &str,
) -> Result<()> {
    let actual = hash_with(algorithm, data);
    if digests_match(expected_hex, &actual) {
        Ok(())
    } else {
        Err(GatewayError::IntegrityMismatch {
            document: document.to_string(),
            expected: expected_hex.to_owned(),
            actual,
        })
    }
}

/// Where the vault's recorded hash for a document comes from.
///
/// The vault's verification endpoint takes the candidate content along with
/// the id, so the bytes are passed through.
pub trait HashRecordSource: Send + Sync {
    fn hash_record(
        &self,
        document_id: &DocumentId,
        content: &[u8],
    ) -> impl Future<Output = Result<HashRecord>> + Send;
}

/// Detects whether a locally held document still matches the vault's record.
///
/// Stateless: every call fetches the record, hashes the bytes and compares.
/// A mismatch is an ordinary `is_valid = false` result, not an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityVerifier;

impl IntegrityVerifier {
    pub fn new() -> Self {
        Self
    }

    /// Fetch the recorded hash for `document_id` and compare it to
    /// `local_bytes`.
    #[instrument(skip(self, source, local_bytes), fields(%document_id, len = local_bytes.len()))]
    pub async fn verify<S: HashRecordSource>(
        &self,
        source: &S,
        document_id: &DocumentId,
        local_bytes: &[u8],
    ) -> Result<VerificationResult> {
        let record = source.hash_record(document_id, local_bytes).await?;
        let result = self.compare(&record, local_bytes);

        if record.server_verdict.is_some_and(|server_says| server_says != result.is_valid) {
            warn!(
                server_says = ?record.server_verdict,
                local = result.is_valid,
                "vault verdict disagrees with local hash comparison"
            );
        }
        if !result.is_valid {
            warn!(expected = %result.expected_hash, actual = %result.actual_hash, "content does not match recorded hash");
        }
        Ok(result)
    }

    /// Compare `local_bytes` against an already fetched record.
    pub fn compare(&self, record: &HashRecord, local_bytes: &[u8]) -> VerificationResult {
        let actual_hash = hash_with(record.algorithm, local_bytes);
        let is_valid = digests_match(&record.expected_hash, &actual_hash);
        debug!(algorithm = %record.algorithm, is_valid, "hash comparison done");

        VerificationResult {
            is_valid,
            expected_hash: record.expected_hash.clone(),
            actual_hash,
            algorithm: record.algorithm,
            timestamp: Utc::now(),
        }
    }
}
