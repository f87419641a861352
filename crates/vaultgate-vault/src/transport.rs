// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport seam between the gated client and the remote vault.

use std::future::Future;

use vaultgate_core::error::Result;
use vaultgate_core::types::{
    AuditEntry, DocumentId, DocumentMetadata, DocumentUpload, HashRecord, UserId,
};
use vaultgate_security::HashRecordSource;

/// One method per vault endpoint.
///
/// Every call is a single request/response exchange. Implementations never
/// retry; any failure aborts the call with no partial effect assumed.
pub trait VaultApi: Send + Sync {
    fn store(
        &self,
        identity: &UserId,
        upload: &DocumentUpload,
    ) -> impl Future<Output = Result<DocumentMetadata>> + Send;

    fn list(&self, identity: &UserId) -> impl Future<Output = Result<Vec<DocumentMetadata>>> + Send;

    fn download(
        &self,
        identity: &UserId,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Ask the vault for its recorded hash of `id`, sending the candidate
    /// content along.
    fn verify(
        &self,
        identity: &UserId,
        id: &DocumentId,
        content: &[u8],
    ) -> impl Future<Output = Result<HashRecord>> + Send;

    fn audit_trail(
        &self,
        identity: &UserId,
        id: &DocumentId,
    ) -> impl Future<Output = Result<Vec<AuditEntry>>> + Send;

    fn delete(&self, identity: &UserId, id: &DocumentId) -> impl Future<Output = Result<()>> + Send;

    fn metadata(
        &self,
        identity: &UserId,
        id: &DocumentId,
    ) -> impl Future<Output = Result<DocumentMetadata>> + Send;
}

/// The vault's verify endpoint seen as a hash-record source for one caller.
pub struct VaultHashRecords<'a, A> {
    api: &'a A,
    identity: &'a UserId,
}

impl<'a, A: VaultApi> VaultHashRecords<'a, A> {
    pub fn new(api: &'a A, identity: &'a UserId) -> Self {
        Self { api, identity }
    }
}

impl<A: VaultApi> HashRecordSource for VaultHashRecords<'_, A> {
    async fn hash_record(&self, document_id: &DocumentId, content: &[u8]) -> Result<HashRecord> {
        self.api.verify(self.identity, document_id, content).await
    }
}
