// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory `VaultApi` for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use vaultgate_core::error::{GatewayError, Result};
use vaultgate_core::types::{
    AuditEntry, DocumentId, DocumentMetadata, DocumentUpload, HashAlgorithm, HashRecord, UserId,
};
use vaultgate_security::hash_bytes;

use crate::transport::VaultApi;

#[derive(Default)]
struct FakeState {
    documents: Vec<(DocumentMetadata, Vec<u8>)>,
    trails: HashMap<String, Vec<AuditEntry>>,
    calls: usize,
    failing: bool,
    reported_hash: Option<String>,
    next_id: usize,
}

#[derive(Clone, Default)]
pub struct FakeVault {
    state: Arc<Mutex<FakeState>>,
}

impl FakeVault {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Requests received so far.
    pub fn calls(&self) -> usize {
        self.state().calls
    }

    /// Make every following request fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.state().failing = failing;
    }

    /// Report this content hash on the next stores instead of the real one.
    pub fn report_hash(&self, hash: &str) {
        self.state().reported_hash = Some(hash.to_owned());
    }

    pub fn set_trail(&self, id: &str, entries: Vec<AuditEntry>) {
        self.state().trails.insert(id.to_owned(), entries);
    }

    pub fn seed(&self, title: &str, document_type: &str, bytes: &[u8]) -> DocumentMetadata {
        let mut state = self.state();
        state.next_id += 1;
        let metadata = DocumentMetadata {
            id: DocumentId::new(format!("doc_{}", state.next_id)).unwrap(),
            title: title.to_owned(),
            file_name: format!("{title}.pdf"),
            file_type: "PDF".into(),
            document_type: document_type.to_owned(),
            size_bytes: bytes.len() as u64,
            created_at: Utc::now(),
            content_hash: Some(hash_bytes(bytes)),
            verified: true,
        };
        state.documents.push((metadata.clone(), bytes.to_vec()));
        metadata
    }

    fn begin(&self) -> Result<MutexGuard<'_, FakeState>> {
        let mut state = self.state();
        state.calls += 1;
        if state.failing {
            return Err(GatewayError::Transport("HTTP 500: fake vault down".into()));
        }
        Ok(state)
    }

    fn find(state: &FakeState, id: &DocumentId) -> Result<(DocumentMetadata, Vec<u8>)> {
        state
            .documents
            .iter()
            .find(|(meta, _)| &meta.id == id)
            .cloned()
            .ok_or_else(|| GatewayError::Transport("HTTP 404: Document not found".into()))
    }
}

impl VaultApi for FakeVault {
    async fn store(&self, _identity: &UserId, upload: &DocumentUpload) -> Result<DocumentMetadata> {
        let mut state = self.begin()?;
        state.next_id += 1;
        let metadata = DocumentMetadata {
            id: DocumentId::new(format!("doc_{}", state.next_id))?,
            title: upload.title.clone(),
            file_name: upload.file_name.clone(),
            file_type: upload.file_type.clone(),
            document_type: upload.document_type.clone(),
            size_bytes: upload.bytes.len() as u64,
            created_at: Utc::now(),
            content_hash: Some(
                state
                    .reported_hash
                    .clone()
                    .unwrap_or_else(|| hash_bytes(&upload.bytes)),
            ),
            verified: upload.secure_storage,
        };
        state.documents.push((metadata.clone(), upload.bytes.clone()));
        Ok(metadata)
    }

    async fn list(&self, _identity: &UserId) -> Result<Vec<DocumentMetadata>> {
        let state = self.begin()?;
        Ok(state.documents.iter().map(|(meta, _)| meta.clone()).collect())
    }

    async fn download(&self, _identity: &UserId, id: &DocumentId) -> Result<Vec<u8>> {
        let state = self.begin()?;
        Ok(Self::find(&state, id)?.1)
    }

    async fn verify(&self, _identity: &UserId, id: &DocumentId, content: &[u8]) -> Result<HashRecord> {
        let state = self.begin()?;
        let (_, stored) = Self::find(&state, id)?;
        let expected_hash = hash_bytes(&stored);
        Ok(HashRecord {
            server_verdict: Some(expected_hash == hash_bytes(content)),
            expected_hash,
            algorithm: HashAlgorithm::Sha256,
        })
    }

    async fn audit_trail(&self, _identity: &UserId, id: &DocumentId) -> Result<Vec<AuditEntry>> {
        let state = self.begin()?;
        Ok(state.trails.get(id.as_str()).cloned().unwrap_or_default())
    }

    async fn delete(&self, _identity: &UserId, id: &DocumentId) -> Result<()> {
        let mut state = self.begin()?;
        let before = state.documents.len();
        state.documents.retain(|(meta, _)| &meta.id != id);
        if state.documents.len() == before {
            return Err(GatewayError::Transport("HTTP 404: Document not found".into()));
        }
        Ok(())
    }

    async fn metadata(&self, _identity: &UserId, id: &DocumentId) -> Result<DocumentMetadata> {
        let state = self.begin()?;
        Ok(Self::find(&state, id)?.0)
    }
}
