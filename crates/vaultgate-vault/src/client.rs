// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gated vault client.
//
// Every operation takes a `RequestContext` naming the caller and whether the
// call must pass biometric verification. When it must, and the caller has an
// enabled enrollment, the gate decides before any request is sent:
//
//   Success | NotEnrolled  -> proceed
//   Failed                 -> AuthenticationFailed
//   SecurityError          -> SecurityViolation (enrollment already revoked)
//   Error                  -> Biometric
//
// Callers without an enrollment are never prompted.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use vaultgate_core::config::PolicyConfig;
use vaultgate_core::error::{GatewayError, Result};
use vaultgate_core::types::{
    AuditEntry, DocumentId, DocumentMetadata, DocumentUpload, HashAlgorithm, Operation, UserId,
    VerificationOutcome, VerificationResult,
};
use vaultgate_security::audit::actions;
use vaultgate_security::{BiometricGate, IntegrityVerifier, SharedAuditLog, verify_hash};

use crate::transport::{VaultApi, VaultHashRecords};

/// Who is calling and whether the call needs a biometric check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub identity: UserId,
    pub require_verification: bool,
}

impl RequestContext {
    pub fn new(identity: UserId, require_verification: bool) -> Self {
        Self {
            identity,
            require_verification,
        }
    }

    /// Context carrying the policy default for `operation`.
    pub fn for_operation(identity: UserId, policy: &PolicyConfig, operation: Operation) -> Self {
        Self::new(identity, policy.requires_verification(operation))
    }

    /// Same caller, verification required.
    pub fn escalated(self) -> Self {
        Self {
            require_verification: true,
            ..self
        }
    }
}

/// Vault client that enforces the biometric gate.
pub struct SecureVaultClient<A> {
    api: A,
    gate: Arc<BiometricGate>,
    verifier: IntegrityVerifier,
    audit: SharedAuditLog,
    max_upload_bytes: u64,
}

impl<A: VaultApi> SecureVaultClient<A> {
    pub fn new(api: A, gate: Arc<BiometricGate>, audit: SharedAuditLog, max_upload_bytes: u64) -> Self {
        Self {
            api,
            gate,
            verifier: IntegrityVerifier::new(),
            audit,
            max_upload_bytes,
        }
    }

    pub fn gate(&self) -> &BiometricGate {
        &self.gate
    }

    /// Run the gate for `ctx`. `Ok` means the vault call may go ahead.
    #[instrument(skip(self), fields(user = %ctx.identity, require = ctx.require_verification))]
    pub async fn authorize(&self, ctx: &RequestContext, operation: Operation) -> Result<()> {
        if !ctx.require_verification {
            return Ok(());
        }
        // A storage fault here must not read as "not enrolled".
        if !self.gate.try_is_enabled(&ctx.identity)? {
            debug!("no biometric enrollment, proceeding without prompt");
            return Ok(());
        }

        match self.gate.verify(&ctx.identity).await {
            VerificationOutcome::Success | VerificationOutcome::NotEnrolled => Ok(()),
            VerificationOutcome::Failed => {
                warn!("biometric check failed, operation refused");
                Err(GatewayError::AuthenticationFailed)
            }
            VerificationOutcome::SecurityError(reason) => {
                warn!(%reason, "security violation, operation refused");
                Err(GatewayError::SecurityViolation(reason))
            }
            VerificationOutcome::Error(reason) => Err(GatewayError::Biometric(reason)),
        }
    }

    /// Upload a document. The vault's reported content hash must match the
    /// bytes sent.
    #[instrument(skip(self, upload), fields(user = %ctx.identity, file_name = %upload.file_name))]
    pub async fn store(&self, ctx: &RequestContext, upload: &DocumentUpload) -> Result<DocumentMetadata> {
        if upload.bytes.len() as u64 > self.max_upload_bytes {
            return Err(GatewayError::InvalidInput(format!(
                "document is {} bytes, the limit is {}",
                upload.bytes.len(),
                self.max_upload_bytes
            )));
        }
        if upload.file_name.trim().is_empty() {
            return Err(GatewayError::InvalidInput("file name must not be empty".into()));
        }

        self.authorize(ctx, Operation::Store).await?;
        let document = self.api.store(&ctx.identity, upload).await?;

        if let Some(reported) = &document.content_hash {
            let algorithm =
                HashAlgorithm::from_hex_len(reported.len()).unwrap_or(HashAlgorithm::Sha256);
            if let Err(err) = verify_hash(&document.id, algorithm, &upload.bytes, reported) {
                warn!(id = %document.id, %reported, "vault recorded a different hash than was uploaded");
                let details = format!(
                    "hash reported on store for {} differs from uploaded content",
                    document.id
                );
                self.audit.record(
                    actions::INTEGRITY_MISMATCH,
                    document.id.as_str(),
                    false,
                    Some(&details),
                );
                return Err(err);
            }
        }

        info!(id = %document.id, "document stored");
        Ok(document)
    }

    #[instrument(skip(self), fields(user = %ctx.identity))]
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<DocumentMetadata>> {
        self.authorize(ctx, Operation::List).await?;
        self.api.list(&ctx.identity).await
    }

    #[instrument(skip(self), fields(user = %ctx.identity, %id))]
    pub async fn download(&self, ctx: &RequestContext, id: &DocumentId) -> Result<Vec<u8>> {
        self.authorize(ctx, Operation::Download).await?;
        self.api.download(&ctx.identity, id).await
    }

    /// Compare local bytes with the vault's record. A mismatch is a result
    /// with `is_valid == false`, recorded in the local audit log.
    #[instrument(skip(self, local_bytes), fields(user = %ctx.identity, %id))]
    pub async fn verify_integrity(
        &self,
        ctx: &RequestContext,
        id: &DocumentId,
        local_bytes: &[u8],
    ) -> Result<VerificationResult> {
        self.authorize(ctx, Operation::VerifyIntegrity).await?;
        let source = VaultHashRecords::new(&self.api, &ctx.identity);
        let result = self.verifier.verify(&source, id, local_bytes).await?;

        if !result.is_valid {
            self.audit.record(
                actions::INTEGRITY_MISMATCH,
                id.as_str(),
                false,
                Some(&format!(
                    "expected {} got {}",
                    result.expected_hash, result.actual_hash
                )),
            );
        }
        Ok(result)
    }

    /// The document's audit trail, most recent first.
    #[instrument(skip(self), fields(user = %ctx.identity, %id))]
    pub async fn audit_trail(&self, ctx: &RequestContext, id: &DocumentId) -> Result<Vec<AuditEntry>> {
        self.authorize(ctx, Operation::AuditTrail).await?;
        let mut entries = self.api.audit_trail(&ctx.identity, id).await?;
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }

    #[instrument(skip(self), fields(user = %ctx.identity, %id))]
    pub async fn delete(&self, ctx: &RequestContext, id: &DocumentId) -> Result<()> {
        self.authorize(ctx, Operation::Delete).await?;
        self.api.delete(&ctx.identity, id).await?;
        info!("document deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(user = %ctx.identity, %id))]
    pub async fn metadata(&self, ctx: &RequestContext, id: &DocumentId) -> Result<DocumentMetadata> {
        self.authorize(ctx, Operation::Metadata).await?;
        self.api.metadata(&ctx.identity, id).await
    }
}
