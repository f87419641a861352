// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vault wire model.
//
// Response bodies are decoded into loosely typed `Wire*` structs first and
// then converted, with validation, into the domain types. A field the domain
// needs but the body lacks is a protocol error; nothing is defaulted.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use vaultgate_core::error::{GatewayError, Result};
use vaultgate_core::types::{
    AuditEntry, DocumentId, DocumentMetadata, HashAlgorithm, HashRecord, Operation,
};

/// Value the vault puts in `expected_hash` when it holds no record.
const NO_RECORD: &str = "N/A";

fn protocol(operation: Operation, what: impl std::fmt::Display) -> GatewayError {
    GatewayError::Protocol(format!("{operation}: {what}"))
}

fn required<T>(operation: Operation, field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| protocol(operation, format_args!("missing field '{field}'")))
}

/// Decode a JSON body, reporting malformed JSON as a protocol error.
pub fn decode<T: DeserializeOwned>(operation: Operation, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| protocol(operation, format_args!("bad JSON: {e}")))
}

/// Human-readable reason from an error body (`detail` or `message`).
pub fn error_detail(body: &[u8]) -> Option<String> {
    let status: WireStatus = serde_json::from_slice(body).ok()?;
    status.detail.or(status.message)
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Fields every JSON response may carry.
#[derive(Debug, Default, Deserialize)]
pub struct WireStatus {
    pub success: Option<bool>,
    pub detail: Option<String>,
    pub message: Option<String>,
}

impl WireStatus {
    /// `success: false` is a transport failure even with a 2xx status.
    /// When `required`, a missing flag is a protocol violation.
    pub fn check(&self, operation: Operation, required: bool) -> Result<()> {
        match self.success {
            Some(true) => Ok(()),
            Some(false) => Err(GatewayError::Transport(format!(
                "{operation}: vault reported failure: {}",
                self.detail
                    .as_deref()
                    .or(self.message.as_deref())
                    .unwrap_or("no reason given")
            ))),
            None if required => Err(protocol(operation, "missing field 'success'")),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDocument {
    pub id: Option<String>,
    pub title: Option<String>,
    #[serde(alias = "filename")]
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub document_type: Option<String>,
    pub size_bytes: Option<u64>,
    pub file_size: Option<String>,
    pub created_at: Option<String>,
    pub content_hash: Option<String>,
    #[serde(alias = "isBlockchainVerified")]
    pub verified: Option<bool>,
}

impl WireDocument {
    pub fn into_metadata(self, operation: Operation) -> Result<DocumentMetadata> {
        let id = DocumentId::new(required(operation, "id", self.id)?)
            .map_err(|e| protocol(operation, e))?;

        let size_bytes = match (self.size_bytes, self.file_size) {
            (Some(bytes), _) => bytes,
            (None, Some(display)) => parse_display_size(&display)
                .ok_or_else(|| protocol(operation, format_args!("unreadable fileSize '{display}'")))?,
            (None, None) => return Err(protocol(operation, "missing field 'sizeBytes'")),
        };

        let created_at = required(operation, "createdAt", self.created_at)?;
        let created_at = parse_timestamp(&created_at)
            .ok_or_else(|| protocol(operation, format_args!("unreadable createdAt '{created_at}'")))?;

        let content_hash = match self.content_hash {
            Some(hash) if HashAlgorithm::from_hex_len(hash.len()).is_none() || !is_hex(&hash) => {
                return Err(protocol(
                    operation,
                    format_args!("contentHash '{hash}' is not a known digest"),
                ));
            }
            other => other,
        };

        Ok(DocumentMetadata {
            id,
            title: required(operation, "title", self.title)?,
            file_name: required(operation, "fileName", self.file_name)?,
            file_type: required(operation, "fileType", self.file_type)?,
            document_type: required(operation, "documentType", self.document_type)?,
            size_bytes,
            created_at,
            content_hash,
            verified: required(operation, "verified", self.verified)?,
        })
    }
}

/// `{success, document}` from store and metadata.
#[derive(Debug, Deserialize)]
pub struct WireDocumentResponse {
    #[serde(flatten)]
    pub status: WireStatus,
    pub document: Option<WireDocument>,
}

impl WireDocumentResponse {
    pub fn into_metadata(self, operation: Operation) -> Result<DocumentMetadata> {
        self.status.check(operation, true)?;
        required(operation, "document", self.document)?.into_metadata(operation)
    }
}

/// `{success, documents}` from list.
#[derive(Debug, Deserialize)]
pub struct WireListResponse {
    #[serde(flatten)]
    pub status: WireStatus,
    pub documents: Option<Vec<WireDocument>>,
}

impl WireListResponse {
    pub fn into_documents(self) -> Result<Vec<DocumentMetadata>> {
        self.status.check(Operation::List, true)?;
        required(Operation::List, "documents", self.documents)?
            .into_iter()
            .map(|doc| doc.into_metadata(Operation::List))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct WireVerification {
    pub is_valid: Option<bool>,
    pub expected_hash: Option<String>,
    pub actual_hash: Option<String>,
    pub algorithm: Option<String>,
}

/// Verify response, either flat or nested under `verification`.
#[derive(Debug, Deserialize)]
pub struct WireVerifyResponse {
    #[serde(flatten)]
    pub status: WireStatus,
    pub verification: Option<WireVerification>,
    #[serde(flatten)]
    pub flat: WireVerification,
}

impl WireVerifyResponse {
    pub fn into_record(self) -> Result<HashRecord> {
        let op = Operation::VerifyIntegrity;
        self.status.check(op, false)?;
        let verification = self.verification.unwrap_or(self.flat);

        let algorithm = required(op, "algorithm", verification.algorithm)?;
        let algorithm = HashAlgorithm::from_name(&algorithm)
            .ok_or_else(|| protocol(op, format_args!("unknown hash algorithm '{algorithm}'")))?;

        let expected_hash = required(op, "expected_hash", verification.expected_hash)?;
        if expected_hash.is_empty() || expected_hash == NO_RECORD {
            return Err(protocol(op, "vault holds no hash record for this document"));
        }
        if expected_hash.len() != algorithm.hex_len() || !is_hex(&expected_hash) {
            return Err(protocol(
                op,
                format_args!("expected_hash is not a {algorithm} digest"),
            ));
        }

        Ok(HashRecord {
            expected_hash,
            algorithm,
            server_verdict: verification.is_valid,
        })
    }
}

// ---------------------------------------------------------------------------
// Audit trail
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAuditRequest<'a> {
    pub document_id: &'a str,
    pub identity: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct WireAuditDetails {
    pub file_hash: Option<String>,
    pub block_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireAuditEntry {
    #[serde(alias = "type")]
    pub action: Option<String>,
    pub timestamp: Option<String>,
    pub hash: Option<String>,
    pub actor: Option<String>,
    pub details: Option<WireAuditDetails>,
}

impl WireAuditEntry {
    pub fn into_entry(self) -> Result<AuditEntry> {
        let op = Operation::AuditTrail;
        let timestamp = required(op, "timestamp", self.timestamp)?;
        let timestamp = parse_timestamp(&timestamp)
            .ok_or_else(|| protocol(op, format_args!("unreadable timestamp '{timestamp}'")))?;

        let hash = self
            .hash
            .or_else(|| {
                self.details
                    .and_then(|details| details.file_hash.or(details.block_hash))
            });

        Ok(AuditEntry {
            action: required(op, "action", self.action)?,
            timestamp,
            hash: required(op, "hash", hash)?,
            actor: required(op, "actor", self.actor)?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct WireAuditResponse {
    #[serde(flatten)]
    pub status: WireStatus,
    pub audit_trail: Option<Vec<WireAuditEntry>>,
}

impl WireAuditResponse {
    pub fn into_entries(self) -> Result<Vec<AuditEntry>> {
        self.status.check(Operation::AuditTrail, true)?;
        required(Operation::AuditTrail, "audit_trail", self.audit_trail)?
            .into_iter()
            .map(WireAuditEntry::into_entry)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Field parsers
// ---------------------------------------------------------------------------

/// RFC 3339, or naive ISO-8601 read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse a display size such as `"12.3 KB"`, `"1.2 MB"` or `"512 B"`.
pub fn parse_display_size(raw: &str) -> Option<u64> {
    let mut parts = raw.split_whitespace();
    let value: f64 = parts.next()?.parse().ok()?;
    let unit = parts.next().unwrap_or("B");
    if parts.next().is_some() || !value.is_finite() || value < 0.0 {
        return None;
    }
    let multiplier = match unit.to_ascii_uppercase().as_str() {
        "B" => 1.0,
        "KB" => 1024.0,
        "MB" => 1024.0 * 1024.0,
        "GB" => 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some((value * multiplier).round() as u64)
}

fn is_hex(value: &str) -> bool {
    value.bytes().all(|b| b.is_ascii_hexdigit())
}
