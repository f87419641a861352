// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests of the gated client over HTTP against a fake vault
// served by axum on a local port.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use vaultgate_bridge::{MockBridge, PromptScript};
use vaultgate_core::config::{BiometricConfig, VaultConfig};
use vaultgate_core::error::GatewayError;
use vaultgate_core::types::{DocumentId, DocumentUpload, EnrollmentOutcome, UserId};
use vaultgate_security::{AuditLog, BiometricGate, MemoryStore, SharedAuditLog};
use vaultgate_vault::{DocumentRegistry, HttpVaultApi, RequestContext, SecureVaultClient};

// ---------------------------------------------------------------------------
// Fake vault
// ---------------------------------------------------------------------------

struct StoredDoc {
    id: String,
    title: String,
    file_name: String,
    file_type: String,
    document_type: String,
    owner: String,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct Vault {
    docs: Mutex<Vec<StoredDoc>>,
    requests: AtomicUsize,
    last_identity: Mutex<Option<String>>,
    fail_list: AtomicBool,
    malformed_list: AtomicBool,
    slow_list: AtomicBool,
}

type Shared = Arc<Vault>;

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn identity(vault: &Vault, headers: &HeaderMap) -> Option<String> {
    vault.requests.fetch_add(1, Ordering::SeqCst);
    let value = headers
        .get("user-email")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    *vault.last_identity.lock().unwrap() = value.clone();
    value
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Document not found" }))).into_response()
}

fn document_json(doc: &StoredDoc) -> Value {
    // Legacy shape: display size, naive timestamp, blockchain flag.
    json!({
        "id": doc.id,
        "title": doc.title,
        "fileName": doc.file_name,
        "fileType": doc.file_type.to_uppercase(),
        "fileSize": format!("{:.1} KB", doc.bytes.len() as f64 / 1024.0),
        "sizeBytes": doc.bytes.len(),
        "createdAt": "2025-11-02T10:30:00.000001",
        "documentType": doc.document_type,
        "isBlockchainVerified": true,
        "contentHash": sha256_hex(&doc.bytes),
    })
}

async fn store(State(vault): State<Shared>, headers: HeaderMap, mut form: Multipart) -> Response {
    identity(&vault, &headers);
    let mut fields = std::collections::HashMap::new();
    let mut bytes = Vec::new();
    while let Some(field) = form.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_owned();
        let data = field.bytes().await.unwrap();
        if name == "file" {
            bytes = data.to_vec();
        } else {
            fields.insert(name, String::from_utf8(data.to_vec()).unwrap());
        }
    }

    let mut docs = vault.docs.lock().unwrap();
    let doc = StoredDoc {
        id: format!("doc_{}", docs.len() + 1),
        title: fields["title"].clone(),
        file_name: fields["file_name"].clone(),
        file_type: fields["file_type"].clone(),
        document_type: fields["document_type"].clone(),
        owner: fields["user_email"].clone(),
        bytes,
    };
    let body = json!({ "success": true, "document": document_json(&doc) });
    docs.push(doc);
    Json(body).into_response()
}

async fn list(State(vault): State<Shared>, headers: HeaderMap) -> Response {
    let user = identity(&vault, &headers).unwrap_or_default();
    if vault.slow_list.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_secs(3)).await;
    }
    if vault.fail_list.load(Ordering::SeqCst) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "Failed to get user documents: boom" })),
        )
            .into_response();
    }
    if vault.malformed_list.load(Ordering::SeqCst) {
        return Json(json!({ "success": true, "documents": [ { "id": "doc_x" } ] })).into_response();
    }
    let docs = vault.docs.lock().unwrap();
    let documents: Vec<Value> = docs
        .iter()
        .filter(|doc| doc.owner == user)
        .map(document_json)
        .collect();
    Json(json!({ "success": true, "documents": documents })).into_response()
}

async fn download(
    State(vault): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    identity(&vault, &headers);
    let docs = vault.docs.lock().unwrap();
    match docs.iter().find(|doc| doc.id == id) {
        Some(doc) => doc.bytes.clone().into_response(),
        None => not_found(),
    }
}

async fn verify(State(vault): State<Shared>, headers: HeaderMap, mut form: Multipart) -> Response {
    identity(&vault, &headers);
    let mut id = String::new();
    let mut content = Vec::new();
    while let Some(field) = form.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_owned();
        let data = field.bytes().await.unwrap();
        match name.as_str() {
            "document_id" => id = String::from_utf8(data.to_vec()).unwrap(),
            "file" => content = data.to_vec(),
            _ => {}
        }
    }

    let docs = vault.docs.lock().unwrap();
    let actual = sha256_hex(&content);
    let verification = match docs.iter().find(|doc| doc.id == id) {
        Some(doc) => {
            let expected = sha256_hex(&doc.bytes);
            json!({
                "verified": expected == actual,
                "is_valid": expected == actual,
                "expected_hash": expected,
                "actual_hash": actual,
                "algorithm": "SHA-256",
            })
        }
        None => json!({
            "verified": false,
            "is_valid": false,
            "status": "NOT_FOUND",
            "expected_hash": "N/A",
            "actual_hash": actual,
            "algorithm": "SHA-256",
        }),
    };
    Json(json!({ "success": true, "verification": verification, "document_id": id })).into_response()
}

async fn audit_trail(
    State(vault): State<Shared>,
    headers: HeaderMap,
    Json(request): Json<Value>,
) -> Response {
    identity(&vault, &headers);
    let id = request["documentId"].as_str().unwrap_or_default().to_owned();
    let docs = vault.docs.lock().unwrap();
    let Some(doc) = docs.iter().find(|doc| doc.id == id) else {
        return not_found();
    };
    let hash = sha256_hex(&doc.bytes);
    Json(json!({
        "success": true,
        "audit_trail": [
            { "type": "hash_record", "timestamp": "2025-11-02T10:30:00", "actor": doc.owner,
              "details": { "file_hash": hash } },
            { "action": "download", "timestamp": "2025-11-04T08:00:00Z", "actor": doc.owner,
              "hash": hash },
            { "type": "chain_block", "timestamp": "2025-11-03T09:00:00Z", "actor": "ledger",
              "details": { "block_hash": "00ff" } },
        ],
        "total_records": 3
    }))
    .into_response()
}

async fn remove(
    State(vault): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    identity(&vault, &headers);
    let mut docs = vault.docs.lock().unwrap();
    let before = docs.len();
    docs.retain(|doc| doc.id != id);
    if docs.len() == before {
        return not_found();
    }
    Json(json!({ "success": true, "message": "Document deleted successfully" })).into_response()
}

async fn metadata(
    State(vault): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    identity(&vault, &headers);
    let docs = vault.docs.lock().unwrap();
    match docs.iter().find(|doc| doc.id == id) {
        Some(doc) => Json(json!({ "success": true, "document": document_json(doc) })).into_response(),
        None => not_found(),
    }
}

async fn spawn_vault(vault: Shared) -> String {
    let routes = Router::new()
        .route("/store", post(store))
        .route("/list", get(list))
        .route("/download/{id}", get(download))
        .route("/verify", post(verify))
        .route("/audit-trail", post(audit_trail))
        .route("/document/{id}", delete(remove))
        .route("/document-metadata/{id}", get(metadata))
        .with_state(vault);
    let app = Router::new().nest("/mcp", routes);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/mcp")
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

struct Harness {
    vault: Shared,
    bridge: Arc<MockBridge>,
    client: Arc<SecureVaultClient<HttpVaultApi>>,
}

impl Harness {
    async fn start() -> Self {
        Self::start_with_timeout(10).await
    }

    async fn start_with_timeout(secs: u64) -> Self {
        let vault = Shared::default();
        let base_url = spawn_vault(vault.clone()).await;
        let config = VaultConfig {
            base_url,
            request_timeout_secs: secs,
            ..VaultConfig::default()
        };

        let bridge = Arc::new(MockBridge::new());
        let audit = SharedAuditLog::new(AuditLog::open_in_memory().unwrap());
        let gate = Arc::new(BiometricGate::new(
            bridge.clone(),
            Arc::new(MemoryStore::new()),
            audit.clone(),
            BiometricConfig::default(),
        ));
        let api = HttpVaultApi::new(&config).unwrap();
        let client = Arc::new(SecureVaultClient::new(api, gate, audit, 10 * 1024 * 1024));
        Self {
            vault,
            bridge,
            client,
        }
    }

    fn requests(&self) -> usize {
        self.vault.requests.load(Ordering::SeqCst)
    }
}

fn user() -> UserId {
    UserId::new("a@x.com").unwrap()
}

fn open() -> RequestContext {
    RequestContext::new(user(), false)
}

fn gated() -> RequestContext {
    RequestContext::new(user(), true)
}

fn upload(title: &str, bytes: &[u8]) -> DocumentUpload {
    DocumentUpload {
        title: title.into(),
        file_name: format!("{title}.txt"),
        file_type: "text/plain".into(),
        document_type: "Rental Agreement".into(),
        bytes: bytes.to_vec(),
        extracted_text: Some("extracted".into()),
        secure_storage: true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn store_then_verify_integrity_over_http() {
    let h = Harness::start().await;

    let doc = h.client.store(&open(), &upload("lease", b"ABC")).await.unwrap();
    assert_eq!(doc.content_hash.as_deref(), Some(sha256_hex(b"ABC").as_str()));
    assert_eq!(doc.size_bytes, 3);
    assert!(doc.verified);

    let ok = h.client.verify_integrity(&open(), &doc.id, b"ABC").await.unwrap();
    assert!(ok.is_valid);
    assert_eq!(ok.expected_hash, sha256_hex(b"ABC"));

    let bad = h.client.verify_integrity(&open(), &doc.id, b"ABD").await.unwrap();
    assert!(!bad.is_valid);
    assert_eq!(bad.actual_hash, sha256_hex(b"ABD"));
    assert_ne!(bad.actual_hash, bad.expected_hash);
}

#[tokio::test]
async fn identity_reaches_the_vault() {
    let h = Harness::start().await;
    h.client.store(&open(), &upload("lease", b"1")).await.unwrap();

    let docs = h.client.list(&open()).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].file_name, "lease.txt");
    assert_eq!(
        h.vault.last_identity.lock().unwrap().as_deref(),
        Some("a@x.com")
    );

    let other = RequestContext::new(UserId::new("b@x.com").unwrap(), false);
    assert!(h.client.list(&other).await.unwrap().is_empty());
}

#[tokio::test]
async fn download_and_metadata() {
    let h = Harness::start().await;
    let doc = h.client.store(&open(), &upload("lease", b"payload")).await.unwrap();

    let bytes = h.client.download(&open(), &doc.id).await.unwrap();
    assert_eq!(bytes, b"payload");

    let meta = h.client.metadata(&open(), &doc.id).await.unwrap();
    assert_eq!(meta.id, doc.id);
    assert_eq!(meta.document_type, "Rental Agreement");

    let missing = DocumentId::new("doc_404").unwrap();
    match h.client.download(&open(), &missing).await.unwrap_err() {
        GatewayError::Transport(message) => assert!(message.contains("Document not found")),
        other => panic!("unexpected: {other}"),
    }
}

#[tokio::test]
async fn verify_without_hash_record_is_protocol_error() {
    let h = Harness::start().await;
    let missing = DocumentId::new("doc_404").unwrap();
    assert!(matches!(
        h.client.verify_integrity(&open(), &missing, b"ABC").await,
        Err(GatewayError::Protocol(_))
    ));
}

#[tokio::test]
async fn audit_trail_sorted_newest_first() {
    let h = Harness::start().await;
    let doc = h.client.store(&open(), &upload("lease", b"ABC")).await.unwrap();

    let trail = h.client.audit_trail(&open(), &doc.id).await.unwrap();
    let actions: Vec<_> = trail.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, ["download", "chain_block", "hash_record"]);
    assert_eq!(trail[2].hash, sha256_hex(b"ABC"));
}

#[tokio::test]
async fn enrolled_user_is_verified_before_delete() {
    let h = Harness::start().await;
    assert_eq!(h.client.gate().enroll(&user()).await, EnrollmentOutcome::Success);
    let doc = h.client.store(&open(), &upload("lease", b"ABC")).await.unwrap();

    h.client.delete(&gated(), &doc.id).await.unwrap();
    assert_eq!(h.bridge.prompts_shown(), 2);
    assert!(h.client.list(&open()).await.unwrap().is_empty());
}

#[tokio::test]
async fn denied_prompt_sends_no_request() {
    let h = Harness::start().await;
    h.client.gate().enroll(&user()).await;
    let doc = h.client.store(&open(), &upload("lease", b"ABC")).await.unwrap();
    let before = h.requests();

    h.bridge.queue_answer(PromptScript::Deny);
    let err = h.client.delete(&gated(), &doc.id).await.unwrap_err();
    assert!(matches!(err, GatewayError::AuthenticationFailed));
    assert_eq!(h.requests(), before);
    assert_eq!(h.client.list(&open()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn device_change_revokes_and_blocks() {
    let h = Harness::start().await;
    h.client.gate().enroll(&user()).await;
    let doc = h.client.store(&open(), &upload("lease", b"ABC")).await.unwrap();
    let before = h.requests();

    h.bridge.set_device_id("imposter");
    let err = h.client.audit_trail(&gated(), &doc.id).await.unwrap_err();
    assert!(matches!(err, GatewayError::SecurityViolation(_)));
    assert_eq!(h.requests(), before);
    assert!(!h.client.gate().is_enabled(&user()));
}

#[tokio::test]
async fn server_error_is_transport_error() {
    let h = Harness::start().await;
    h.vault.fail_list.store(true, Ordering::SeqCst);
    match h.client.list(&open()).await.unwrap_err() {
        GatewayError::Transport(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("boom"));
        }
        other => panic!("unexpected: {other}"),
    }
    assert_eq!(h.requests(), 1);
}

#[tokio::test]
async fn incomplete_document_is_protocol_error() {
    let h = Harness::start().await;
    h.vault.malformed_list.store(true, Ordering::SeqCst);
    assert!(matches!(
        h.client.list(&open()).await,
        Err(GatewayError::Protocol(_))
    ));
}

#[tokio::test]
async fn slow_vault_times_out() {
    let h = Harness::start_with_timeout(1).await;
    h.vault.slow_list.store(true, Ordering::SeqCst);
    assert!(matches!(
        h.client.list(&open()).await,
        Err(GatewayError::Transport(_))
    ));
}

#[tokio::test]
async fn registry_over_http() {
    let h = Harness::start().await;
    h.client.store(&open(), &upload("lease", b"1")).await.unwrap();
    let loan = h.client.store(&open(), &upload("loan", b"2")).await.unwrap();

    let mut registry = DocumentRegistry::new(h.client.clone());
    registry.load_all(&open()).await.unwrap();
    assert_eq!(registry.all().len(), 2);

    registry.delete(&open(), &loan.id).await.unwrap();
    assert_eq!(registry.all().len(), 1);

    // Already gone on the server: the registry keeps what it has.
    let stale = registry.all()[0].id.clone();
    h.client.delete(&open(), &stale).await.unwrap();
    assert!(registry.delete(&open(), &stale).await.is_err());
    assert_eq!(registry.all().len(), 1);
}
