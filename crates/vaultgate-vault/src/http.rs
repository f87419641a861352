// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP transport for the vault API.
//
// Endpoints, relative to the configured base URL:
//   POST   /store                    multipart upload
//   GET    /list
//   GET    /download/{id}            raw bytes
//   POST   /verify                   multipart: file + document_id
//   POST   /audit-trail              JSON {documentId, identity}
//   DELETE /document/{id}
//   GET    /document-metadata/{id}
//
// The identity travels in the configured header on every request and as a
// form field or body field where the endpoint expects one.

use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, error, info, instrument};
use vaultgate_core::config::VaultConfig;
use vaultgate_core::error::{GatewayError, Result};
use vaultgate_core::types::{
    AuditEntry, DocumentId, DocumentMetadata, DocumentUpload, HashRecord, Operation, UserId,
};

use crate::multipart::MultipartForm;
use crate::transport::VaultApi;
use crate::wire::{
    self, WireAuditRequest, WireAuditResponse, WireDocumentResponse, WireListResponse, WireStatus,
    WireVerifyResponse,
};

/// `VaultApi` over HTTP/1.1.
///
/// Each call is one request with its own timeout covering the whole
/// exchange, body included. Nothing is retried.
pub struct HttpVaultApi {
    client: Client<HttpConnector, Full<Bytes>>,
    base_url: String,
    identity_header: HeaderName,
    timeout: Duration,
}

impl HttpVaultApi {
    pub fn new(config: &VaultConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_owned();
        let uri: Uri = base_url
            .parse()
            .map_err(|e| GatewayError::Config(format!("invalid vault URL '{base_url}': {e}")))?;
        if uri.scheme_str() != Some("http") {
            return Err(GatewayError::Config(format!(
                "vault URL '{base_url}' must use http://"
            )));
        }

        let identity_header = HeaderName::from_bytes(config.identity_header.as_bytes())
            .map_err(|e| {
                GatewayError::Config(format!(
                    "invalid identity header '{}': {e}",
                    config.identity_header
                ))
            })?;

        let client = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self {
            client,
            base_url,
            identity_header,
            timeout: config.request_timeout(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        identity: &UserId,
    ) -> Result<hyper::http::request::Builder> {
        let identity_value = HeaderValue::from_str(identity.as_str()).map_err(|_| {
            GatewayError::InvalidInput(format!(
                "identity '{identity}' cannot be sent in an HTTP header"
            ))
        })?;
        Ok(Request::builder()
            .method(method)
            .uri(format!("{}{path}", self.base_url))
            .header(self.identity_header.clone(), identity_value))
    }

    /// Send one request and collect the body. Non-2xx statuses become
    /// transport errors carrying the vault's reason when it gives one.
    async fn exchange(
        &self,
        operation: Operation,
        builder: hyper::http::request::Builder,
        body: Vec<u8>,
    ) -> Result<Bytes> {
        let request = builder
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| GatewayError::InvalidInput(format!("{operation}: {e}")))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| GatewayError::Transport(format!("{operation}: {e}")))?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| GatewayError::Transport(format!("{operation}: reading body: {e}")))?
                .to_bytes();
            Ok::<(StatusCode, Bytes), GatewayError>((status, body))
        };

        let (status, body) = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                GatewayError::Transport(format!(
                    "{operation}: no response within {}s",
                    self.timeout.as_secs()
                ))
            })??;

        if !status.is_success() {
            let reason = wire::error_detail(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_owned());
            error!(%operation, %status, %reason, "vault request failed");
            return Err(GatewayError::Transport(format!(
                "{operation}: HTTP {}: {reason}",
                status.as_u16()
            )));
        }

        debug!(%operation, %status, len = body.len(), "vault responded");
        Ok(body)
    }
}

impl VaultApi for HttpVaultApi {
    #[instrument(skip(self, upload), fields(%identity, file_name = %upload.file_name))]
    async fn store(&self, identity: &UserId, upload: &DocumentUpload) -> Result<DocumentMetadata> {
        let mut form = MultipartForm::new()
            .file("file", &upload.file_name, &upload.file_type, &upload.bytes)
            .text("user_email", identity.as_str())
            .text("file_name", &upload.file_name)
            .text("file_type", &upload.file_type)
            .text("document_type", &upload.document_type)
            .text("title", &upload.title)
            .text(
                "enable_secure_storage",
                if upload.secure_storage { "true" } else { "false" },
            );
        if let Some(text) = &upload.extracted_text {
            form = form.text("extracted_text", text);
        }
        let content_type = form.content_type();

        let builder = self
            .request(Method::POST, "/store", identity)?
            .header(CONTENT_TYPE, content_type);
        let body = self.exchange(Operation::Store, builder, form.finish()).await?;

        let document = wire::decode::<WireDocumentResponse>(Operation::Store, &body)?
            .into_metadata(Operation::Store)?;
        info!(id = %document.id, "document stored");
        Ok(document)
    }

    #[instrument(skip(self), fields(%identity))]
    async fn list(&self, identity: &UserId) -> Result<Vec<DocumentMetadata>> {
        let builder = self.request(Method::GET, "/list", identity)?;
        let body = self.exchange(Operation::List, builder, Vec::new()).await?;
        let documents = wire::decode::<WireListResponse>(Operation::List, &body)?.into_documents()?;
        debug!(count = documents.len(), "documents listed");
        Ok(documents)
    }

    #[instrument(skip(self), fields(%identity, %id))]
    async fn download(&self, identity: &UserId, id: &DocumentId) -> Result<Vec<u8>> {
        let builder = self.request(Method::GET, &format!("/download/{id}"), identity)?;
        let body = self.exchange(Operation::Download, builder, Vec::new()).await?;
        Ok(body.to_vec())
    }

    #[instrument(skip(self, content), fields(%identity, %id, len = content.len()))]
    async fn verify(&self, identity: &UserId, id: &DocumentId, content: &[u8]) -> Result<HashRecord> {
        let form = MultipartForm::new()
            .text("document_id", id.as_str())
            .file("file", id.as_str(), "application/octet-stream", content);
        let content_type = form.content_type();

        let builder = self
            .request(Method::POST, "/verify", identity)?
            .header(CONTENT_TYPE, content_type);
        let body = self
            .exchange(Operation::VerifyIntegrity, builder, form.finish())
            .await?;
        wire::decode::<WireVerifyResponse>(Operation::VerifyIntegrity, &body)?.into_record()
    }

    #[instrument(skip(self), fields(%identity, %id))]
    async fn audit_trail(&self, identity: &UserId, id: &DocumentId) -> Result<Vec<AuditEntry>> {
        let payload = serde_json::to_vec(&WireAuditRequest {
            document_id: id.as_str(),
            identity: identity.as_str(),
        })?;
        let builder = self
            .request(Method::POST, "/audit-trail", identity)?
            .header(CONTENT_TYPE, "application/json");
        let body = self.exchange(Operation::AuditTrail, builder, payload).await?;
        wire::decode::<WireAuditResponse>(Operation::AuditTrail, &body)?.into_entries()
    }

    #[instrument(skip(self), fields(%identity, %id))]
    async fn delete(&self, identity: &UserId, id: &DocumentId) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("/document/{id}"), identity)?;
        let body = self.exchange(Operation::Delete, builder, Vec::new()).await?;
        wire::decode::<WireStatus>(Operation::Delete, &body)?.check(Operation::Delete, true)?;
        info!("document deleted");
        Ok(())
    }

    #[instrument(skip(self), fields(%identity, %id))]
    async fn metadata(&self, identity: &UserId, id: &DocumentId) -> Result<DocumentMetadata> {
        let builder = self.request(Method::GET, &format!("/document-metadata/{id}"), identity)?;
        let body = self.exchange(Operation::Metadata, builder, Vec::new()).await?;
        wire::decode::<WireDocumentResponse>(Operation::Metadata, &body)?
            .into_metadata(Operation::Metadata)
    }
}
