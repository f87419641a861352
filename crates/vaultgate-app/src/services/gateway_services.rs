// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — initialises the gateway subsystems and exposes one
// async-friendly method per CLI command.
//
// The audit log (rusqlite) is `Send` but not `Sync`; `SharedAuditLog` wraps
// it in `Arc<Mutex<>>` so the gate and the vault client can share it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use vaultgate_bridge::{MockBridge, PlatformBridge, platform_bridge};
use vaultgate_core::config::GatewayConfig;
use vaultgate_core::error::{GatewayError, Result};
use vaultgate_core::types::{
    AuditEntry, Capability, DocumentId, DocumentMetadata, DocumentUpload, EnrollmentOutcome,
    EnrollmentState, Operation, UserId, VerificationOutcome, VerificationResult,
};
use vaultgate_security::{
    AuditLog, BiometricGate, EncryptedFileStore, KeychainStore, MemoryStore, SecureStore,
    SecurityEvent, SharedAuditLog,
};
use vaultgate_vault::{DocumentRegistry, HttpVaultApi, RequestContext, SecureVaultClient, SortMode};

use super::data_dir;

const CONFIG_FILE: &str = "config.json";
const AUDIT_DB: &str = "audit.db";
const ENROLLMENT_FILE: &str = "enrollments.age";

/// Start-up choices made on the command line.
#[derive(Debug, Clone, Default)]
pub struct ServiceOptions {
    pub data_dir: Option<PathBuf>,
    /// Passphrase for the encrypted enrollment file.
    pub passphrase: Option<String>,
    /// Use the in-memory scriptable bridge instead of the platform one.
    pub mock_bridge: bool,
}

/// Where enrollment secrets live for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    EncryptedFile,
    Keychain,
    Memory,
}

impl StoreKind {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::EncryptedFile => "encrypted file",
            Self::Keychain => "platform keychain",
            Self::Memory => "memory (not persisted)",
        }
    }
}

/// Snapshot printed by `vaultgate status`.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub platform: String,
    pub capability: Capability,
    pub state: EnrollmentState,
    pub enrolled_at: Option<DateTime<Utc>>,
    pub store: StoreKind,
    pub vault_url: String,
    pub audit_enabled: bool,
}

/// View options for `vaultgate list`.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub search: Option<String>,
    pub sort: SortMode,
    pub document_type: Option<String>,
}

/// What to upload with `vaultgate store`.
#[derive(Debug, Clone)]
pub struct StoreRequest {
    pub path: PathBuf,
    pub document_type: String,
    pub title: Option<String>,
    pub secure_storage: bool,
}

pub struct GatewayServices {
    data_dir: PathBuf,
    config: GatewayConfig,
    bridge: Arc<dyn PlatformBridge>,
    store_kind: StoreKind,
    audit: SharedAuditLog,
    gate: Arc<BiometricGate>,
    client: Arc<SecureVaultClient<HttpVaultApi>>,
}

impl GatewayServices {
    /// Initialise all services. Call once at start-up.
    pub fn init(options: ServiceOptions) -> Result<Self> {
        let bridge: Arc<dyn PlatformBridge> = if options.mock_bridge {
            Arc::new(MockBridge::new())
        } else {
            platform_bridge()
        };
        Self::init_with_bridge(options, bridge)
    }

    /// Initialise against an injected bridge (mobile shells, tests).
    pub fn init_with_bridge(options: ServiceOptions, bridge: Arc<dyn PlatformBridge>) -> Result<Self> {
        let dir = data_dir::data_dir(options.data_dir.as_deref())?;
        info!(path = %dir.display(), platform = bridge.platform_name(), "initialising gateway services");

        let config = load_config(&dir)?;
        let passphrase = options.passphrase.filter(|p| !p.is_empty());
        let (store, store_kind) = open_store(&dir, passphrase, &bridge)?;

        let audit = if config.audit_enabled {
            SharedAuditLog::new(AuditLog::open(dir.join(AUDIT_DB))?)
        } else {
            warn!("local security audit log is disabled");
            SharedAuditLog::disabled()
        };

        let gate = Arc::new(BiometricGate::new(
            Arc::clone(&bridge),
            store,
            audit.clone(),
            config.biometric.clone(),
        ));
        let api = HttpVaultApi::new(&config.vault)?;
        let client = Arc::new(SecureVaultClient::new(
            api,
            Arc::clone(&gate),
            audit.clone(),
            config.max_upload_bytes,
        ));

        info!(store = store_kind.describe(), "gateway services initialised");
        Ok(Self {
            data_dir: dir,
            config,
            bridge,
            store_kind,
            audit,
            gate,
            client,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Write the active settings to `config.json`.
    pub fn save_config(&self) -> Result<PathBuf> {
        persist_config(&self.data_dir, &self.config)
    }

    /// Request context with the policy default for `operation`, escalated
    /// when the caller asked for verification.
    pub fn ctx(&self, user: &UserId, operation: Operation, escalate: bool) -> RequestContext {
        let ctx = RequestContext::for_operation(user.clone(), &self.config.policy, operation);
        if escalate { ctx.escalated() } else { ctx }
    }

    // -- Biometric protection ------------------------------------------------

    pub fn status(&self, user: &UserId) -> Result<StatusReport> {
        Ok(StatusReport {
            platform: self.bridge.platform_name().to_owned(),
            capability: self.gate.check_capability(),
            state: self.gate.enrollment_state(user),
            enrolled_at: self.gate.enrolled_at(user)?,
            store: self.store_kind,
            vault_url: self.config.vault.base_url.clone(),
            audit_enabled: self.audit.is_enabled(),
        })
    }

    pub async fn enroll(&self, user: &UserId) -> EnrollmentOutcome {
        if self.store_kind == StoreKind::Memory {
            warn!("enrollment will be lost when this process exits");
        }
        self.gate.enroll(user).await
    }

    pub async fn verify_identity(&self, user: &UserId) -> VerificationOutcome {
        self.gate.verify(user).await
    }

    pub async fn disable(&self, user: &UserId) -> Result<()> {
        self.gate.disable(user).await
    }

    /// Most recent local security events, newest first.
    pub fn security_log(&self, limit: u32) -> Result<Vec<SecurityEvent>> {
        self.audit
            .with_log(|log| log.recent_entries(limit))
            .unwrap_or_else(|| {
                Err(GatewayError::Config(
                    "the local security audit log is disabled".into(),
                ))
            })
    }

    // -- Vault ---------------------------------------------------------------

    #[instrument(skip(self, options), fields(%user))]
    pub async fn list(
        &self,
        user: &UserId,
        escalate: bool,
        options: ListOptions,
    ) -> Result<Vec<DocumentMetadata>> {
        let ctx = self.ctx(user, Operation::List, escalate);
        let mut registry = DocumentRegistry::new(Arc::clone(&self.client));
        registry.load_all(&ctx).await?;
        if let Some(query) = options.search {
            registry.set_search_query(query);
        }
        registry.set_type_filter(options.document_type);
        registry.set_sort_mode(options.sort);
        Ok(registry.filtered().to_vec())
    }

    #[instrument(skip(self, request), fields(%user, path = %request.path.display()))]
    pub async fn store(
        &self,
        user: &UserId,
        escalate: bool,
        request: StoreRequest,
    ) -> Result<DocumentMetadata> {
        let upload = read_upload(&request)?;
        let ctx = self.ctx(user, Operation::Store, escalate);
        self.client.store(&ctx, &upload).await
    }

    /// Download a document into `out`. Returns the number of bytes written.
    pub async fn download(
        &self,
        user: &UserId,
        escalate: bool,
        id: &DocumentId,
        out: &Path,
    ) -> Result<usize> {
        let ctx = self.ctx(user, Operation::Download, escalate);
        let bytes = self.client.download(&ctx, id).await?;
        std::fs::write(out, &bytes)?;
        Ok(bytes.len())
    }

    /// Compare a local file against the vault's hash record.
    pub async fn check(
        &self,
        user: &UserId,
        escalate: bool,
        id: &DocumentId,
        path: &Path,
    ) -> Result<VerificationResult> {
        let bytes = std::fs::read(path)?;
        let ctx = self.ctx(user, Operation::VerifyIntegrity, escalate);
        self.client.verify_integrity(&ctx, id, &bytes).await
    }

    pub async fn audit_trail(
        &self,
        user: &UserId,
        escalate: bool,
        id: &DocumentId,
    ) -> Result<Vec<AuditEntry>> {
        let ctx = self.ctx(user, Operation::AuditTrail, escalate);
        self.client.audit_trail(&ctx, id).await
    }

    pub async fn delete(&self, user: &UserId, escalate: bool, id: &DocumentId) -> Result<()> {
        let ctx = self.ctx(user, Operation::Delete, escalate);
        self.client.delete(&ctx, id).await
    }
}

// -- Secure store selection -------------------------------------------------

/// Pick the enrollment store for this run.
///
/// A passphrase opens (or creates) the encrypted enrollment file. Without
/// one, an existing file is locked and start-up fails; otherwise the
/// platform keychain is used when the device has biometric hardware, and a
/// throwaway in-memory store when it doesn't.
fn open_store(
    dir: &Path,
    passphrase: Option<String>,
    bridge: &Arc<dyn PlatformBridge>,
) -> Result<(Arc<dyn SecureStore>, StoreKind)> {
    let path = dir.join(ENROLLMENT_FILE);
    if let Some(passphrase) = passphrase {
        let store = EncryptedFileStore::open(&path, passphrase)?;
        return Ok((Arc::new(store), StoreKind::EncryptedFile));
    }
    if path.exists() {
        return Err(GatewayError::Config(format!(
            "{} is encrypted; pass --passphrase or set VAULTGATE_PASSPHRASE",
            path.display()
        )));
    }
    match bridge.biometric_capability() {
        Capability::Available => Ok((
            Arc::new(KeychainStore::new(Arc::clone(bridge))),
            StoreKind::Keychain,
        )),
        Capability::None => Ok((Arc::new(MemoryStore::new()), StoreKind::Memory)),
    }
}

// -- Uploads ------------------------------------------------------------------

fn read_upload(request: &StoreRequest) -> Result<DocumentUpload> {
    let file_name = request
        .path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            GatewayError::InvalidInput(format!("'{}' has no file name", request.path.display()))
        })?
        .to_owned();
    let title = match &request.title {
        Some(title) => title.clone(),
        None => request
            .path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&file_name)
            .to_owned(),
    };
    let bytes = std::fs::read(&request.path)?;

    Ok(DocumentUpload {
        title,
        file_type: content_type_for(&request.path).to_owned(),
        file_name,
        document_type: request.document_type.clone(),
        bytes,
        extracted_text: None,
        secure_storage: request.secure_storage,
    })
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}

// -- Config persistence -------------------------------------------------------

/// Missing file means defaults. A file that doesn't parse is an error, not
/// a silent reset.
fn load_config(data_dir: &Path) -> Result<GatewayConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(GatewayConfig::default()),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&data)
        .map_err(|e| GatewayError::Config(format!("{}: {e}", path.display())))
}

fn persist_config(data_dir: &Path, config: &GatewayConfig) -> Result<PathBuf> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(path)
}
