// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Client-side view of the user's vault documents.

use std::sync::Arc;

use tracing::{debug, instrument, warn};
use vaultgate_core::error::Result;
use vaultgate_core::types::{DocumentId, DocumentMetadata};

use crate::client::{RequestContext, SecureVaultClient};
use crate::transport::VaultApi;

/// Ordering of the filtered view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    /// Newest first.
    #[default]
    RecentFirst,
    /// Grouped by document type, newest first within a group.
    TypeGrouped,
}

/// Cached document list with a derived, filtered and sorted view.
///
/// `filtered` is recomputed synchronously after every change. Failed
/// loads and deletes leave the cached list exactly as it was.
pub struct DocumentRegistry<A> {
    client: Arc<SecureVaultClient<A>>,
    all: Vec<DocumentMetadata>,
    filtered: Vec<DocumentMetadata>,
    search_query: String,
    sort_mode: SortMode,
    type_filter: Option<String>,
    last_error: Option<String>,
}

impl<A: VaultApi> DocumentRegistry<A> {
    pub fn new(client: Arc<SecureVaultClient<A>>) -> Self {
        Self {
            client,
            all: Vec::new(),
            filtered: Vec::new(),
            search_query: String::new(),
            sort_mode: SortMode::default(),
            type_filter: None,
            last_error: None,
        }
    }

    /// Replace the cache with the vault's list.
    #[instrument(skip(self), fields(user = %ctx.identity))]
    pub async fn load_all(&mut self, ctx: &RequestContext) -> Result<()> {
        match self.client.list(ctx).await {
            Ok(documents) => {
                debug!(count = documents.len(), "registry loaded");
                self.all = documents;
                self.last_error = None;
                self.recompute();
                Ok(())
            }
            Err(e) => {
                warn!("registry load failed, keeping cached list: {e}");
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Put a document the client just stored at the front.
    pub fn add(&mut self, document: DocumentMetadata) {
        self.all.insert(0, document);
        self.recompute();
    }

    /// Delete remotely, then drop the one matching entry.
    #[instrument(skip(self), fields(user = %ctx.identity, %id))]
    pub async fn delete(&mut self, ctx: &RequestContext, id: &DocumentId) -> Result<()> {
        if let Err(e) = self.client.delete(ctx, id).await {
            warn!("delete failed, registry unchanged: {e}");
            self.last_error = Some(e.to_string());
            return Err(e);
        }
        if let Some(index) = self.all.iter().position(|doc| &doc.id == id) {
            self.all.remove(index);
        }
        self.recompute();
        Ok(())
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
        self.recompute();
    }

    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort_mode = mode;
        self.recompute();
    }

    /// Show only documents of this type (case-insensitive). `None` clears it.
    pub fn set_type_filter(&mut self, document_type: Option<String>) {
        self.type_filter = document_type;
        self.recompute();
    }

    pub fn all(&self) -> &[DocumentMetadata] {
        &self.all
    }

    pub fn filtered(&self) -> &[DocumentMetadata] {
        &self.filtered
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn find(&self, id: &DocumentId) -> Option<&DocumentMetadata> {
        self.all.iter().find(|doc| &doc.id == id)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn recompute(&mut self) {
        let query = self.search_query.trim().to_lowercase();
        let type_filter = self.type_filter.as_deref().map(str::to_lowercase);

        let mut view: Vec<DocumentMetadata> = self
            .all
            .iter()
            .filter(|doc| {
                type_filter
                    .as_deref()
                    .is_none_or(|wanted| doc.document_type.to_lowercase() == wanted)
            })
            .filter(|doc| {
                query.is_empty()
                    || [&doc.title, &doc.file_name, &doc.document_type]
                        .iter()
                        .any(|field| field.to_lowercase().contains(&query))
            })
            .cloned()
            .collect();

        match self.sort_mode {
            SortMode::RecentFirst => view.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortMode::TypeGrouped => view.sort_by(|a, b| {
                a.document_type
                    .to_lowercase()
                    .cmp(&b.document_type.to_lowercase())
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
        }
        self.filtered = view;
    }
}

/// Render a byte count as `B`, `KB` or `MB` with one decimal.
pub fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes < KIB {
        format!("{bytes} B")
    } else if bytes < MIB {
        format!("{:.1} KB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    }
}
