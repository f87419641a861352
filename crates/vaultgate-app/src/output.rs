// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-text rendering for the CLI.

use vaultgate_core::error::GatewayError;
use vaultgate_core::human_errors::{Severity, humanize_error};
use vaultgate_core::types::{
    AuditEntry, Capability, DocumentMetadata, EnrollmentState, VerificationResult,
};
use vaultgate_security::SecurityEvent;
use vaultgate_vault::format_size;

use crate::services::gateway_services::StatusReport;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn print_status(user: &str, status: &StatusReport) {
    let capability = match status.capability {
        Capability::Available => "available",
        Capability::None => "not available",
    };
    let state = match (status.state, status.enrolled_at) {
        (EnrollmentState::Enrolled, Some(at)) => format!("on since {}", at.format(TIME_FORMAT)),
        (EnrollmentState::Enrolled, None) => "on".to_owned(),
        (EnrollmentState::Unenrolled, _) => "off".to_owned(),
    };
    println!("identity:          {user}");
    println!("platform:          {}", status.platform);
    println!("biometrics:        {capability}");
    println!("protection:        {state}");
    println!("enrollment store:  {}", status.store.describe());
    println!("vault:             {}", status.vault_url);
    println!(
        "security log:      {}",
        if status.audit_enabled { "on" } else { "off" }
    );
}

pub fn print_documents(documents: &[DocumentMetadata]) {
    if documents.is_empty() {
        println!("No documents.");
        return;
    }
    for doc in documents {
        let mark = if doc.verified { "✓" } else { " " };
        println!(
            "{mark} {:<24} {:<28} {:<20} {:>9}  {}",
            doc.id.as_str(),
            doc.title,
            doc.document_type,
            format_size(doc.size_bytes),
            doc.created_at.format(TIME_FORMAT),
        );
    }
}

pub fn print_stored(doc: &DocumentMetadata) {
    println!("Stored {} as {}", doc.file_name, doc.id);
    if let Some(hash) = &doc.content_hash {
        println!("  content hash {hash}");
    }
}

pub fn print_verification(result: &VerificationResult) {
    if result.is_valid {
        println!("OK: file matches the vault record ({})", result.algorithm);
    } else {
        println!("MISMATCH: file differs from the vault record");
    }
    println!("  expected {}", result.expected_hash);
    println!("  actual   {}", result.actual_hash);
}

pub fn print_audit_trail(entries: &[AuditEntry]) {
    if entries.is_empty() {
        println!("No audit entries.");
        return;
    }
    for entry in entries {
        println!(
            "{}  {:<16} {:<28} {}",
            entry.timestamp.format(TIME_FORMAT),
            entry.action,
            entry.actor,
            entry.hash
        );
    }
}

pub fn print_security_log(events: &[SecurityEvent]) {
    if events.is_empty() {
        println!("No security events.");
        return;
    }
    for event in events {
        let outcome = if event.success { "ok" } else { "FAILED" };
        println!(
            "{}  {:<20} {:<28} {:<6} {}",
            event.timestamp,
            event.action,
            event.subject,
            outcome,
            event.details.as_deref().unwrap_or("")
        );
    }
}

/// Print an error the way a user should read it, with the technical detail
/// underneath.
pub fn print_error(err: &GatewayError) {
    let human = humanize_error(err);
    let prefix = match human.severity {
        Severity::Security => "SECURITY",
        _ => "error",
    };
    eprintln!("{prefix}: {}", human.message);
    eprintln!("  {}", human.suggestion);
    eprintln!("  ({err})");
}
