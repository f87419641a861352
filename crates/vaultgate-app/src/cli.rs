// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use vaultgate_vault::SortMode;

/// Vaultgate - device-bound biometric gate and integrity checks for a remote document vault
#[derive(Parser)]
#[command(name = "vaultgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Identity the vault knows you by (usually an email address)
    #[arg(short, long, global = true, env = "VAULTGATE_USER")]
    pub user: Option<String>,

    /// Data directory (config, audit log, enrollment file)
    #[arg(long, global = true, env = "VAULTGATE_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Passphrase of the encrypted enrollment file
    #[arg(long, global = true, env = "VAULTGATE_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// Use the scriptable in-memory bridge (headless runs)
    #[arg(long, global = true)]
    pub mock_bridge: bool,

    /// Require biometric verification even where policy doesn't
    #[arg(long, global = true)]
    pub verify: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show biometric capability, enrollment and vault settings
    Status,

    /// Turn on biometric protection for this device
    Enroll,

    /// Run the biometric check once
    VerifyIdentity,

    /// Turn off biometric protection
    Disable,

    /// List documents in the vault
    List {
        /// Case-insensitive match on title, file name or type
        #[arg(long)]
        search: Option<String>,

        /// Ordering of the list
        #[arg(long, value_enum, default_value_t = SortArg::Recent)]
        sort: SortArg,

        /// Only documents of this type
        #[arg(long = "type", value_name = "TYPE")]
        document_type: Option<String>,
    },

    /// Upload a document
    Store {
        /// File to upload
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Document type (e.g. "Rental Agreement")
        #[arg(long = "type", value_name = "TYPE")]
        document_type: String,

        /// Title (defaults to the file name without extension)
        #[arg(long)]
        title: Option<String>,

        /// Don't ask the vault to keep a tamper-evident hash record
        #[arg(long)]
        no_secure_storage: bool,
    },

    /// Download a document to a file
    Download {
        #[arg(value_name = "ID")]
        id: String,

        #[arg(value_name = "OUT")]
        out: PathBuf,
    },

    /// Check a local file against the vault's hash record
    Check {
        #[arg(value_name = "ID")]
        id: String,

        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Show a document's audit trail
    Audit {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Delete a document from the vault
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Show recent local security events
    SecurityLog {
        /// Maximum number of events
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Write the active settings to config.json
    Config,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    /// Newest first
    Recent,
    /// Grouped by document type
    Type,
}

impl From<SortArg> for SortMode {
    fn from(sort: SortArg) -> Self {
        match sort {
            SortArg::Recent => SortMode::RecentFirst,
            SortArg::Type => SortMode::TypeGrouped,
        }
    }
}
