// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Vaultgate — device-bound security gateway for a remote document vault
//
// Entry point. Initialises logging, parses the command line, builds the
// service layer and runs one command.

mod cli;
mod output;
mod services;

use std::process::ExitCode;

use clap::Parser;
use vaultgate_core::error::{GatewayError, Result};
use vaultgate_core::types::{DocumentId, EnrollmentOutcome, UserId, VerificationOutcome};

use cli::{Cli, Commands};
use services::gateway_services::{GatewayServices, ListOptions, ServiceOptions, StoreRequest};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!("command failed: {e:?}");
            output::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let services = GatewayServices::init(ServiceOptions {
        data_dir: cli.data_dir,
        passphrase: cli.passphrase,
        mock_bridge: cli.mock_bridge,
    })?;
    let escalate = cli.verify;

    match cli.command {
        Commands::Config => {
            let path = services.save_config()?;
            println!("{}", serde_json::to_string_pretty(services.config())?);
            println!("saved to {}", path.display());
            println!("data directory {}", services.data_dir().display());
        }

        Commands::SecurityLog { limit } => {
            output::print_security_log(&services.security_log(limit)?);
        }

        Commands::Status => {
            let user = identity(cli.user)?;
            output::print_status(user.as_str(), &services.status(&user)?);
        }

        Commands::Enroll => {
            let user = identity(cli.user)?;
            match services.enroll(&user).await {
                EnrollmentOutcome::Success => println!("Biometric protection is on."),
                EnrollmentOutcome::DeviceNotSupported => {
                    return Err(GatewayError::DeviceNotSupported);
                }
                EnrollmentOutcome::UserCancelled => return Err(GatewayError::UserCancelled),
                EnrollmentOutcome::Error(reason) => return Err(GatewayError::Biometric(reason)),
            }
        }

        Commands::VerifyIdentity => {
            let user = identity(cli.user)?;
            match services.verify_identity(&user).await {
                VerificationOutcome::Success => println!("Identity verified."),
                VerificationOutcome::NotEnrolled => return Err(GatewayError::NotEnrolled),
                VerificationOutcome::Failed => return Err(GatewayError::AuthenticationFailed),
                VerificationOutcome::SecurityError(reason) => {
                    return Err(GatewayError::SecurityViolation(reason));
                }
                VerificationOutcome::Error(reason) => return Err(GatewayError::Biometric(reason)),
            }
        }

        Commands::Disable => {
            let user = identity(cli.user)?;
            services.disable(&user).await?;
            println!("Biometric protection is off.");
        }

        Commands::List {
            search,
            sort,
            document_type,
        } => {
            let user = identity(cli.user)?;
            let options = ListOptions {
                search,
                sort: sort.into(),
                document_type,
            };
            output::print_documents(&services.list(&user, escalate, options).await?);
        }

        Commands::Store {
            path,
            document_type,
            title,
            no_secure_storage,
        } => {
            let user = identity(cli.user)?;
            let request = StoreRequest {
                path,
                document_type,
                title,
                secure_storage: !no_secure_storage,
            };
            output::print_stored(&services.store(&user, escalate, request).await?);
        }

        Commands::Download { id, out } => {
            let user = identity(cli.user)?;
            let id = DocumentId::new(id)?;
            let written = services.download(&user, escalate, &id, &out).await?;
            println!("Wrote {written} bytes to {}", out.display());
        }

        Commands::Check { id, path } => {
            let user = identity(cli.user)?;
            let id = DocumentId::new(id)?;
            let result = services.check(&user, escalate, &id, &path).await?;
            output::print_verification(&result);
            if !result.is_valid {
                return Ok(ExitCode::from(2));
            }
        }

        Commands::Audit { id } => {
            let user = identity(cli.user)?;
            let id = DocumentId::new(id)?;
            output::print_audit_trail(&services.audit_trail(&user, escalate, &id).await?);
        }

        Commands::Delete { id } => {
            let user = identity(cli.user)?;
            let id = DocumentId::new(id)?;
            services.delete(&user, escalate, &id).await?;
            println!("Deleted {id}.");
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn identity(user: Option<String>) -> Result<UserId> {
    let user = user.ok_or_else(|| {
        GatewayError::InvalidInput("no identity given; pass --user or set VAULTGATE_USER".into())
    })?;
    UserId::new(user)
}
