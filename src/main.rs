//! certgate - client-certificate authorization gateway
//!
//! Decodes a proxy-forwarded base64-DER client certificate and gates every
//! protected route on an allow-list decision.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use certgate::{
    cli::{Cli, Command},
    config::Config,
    gate::{Gate, Outcome, decoder},
    server::CertGate,
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        Some(Command::Check { ref file }) => run_check(cli.config.as_deref(), file),
        Some(Command::Serve) | None => run_server(cli).await,
    }
}

/// Evaluate a saved header value against the configured policy.
///
/// Exit code 0 means the certificate would be allowed, 1 that it would be
/// denied - usable from deployment scripts to verify an allow-list entry
/// before rollout.
fn run_check(config_path: Option<&Path>, file: &Path) -> ExitCode {
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let raw = match std::fs::read_to_string(file) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("❌ Failed to read {}: {e}", file.display());
            return ExitCode::FAILURE;
        }
    };

    // Print the decoded subject when the blob parses, whatever the decision
    if let Ok(cert) = decoder::decode(Some(raw.trim())) {
        println!("Subject:    {}", decoder::format_dn(&cert.subject));
        println!("Issuer:     {}", decoder::format_dn(&cert.issuer));
        println!("Serial:     {}", cert.serial_hex);
        println!("Thumbprint: {}", cert.thumbprint_sha256);
        println!("Validity:   {} to {}", cert.not_before, cert.not_after);
    }

    let gate = Gate::from_config(&config.gate);
    let decision = gate.authorize(Some(raw.trim()));

    match decision.outcome {
        Outcome::Allow => {
            println!("✅ {}", decision.message);
            ExitCode::SUCCESS
        }
        Outcome::Deny => {
            println!("❌ {}", decision.message);
            if let Some(code) = decision.reason_code() {
                println!("   Reason: {code}");
            }
            if let Some(ref identity) = decision.identity {
                println!("   Identity: {identity}");
            }
            if let Some(ref detail) = decision.detail {
                println!("   Detail: {detail}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Run the gateway server
async fn run_server(cli: Cli) -> ExitCode {
    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            // Apply CLI overrides
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host = host.clone();
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.server.port,
        allow_entries = config.gate.allow.len(),
        "Starting certgate"
    );

    let server = CertGate::new(config);

    if let Err(e) = server.run().await {
        error!("Server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Shutdown complete");
    ExitCode::SUCCESS
}
