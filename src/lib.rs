//! certgate: client-certificate authorization gateway.
//!
//! Sits behind a TLS-terminating reverse proxy that forwards the peer
//! certificate as a base64-encoded DER blob in a request header, and gates
//! every protected route on an allow-list decision derived from that
//! certificate.
//!
//! # Features
//!
//! - **Certificate decoder**: structural X.509 parse of the forwarded blob,
//!   no cryptographic validation (the upstream terminator owns the handshake)
//! - **Authorization gate**: request-scoped middleware, exact-match
//!   allow-list, fail-closed with a distinct reason per deny path
//! - **Audit trail**: every allow/deny decision emitted as a structured
//!   tracing event
//! - **Configurable identity attribute**: match on CN, serial number, or
//!   SHA-256 thumbprint

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod server;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
