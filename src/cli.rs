//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Client-certificate authorization gateway
#[derive(Parser, Debug)]
#[command(name = "certgate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "CERTGATE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "CERTGATE_PORT")]
    pub port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "CERTGATE_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "CERTGATE_LOG_LEVEL", global = true)]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "CERTGATE_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to server mode)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the gateway server (default)
    Serve,

    /// Evaluate a saved header value against the configured policy
    Check {
        /// File containing the forwarded certificate header value
        /// (base64-encoded DER, as the proxy would send it)
        #[arg(required = true)]
        file: PathBuf,
    },
}
