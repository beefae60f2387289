//! Configuration management

use std::{path::Path, time::Duration};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Certificate gate configuration
    pub gate: GateConfig,
    /// Protected rows page configuration
    pub page: PageConfig,
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (CERTGATE_ prefix)
        figment = figment.merge(Env::prefixed("CERTGATE_").split("__"));

        figment.extract().map_err(|e| Error::Config(e.to_string()))
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8443,
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Certificate gate configuration.
///
/// The gate assumes the upstream proxy terminated TLS and forwards the peer
/// certificate in `header`.  Absence of that header is always a hard deny;
/// there is no optional mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Name of the request header carrying the base64-encoded DER
    /// certificate.  An external contract with the proxy, so configuration
    /// rather than a literal.
    pub header: String,

    /// Which certificate attribute is compared against the allow-list.
    ///
    /// The historical deployments labeled their allow-list entries "CN" even
    /// when the values had thumbprint shape, so the matched field is explicit
    /// configuration instead of an assumption.
    pub identity_attribute: IdentityAttribute,

    /// Authorized identifier values.  Matched exactly and case-sensitively.
    pub allow: Vec<String>,

    /// Paths that bypass the gate (default: `["/health"]`)
    #[serde(default = "default_public_paths")]
    pub public_paths: Vec<String>,
}

fn default_public_paths() -> Vec<String> {
    vec!["/health".to_string()]
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            header: "X-ARR-ClientCert".to_string(),
            identity_attribute: IdentityAttribute::Cn,
            allow: Vec::new(),
            public_paths: default_public_paths(),
        }
    }
}

/// Certificate attribute used as the authorization identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdentityAttribute {
    /// Subject Common Name (first CN in subject encoding order).
    #[default]
    Cn,
    /// Certificate serial number, contiguous lowercase hex.
    Serial,
    /// SHA-256 digest of the DER encoding, contiguous lowercase hex.
    Thumbprint,
}

/// Configuration for the protected rows page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Page title
    pub title: String,
    /// Rows to display
    pub rows: Vec<RowRecord>,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            title: "Inventory".to_string(),
            rows: vec![
                RowRecord {
                    id: 1,
                    name: "widget".to_string(),
                    quantity: 42,
                },
                RowRecord {
                    id: 2,
                    name: "sprocket".to_string(),
                    quantity: 7,
                },
                RowRecord {
                    id: 3,
                    name: "gear".to_string(),
                    quantity: 19,
                },
            ],
        }
    }
}

/// One row of the protected table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowRecord {
    /// Row identifier
    pub id: u64,
    /// Item name
    pub name: String,
    /// Quantity on hand
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_binds_localhost() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8443);
    }

    #[test]
    fn default_gate_uses_arr_client_cert_header() {
        // GIVEN: default-constructed gate config
        let cfg = GateConfig::default();
        // THEN: the Azure front-door header name is the default contract
        assert_eq!(cfg.header, "X-ARR-ClientCert");
        assert_eq!(cfg.identity_attribute, IdentityAttribute::Cn);
    }

    #[test]
    fn default_allow_list_is_empty() {
        // Empty allow-list means every identity is denied (fail-closed)
        let cfg = GateConfig::default();
        assert!(cfg.allow.is_empty());
    }

    #[test]
    fn health_is_public_by_default() {
        let cfg = GateConfig::default();
        assert_eq!(cfg.public_paths, vec!["/health"]);
    }

    #[test]
    fn identity_attribute_deserializes_from_lowercase() {
        let cfg: GateConfig =
            serde_yaml::from_str("identity_attribute: thumbprint").unwrap();
        assert_eq!(cfg.identity_attribute, IdentityAttribute::Thumbprint);

        let cfg: GateConfig = serde_yaml::from_str("identity_attribute: serial").unwrap();
        assert_eq!(cfg.identity_attribute, IdentityAttribute::Serial);
    }

    #[test]
    fn gate_config_deserializes_from_yaml() {
        // GIVEN: a complete gate block in YAML
        let yaml = r#"
header: "X-Forwarded-Client-Cert"
identity_attribute: cn
allow:
  - "4f0000008fe385c0fb1076426400040000008f"
public_paths: ["/health", "/ready"]
"#;
        let cfg: GateConfig = serde_yaml::from_str(yaml).unwrap();
        // THEN: fields parsed correctly
        assert_eq!(cfg.header, "X-Forwarded-Client-Cert");
        assert_eq!(cfg.allow.len(), 1);
        assert_eq!(cfg.public_paths, vec!["/health", "/ready"]);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/certgate.yaml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn page_defaults_have_sample_rows() {
        let page = PageConfig::default();
        assert_eq!(page.title, "Inventory");
        assert!(!page.rows.is_empty());
    }
}
