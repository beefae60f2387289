//! Allow-list policy evaluation.
//!
//! Compiles the startup [`GateConfig`] into a [`Gate`] and evaluates one
//! forwarded header value per request against it.  Evaluation is
//! fail-closed: every branch that does not reach an exact allow-list match
//! terminates in a deny with a distinct reason, and there is no implicit
//! default-allow path.
//!
//! Per request the evaluation walks
//! `START → DECODING → IDENTITY_CHECK → POLICY_CHECK → ALLOW | DENY`;
//! nothing is retried and nothing is shared between requests beyond the
//! immutable gate itself.

use std::collections::HashSet;
use std::fmt;

use crate::config::{GateConfig, IdentityAttribute};
use crate::gate::decoder::{self, DecodeError, ParsedCertificate};

// ─────────────────────────────────────────────────────────────────────────────
// Decision types
// ─────────────────────────────────────────────────────────────────────────────

/// Result of evaluating a forwarded certificate against the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The request may proceed to the protected handler.
    Allow,
    /// The request is rejected with HTTP 403.
    Deny,
}

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No certificate header was forwarded.
    CertificateMissing,
    /// The forwarded value could not be decoded (bad base64 or bad DER).
    CertificateInvalid,
    /// The certificate decoded but lacks the configured identity attribute.
    IdentityAttributeMissing,
    /// The identity is not on the allow-list.
    NotAuthorized,
}

impl DenyReason {
    /// Stable machine-readable reason code for responses and audit events.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::CertificateMissing => "certificate_missing",
            Self::CertificateInvalid => "certificate_invalid",
            Self::IdentityAttributeMissing => "identity_attribute_missing",
            Self::NotAuthorized => "not_authorized",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One per-request authorization decision.
///
/// `message` is safe to return to the client.  `detail` carries the decoder
/// error text for operator logs and must never reach the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDecision {
    /// Allow or deny.
    pub outcome: Outcome,
    /// The evaluated identity.  Present on allow, and retained on a
    /// `NotAuthorized` deny so audit logs show who was turned away.
    pub identity: Option<String>,
    /// Deny reason; absent on allow.
    pub reason: Option<DenyReason>,
    /// Client-facing, redacted message.
    pub message: String,
    /// Operator-only diagnostics (decode error text).  Never raw bytes.
    pub detail: Option<String>,
}

impl AuthorizationDecision {
    fn allow(identity: String) -> Self {
        Self {
            outcome: Outcome::Allow,
            message: format!("authorized as {identity}"),
            identity: Some(identity),
            reason: None,
            detail: None,
        }
    }

    fn deny(
        reason: DenyReason,
        message: impl Into<String>,
        identity: Option<String>,
        detail: Option<String>,
    ) -> Self {
        Self {
            outcome: Outcome::Deny,
            identity,
            reason: Some(reason),
            message: message.into(),
            detail,
        }
    }

    /// Reason code when denied.
    #[must_use]
    pub fn reason_code(&self) -> Option<&'static str> {
        self.reason.map(DenyReason::code)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gate
// ─────────────────────────────────────────────────────────────────────────────

/// Compiled authorization gate.
///
/// Build once at startup with [`Gate::from_config`], share as `Arc<Gate>`,
/// and call [`Gate::authorize`] on every protected request.  The gate is
/// immutable after construction, so concurrent readers need no locking; a
/// future live reload must swap the whole `Arc` snapshot.
#[derive(Debug, Clone)]
pub struct Gate {
    header: String,
    attribute: IdentityAttribute,
    allow: HashSet<String>,
    public_paths: Vec<String>,
}

impl Gate {
    /// Compile the gate from configuration.
    #[must_use]
    pub fn from_config(config: &GateConfig) -> Self {
        Self {
            header: config.header.clone(),
            attribute: config.identity_attribute,
            allow: config.allow.iter().cloned().collect(),
            public_paths: config.public_paths.clone(),
        }
    }

    /// Name of the proxy header carrying the forwarded certificate.
    #[must_use]
    pub fn header_name(&self) -> &str {
        &self.header
    }

    /// Returns `true` when the allow-list has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty()
    }

    /// Check if a path bypasses the gate.
    #[must_use]
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| path.starts_with(p))
    }

    /// Evaluate one forwarded header value.
    ///
    /// Synchronous, side-effect free, and a pure function of the header
    /// value and this gate's snapshot: identical inputs always yield
    /// identical decisions.
    #[must_use]
    pub fn authorize(&self, header_value: Option<&str>) -> AuthorizationDecision {
        let cert = match decoder::decode(header_value) {
            Ok(cert) => cert,
            Err(DecodeError::MissingCertificate) => {
                // The proxy is expected to require client certificates;
                // absence here is a hard failure, never a soft fallback.
                return AuthorizationDecision::deny(
                    DenyReason::CertificateMissing,
                    "no client certificate was forwarded with the request",
                    None,
                    None,
                );
            }
            Err(e @ (DecodeError::MalformedEncoding | DecodeError::MalformedCertificate(_))) => {
                return AuthorizationDecision::deny(
                    DenyReason::CertificateInvalid,
                    "forwarded client certificate could not be decoded",
                    None,
                    Some(e.to_string()),
                );
            }
        };

        let Some(identity) = self.identity_of(&cert) else {
            return AuthorizationDecision::deny(
                DenyReason::IdentityAttributeMissing,
                format!("certificate has no {} attribute", self.attribute_label()),
                None,
                None,
            );
        };

        // Exact, case-sensitive match only: no wildcards, no normalization.
        if self.allow.contains(&identity) {
            AuthorizationDecision::allow(identity)
        } else {
            AuthorizationDecision::deny(
                DenyReason::NotAuthorized,
                "certificate identity is not authorized",
                Some(identity),
                None,
            )
        }
    }

    /// Select the configured identity attribute from a decoded certificate.
    fn identity_of(&self, cert: &ParsedCertificate) -> Option<String> {
        match self.attribute {
            IdentityAttribute::Cn => cert.common_name.clone(),
            IdentityAttribute::Serial => Some(cert.serial_hex.clone()),
            IdentityAttribute::Thumbprint => Some(cert.thumbprint_sha256.clone()),
        }
    }

    fn attribute_label(&self) -> &'static str {
        match self.attribute {
            IdentityAttribute::Cn => "CN",
            IdentityAttribute::Serial => "serial",
            IdentityAttribute::Thumbprint => "thumbprint",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
