//! Audit logging for gate decisions.
//!
//! Every decision, allow or deny, is emitted via `tracing::info!` with a
//! structured JSON field, making the audit trail queryable by any log
//! aggregator (Loki, CloudWatch, Datadog).
//!
//! # Events
//!
//! | Event | When |
//! |-------|------|
//! | `gate.allowed` | The certificate identity matched the allow-list |
//! | `gate.denied` | Any deny path (missing, invalid, no identity, unauthorized) |

use serde::Serialize;

use super::policy::{AuthorizationDecision, Outcome};

/// Structured audit event emitted for every gate decision.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Event type string (`"gate.allowed"` or `"gate.denied"`).
    pub event: &'static str,
    /// Evaluated identity.  Present on allow and on `not_authorized`
    /// denials; absent when no identity could be derived.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Deny reason code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    /// Request path, when the decision was made inside the middleware.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Operator diagnostics (decode error text).  Never raw bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    /// Build the audit event for a decision.
    #[must_use]
    pub fn from_decision(decision: &AuthorizationDecision, path: Option<&str>) -> Self {
        Self {
            event: match decision.outcome {
                Outcome::Allow => "gate.allowed",
                Outcome::Deny => "gate.denied",
            },
            identity: decision.identity.clone(),
            reason: decision.reason_code(),
            path: path.map(str::to_owned),
            detail: decision.detail.clone(),
        }
    }
}

/// Emit an audit event via `tracing::info!` with structured fields.
///
/// The event is serialized as a JSON blob in the `audit` field:
///
/// ```text
/// INFO certgate::gate::audit audit={"event":"gate.denied","reason":...}
/// ```
pub fn emit(event: &AuditEvent) {
    match serde_json::to_string(event) {
        Ok(ref json) => tracing::info!(audit = %json, "gate audit"),
        Err(ref e) => tracing::warn!(error = %e, "Failed to serialize audit event"),
    }
}
