//! Authorization middleware for protected routes.
//!
//! Runs in front of every protected handler:
//! - reads the forwarded certificate header named by configuration
//! - asks the [`Gate`](super::policy::Gate) for a decision
//! - on allow, injects [`AuthorizedIdentity`] into request extensions and
//!   passes the request through
//! - on deny, short-circuits with a structured HTTP 403; downstream
//!   handlers never run
//!
//! Configured public paths (health checks) bypass the gate entirely.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use super::audit::{self, AuditEvent};
use super::policy::{AuthorizationDecision, Gate, Outcome};

/// Identity of the authenticated client, injected into request extensions
/// on allow so protected handlers can render "authorized as `<identity>`"
/// without re-deriving it.
#[derive(Debug, Clone)]
pub struct AuthorizedIdentity(pub String);

/// Certificate gate middleware.
pub async fn gate_middleware(
    State(gate): State<Arc<Gate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();

    if gate.is_public_path(&path) {
        debug!(path = %path, "Public path, skipping certificate gate");
        return next.run(request).await;
    }

    // Lossy conversion: header bytes outside visible ASCII cannot be valid
    // base64, so they fall out as a decode failure rather than "missing".
    let header_value = request
        .headers()
        .get(gate.header_name())
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    let decision = gate.authorize(header_value.as_deref());
    audit::emit(&AuditEvent::from_decision(&decision, Some(&path)));

    match decision.outcome {
        Outcome::Allow => {
            if let Some(identity) = decision.identity {
                debug!(identity = %identity, path = %path, "Authorized request");
                request.extensions_mut().insert(AuthorizedIdentity(identity));
            }
            next.run(request).await
        }
        Outcome::Deny => {
            warn!(
                path = %path,
                reason = ?decision.reason_code(),
                identity = ?decision.identity,
                "Request denied by certificate gate"
            );
            forbidden_response(&decision)
        }
    }
}

/// Create a 403 Forbidden response with the reason code and redacted
/// message.  Raw certificate bytes and parser internals never appear here.
fn forbidden_response(decision: &AuthorizationDecision) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": decision.reason_code().unwrap_or("forbidden"),
            "message": decision.message,
        })),
    )
        .into_response()
}
