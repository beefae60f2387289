//! HTTP server and router.
//!
//! Wires the certificate gate in front of the protected rows page.  The
//! data-display handler is deliberately thin: it receives the authenticated
//! identity from request extensions and renders a static HTML table.  Query
//! execution against a real database is a separate concern behind the same
//! handoff (`identity` in, HTML out).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Json, Router,
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer, compression::CompressionLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{Config, PageConfig};
use crate::gate::{AuthorizedIdentity, Gate, gate_middleware};
use crate::{Error, Result};

/// Shared application state
pub struct AppState {
    /// Rows page configuration
    pub page: PageConfig,
}

/// Certificate gateway server
pub struct CertGate {
    config: Config,
}

impl CertGate {
    /// Create a new server from configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the server until SIGINT/SIGTERM.
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let gate = Arc::new(Gate::from_config(&self.config.gate));
        let state = Arc::new(AppState {
            page: self.config.page.clone(),
        });

        let app = create_router(state, Arc::clone(&gate), self.config.server.request_timeout);

        let listener = TcpListener::bind(addr).await?;

        info!(
            version = env!("CARGO_PKG_VERSION"),
            host = %self.config.server.host,
            port = self.config.server.port,
            header = %gate.header_name(),
            "certgate listening"
        );

        if gate.is_empty() {
            warn!("Allow-list is empty - every certificate will be denied");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        info!("Server stopped");
        Ok(())
    }
}

/// Create the router with the gate mounted in front of protected routes.
pub fn create_router(state: Arc<AppState>, gate: Arc<Gate>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(rows_page_handler))
        .route("/health", get(health_handler))
        // Certificate gate (public paths bypass it inside the middleware)
        .layer(axum::middleware::from_fn_with_state(gate, gate_middleware))
        .layer(CatchPanicLayer::new())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - liveness probe, bypasses the gate.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET / - the protected rows page.
///
/// Only reachable through the gate, so the `AuthorizedIdentity` extension
/// is always present here.
async fn rows_page_handler(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<AuthorizedIdentity>,
) -> Html<String> {
    Html(render_rows_page(&identity.0, &state.page))
}

/// Render the rows table with the authenticated identity.
fn render_rows_page(identity: &str, page: &PageConfig) -> String {
    let mut body = String::new();
    body.push_str("<!DOCTYPE html>\n<html>\n<head><title>");
    body.push_str(&escape_html(&page.title));
    body.push_str("</title></head>\n<body>\n");
    body.push_str(&format!(
        "<p>authorized as <strong>{}</strong></p>\n",
        escape_html(identity)
    ));
    body.push_str(&format!("<h1>{}</h1>\n", escape_html(&page.title)));
    body.push_str("<table>\n<tr><th>id</th><th>name</th><th>quantity</th></tr>\n");
    for row in &page.rows {
        body.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            row.id,
            escape_html(&row.name),
            row.quantity
        ));
    }
    body.push_str("</table>\n</body>\n</html>\n");
    body
}

/// Minimal HTML escaping for interpolated values.
fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
