use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use sheetbot_core::LookupService;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    lookup: Arc<LookupService>,
    export_binary: String,
}

impl HealthState {
    pub fn new(lookup: Arc<LookupService>, export_binary: impl Into<String>) -> Self {
        Self { lookup, export_binary: export_binary.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub export_binary: HealthCheck,
    pub cache_entries: usize,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let export_binary = export_binary_check(&state.export_binary);
    let ready = export_binary.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "sheetbot-server runtime initialized".to_string(),
        },
        export_binary,
        cache_entries: state.lookup.cached_entries(),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

pub fn export_binary_check(binary: &str) -> HealthCheck {
    match which::which(binary) {
        Ok(path) => HealthCheck { status: "ready", detail: format!("found at {}", path.display()) },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("`{binary}` not resolvable: {error}") }
        }
    }
}
