// src/server/handlers/index.rs
//! Server information and robots.txt

use crate::resolver::ResolverSnapshot;
use crate::server::metrics::MetricsSnapshot;
use crate::server::{SERVER_DESCRIPTION, SharedState};
use axum::{
    Json,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use serde::Serialize;

const ROBOTS_TXT: &str = "User-agent: *\nDisallow: /";

/// Document returned for `/`
#[derive(Serialize)]
pub struct ServerInfo {
    pub description: &'static str,
    /// `"<dist> <vers> <arch>"` for every platform with a package
    pub supported: Vec<String>,
    pub version: &'static str,
    pub templates: ResolverSnapshot,
    pub requests: MetricsSnapshot,
}

/// GET /
pub async fn server_info(State(state): State<SharedState>) -> Json<ServerInfo> {
    Json(ServerInfo {
        description: SERVER_DESCRIPTION,
        supported: state.packages.list_supported().to_vec(),
        version: env!("CARGO_PKG_VERSION"),
        templates: state.templates.stats(),
        requests: state.metrics.snapshot(),
    })
}

/// GET /robots.txt
pub async fn robots() -> Response {
    ([(header::CONTENT_TYPE, "text/plain")], ROBOTS_TXT).into_response()
}
