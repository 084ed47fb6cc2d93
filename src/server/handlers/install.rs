// src/server/handlers/install.rs
//! Installer files and the tool download redirect

use crate::server::SharedState;
use crate::server::handlers::{ApiError, ApiResult, Params, client_descriptor};
use axum::{
    body::Body,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use std::path::PathBuf;

const INSTALL_SCRIPT: &str = "install.sh";
const INSTALL_CONFIG: &str = "install.conf";
const NO_CACHE: &str = "no-cache, must-revalidate";

/// GET /install/
pub async fn install_script(State(state): State<SharedState>) -> ApiResult<Response> {
    serve_file(state.config.files_dir().join(INSTALL_SCRIPT), "text/plain", None).await
}

/// GET /install/config/
pub async fn install_config(State(state): State<SharedState>) -> ApiResult<Response> {
    serve_file(
        state.config.files_dir().join(INSTALL_CONFIG),
        "text/plain",
        Some(NO_CACHE),
    )
    .await
}

/// GET /install/rpm/
pub async fn rpm_installer(State(state): State<SharedState>) -> ApiResult<Response> {
    let Some(rpm) = &state.config.content.rpm_installer_file else {
        return Err(ApiError::new(StatusCode::NOT_FOUND, "Not Found"));
    };
    serve_file(
        state.config.files_dir().join(rpm),
        "application/x-redhat-package-manager",
        Some(NO_CACHE),
    )
    .await
}

/// GET /tool/
///
/// Redirects to the release archive for the client's OS type.
pub async fn tool_redirect(
    State(state): State<SharedState>,
    Query(params): Query<Params>,
) -> ApiResult<Response> {
    let client = client_descriptor(&state, &params)?;
    let Some(url) = state.config.tool.download_url(client.os_type()) else {
        tracing::warn!("tool redirect requested but tool.version/base_url not set");
        return Err(ApiError::new(StatusCode::NOT_FOUND, "tool download not configured"));
    };
    Ok(Redirect::temporary(&url).into_response())
}

async fn serve_file(
    path: PathBuf,
    content_type: &'static str,
    cache_control: Option<&'static str>,
) -> ApiResult<Response> {
    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::error!(path = %path.display(), "installer file missing");
            return Err(ApiError::new(StatusCode::NOT_FOUND, "Not Found"));
        }
        Err(e) => return Err(ApiError::internal(format!("{}: {}", path.display(), e))),
    };

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(cache_control) = cache_control {
        response = response.header(header::CACHE_CONTROL, cache_control);
    }
    response
        .body(Body::from(data))
        .map_err(|e| ApiError::internal(format!("building response: {}", e)))
}
