// src/server/handlers/packages.rs
//! Agent package endpoint

use crate::error::ErrorKind;
use crate::server::SharedState;
use crate::server::handlers::{ApiError, ApiResult, Params, client_descriptor};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};

const PACKAGE_CACHE_CONTROL: &str = "private, max-age=300";

/// GET /package/
///
/// Answers with JSON when `Accept` is exactly `*/*` or `application/json`,
/// otherwise with the `%%`-separated line the shell installer parses.
/// `?redirect` sends direct-download clients straight to the package.
pub async fn get_package(
    State(state): State<SharedState>,
    Query(params): Query<Params>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let client = client_descriptor(&state, &params)?;

    let pkg = state
        .packages
        .get_package_info(
            client.os_type(),
            client.os_distro(),
            client.os_version(),
            client.sys_arch(),
        )
        .map_err(|e| {
            if e.kind() == ErrorKind::Unsupported {
                state.metrics.record_unsupported();
            }
            tracing::warn!(client = %client, "unsupported os: {}", e);
            ApiError::from(e)
        })?;
    state.metrics.record_package();

    if params.contains_key("redirect") {
        if let Some(url) = pkg.download_url() {
            return Ok(Redirect::temporary(&url).into_response());
        }
    }

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if accept == "*/*" || accept == "application/json" {
        let mut body = serde_json::to_string(&pkg)
            .map_err(|e| ApiError::internal(format!("json encoding: {}", e)))?;
        body.push('\n');
        return Ok((
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CACHE_CONTROL, PACKAGE_CACHE_CONTROL),
            ],
            body,
        )
            .into_response());
    }

    let line = pkg.to_plain_text(state.validators.is_pkg_distro(client.os_distro()));
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain"),
            (header::CACHE_CONTROL, PACKAGE_CACHE_CONTROL),
        ],
        line,
    )
        .into_response())
}
