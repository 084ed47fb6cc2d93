// src/server/handlers/templates.rs
//! Template endpoint

use crate::server::SharedState;
use crate::server::handlers::{ApiError, ApiResult, Params, client_descriptor};
use crate::templates::TEMPLATE_CONTENT_TYPE;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// GET /template/:category/:name/
///
/// Returns the most specific template for the client's `type`, `dist`,
/// `vers` and `arch`, verbatim.
pub async fn get_template(
    State(state): State<SharedState>,
    Path((category, name)): Path<(String, String)>,
    Query(params): Query<Params>,
) -> ApiResult<Response> {
    state.validators.resource_spec(&category, &name).map_err(|e| {
        tracing::warn!("invalid template specification: {}", e);
        ApiError::from(e)
    })?;
    let client = client_descriptor(&state, &params)?;

    let lookup = Arc::clone(&state);
    let content = tokio::task::spawn_blocking(move || {
        lookup.templates.get(&category, &name, &client)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Task join error: {}", e)))?
    .map_err(|e| {
        tracing::warn!("fetching template: {}", e);
        ApiError::from(e)
    })?;

    state.metrics.record_template();
    Ok((
        [(header::CONTENT_TYPE, TEMPLATE_CONTENT_TYPE)],
        Body::from(content.to_vec()),
    )
        .into_response())
}
