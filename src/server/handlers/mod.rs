// src/server/handlers/mod.rs
//! HTTP request handlers for the installhub server

pub mod broker;
pub mod index;
pub mod install;
pub mod packages;
pub mod templates;

use crate::descriptor::ClientDescriptor;
use crate::error::{Error, ErrorKind};
use crate::server::ServerState;
use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;

/// Query parameters as received
pub type Params = HashMap<String, String>;

/// Error response: status plus a plain-text message
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 500 with the detail logged, not sent
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!("{}", detail);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            status_text(StatusCode::INTERNAL_SERVER_ERROR),
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err.kind() {
            ErrorKind::Client => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            ErrorKind::NotFound | ErrorKind::Unsupported => {
                Self::new(StatusCode::NOT_FOUND, err.to_string())
            }
            ErrorKind::Fault | ErrorKind::Configuration => Self::internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message,
        )
            .into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// Validated client descriptor from the `type`, `dist`, `vers` and `arch` parameters
pub(crate) fn client_descriptor(state: &ServerState, params: &Params) -> ApiResult<ClientDescriptor> {
    let param = |name: &str| params.get(name).map(String::as_str).unwrap_or("");
    state
        .validators
        .client_descriptor(param("type"), param("dist"), param("vers"), param("arch"))
        .map_err(|e| {
            tracing::warn!("invalid parameter: {}", e);
            ApiError::from(e)
        })
}

/// Fallback for unrouted paths
pub async fn not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, status_text(StatusCode::NOT_FOUND))
}
