// src/server/handlers/broker.rs
//! Broker selection endpoint

use crate::broker::BrokerSelection;
use crate::server::SharedState;
use crate::server::handlers::{ApiError, ApiResult, Params};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Serialize)]
pub struct BrokerResponse {
    pub broker_id: String,
}

/// GET /broker/?agent_mode=<mode>
///
/// The older `agent` parameter is read when `agent_mode` is absent.
pub async fn get_broker(
    State(state): State<SharedState>,
    Query(params): Query<Params>,
) -> ApiResult<Response> {
    let mode = ["agent_mode", "agent"]
        .iter()
        .filter_map(|name| params.get(*name))
        .find(|value| !value.is_empty())
        .map(String::as_str)
        .unwrap_or("");
    if mode.is_empty() {
        tracing::warn!("broker request without agent_mode");
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "agent_mode required"));
    }

    let Some(agent_mode) = state.validators.agent_mode(mode) else {
        tracing::warn!(mode, "invalid agent_mode");
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "invalid agent_mode"));
    };

    match state.brokers.select(Some(agent_mode)) {
        Ok(BrokerSelection::Selected(broker_id)) => {
            state.metrics.record_broker();
            Ok(Json(BrokerResponse { broker_id }).into_response())
        }
        Ok(BrokerSelection::Unavailable) => {
            tracing::error!(mode, "no broker found");
            Err(ApiError::new(
                StatusCode::NOT_FOUND,
                "unable to identify valid broker",
            ))
        }
        Err(e) => {
            tracing::error!(mode, "broker selection error: {}", e);
            Err(e.into())
        }
    }
}
