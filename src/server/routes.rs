// src/server/routes.rs
//! Axum router configuration for the installhub server

use crate::server::SharedState;
use crate::server::handlers::{self, broker, index, install, packages, templates};
use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use std::time::Instant;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

/// Create the main application router
pub fn create_router(state: SharedState) -> Router {
    let mut router = Router::new()
        .route("/", get(index::server_info))
        .route("/robots.txt", get(index::robots))
        .route("/package/", get(packages::get_package))
        .route("/template/:category/:name/", get(templates::get_template))
        .route("/broker/", get(broker::get_broker))
        .route("/install/", get(install::install_script))
        .route("/install/config/", get(install::install_config))
        // legacy alias
        .route("/install/conf/", get(install::install_config))
        .route("/tool/", get(install::tool_redirect))
        // legacy alias
        .route("/utils/", get(install::tool_redirect));

    if state.config.content.rpm_installer_file.is_some() {
        router = router.route("/install/rpm/", get(install::rpm_installer));
    }

    if state.config.content.local_packages {
        router = router.nest_service(
            "/packages",
            ServeDir::new(state.config.local_package_dir()),
        );
    }

    router
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(state.clone(), access_log))
        .layer(CompressionLayer::new())
        .with_state(state)
}

/// Log every request and count it by response status
async fn access_log(State(state): State<SharedState>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    state.metrics.record_response(status);
    tracing::info!(
        method = %method,
        uri = %uri,
        status = status.as_u16(),
        duration_us = start.elapsed().as_micros() as u64,
        "request"
    );
    response
}
