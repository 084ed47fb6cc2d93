// src/server/metrics.rs
//! Request metrics tracking
//!
//! Atomic counters updated by the access-log middleware and by handlers.
//! A snapshot is included in the `/` document.

use axum::http::StatusCode;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Server metrics collector
#[derive(Default)]
pub struct ServerMetrics {
    /// Total requests
    requests_total: AtomicU64,
    /// 2xx responses
    success: AtomicU64,
    /// 3xx responses
    redirects: AtomicU64,
    /// 4xx responses
    client_errors: AtomicU64,
    /// 5xx responses
    server_errors: AtomicU64,
    templates_served: AtomicU64,
    packages_served: AtomicU64,
    /// Package lookups for platforms not in the registry
    unsupported_platforms: AtomicU64,
    brokers_selected: AtomicU64,
    start_time: std::sync::OnceLock<Instant>,
}

impl ServerMetrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        let metrics = Self::default();
        let _ = metrics.start_time.set(Instant::now());
        metrics
    }

    /// Record a finished request by response status
    pub fn record_response(&self, status: StatusCode) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        let counter = if status.is_success() {
            &self.success
        } else if status.is_redirection() {
            &self.redirects
        } else if status.is_client_error() {
            &self.client_errors
        } else if status.is_server_error() {
            &self.server_errors
        } else {
            return;
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_template(&self) {
        self.templates_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_package(&self) {
        self.packages_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unsupported(&self) {
        self.unsupported_platforms.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_broker(&self) {
        self.brokers_selected.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime = self
            .start_time
            .get()
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO);

        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            success: self.success.load(Ordering::Relaxed),
            redirects: self.redirects.load(Ordering::Relaxed),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            templates_served: self.templates_served.load(Ordering::Relaxed),
            packages_served: self.packages_served.load(Ordering::Relaxed),
            unsupported_platforms: self.unsupported_platforms.load(Ordering::Relaxed),
            brokers_selected: self.brokers_selected.load(Ordering::Relaxed),
            uptime_secs: uptime.as_secs(),
        }
    }
}

/// Snapshot of current metrics
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub success: u64,
    pub redirects: u64,
    pub client_errors: u64,
    pub server_errors: u64,
    pub templates_served: u64,
    pub packages_served: u64,
    pub unsupported_platforms: u64,
    pub brokers_selected: u64,
    pub uptime_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        let metrics = ServerMetrics::new();
        metrics.record_response(StatusCode::OK);
        metrics.record_response(StatusCode::TEMPORARY_REDIRECT);
        metrics.record_response(StatusCode::NOT_FOUND);
        metrics.record_response(StatusCode::BAD_REQUEST);
        metrics.record_response(StatusCode::INTERNAL_SERVER_ERROR);

        let snap = metrics.snapshot();
        assert_eq!(snap.requests_total, 5);
        assert_eq!(snap.success, 1);
        assert_eq!(snap.redirects, 1);
        assert_eq!(snap.client_errors, 2);
        assert_eq!(snap.server_errors, 1);
    }

    #[test]
    fn test_handler_counters() {
        let metrics = ServerMetrics::new();
        metrics.record_template();
        metrics.record_package();
        metrics.record_package();
        metrics.record_unsupported();
        metrics.record_broker();

        let snap = metrics.snapshot();
        assert_eq!(snap.templates_served, 1);
        assert_eq!(snap.packages_served, 2);
        assert_eq!(snap.unsupported_platforms, 1);
        assert_eq!(snap.brokers_selected, 1);
        assert_eq!(snap.requests_total, 0);
    }
}
