//! HTTP API for health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use dx_sync_lib::health::{ComponentStatus, HealthRegistry};
use prometheus::{proto::MetricFamily, Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry) -> Self {
        Self { health_registry }
    }
}

/// Fixed liveness payload
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Component health - returns 200 if healthy or degraded, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        // A failed run only degrades; the next tick retries
        ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once the sync task is scheduled
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    render_metrics(&prometheus::gather())
}

fn render_metrics(
    metric_families: &[MetricFamily],
) -> (StatusCode, [(&'static str, &'static str); 1], Vec<u8>) {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            Vec::new(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use dx_sync_lib::{health::components, observability::SyncMetrics};
    use tower::ServiceExt;

    async fn setup_test_app() -> (Router, Arc<AppState>) {
        let health_registry = HealthRegistry::new();
        health_registry.register(components::SCHEDULER).await;
        health_registry.register(components::CATALOG_SYNC).await;
        health_registry.register(components::API).await;

        let state = Arc::new(AppState::new(health_registry));
        let router = create_router(state.clone());

        (router, state)
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, body.to_vec())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let (status, body) = get(app, uri).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_returns_fixed_payload() {
        let (app, state) = setup_test_app().await;

        // Liveness does not depend on component state
        state
            .health_registry
            .set_unhealthy(components::SCHEDULER, "stopped")
            .await;

        let (status, body) = get_json(app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_healthz_returns_ok_when_healthy() {
        let (app, _state) = setup_test_app().await;

        let (status, health) = get_json(app, "/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "healthy");
        assert!(health["components"]["catalog_sync"].is_object());
        assert!(health["components"]["api"].is_object());
    }

    #[tokio::test]
    async fn test_healthz_returns_ok_after_failed_sync() {
        let (app, state) = setup_test_app().await;

        state
            .health_registry
            .set_degraded(
                components::CATALOG_SYNC,
                "Error communicating with DX: bad app id",
            )
            .await;

        let (status, health) = get_json(app, "/healthz").await;

        // Degraded still returns 200 (operational)
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "degraded");
        assert_eq!(
            health["components"]["catalog_sync"]["message"],
            "Error communicating with DX: bad app id"
        );
    }

    #[tokio::test]
    async fn test_healthz_reports_stopped_api_server() {
        let (app, state) = setup_test_app().await;

        state
            .health_registry
            .set_unhealthy(components::API, "API server stopped")
            .await;

        let (status, health) = get_json(app, "/healthz").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(health["status"], "unhealthy");
        assert_eq!(health["components"]["api"]["status"], "unhealthy");
        assert_eq!(health["components"]["scheduler"]["status"], "healthy");
    }

    #[tokio::test]
    async fn test_readyz_returns_503_until_scheduled() {
        let (app, _state) = setup_test_app().await;

        let (status, readiness) = get_json(app, "/readyz").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(readiness["ready"], false);
        assert_eq!(readiness["reason"], "Sync task not yet scheduled");
    }

    #[tokio::test]
    async fn test_readyz_returns_ok_when_ready() {
        let (app, state) = setup_test_app().await;

        state.health_registry.set_ready(true).await;

        let (status, readiness) = get_json(app, "/readyz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(readiness["ready"], true);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_returns_prometheus_format() {
        let (app, _state) = setup_test_app().await;

        let metrics = SyncMetrics::new();
        metrics.record_success(250, 3, 1.2);
        metrics.record_skipped();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let metrics_text = String::from_utf8(body.to_vec()).unwrap();

        assert!(metrics_text.contains(r#"dx_sync_runs_total{outcome="success"}"#));
        assert!(metrics_text.contains(r#"dx_sync_runs_total{outcome="skipped"}"#));
        assert!(metrics_text.contains("dx_sync_batches_sent_total"));
        assert!(metrics_text.contains("dx_sync_last_success_timestamp_seconds"));
        assert!(metrics_text.contains("dx_sync_run_duration_seconds_bucket"));
        assert!(metrics_text.contains("dx_sync_run_duration_seconds_count"));
    }

    #[test]
    fn test_unencodable_metrics_return_500() {
        // A family without samples is rejected by the text encoder
        let (status, _, body) = render_metrics(&[MetricFamily::default()]);

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.is_empty());
    }
}
