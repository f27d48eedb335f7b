//! Dashboard: Axum web server showing the latest scan.
//!
//! Serves a small REST API and a self-contained HTML page that polls it:
//! the color-coded results table, a CSV download and per-symbol trend
//! charts. CORS enabled for local development.

pub mod routes;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method},
    response::Html,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use routes::AppState;

/// The embedded dashboard HTML (compiled into the binary).
const DASHBOARD_HTML: &str = include_str!("templates/index.html");

/// Bind the dashboard port and serve in a background task.
///
/// Binding happens before returning, so a port conflict is reported to
/// the caller instead of being lost inside the task.
pub async fn spawn_dashboard(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard port {port}"))?;
    info!(port, "Dashboard server starting on http://localhost:{port}");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Dashboard server error");
        }
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        // API routes
        .route("/api/status", get(routes::get_status))
        .route("/api/scan", get(routes::get_scan))
        .route("/api/scan.csv", get(routes::get_scan_csv))
        .route("/api/charts", get(routes::get_charts))
        .route("/api/passes", get(routes::get_passes))
        .route("/api/refresh", post(routes::post_refresh))
        .route("/health", get(routes::health))
        // Dashboard HTML
        .route("/", get(serve_dashboard))
        .layer(cors)
        .with_state(state)
}

/// Serve the embedded HTML dashboard.
async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::ReportSink;
    use crate::types::{ExpResult, ScanReportBuilder, Timeframe};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use routes::{DashboardSink, DashboardState};
    use std::sync::Arc;
    use tokio::sync::Notify;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        Arc::new(DashboardState::new(60, Arc::new(Notify::new())))
    }

    async fn populated_state() -> AppState {
        let state = test_state();
        let mut b = ScanReportBuilder::new(1);
        b.push_result("ETH", ExpResult::from_values([1.5; Timeframe::COUNT]));
        b.push_result("SOL", ExpResult::from_values([-8.25; Timeframe::COUNT]));
        DashboardSink::new(state.clone())
            .publish(&b.finish(Timeframe::OneDay))
            .await
            .unwrap();
        state
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let resp = get(build_router(test_state()), "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let resp = get(build_router(populated_state().await), "/api/status").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["passes_completed"], 1);
        assert_eq!(json["last_pass_symbols_ok"], 2);
    }

    #[tokio::test]
    async fn test_scan_endpoint_before_first_pass() {
        let resp = get(build_router(test_state()), "/api/scan").await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_scan_endpoint() {
        let resp = get(build_router(populated_state().await), "/api/scan").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["rows"][0]["symbol"], "ETH");
        assert_eq!(json["rows"][1]["cells"][0]["color"], "red");
    }

    #[tokio::test]
    async fn test_csv_download() {
        let resp = get(build_router(populated_state().await), "/api/scan.csv").await;
        assert_eq!(resp.status(), StatusCode::OK);
        let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.contains("exp_btc_scan.csv"));

        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let csv = String::from_utf8(body.to_vec()).unwrap();
        assert!(csv.starts_with(",1d,4h,1h,30m,15m,5m,1m"));
        assert!(csv.contains("SOL,-8.25"));
    }

    #[tokio::test]
    async fn test_charts_endpoint() {
        let resp = get(build_router(populated_state().await), "/api/charts").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let json: Vec<serde_json::Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(json.len(), 2);
        assert_eq!(json[0]["points"][0]["timeframe"], "1d");
    }

    #[tokio::test]
    async fn test_refresh_requires_post() {
        let app = build_router(test_state());
        let resp = get(app.clone(), "/api/refresh").await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let resp = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_dashboard_html() {
        let resp = get(build_router(test_state()), "/").await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("EXP Scanner"));
        assert!(html.contains("/api/scan"));
    }

    #[tokio::test]
    async fn test_dashboard_escapes_exchange_text() {
        let resp = get(build_router(test_state()), "/").await;
        let body = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();

        assert!(html.contains("function escapeHtml"));
        assert!(html.contains("escapeHtml(f.message)"));
        assert!(html.contains("escapeHtml(f.symbol)"));
        assert!(html.contains("escapeHtml(r.symbol)"));
        assert!(!html.contains("${f.message}"));
    }
}
