//! One-Shield Fleet Console Backend
//!
//! Tracks the liveness of browser-extension agents and aggregates the
//! security alerts they report into ranked geographic views.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ONE-SHIELD FLEET CONSOLE                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌─────────────────┐  ┌──────────────────┐  │
//! │  │  API      │  │  Fleet Registry │  │  Staleness       │  │
//! │  │  Gateway  │─▶│  (RwLock map)   │◀─│  Sweeper (tokio) │  │
//! │  │  (Axum)   │  └─────────────────┘  └──────────────────┘  │
//! │  │           │  ┌─────────────────┐  ┌──────────────────┐  │
//! │  │           │─▶│  Alert Buffer   │─▶│  Aggregator +    │  │
//! │  └───────────┘  └─────────────────┘  │  Geo Classifier  │  │
//! │                                      └──────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod fleet;
pub mod alerts;
pub mod handlers;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};

pub use error::{AppError, AppResult};

use crate::alerts::AlertBuffer;
use crate::fleet::FleetRegistry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<FleetRegistry>,
    pub alerts: Arc<AlertBuffer>,
    pub config: config::Config,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let registry = FleetRegistry::new().with_offline_capacity(config.offline_capacity);
        Self::with_registry(Arc::new(registry), config)
    }

    pub fn with_registry(registry: Arc<FleetRegistry>, config: config::Config) -> Self {
        Self {
            registry,
            alerts: Arc::new(AlertBuffer::new(config.alert_buffer_capacity)),
            config,
        }
    }
}

/// Create the main router with all routes
pub fn create_router(state: AppState) -> Router {
    // Agent-facing routes
    let agent_routes = Router::new()
        .route("/api/v1/instances/register", post(handlers::instances::register))
        .route("/api/v1/instances/:id/heartbeat", post(handlers::instances::heartbeat))
        .route("/api/v1/alerts", post(handlers::alerts::ingest));

    // Console routes (read-only apart from operator stale/remove)
    let console_routes = Router::new()
        // Fleet
        .route("/api/v1/instances", get(handlers::instances::list))
        .route(
            "/api/v1/instances/:id",
            get(handlers::instances::get).delete(handlers::instances::remove),
        )
        .route("/api/v1/instances/:id/stale", post(handlers::instances::mark_stale))
        .route("/api/v1/fleet/stats", get(handlers::instances::stats))

        // Alerts
        .route("/api/v1/alerts/heatmap", get(handlers::alerts::heatmap))
        .route("/api/v1/alerts/summary", get(handlers::alerts::summary))
        .route("/api/v1/geo/classify", get(handlers::alerts::classify));

    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(agent_routes)
        .merge(console_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use axum::{body::{to_bytes, Body}, http::{Request, StatusCode}};
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::test_state;

    #[tokio::test]
    async fn test_health() {
        let (state, _) = test_state();
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await;
        let response = tokio_test::assert_ok!(response);
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["instances"], 0);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (state, _) = test_state();
        let response = create_router(state)
            .oneshot(Request::builder().uri("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
