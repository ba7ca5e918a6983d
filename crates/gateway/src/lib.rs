//! HTTP API gateway for FieldRep.
//!
//! Exposes CRUD endpoints for HCPs and interactions, the chat endpoint
//! backed by the dispatch loop, and direct access to the five tools.
//!
//! Built on Axum. Every request is stateless: chat history travels with the
//! request and nothing about a conversation is kept server-side.

pub mod api;
pub mod error;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use fieldrep_agent::DispatchLoop;
use fieldrep_config::{AppConfig, GatewayConfig};
use fieldrep_core::event::EventBus;
use fieldrep_core::provider::Provider;
use fieldrep_core::store::RecordStore;
use fieldrep_core::tool::ToolRegistry;
use fieldrep_tools::ToolSettings;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

/// Shared application state for the gateway.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn RecordStore>,
    pub tools: Arc<ToolRegistry>,
    pub dispatch: Arc<DispatchLoop>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the tools and the dispatch loop over one store and provider.
    pub fn new(config: AppConfig, store: Arc<dyn RecordStore>, provider: Arc<dyn Provider>) -> Self {
        Self::with_event_bus(config, store, provider, Arc::new(EventBus::default()))
    }

    pub fn with_event_bus(
        config: AppConfig,
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn Provider>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        let tools = Arc::new(fieldrep_tools::default_registry(
            store.clone(),
            provider.clone(),
            ToolSettings::from(&config),
        ));
        let dispatch = Arc::new(
            DispatchLoop::from_config(provider, tools.clone(), &config).with_event_bus(event_bus),
        );
        Self {
            config,
            store,
            tools,
            dispatch,
        }
    }
}

/// CORS from the configured origin list. `"*"` allows any origin.
fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    let origin = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}

/// Build the full router.
///
/// Layers applied:
/// - CORS from `gateway.allowed_origins`
/// - Request body size limit from `gateway.body_limit_bytes`
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.gateway);
    let body_limit = state.config.gateway.body_limit_bytes;

    api::router(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Bind to the configured address and serve until the process stops.
pub async fn serve(state: SharedState) -> std::io::Result<()> {
    let addr = format!("{}:{}", state.config.gateway.host, state.config.gateway.port);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Gateway listening");
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use fieldrep_core::testing::SequentialMockProvider;
    use fieldrep_store::InMemoryStore;
    use tower::ServiceExt;

    fn state_with(config: AppConfig) -> SharedState {
        Arc::new(AppState::new(
            config,
            Arc::new(InMemoryStore::new()),
            Arc::new(SequentialMockProvider::new(vec![])),
        ))
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let app = build_router(state_with(AppConfig::default()));
        let req = Request::builder()
            .uri("/health")
            .header("Origin", "http://localhost:3000")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn cors_ignores_unknown_origin() {
        let app = build_router(state_with(AppConfig::default()));
        let req = Request::builder()
            .uri("/health")
            .header("Origin", "http://evil.example")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn wildcard_origin_allows_any() {
        let mut config = AppConfig::default();
        config.gateway.allowed_origins = vec!["*".into()];
        let app = build_router(state_with(config));
        let req = Request::builder()
            .uri("/health")
            .header("Origin", "http://anywhere.example")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut config = AppConfig::default();
        config.gateway.body_limit_bytes = 64;
        let app = build_router(state_with(config));
        let body = serde_json::json!({"message": "x".repeat(200), "history": []}).to_string();
        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
