//! # HTTP API
//!
//! One path, three uses:
//! - `POST /`: GraphQL queries and mutations
//! - `GET /` with a WebSocket upgrade: GraphQL subscriptions
//! - any other `GET`: the prebuilt frontend from the static directory
//!
//! `/health` reports liveness and store counters.

pub mod auth;
pub mod bus;
pub mod push;
pub mod schema;
pub mod service;
pub mod types;

use crate::config::ServerConfig;
use async_graphql::http::ALL_WEBSOCKET_PROTOCOLS;
use async_graphql_axum::{GraphQLProtocol, GraphQLRequest, GraphQLResponse, GraphQLWebSocket};
use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State, WebSocketUpgrade, ws::rejection::WebSocketUpgradeRejection},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use rtcchat_core::Store;
use schema::{ChatSchema, build_schema};
use serde_json::json;
use service::ChatService;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub use push::{PushSender, WebPushSender};

/// Largest accepted request body. Images travel inline as data URLs.
pub const MAX_BODY_BYTES: usize = 1_572_864;

const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
     connect-src 'self' ws: wss:; \
     img-src 'self' data: blob:; \
     style-src 'self' 'unsafe-inline'; \
     script-src 'self'; \
     object-src 'none'; \
     frame-ancestors 'self'";

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub schema: ChatSchema,
    pub service: Arc<ChatService>,
}

impl AppState {
    pub fn new(service: ChatService) -> Self {
        let service = Arc::new(service);
        Self {
            schema: build_schema(service.clone()),
            service,
        }
    }
}

/// Build the push sender described by the configuration, if any.
pub fn push_sender_from_config(config: &ServerConfig) -> Option<Arc<dyn PushSender>> {
    let vapid = config.vapid.as_ref()?;
    match WebPushSender::from_pem(&vapid.private_key_pem, &vapid.subject) {
        Ok(sender) => Some(Arc::new(sender)),
        Err(e) => {
            tracing::error!(error = %e, "Push notifications disabled");
            None
        }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.service.config().cors_origins);

    Router::new()
        .route("/", get(get_root).post(graphql_handler))
        .route("/health", get(health_handler))
        .fallback(static_handler)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static(CONTENT_SECURITY_POLICY),
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(auth::ADMIN_TOKEN_HEADER),
        ]);
    if origins.is_empty() {
        return base.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let auth = state.service.authenticate(&headers);
    state
        .schema
        .execute(request.into_inner().data(auth))
        .await
        .into()
}

/// WebSocket upgrade for subscriptions, otherwise the frontend's index.
async fn get_root(
    State(state): State<AppState>,
    protocol: Result<GraphQLProtocol, StatusCode>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    request: Request,
) -> Response {
    match (upgrade, protocol) {
        (Ok(upgrade), Ok(protocol)) => upgrade
            .protocols(ALL_WEBSOCKET_PROTOCOLS)
            .on_upgrade(move |socket| GraphQLWebSocket::new(socket, state.schema, protocol).serve())
            .into_response(),
        (Ok(_), Err(status)) => status.into_response(),
        (Err(_), _) => serve_static(&state, request).await,
    }
}

async fn static_handler(State(state): State<AppState>, request: Request) -> Response {
    serve_static(&state, request).await
}

async fn serve_static(state: &AppState, request: Request) -> Response {
    let Some(dir) = state.service.config().static_dir.clone() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if request.method() != Method::GET && request.method() != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }
    // Unknown paths are client-side routes of the single-page app.
    let index = ServeFile::new(dir.join("index.html"));
    let service = ServeDir::new(dir)
        .append_index_html_on_directories(true)
        .fallback(index);
    match service.oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(e) => {
            tracing::warn!(error = %e, "Static file error");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn health_handler(State(state): State<AppState>) -> Response {
    match state.service.store().stats() {
        Ok(stats) => Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "users": stats.users,
            "connections": stats.connections,
            "messages": stats.messages,
            "live_subscribers": state.service.bus().subscriber_count(),
        }))
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "error" })),
            )
                .into_response()
        }
    }
}

// =============================================================================
// SERVER
// =============================================================================

/// Bind the listener, run the startup cleanup, then serve until Ctrl-C.
pub async fn serve(store: Arc<Store>, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let sender = push_sender_from_config(&config);
    let addr: SocketAddr = config.bind.parse()?;
    let service = ChatService::new(store, config, sender)?;
    let state = AppState::new(service);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "RTCChat server listening");

    if let Err(e) = state.service.cleanup_now() {
        tracing::error!(error = %e, "Startup cleanup failed");
    }

    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
