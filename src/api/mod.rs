use crate::config::Config;
use crate::registry;
use crate::services::auth_service::AuthService;
use crate::services::conversation_service::ConversationService;
use crate::services::crud_service::CrudService;
use crate::services::gateway::RoomRegistry;
use crate::storage::DbPool;
use axum::body::Body;
use axum::http::Request;
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod conversations;
pub mod crud;
pub mod gateway;
pub mod health;
pub mod middleware;

/// Tables whose routes are owned by a dedicated handler module instead of
/// the generic CRUD factory.
const RESERVED_TABLES: &[&str] = &["conversations"];

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Config,
    pub pool: DbPool,
    pub auth_service: AuthService,
    pub crud_service: CrudService,
    pub conversation_service: ConversationService,
    pub rooms: RoomRegistry,
    pub shutdown_rx: tokio::sync::watch::Receiver<bool>,
}

#[derive(Debug)]
pub struct ServiceContainer {
    pub pool: DbPool,
    pub auth_service: AuthService,
    pub crud_service: CrudService,
    pub conversation_service: ConversationService,
    pub rooms: RoomRegistry,
}

/// Configures and returns the application router.
///
/// # Panics
/// Panics if the rate limiter configuration cannot be constructed.
pub fn app_router(config: Config, services: ServiceContainer, shutdown_rx: tokio::sync::watch::Receiver<bool>) -> Router {
    let std_interval_ns = 1_000_000_000 / config.rate_limit.per_second.max(1);
    let standard_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(std_interval_ns)
            .burst_size(config.rate_limit.burst)
            .finish()
            .expect("Failed to build standard rate limiter config"),
    );

    // Stricter limits for the credential-check endpoint
    let auth_interval_ns = 1_000_000_000 / config.rate_limit.auth_per_second.max(1);
    let auth_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_nanosecond(auth_interval_ns)
            .burst_size(config.rate_limit.auth_burst)
            .finish()
            .expect("Failed to build auth rate limiter config"),
    );

    let state = AppState {
        config,
        pool: services.pool,
        auth_service: services.auth_service,
        crud_service: services.crud_service,
        conversation_service: services.conversation_service,
        rooms: services.rooms,
        shutdown_rx,
    };

    let auth_routes = Router::new().route("/auth/login", post(auth::login)).layer(GovernorLayer::new(auth_conf));

    let mut api_routes = Router::new()
        .route("/health", get(health::health))
        .route("/conversations/create", post(conversations::create_or_get))
        .route("/conversations/user/{userId}", get(conversations::list))
        .route(
            "/conversations/{conversationId}",
            delete(conversations::delete_conversation),
        )
        .route(
            "/conversations/{conversationId}/messages",
            get(conversations::get_messages).post(conversations::send_message),
        )
        .route(
            "/conversations/{conversationId}/messages/{messageId}",
            delete(conversations::delete_message),
        )
        .route(
            "/conversations/{conversationId}/messages/{messageId}/read",
            put(conversations::mark_read),
        );

    for desc in registry::all() {
        if RESERVED_TABLES.contains(&desc.name) {
            continue;
        }
        api_routes = api_routes.nest(&format!("/{}", desc.name), crud::table_router(desc));
    }

    let api_routes = api_routes.layer(GovernorLayer::new(standard_conf));

    Router::new()
        .route("/ws", get(gateway::websocket_handler))
        .nest("/api", auth_routes.merge(api_routes))
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::new(axum::http::HeaderName::from_static("x-request-id")))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(move |request: &Request<Body>| {
                    let request_id = request
                        .extensions()
                        .get::<tower_http::request_id::RequestId>()
                        .map(|id| id.header_value().to_str().unwrap_or_default())
                        .unwrap_or_default()
                        .to_string();

                    tracing::info_span!(
                        "request",
                        "request_id" = %request_id,
                        "http.request.method" = %request.method(),
                        "url.path" = %request.uri().path(),
                        "http.response.status_code" = tracing::field::Empty,
                        "otel.kind" = "server",
                        "user_id" = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, _span: &tracing::Span| {
                        let status = response.status();
                        tracing::Span::current().record("http.response.status_code", status.as_u16());

                        tracing::info!(
                            latency_ms = %latency.as_millis(),
                            status = %status.as_u16(),
                            "request completed"
                        );
                    },
                )
                .on_failure(|error, _latency, _span: &tracing::Span| {
                    tracing::error!(error = %error, "request failed");
                }),
        )
        .layer(SetRequestIdLayer::new(
            axum::http::HeaderName::from_static("x-request-id"),
            middleware::MakeRequestUuid,
        ))
        .with_state(state)
}
