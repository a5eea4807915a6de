#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::panic,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    missing_debug_implementations,
    unreachable_pub,
    clippy::print_stderr
)]

use faena_server::api::ServiceContainer;
use faena_server::cache::ResponseCache;
use faena_server::config::{AuthConfig, CacheConfig, Config, LogFormat, RateLimitConfig, ServerConfig, TelemetryConfig, WsConfig};
use faena_server::domain::auth;
use faena_server::services::auth_service::AuthService;
use faena_server::services::conversation_service::ConversationService;
use faena_server::services::crud_service::CrudService;
use faena_server::services::gateway::RoomRegistry;
use faena_server::services::push::LogPushProvider;
use faena_server::storage;
use faena_server::storage::conversation_repo::ConversationRepository;
use faena_server::storage::crud_repo::CrudRepository;
use faena_server::storage::user_repo::UserRepository;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Once;
use tokio::sync::watch;
use uuid::Uuid;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("faena_server=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap())
            .add_directive("tungstenite=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

pub fn test_config(database_url: String) -> Config {
    Config {
        database_url,
        server: ServerConfig { host: "127.0.0.1".to_string(), port: 0, shutdown_timeout_secs: 2 },
        auth: AuthConfig { jwt_secret: "test_secret".to_string(), token_ttl_secs: 3600 },
        cache: CacheConfig { ttl_secs: 60, capacity: 500 },
        rate_limit: RateLimitConfig { per_second: 10_000, burst: 10_000, auth_per_second: 10_000, auth_burst: 10_000 },
        websocket: WsConfig { outbound_buffer_size: 32 },
        telemetry: TelemetryConfig { otlp_endpoint: None, log_format: LogFormat::Text },
    }
}

pub struct TestApp {
    pub server_url: String,
    pub ws_url: String,
    pub client: reqwest::Client,
    pub pool: PgPool,
    pub config: Config,
    pub shutdown_tx: watch::Sender<bool>,
}

pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestApp {
    /// Boots a full server on an ephemeral port against the database named
    /// by `TEST_DATABASE_URL`. Returns `None` when that variable is unset so
    /// the suite can run without a database.
    pub async fn try_spawn() -> Option<Self> {
        let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping");
            return None;
        };
        setup_tracing();

        let pool = storage::init_pool(&database_url).await.expect("Failed to connect to DB. Is Postgres running?");
        storage::run_migrations(&pool).await.expect("Failed to run migrations");

        let config = test_config(database_url);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let cache = ResponseCache::new(config.cache.capacity, config.cache.ttl_secs);
        let rooms = RoomRegistry::new();
        let user_repo = UserRepository::new(pool.clone());
        let services = ServiceContainer {
            pool: pool.clone(),
            auth_service: AuthService::new(config.auth.clone(), user_repo.clone()),
            crud_service: CrudService::new(CrudRepository::new(pool.clone()), cache),
            conversation_service: ConversationService::new(
                ConversationRepository::new(pool.clone()),
                user_repo,
                rooms.clone(),
                Arc::new(LogPushProvider),
            ),
            rooms,
        };

        let router = faena_server::api::app_router(config.clone(), services, shutdown_rx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to read local addr");

        tokio::spawn(async move {
            let _ = axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await;
        });

        Some(Self {
            server_url: format!("http://{addr}/api"),
            ws_url: format!("ws://{addr}/ws"),
            client: reqwest::Client::new(),
            pool,
            config,
            shutdown_tx,
        })
    }

    /// Inserts a user directly and logs in through the API.
    pub async fn register_user(&self, role: &str) -> TestUser {
        let email = format!("user-{}@test.local", Uuid::new_v4());
        let password = "correct-horse-battery";
        let hash = auth::hash_password(password).expect("Failed to hash password");

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash, role) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&email)
        .bind(&hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert test user");

        let resp = self
            .client
            .post(format!("{}/auth/login", self.server_url))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Login request failed");
        assert_eq!(resp.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = resp.json().await.expect("Login response was not JSON");
        let token = body["token"].as_str().expect("Login response had no token").to_string();

        TestUser { id, email, token }
    }

    pub fn authed(&self, req: reqwest::RequestBuilder, user: &TestUser) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", user.token))
    }
}
