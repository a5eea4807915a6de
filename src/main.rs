#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

use faena_server::api::ServiceContainer;
use faena_server::cache::ResponseCache;
use faena_server::config::Config;
use faena_server::services::auth_service::AuthService;
use faena_server::services::conversation_service::ConversationService;
use faena_server::services::crud_service::CrudService;
use faena_server::services::gateway::RoomRegistry;
use faena_server::services::push::LogPushProvider;
use faena_server::storage::conversation_repo::ConversationRepository;
use faena_server::storage::crud_repo::CrudRepository;
use faena_server::storage::user_repo::UserRepository;
use faena_server::{storage, telemetry};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::Instrument;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load();
    telemetry::init_telemetry(&config.telemetry)?;

    faena_server::setup_panic_hook();

    let boot_span = tracing::info_span!("boot_server");
    let (listener, app_router, shutdown_tx, shutdown_rx) = async {
        // Phase 1: Infrastructure
        let pool = storage::init_pool(&config.database_url).await?;
        storage::run_migrations(&pool).await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        faena_server::spawn_signal_handler(shutdown_tx.clone());

        // Phase 2: Component wiring
        let cache = ResponseCache::new(config.cache.capacity, config.cache.ttl_secs);
        let rooms = RoomRegistry::new();
        let push_provider = Arc::new(LogPushProvider);

        let user_repo = UserRepository::new(pool.clone());
        let services = ServiceContainer {
            pool: pool.clone(),
            auth_service: AuthService::new(config.auth.clone(), user_repo.clone()),
            crud_service: CrudService::new(CrudRepository::new(pool.clone()), cache),
            conversation_service: ConversationService::new(
                ConversationRepository::new(pool),
                user_repo,
                rooms.clone(),
                push_provider,
            ),
            rooms,
        };

        // Phase 3: Listener and router
        let app_router = faena_server::api::app_router(config.clone(), services, shutdown_rx.clone());

        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
        tracing::info!(address = %addr, "listening");
        let listener = tokio::net::TcpListener::bind(addr).await?;

        Ok::<(tokio::net::TcpListener, axum::Router, watch::Sender<bool>, watch::Receiver<bool>), anyhow::Error>((
            listener,
            app_router,
            shutdown_tx,
            shutdown_rx,
        ))
    }
    .instrument(boot_span)
    .await?;

    // Phase 4: Serve until a shutdown signal arrives
    let mut serve_rx = shutdown_rx.clone();
    let server = axum::serve(listener, app_router.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            let _ = serve_rx.wait_for(|&s| s).await;
        });

    // Phase 5: Bound the connection drain once the shutdown flag is up
    let mut drain_rx = shutdown_rx.clone();
    tokio::select! {
        res = server => {
            if let Err(e) = res {
                tracing::error!(error = %e, "Server error");
            }
        }
        () = async {
            let _ = drain_rx.wait_for(|&s| s).await;
            tokio::time::sleep(std::time::Duration::from_secs(config.server.shutdown_timeout_secs)).await;
        } => {
            tracing::warn!("Timeout waiting for connections to drain");
        }
    }

    let _ = shutdown_tx.send(true);
    tracing::info!("Shutdown complete");

    Ok(())
}
