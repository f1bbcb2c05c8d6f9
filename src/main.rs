use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod error;
mod models;
mod push;
mod services;
mod storage;
#[cfg(test)]
mod test_utils;

use config::Config;
use push::{fcm::FcmTransport, PushTransport};
use services::{dispatcher::BroadcastDispatcher, registry::TokenRegistry, scheduler::ScheduleManager};
use storage::{memory::MemoryTokenStore, redis::RedisTokenStore, TokenStore};

#[derive(Clone)]
pub struct AppState {
    pub registry: TokenRegistry,
    pub dispatcher: Arc<BroadcastDispatcher>,
    pub scheduler: Arc<ScheduleManager>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load();
    tracing::info!("Starting server in {} mode", config.server.environment);

    // Initialize token store
    let store: Arc<dyn TokenStore> = if config.uses_memory_store() {
        tracing::warn!("Using in-memory token store; tokens are lost on restart");
        Arc::new(MemoryTokenStore::new())
    } else {
        let store = RedisTokenStore::new(&config.database.url, &config.database.tokens_collection)
            .await
            .context("failed to connect to the token store")?;
        tracing::info!("Connected to Redis");
        Arc::new(store)
    };

    // Initialize push provider
    let credentials = config.firebase.credentials().context(
        "FIREBASE_PROJECT_ID, FIREBASE_CLIENT_EMAIL and FIREBASE_PRIVATE_KEY must be set",
    )?;
    let transport: Arc<dyn PushTransport> =
        Arc::new(FcmTransport::new(credentials).context("invalid Firebase service account")?);
    tracing::info!("Push provider initialized");

    // Wire services
    let registry = TokenRegistry::new(store);
    let dispatcher = Arc::new(BroadcastDispatcher::new(registry.clone(), transport));
    let scheduler = Arc::new(ScheduleManager::new(dispatcher.clone()));

    // Create app state
    let state = AppState {
        registry,
        dispatcher,
        scheduler: scheduler.clone(),
    };

    let app = api::router::create_router(state);

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server running on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
