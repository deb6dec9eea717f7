use backend::config::Config;
use backend::shutdown::{shutdown_signal, spawn_expiry_sweeper};
use backend::store::EventStore;
use backend::{app, AppState};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::parse();

    tracing::info!("Starting santa-draw v{}", env!("CARGO_PKG_VERSION"));

    let store = match config.persist_path() {
        Some(path) => EventStore::with_persistence(path).await,
        None => {
            tracing::warn!("Persistence disabled, draws live in memory only");
            EventStore::default()
        }
    };

    let sweeper = spawn_expiry_sweeper(store.clone(), config.sweep_interval());
    let app = app(AppState::new(store));

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!("Failed to bind {}: {}", addr, e);
        e
    })?;
    tracing::info!("Server listening on {}", addr);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.notify_one();
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
