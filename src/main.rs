//! Trialcards sync binary entrypoint wiring the catalog, the local store, the remote supervisor
//! and the REST/SSE layers.

use std::{env, net::SocketAddr};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trialcards_sync::{
    config::AppConfig,
    dao::local_store::{FileBackend, LocalStatsStore},
    routes,
    state::{AppState, SharedState, catalog::Catalog},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let catalog = Catalog::load(&config.catalog_path)
        .with_context(|| format!("loading card catalog {}", config.catalog_path.display()))?;
    info!(cards = catalog.len(), "card catalog loaded");

    let local = match FileBackend::open(&config.data_dir) {
        Ok(backend) => LocalStatsStore::new(backend),
        Err(err) => {
            warn!(
                error = %err,
                data_dir = %config.data_dir.display(),
                "local storage unavailable; progress is kept in memory only"
            );
            LocalStatsStore::in_memory()
        }
    };

    let app_state = AppState::new(config, catalog, local);
    spawn_remote_supervisor(app_state.clone());

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Start supervising the CouchDB remote store when it is configured; otherwise stay local-only.
#[cfg(feature = "couch-store")]
fn spawn_remote_supervisor(state: SharedState) {
    use std::sync::Arc;

    use trialcards_sync::{
        dao::{
            remote_store::{
                RemoteStatsStore,
                couchdb::{CouchConfig, CouchRemoteStore},
            },
            storage::StorageError,
        },
        services::remote_supervisor,
    };

    let couch_config = match CouchConfig::from_env() {
        Ok(couch_config) => couch_config.with_timeout(state.config().remote_timeout),
        Err(err) => {
            info!(reason = %err, "remote store not configured; running local-only");
            return;
        }
    };

    tokio::spawn(remote_supervisor::run(state, move || {
        let couch_config = couch_config.clone();
        async move {
            let store = CouchRemoteStore::connect(couch_config).await?;
            Ok::<_, StorageError>(Arc::new(store) as Arc<dyn RemoteStatsStore>)
        }
    }));
}

#[cfg(not(feature = "couch-store"))]
fn spawn_remote_supervisor(_state: SharedState) {
    info!("built without a remote store backend; running local-only");
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
