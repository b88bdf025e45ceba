//! Chat Quiz Back binary entrypoint wiring the REST layer and the quiz store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_quiz_back::{
    config::AppConfig,
    dao::quiz_store::InMemoryQuizStore,
    routes,
    services::catalog_service,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());
    install_store(&app_state).await?;

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the storage backend: MongoDB when `MONGO_URI` is set, the seeded in-memory store otherwise.
async fn install_store(state: &SharedState) -> anyhow::Result<()> {
    #[cfg(feature = "mongo-store")]
    if env::var_os("MONGO_URI").is_some() {
        return spawn_mongo_supervisor(state.clone()).await;
    }

    let store = Arc::new(InMemoryQuizStore::new());
    let config = state.config();
    catalog_service::seed_catalog(store.as_ref(), &config.rules(), config.catalog())
        .await
        .context("seeding in-memory catalog")?;
    state.set_quiz_store(store).await;
    info!("using in-memory quiz store");
    Ok(())
}

#[cfg(feature = "mongo-store")]
async fn spawn_mongo_supervisor(state: SharedState) -> anyhow::Result<()> {
    use chat_quiz_back::{
        dao::{
            quiz_store::{
                QuizStore,
                mongodb::{MongoConfig, MongoQuizStore},
            },
            storage::StorageError,
        },
        services::storage_supervisor,
    };
    use tracing::warn;

    let mongo_config = MongoConfig::from_env()
        .await
        .context("reading MongoDB configuration")?;
    info!(database = %mongo_config.database_name, "using MongoDB quiz store");

    let seed_state = state.clone();
    let connect = move || {
        let mongo_config = mongo_config.clone();
        let seed_state = seed_state.clone();
        async move {
            let store: Arc<dyn QuizStore> = Arc::new(
                MongoQuizStore::connect(mongo_config)
                    .await
                    .map_err(StorageError::from)?,
            );
            let config = seed_state.config();
            if let Err(err) =
                catalog_service::seed_catalog(store.as_ref(), &config.rules(), config.catalog())
                    .await
            {
                warn!(error = %err, "failed to seed MongoDB catalog");
            }
            Ok::<_, StorageError>(store)
        }
    };

    tokio::spawn(storage_supervisor::run(state, connect));
    Ok(())
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

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
