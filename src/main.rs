use std::{process, sync::Arc, time::Duration};

use taccuino::{
    application::{
        error::AppError, reader::ContentReader, secrets::SecretToken, store::ContentStore,
        writer::ContentWriter,
    },
    cache::ResponseCache,
    config::{self, StoreBackend},
    infra::{
        error::InfraError,
        http::{self, ApiState, PublicState, RouterState},
        store::{FsStore, MemoryStore},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let store = build_store(&settings)?;
    let cache = settings
        .cache
        .capacity
        .map(|capacity| Arc::new(ResponseCache::new(capacity, settings.cache.shared_max_age)));

    let state = RouterState {
        public: PublicState::new(
            ContentReader::new(store.clone()),
            cache.clone(),
            &settings.cache,
        ),
        api: ApiState {
            writer: ContentWriter::new(store),
            publish_token: SecretToken::new(settings.auth.publish_secret.clone()),
            webhook_token: SecretToken::new(settings.auth.webhook_secret.clone()),
            cache,
        },
    };

    if settings.auth.publish_secret.is_none() {
        warn!(
            target = "taccuino::server",
            "publish secret is not configured, the publish endpoint will reject every request"
        );
    }
    if settings.auth.webhook_secret.is_none() {
        warn!(
            target = "taccuino::server",
            "webhook secret is not configured, the webhook endpoint will reject every request"
        );
    }

    serve_http(&settings, state).await
}

fn build_store(settings: &config::Settings) -> Result<Arc<dyn ContentStore>, AppError> {
    match settings.store.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StoreBackend::Filesystem => {
            let store = FsStore::new(settings.store.root.clone())
                .map_err(|err| AppError::from(InfraError::Io(err)))?;
            Ok(Arc::new(store))
        }
    }
}

async fn serve_http(settings: &config::Settings, state: RouterState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "taccuino::server",
        addr = %settings.server.addr,
        backend = ?settings.store.backend,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to install shutdown signal handler");
        return;
    }

    info!(
        target = "taccuino::server",
        grace_secs = grace.as_secs(),
        "shutdown signal received, draining connections"
    );

    // Hard stop if draining outlives the configured window.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(
            target = "taccuino::server",
            "graceful shutdown window elapsed, exiting"
        );
        process::exit(0);
    });
}
