use enrollment_intake::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    repository::{RepositoryState, SqliteRepository},
    storage::{DiskImageStore, ImageStore, ImageStoreState},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Initializes configuration, logging, the record store, the content
/// directory, and the HTTP server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise verbose for this crate, request-level for tower_http.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "enrollment_intake=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    if config.uses_default_admin_token() {
        tracing::warn!(
            "ADMIN_TOKEN is not set; the admin API accepts the built-in default token. \
             Set ADMIN_TOKEN before exposing this service."
        );
    }

    // 4. Record Store (SQLite)
    let sqlite = SqliteRepository::connect(&config.db_url)
        .await
        .expect("FATAL: Failed to open the SQLite database. Check DATABASE_URL.");
    sqlite
        .init_schema()
        .await
        .expect("FATAL: Failed to create the students table.");
    tracing::info!(db_url = %config.db_url, "Record store ready");

    let repo = Arc::new(sqlite) as RepositoryState;

    // 5. Content Directory
    let disk = DiskImageStore::new(&config.upload_dir);
    disk.ensure_dir()
        .await
        .expect("FATAL: Failed to create the upload directory. Check UPLOAD_DIR.");
    tracing::info!(upload_dir = %disk.root().display(), "Content directory ready");

    let images = Arc::new(disk) as ImageStoreState;

    // 6. Unified State Assembly
    let port = config.port;
    let app_state = AppState::new(repo, images, config);

    // Expired rate limit windows are pruned once a minute.
    let limits = app_state.limits.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        loop {
            ticker.tick().await;
            limits.cleanup();
        }
    });

    // 7. Router and Server Startup
    let app = create_router(app_state);

    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(address)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check PORT.");

    tracing::info!("Listening on {}", address);
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{}/swagger-ui", port);

    // Peer addresses are needed by the per-address rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("FATAL: HTTP server terminated unexpectedly.");
}
