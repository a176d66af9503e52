use sg_service::config::Config;
use sg_service::handlers::auth_handler::AppState;
use sg_service::repositories::{PgApplicationRegistry, PgIdentityStore};
use sg_service::routes;
use sg_service::services::authenticator::TokenAuthenticator;
use sg_service::services::fallback::FallbackRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sg_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ScribeGate");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!("Configuration loaded successfully");

    // Metrics exporter; a failure here degrades observability, not service.
    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new().install() {
        warn!("Failed to install Prometheus exporter: {}", e);
    }

    // Initialize database connection pool
    info!("Connecting to database...");
    let db_pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    info!("Database connection established");

    // Apply schema migrations
    sqlx::migrate!().run(&db_pool).await.map_err(|e| {
        error!("Failed to run database migrations: {}", e);
        e
    })?;

    info!("Database migrations applied");

    // Wire the authentication pipeline
    let registry = Arc::new(PgApplicationRegistry::new(db_pool.clone()));
    let identities = Arc::new(PgIdentityStore::new(db_pool.clone()));
    let fallbacks = FallbackRegistry::with_builtins();
    let authenticator = Arc::new(TokenAuthenticator::new(
        &config,
        registry,
        identities,
        &fallbacks,
    ));

    // Parse bind address before moving config
    let bind_address = config.bind_address.clone();

    // Create application state
    let state = Arc::new(AppState {
        pool: db_pool,
        config,
        authenticator,
    });

    // Build application routes
    let app = routes::build_routes(state);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("ScribeGate listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
