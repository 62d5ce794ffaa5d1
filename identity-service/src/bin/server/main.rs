use std::sync::Arc;

use auth::Authenticator;
use auth::JwtHandler;
use auth::PasswordHasher;
use identity_service::config::Config;
use identity_service::domain::identity::ports::CredentialStore;
use identity_service::domain::identity::service::IdentityService;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::repositories::InMemoryCredentialStore;
use identity_service::outbound::repositories::PostgresCredentialStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        persistent_store = config.database.url.is_some(),
        token_ttl_hours = config.jwt.expiration_hours,
        leeway_seconds = config.jwt.leeway_seconds,
        "Configuration loaded"
    );

    let password_hasher = PasswordHasher::with_params(
        config.password.memory_kib,
        config.password.iterations,
        config.password.parallelism,
    )?;
    let jwt_handler =
        JwtHandler::new(config.jwt.secret.as_bytes()).with_leeway(config.jwt.leeway_seconds);
    let authenticator = Arc::new(Authenticator::from_parts(password_hasher, jwt_handler));

    match config.database.url.as_deref() {
        Some(url) => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(config.database.acquire_timeout())
                .connect(url)
                .await?;
            tracing::info!(
                max_connections = config.database.max_connections,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            serve(PostgresCredentialStore::new(pg_pool), authenticator, &config).await
        }
        None => {
            tracing::warn!("No database.url configured; identities are kept in memory only");
            serve(InMemoryCredentialStore::new(), authenticator, &config).await
        }
    }
}

async fn serve<CS: CredentialStore>(
    store: CS,
    authenticator: Arc<Authenticator>,
    config: &Config,
) -> Result<(), anyhow::Error> {
    let identity_service = Arc::new(IdentityService::new(
        Arc::new(store),
        authenticator,
        config.registration.policy()?,
        config.jwt.token_ttl()?,
    ));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    axum::serve(http_listener, create_router(identity_service)).await?;
    tracing::info!("Server exited");

    Ok(())
}
