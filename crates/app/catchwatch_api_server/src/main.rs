//! Catchwatch API server binary.
//!
//! Serves login, session and permission routes backed by PostgreSQL.

use std::sync::Arc;

use catchwatch_api::{AppState, config::ApiConfig};
use catchwatch_core::auth::authorizer::Authorizer;
use catchwatch_core::auth::jwt::{SessionCodec, SessionConfig};
use catchwatch_core::auth::store::PgCredentialStore;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "catchwatch_api_server", about = "Catchwatch API server")]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "BIND_ADDR", default_value = "127.0.0.1:3100")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/catchwatch"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Mark the session cookie `Secure` (serve behind TLS).
    #[arg(long, env = "COOKIE_SECURE", default_value_t = false)]
    cookie_secure: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(
                    "info,catchwatch_api=debug,catchwatch_core=debug",
                )
            }),
        )
        .init();

    let args = Args::parse();

    info!(bind_addr = %args.bind_addr, "starting catchwatch_api_server");
    info!(
        max_connections = args.max_connections,
        "configuring connection pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    catchwatch_core::migrate::migrate(&pool).await?;

    let config = ApiConfig {
        bind_addr: args.bind_addr,
        session_secret: catchwatch_core::auth::jwt::resolve_session_secret(),
        cookie_secure: args.cookie_secure,
    };
    info!(?config, "configuration resolved");

    let codec = SessionCodec::new(&SessionConfig::new(config.session_secret.clone()))?;
    let store = PgCredentialStore::new(pool);

    let state = AppState {
        authorizer: Arc::new(Authorizer::new(Arc::new(store))),
        codec: Arc::new(codec),
        config: config.clone(),
    };

    let app = catchwatch_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}
