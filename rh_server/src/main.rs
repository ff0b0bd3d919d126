//! Referral program server.
//!
//! Connects to PostgreSQL, applies migrations, seeds the default administrator
//! and serves the JSON API until Ctrl+C.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Error};
use pico_args::Arguments;
use referral_hub::{Database, LocalImageStore};
use rh_server::{
    api::{self, AppState},
    config::ServerConfig,
    logging, metrics,
};
use tower_http::services::ServeDir;
use tracing::info;

const HELP: &str = "\
Run the referral program server

USAGE:
  rh_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  DATABASE_URL             PostgreSQL connection string
  JWT_SECRET               JWT signing secret (required, >= 32 chars)
  PASSWORD_PEPPER          Password hashing pepper (required, >= 16 chars)
  UPLOAD_DIR               Directory for payment screenshots [default: uploads]
  PUBLIC_UPLOAD_URL        URL prefix screenshots are served under [default: /uploads]
  ALLOW_ADMIN_SIGNUP       Open POST /api/v1/auth/admin-signup [default: false]
  METRICS_ENABLED          Serve Prometheus metrics on /metrics [default: false]
  DEFAULT_ADMIN_EMAIL      Administrator seeded at startup (with _NAME and _PASSWORD)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs
            .opt_value_from_str("--bind")
            .context("Invalid --bind address")?,
        database_url: pargs
            .opt_value_from_str("--db-url")
            .context("Invalid --db-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)?;
    config.validate()?;
    info!("Starting referral server at {}", config.bind);

    let db = Database::new(&config.database)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    info!("Database connected and migrated");

    let images = Arc::new(LocalImageStore::new(
        config.uploads.dir.clone(),
        config.uploads.public_url.clone(),
    ));
    let mut state = AppState::new(&db.repositories(), &config.security, images)
        .with_admin_signup(config.allow_admin_signup);

    if let Some(admin) = &config.default_admin {
        match state.auth.ensure_default_admin(admin).await? {
            Some(user) => info!("Seeded default administrator {}", user.email),
            None => info!("Default administrator already present"),
        }
    }

    if config.metrics_enabled {
        let handle = metrics::init_metrics().map_err(Error::msg)?;
        state = state.with_metrics(handle);
        info!("Prometheus metrics enabled on /metrics");
    }

    let mut app = api::create_router(state);
    if config.uploads.public_url.starts_with('/') {
        app = app.nest_service(
            &config.uploads.public_url,
            ServeDir::new(&config.uploads.dir),
        );
    }

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");
    db.close().await;

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install CTRL+C signal handler: {}", err);
        std::future::pending::<()>().await;
    }
}
