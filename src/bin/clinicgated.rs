//! clinicgate daemon - patient record HTTP server

use anyhow::{Context, Result};
use clap::Parser;
use clinicgate::config::{
    ttl_from_hours, AuthConfig, ServerConfig, DEFAULT_HASH_MEMORY_KIB, DEFAULT_HASH_WORK_FACTOR,
};
use clinicgate::server::ClinicServer;
use clinicgate::storage::{PostgresConfig, PostgresStore};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "clinicgated")]
#[command(about = "clinicgate patient record server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "CLINICGATE_BIND")]
    bind: String,

    /// Token signing secret
    #[arg(long, env = "CLINICGATE_SECRET", hide_env_values = true)]
    secret: String,

    /// Token lifetime in hours
    #[arg(long, env = "CLINICGATE_TOKEN_TTL_HOURS", default_value_t = 24)]
    token_ttl_hours: u64,

    /// Argon2 iterations
    #[arg(long, env = "CLINICGATE_HASH_WORK_FACTOR", default_value_t = DEFAULT_HASH_WORK_FACTOR)]
    hash_work_factor: u32,

    /// Argon2 memory cost in KiB
    #[arg(long, env = "CLINICGATE_HASH_MEMORY_KIB", default_value_t = DEFAULT_HASH_MEMORY_KIB)]
    hash_memory_kib: u32,

    /// Database URL; falls back to DB_HOST/DB_PORT/DB_USER/DB_PASSWORD/DB_NAME
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    run_server(args).await
}

async fn run_server(args: Args) -> Result<()> {
    let bind_addr = args.bind.parse().context("Invalid bind address")?;

    let ttl = ttl_from_hours(args.token_ttl_hours).context("Invalid token lifetime")?;
    let auth = AuthConfig::new(args.secret.into_bytes())
        .token_ttl(ttl)
        .hash_cost(args.hash_work_factor, args.hash_memory_kib);
    let config = ServerConfig::new(bind_addr, auth);

    let db_config = match &args.database_url {
        Some(url) => PostgresConfig::from_url(url).context("Invalid DATABASE_URL")?,
        None => PostgresConfig::from_env().context("Database configuration missing")?,
    };
    let store = Arc::new(PostgresStore::new(db_config).await?);
    let server = ClinicServer::new(config, store.clone(), store)?;

    info!(addr = %args.bind, "clinicgate daemon starting");

    // Run server with graceful shutdown on signals
    server.run(shutdown_signal()).await?;

    info!("clinicgate daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
