use std::sync::Arc;

use clap::Parser;
use salescope_core::SalescopeConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use salescope_server::http::{self, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "salescope.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match SalescopeConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging — RUST_LOG wins, config log level otherwise
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    // Connect to the analytical store. Unreachable store is fatal: every
    // page of the surface depends on it, so there is no degraded mode.
    let pool = match salescope_core::db::create_pool_with_retry(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to the analytical store: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match salescope_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Salescope store health check passed");
        return Ok(());
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = Arc::new(AppState::new(pool, config));
    http::start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
