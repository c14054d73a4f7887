use anyhow::Context;
use clap::Parser;
use retreat_amm::app::{serve, AppState};
use retreat_amm::utils::{logger, validation::Validate};
use retreat_amm::{AppConfig, WsClientFactory};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "amm-server")]
#[command(about = "HTTP endpoint that bootstraps a liquidity pool per request")]
struct Args {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<String>,

    /// Override server.bind_address
    #[arg(long)]
    bind: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load config file '{}'", path))?,
        None => AppConfig::default(),
    };
    if let Some(bind) = &args.bind {
        config.server.bind_address = bind.clone();
    }

    logger::init_server_logger(
        args.verbose || config.monitoring.verbose,
        config.monitoring.json_logs,
    );

    config.validate().context("invalid configuration")?;
    config.server.validate().context("invalid configuration")?;

    let state = Arc::new(AppState::new(
        WsClientFactory::new(config.network.clone()),
        config.pool.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_address))?;
    tracing::info!("🌐 Listening on http://{}", listener.local_addr()?);
    tracing::info!("📡 GET /api/create-amm");

    serve(listener, state).await?;
    Ok(())
}
