use anyhow::Context;
use authgate::{
    api::routes::create_router,
    utils::toml_config::{AuthGateConfig, LogFormat},
    AppState,
};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Credential issuance and session validation server
#[derive(Debug, Parser)]
#[command(name = "authgate-server", version, about)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "AUTHGATE_CONFIG", default_value = "authgate.toml")]
    config: PathBuf,

    /// Override the configured bind host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = AuthGateConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    init_tracing(&config.server.log_level, config.server.log_format);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::from_config(config)
        .await
        .context("initializing application state")?;
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("authgate-server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("authgate={0},tower_http={0}", log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("shutting down");
}
