use anyhow::Context;
use axum::{Router, routing::post};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use claude_code_router::{
    client::OpenAIClient,
    config::RouterConfig,
    handler::{AppState, handle_messages},
    plugin::{BuiltinPlugins, PluginRegistry},
};

#[derive(Debug, Parser)]
#[command(version, about = "Route Claude Messages API traffic to OpenAI-compatible backends")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Override the listen address from the config file
    #[arg(short, long)]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = RouterConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config))?;
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    config.validate()?;

    let plugins = PluginRegistry::load(&config.plugins, &BuiltinPlugins)?;
    let upstream = OpenAIClient::new()?;

    info!("Starting Claude Code Router...");
    info!("  Listen: {}", config.server.listen_addr);
    info!("  Default route: {}", config.router.default);
    info!("  Providers: {}", config.providers.len());
    info!("  Plugins: {:?}", plugins.names().collect::<Vec<_>>());

    let listen_addr = config.server.listen_addr.clone();
    let state = Arc::new(AppState {
        config,
        plugins: Arc::new(plugins),
        upstream: Arc::new(upstream),
    });

    let app = Router::new()
        .route("/v1/messages", post(handle_messages))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", listen_addr))?;
    info!("Router ready!");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
