mod cli;
mod config;
mod error;
mod init;
mod logging;
mod ws;

use anyhow::Context;
use clap::Parser;

use cli::Cli;
use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref());

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.server_host = host;
    }
    if let Some(port) = cli.port {
        config.server.server_port = port;
    }

    tracing::info!(host = %config.server.server_host, port = config.server.server_port, "starting live-transcripts-server");

    let hub = init::spawn_hub(&config).context("failed to start the session hub")?;
    let app = ws::router(hub.clone());

    let addr = format!("{}:{}", config.server.server_host, config.server.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "listening for subscriber connections");

    let serve = axum::serve(listener, app);
    tokio::select! {
        result = serve => result.context("server error")?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }

    hub.shutdown().await;
    Ok(())
}

/// Loads configuration from an explicit `--config` path, or falls back to
/// built-in defaults if none was given. An explicit path that doesn't exist
/// is a hard error; the absence of any path at all is not.
fn load_config(custom_path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    match custom_path {
        Some(path) => {
            Config::load(path).with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}
