mod bootstrap;
mod health;

use anyhow::Result;
use sheetbot_core::config::{AppConfig, LoadOptions, TransportMode};

fn init_logging(config: &AppConfig) {
    use sheetbot_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    // Stdout carries replies in stdio mode, so logs go to stderr.
    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_max_level(log_level)
                .compact()
                .init();
        }
        Pretty => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_max_level(log_level)
                .pretty()
                .init();
        }
        Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_max_level(log_level)
                .json()
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config);

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        health::HealthState::new(app.lookup.clone(), app.config.svn.binary.clone()),
    )
    .await?;

    let transport_mode = app.config.bot.transport;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        transport_mode = ?transport_mode,
        "sheetbot-server started"
    );

    tokio::select! {
        result = app.runner.start() => {
            result?;
            // The stdio stream ending means the session is over; other transports keep the
            // health endpoint up until interrupted.
            if transport_mode != TransportMode::Stdio {
                wait_for_shutdown().await?;
            }
        }
        result = wait_for_shutdown() => result?,
    }

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "sheetbot-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
