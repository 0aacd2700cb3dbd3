//! Colony engine server.
//!
//! Seeds a few colonies, runs the tick loop until Ctrl-C and writes every
//! broadcast message to stdout as one JSON line. An optional first argument
//! names a RON engine config.

use std::io::Write;
use std::path::PathBuf;

use exo_core::config::EngineConfig;
use exo_server::{load_engine_config, GameServer, ServerConfig};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting colony engine server");

    let engine_config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => match load_engine_config(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("FATAL: {} ({})", e, path.display());
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let config = ServerConfig::from_engine(&engine_config);
    let server = GameServer::new(engine_config, config);
    if let Err(e) = server.initialise(server.config().initial_colonies).await {
        tracing::error!(error = %e, "Failed to seed colonies");
    }

    let (snapshot, mut rx) = server.subscribe().await;
    let forward = tokio::spawn(async move {
        let mut stdout = std::io::stdout();
        if let Ok(line) = snapshot.to_json() {
            let _ = writeln!(stdout, "{line}");
        }
        loop {
            match rx.recv().await {
                Ok(message) => match message.to_json() {
                    Ok(line) => {
                        let _ = writeln!(stdout, "{line}");
                    }
                    Err(e) => tracing::warn!(error = %e, "Failed to serialize message"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Output lagged behind the tick loop");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            }
        })
        .await;

    drop(server);
    let _ = forward.await;
    tracing::info!("Server stopped");
}
