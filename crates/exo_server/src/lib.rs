//! # Colony Engine Server
//!
//! Tick-loop service around the colony engine.
//!
//! A `tokio` interval drives [`Engine::tick`]. The engine sits behind one
//! lock, so colony creation from outside the loop is serialized against
//! ticks. After each tick completes and the lock is released, the tick's
//! transport messages are fanned out on a broadcast channel; slow
//! subscribers lag and drop messages rather than holding up the next tick.
//!
//! The network transport itself is left to the embedding process, which
//! subscribes to the channel and forwards messages to its clients.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use exo_core::config::EngineConfig;
use exo_core::error::EngineError;
use exo_core::factory::ColonySpec;
use exo_core::protocol::ServerMessage;
use exo_core::simulation::Engine;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Errors surfaced to callers of the server handle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The engine rejected an operation.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// A colony could not be rendered as JSON.
    #[error("Failed to serialize colony: {0}")]
    Serialize(#[from] serde_json::Error),
    /// Failed to read the config file.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Time between ticks.
    pub tick_interval: Duration,
    /// Messages buffered per subscriber before it starts lagging.
    pub channel_capacity: usize,
    /// Random colonies seeded at startup.
    pub initial_colonies: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_engine(&EngineConfig::default())
    }
}

impl ServerConfig {
    /// Server settings matching the engine's nominal tick interval.
    #[must_use]
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            tick_interval: Duration::from_secs_f64(config.tick_interval),
            channel_capacity: 1024,
            initial_colonies: 3,
        }
    }
}

/// Load an engine config from a RON file.
pub fn load_engine_config(path: &Path) -> Result<EngineConfig, ServerError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(EngineConfig::from_ron_str(&contents)?)
}

#[derive(Debug)]
struct Shared {
    engine: Engine,
    game_over_sent: bool,
}

/// Cloneable handle to the running game.
#[derive(Debug, Clone)]
pub struct GameServer {
    shared: Arc<Mutex<Shared>>,
    sender: broadcast::Sender<ServerMessage>,
    config: ServerConfig,
}

impl GameServer {
    /// Server around a wall-clock engine built from `engine_config`.
    #[must_use]
    pub fn new(engine_config: EngineConfig, config: ServerConfig) -> Self {
        Self::with_engine(Engine::new(engine_config), config)
    }

    /// Server around an existing engine.
    #[must_use]
    pub fn with_engine(engine: Engine, config: ServerConfig) -> Self {
        let (sender, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            shared: Arc::new(Mutex::new(Shared {
                engine,
                game_over_sent: false,
            })),
            sender,
            config,
        }
    }

    /// The server's configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Subscribe to broadcasts. Returns the current snapshot together with
    /// a receiver that starts right after it, so no tick is missed or seen
    /// twice.
    pub async fn subscribe(&self) -> (ServerMessage, broadcast::Receiver<ServerMessage>) {
        let shared = self.shared.lock().await;
        (shared.engine.snapshot(), self.sender.subscribe())
    }

    /// Public view of every colony.
    pub async fn colonies(&self) -> Vec<Value> {
        let shared = self.shared.lock().await;
        match shared.engine.snapshot() {
            ServerMessage::Snapshot { colonies } => colonies,
            _ => Vec::new(),
        }
    }

    /// Create a colony from a JSON payload and return its public view.
    pub async fn create_colony(&self, payload: &str) -> Result<Value, ServerError> {
        let spec = ColonySpec::from_json(payload)?;
        let mut shared = self.shared.lock().await;
        let colony = shared.engine.create_colony(spec)?;
        info!(id = colony.id, name = %colony.name, "Colony created");
        Ok(serde_json::to_value(colony)?)
    }

    /// Seed `count` random colonies.
    pub async fn initialise(&self, count: usize) -> Result<(), ServerError> {
        let mut shared = self.shared.lock().await;
        shared.engine.initialise(count)?;
        Ok(())
    }

    /// Remove every colony and re-arm the game-over broadcast.
    pub async fn reset(&self) {
        let mut shared = self.shared.lock().await;
        shared.engine.reset();
        shared.game_over_sent = false;
    }

    /// Run one tick of `delta_time` seconds and broadcast its messages.
    /// Returns the number of messages produced.
    pub async fn tick_once(&self, delta_time: f64) -> usize {
        let messages = {
            let mut shared = self.shared.lock().await;
            shared.engine.tick(delta_time);
            let mut messages = shared.engine.messages();
            if !shared.game_over_sent {
                if let Some(winner) = shared.engine.winner() {
                    info!(winner, tick = shared.engine.get_tick(), "Game over");
                    messages.push(ServerMessage::GameOver { winner });
                    shared.game_over_sent = true;
                }
            }
            messages
        };

        let count = messages.len();
        for message in messages {
            // No subscribers is not an error; the tick already happened.
            if self.sender.send(message).is_err() {
                debug!("No subscribers for tick messages");
                break;
            }
        }
        count
    }

    /// Drive ticks on the configured interval until `shutdown` resolves.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut interval = time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            interval_ms = self.config.tick_interval.as_millis() as u64,
            "Tick loop started"
        );
        let mut last = Instant::now();
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                now = interval.tick() => {
                    let delta = now.saturating_duration_since(last).as_secs_f64();
                    last = now;
                    let started = std::time::Instant::now();
                    self.tick_once(delta).await;
                    if started.elapsed() > self.config.tick_interval {
                        warn!(
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Tick overran its interval"
                        );
                    }
                }
            }
        }
        info!("Tick loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exo_test_utils::fixtures;

    fn server(engine: Engine) -> GameServer {
        GameServer::with_engine(
            engine,
            ServerConfig {
                tick_interval: Duration::from_millis(5),
                channel_capacity: 4096,
                initial_colonies: 0,
            },
        )
    }

    #[tokio::test]
    async fn test_create_colony_from_payload() {
        let server = server(fixtures::engine());
        let view = server
            .create_colony(r#"{"name": "Alpha", "residents": 50, "trait": "Economic"}"#)
            .await
            .unwrap();
        assert_eq!(view["name"], "Alpha");
        assert_eq!(view["trait"], "Economic");
        assert_eq!(server.colonies().await.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_payload_is_rejected() {
        let server = server(fixtures::engine());
        let err = server.create_colony(r#"{"residents": 5}"#).await.unwrap_err();
        assert!(matches!(err, ServerError::Engine(EngineError::InvalidPayload(_))));
        assert!(server.colonies().await.is_empty());
    }

    #[tokio::test]
    async fn test_subscriber_receives_tick_messages() {
        let (engine, _, _) = fixtures::skirmish();
        let server = server(engine);
        let (snapshot, mut rx) = server.subscribe().await;
        match snapshot {
            ServerMessage::Snapshot { colonies } => assert_eq!(colonies.len(), 2),
            other => panic!("expected snapshot, got {other:?}"),
        }

        let mut sent = 0;
        for _ in 0..20 {
            sent += server.tick_once(fixtures::SKIRMISH_STEP).await;
        }
        assert!(sent > 0);
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn test_game_over_broadcast_once() {
        let (engine, a, _) = fixtures::skirmish();
        let server = server(engine);
        let (_, mut rx) = server.subscribe().await;

        let mut winners = Vec::new();
        for _ in 0..fixtures::SKIRMISH_TICKS {
            server.tick_once(fixtures::SKIRMISH_STEP).await;
            while let Ok(message) = rx.try_recv() {
                if let ServerMessage::GameOver { winner } = message {
                    winners.push(winner);
                }
            }
        }
        assert_eq!(winners, vec![a]);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let server = server(fixtures::engine());
        server.initialise(2).await.unwrap();
        let (_, mut rx) = server.subscribe().await;

        let runner = server.clone();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            runner
                .run(async {
                    let _ = stop_rx.await;
                })
                .await;
        });

        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(matches!(first, Ok(Ok(_))));
        stop_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_clears_colonies() {
        let server = server(fixtures::engine());
        server.initialise(3).await.unwrap();
        assert_eq!(server.colonies().await.len(), 3);
        server.reset().await;
        assert!(server.colonies().await.is_empty());
    }
}
