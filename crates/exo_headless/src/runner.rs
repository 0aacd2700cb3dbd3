//! Single-game runner.
//!
//! Drives one scenario on a simulated clock and optionally streams every
//! transport message to a writer as JSON lines.

use std::io::{self, Write};

use exo_core::config::EngineConfig;
use exo_core::protocol::ServerMessage;
use exo_core::simulation::Engine;
use tracing::{debug, info};

use crate::metrics::{GameMetrics, MetricsCollector};
use crate::scenario::{Scenario, ScenarioError};

/// Runs one scenario to completion.
#[derive(Debug)]
pub struct GameRunner {
    engine: Engine,
    scenario: Scenario,
    collector: MetricsCollector,
    game_over_sent: bool,
}

impl GameRunner {
    /// Build the scenario's engine from `config`. The config seed is the
    /// game seed.
    pub fn new(scenario: Scenario, config: EngineConfig) -> Result<Self, ScenarioError> {
        let seed = config.seed;
        let engine = scenario.build_engine(config)?;
        let collector = MetricsCollector::new(scenario.name.clone(), seed);
        Ok(Self {
            engine,
            scenario,
            collector,
            game_over_sent: false,
        })
    }

    /// The engine being driven.
    #[must_use]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Whether the game has been decided.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.game_over_sent
    }

    /// Advance one tick and return the messages it produced.
    pub fn step(&mut self) -> Vec<ServerMessage> {
        self.engine.tick(self.scenario.delta_time);
        let tick = self.engine.get_tick();
        let mut messages = self.engine.messages();
        if !self.game_over_sent {
            if let Some(winner) = self.engine.winner() {
                info!(tick, winner, "Game decided");
                messages.push(ServerMessage::GameOver { winner });
                self.game_over_sent = true;
            }
        }
        for message in &messages {
            self.collector.observe(tick, message);
        }
        messages
    }

    /// Run until the tick budget is spent or, if the scenario says so, a
    /// winner emerges. When `out` is given, a snapshot followed by every
    /// message is written to it, one JSON object per line.
    pub fn run(mut self, mut out: Option<&mut dyn Write>) -> io::Result<GameMetrics> {
        if let Some(w) = out.as_deref_mut() {
            write_line(w, &self.engine.snapshot())?;
        }

        for _ in 0..self.scenario.max_ticks {
            let messages = self.step();
            if let Some(w) = out.as_deref_mut() {
                for message in &messages {
                    write_line(w, message)?;
                }
            }
            if self.game_over_sent && self.scenario.stop_on_winner {
                break;
            }
            if self.engine.get_tick() % 500 == 0 {
                debug!(tick = self.engine.get_tick(), "Game progress");
            }
        }

        if let Some(w) = out {
            w.flush()?;
        }
        Ok(self.collector.finish(&self.engine))
    }
}

fn write_line(out: &mut dyn Write, message: &ServerMessage) -> io::Result<()> {
    serde_json::to_writer(&mut *out, message)?;
    out.write_all(b"\n")
}
