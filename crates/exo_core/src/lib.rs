//! # Exo Core
//!
//! Tick-driven colony simulation engine.
//!
//! Colonies anchored to planets grow an economy, build structures and
//! fleets, patrol their orbit shells and fight for each other's bases.
//! This crate holds the whole simulation and nothing else:
//! - No rendering
//! - No IO (the transport only reads [`protocol`] messages)
//! - No system randomness (one seeded ChaCha RNG per engine)
//! - No hidden time source (cooldowns read an injected [`clock::Clock`])
//!
//! ## Crate Structure
//!
//! - [`simulation`] - the [`Engine`](simulation::Engine) and its tick order
//! - [`colony`] - colony, planet and fleet data model
//! - [`factory`] - colony creation from partial payloads
//! - [`economy`] - growth, construction, level-up, auto-build
//! - [`behavior`] - per-fleet state machine
//! - [`coordination`] - colony-wide attacks and parking spots
//! - [`combat`] - engagements, base defense, conquest
//! - [`orbit`] / [`pathfinding`] / [`geometry`] - movement and 3D math
//! - [`config`] - data-driven balance tables

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod behavior;
pub mod clock;
pub mod colony;
pub mod combat;
pub mod components;
pub mod config;
pub mod coordination;
pub mod diff;
pub mod economy;
pub mod error;
pub mod events;
pub mod factory;
pub mod geometry;
pub mod orbit;
pub mod pathfinding;
pub mod protocol;
pub mod simulation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, MonotonicClock, SimulationClock};
    pub use crate::colony::{Colony, CombatTarget, Fleet, NaturalResources, Planet, Structure, TargetRef};
    pub use crate::components::*;
    pub use crate::config::EngineConfig;
    pub use crate::error::{EngineError, Result};
    pub use crate::events::{ActionEvent, EventCategory};
    pub use crate::factory::{ColonySpec, FleetSpec};
    pub use crate::protocol::ServerMessage;
    pub use crate::simulation::Engine;
}
