//! Error types for the colony engine.

use thiserror::Error;

use crate::components::{ColonyId, ColonyLevel, FleetType, StructureType};

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for all engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No non-overlapping planet position was found.
    #[error("Failed to find non-overlapping planet position after {attempts} attempts")]
    Placement {
        /// Attempts made before giving up.
        attempts: u32,
    },

    /// A colony creation payload was malformed.
    #[error("Invalid colony payload: {0}")]
    InvalidPayload(String),

    /// Colony lookup failed.
    #[error("Colony not found: {0}")]
    UnknownColony(ColonyId),

    /// Config has no stats for a fleet type.
    #[error("No fleet data configured for {0}")]
    UnknownFleetType(FleetType),

    /// Config has no data for a structure type.
    #[error("No structure data configured for {0}")]
    UnknownStructureType(StructureType),

    /// Config has no entry for a level.
    #[error("No level data configured for {0}")]
    UnknownLevel(ColonyLevel),

    /// Config failed to parse or validate.
    #[error("Invalid engine config: {0}")]
    Config(String),
}
