//! Shared identifiers, enums and small value types.
//!
//! These are pure data with no behavior beyond convenience accessors. The
//! larger entity types live in [`crate::colony`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a colony. Also used as the owner identity.
pub type ColonyId = u64;

/// Identifier of a fleet, unique across the whole engine.
pub type FleetId = u64;

/// Identifier of a built structure, unique across the whole engine.
pub type StructureId = u64;

// ============================================================================
// Colony classification
// ============================================================================

/// Ordered colony progression.
///
/// Levels only ever advance; conquest resets ownership and hp but keeps
/// the level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum ColonyLevel {
    /// Starting level.
    #[default]
    Colony,
    /// Second level.
    Settlement,
    /// Third level.
    Township,
    /// Fourth level.
    Metropolis,
    /// Final level.
    #[serde(rename = "Starport Hub")]
    StarportHub,
}

impl ColonyLevel {
    /// All levels in progression order.
    pub const ALL: [Self; 5] = [
        Self::Colony,
        Self::Settlement,
        Self::Township,
        Self::Metropolis,
        Self::StarportHub,
    ];

    /// The level after this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        let idx = Self::ALL.iter().position(|l| *l == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    /// Display name used in events and payloads.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Colony => "Colony",
            Self::Settlement => "Settlement",
            Self::Township => "Township",
            Self::Metropolis => "Metropolis",
            Self::StarportHub => "Starport Hub",
        }
    }
}

impl fmt::Display for ColonyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Behavioral profile of a colony's AI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColonyTrait {
    /// Favors fleets and attacks the weakest nearby colony.
    Aggressive,
    /// Balanced building, rarely attacks.
    Defensive,
    /// Favors structures.
    Economic,
    /// Never builds fleets and never attacks.
    Pacifist,
}

impl ColonyTrait {
    /// All traits, used for random selection.
    pub const ALL: [Self; 4] = [
        Self::Aggressive,
        Self::Defensive,
        Self::Economic,
        Self::Pacifist,
    ];
}

// ============================================================================
// Fleets
// ============================================================================

/// Fleet hull type. Determines per-unit stats via the config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FleetType {
    /// Cheap, fast interceptor.
    Fighter,
    /// General purpose line ship.
    Attacker,
    /// Fast raider.
    Flanker,
    /// Slow, heavy hitter.
    Bomber,
}

impl FleetType {
    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fighter => "Fighter",
            Self::Attacker => "Attacker",
            Self::Flanker => "Flanker",
            Self::Bomber => "Bomber",
        }
    }
}

impl fmt::Display for FleetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-fleet behavior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FleetState {
    /// Holding position on the home orbit shell.
    #[default]
    Idle,
    /// Cycling a closed patrol loop.
    Patrolling,
    /// Following a one-shot route.
    Moving,
    /// Engaged with a target.
    Attacking,
}

impl FleetState {
    /// Whether this state keeps the fleet on its home shell.
    #[must_use]
    pub const fn is_orbiting(self) -> bool {
        matches!(self, Self::Idle | Self::Patrolling)
    }
}

// ============================================================================
// Economy
// ============================================================================

/// Stored planetary resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Oil.
    Oil,
    /// Steel.
    Steel,
    /// Water.
    Water,
}

/// Structure types a colony can build on its planet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StructureType {
    /// Produces oil.
    OilPump,
    /// Produces steel.
    SteelMill,
    /// Produces water.
    WaterPump,
}

impl StructureType {
    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OilPump => "Oil Pump",
            Self::SteelMill => "Steel Mill",
            Self::WaterPump => "Water Pump",
        }
    }
}

impl fmt::Display for StructureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An amount of each stored resource. Used for costs and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceCost {
    /// Oil.
    #[serde(default)]
    pub oil: f64,
    /// Steel.
    #[serde(default)]
    pub steel: f64,
    /// Water.
    #[serde(default)]
    pub water: f64,
}

impl ResourceCost {
    /// Create a cost.
    #[must_use]
    pub const fn new(oil: f64, steel: f64, water: f64) -> Self {
        Self { oil, steel, water }
    }

    /// Sum of all components.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.oil + self.steel + self.water
    }

    /// Half of each component, floored at zero.
    #[must_use]
    pub fn half(self) -> Self {
        Self {
            oil: (self.oil * 0.5).max(0.0),
            steel: (self.steel * 0.5).max(0.0),
            water: (self.water * 0.5).max(0.0),
        }
    }
}

/// Something that happens to a colony's build slots: an economic structure
/// or a fleet. Keyed for per-kind cooldowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildKind {
    /// A planetary structure.
    Structure(StructureType),
    /// A fleet group.
    Fleet(FleetType),
}
