//! Colony level thresholds and unlocks.

use serde::{Deserialize, Serialize};

use crate::components::{ColonyLevel, FleetType, ResourceCost};

/// Requirements and rewards of one colony level.
///
/// A colony advances to this level once its residents and every storage
/// meet the thresholds. Advancing consumes half of `resources`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    /// The level described.
    pub level: ColonyLevel,

    /// Residents required.
    pub residents: f64,

    /// Stored resources required.
    pub resources: ResourceCost,

    /// Base hp (and max hp) at this level.
    pub base_hp: f32,

    /// Base defense damage per second.
    pub defense_dps: f32,

    /// Fleet types buildable at this level.
    #[serde(default)]
    pub unlocked_fleets: Vec<FleetType>,
}

impl LevelData {
    /// Whether the level unlocks a fleet type.
    #[must_use]
    pub fn unlocks(&self, kind: FleetType) -> bool {
        self.unlocked_fleets.contains(&kind)
    }

    /// Built-in progression table.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        use FleetType::{Attacker, Bomber, Fighter, Flanker};
        vec![
            Self {
                level: ColonyLevel::Colony,
                residents: 0.0,
                resources: ResourceCost::default(),
                base_hp: 1000.0,
                defense_dps: 10.0,
                unlocked_fleets: vec![Fighter],
            },
            Self {
                level: ColonyLevel::Settlement,
                residents: 200.0,
                resources: ResourceCost::new(400.0, 400.0, 200.0),
                base_hp: 2000.0,
                defense_dps: 20.0,
                unlocked_fleets: vec![Fighter, Attacker],
            },
            Self {
                level: ColonyLevel::Township,
                residents: 600.0,
                resources: ResourceCost::new(1500.0, 1500.0, 800.0),
                base_hp: 4000.0,
                defense_dps: 35.0,
                unlocked_fleets: vec![Fighter, Attacker, Flanker],
            },
            Self {
                level: ColonyLevel::Metropolis,
                residents: 1500.0,
                resources: ResourceCost::new(5000.0, 5000.0, 2500.0),
                base_hp: 7000.0,
                defense_dps: 55.0,
                unlocked_fleets: vec![Fighter, Attacker, Flanker, Bomber],
            },
            Self {
                level: ColonyLevel::StarportHub,
                residents: 3000.0,
                resources: ResourceCost::new(15000.0, 15000.0, 8000.0),
                base_hp: 12000.0,
                defense_dps: 80.0,
                unlocked_fleets: vec![Fighter, Attacker, Flanker, Bomber],
            },
        ]
    }
}
