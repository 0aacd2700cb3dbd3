//! Fleet type data for data-driven fleet definitions.

use serde::{Deserialize, Serialize};

use crate::components::{FleetType, ResourceCost};

/// Per-unit statistics and build cost of a fleet type.
///
/// A fleet group's hp pool is `count * max_hp` and its damage per second is
/// `count * damage`.
///
/// # Example RON
///
/// ```ron
/// FleetTypeData(
///     kind: Bomber,
///     max_hp: 160.0,
///     damage: 22.0,
///     speed: 7.0,
///     cost: (oil: 250.0, steel: 300.0, water: 50.0),
///     cooldown: 12.0,
///     patrol_radius: 6.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetTypeData {
    /// Fleet type these stats apply to.
    pub kind: FleetType,

    /// Hit points per unit.
    pub max_hp: f32,

    /// Damage per second per unit.
    pub damage: f32,

    /// Travel speed in world units per second.
    pub speed: f32,

    /// Resources consumed to build one group.
    pub cost: ResourceCost,

    /// Seconds before another group of this type can be built.
    pub cooldown: f64,

    /// Radius of this type's patrol loop before trait scaling.
    pub patrol_radius: f32,
}

impl FleetTypeData {
    /// Built-in stats for every fleet type.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                kind: FleetType::Fighter,
                max_hp: 60.0,
                damage: 6.0,
                speed: 14.0,
                cost: ResourceCost::new(40.0, 60.0, 0.0),
                cooldown: 6.0,
                patrol_radius: 8.0,
            },
            Self {
                kind: FleetType::Attacker,
                max_hp: 100.0,
                damage: 10.0,
                speed: 10.0,
                cost: ResourceCost::new(80.0, 120.0, 0.0),
                cooldown: 8.0,
                patrol_radius: 10.0,
            },
            Self {
                kind: FleetType::Flanker,
                max_hp: 80.0,
                damage: 9.0,
                speed: 16.0,
                cost: ResourceCost::new(120.0, 150.0, 0.0),
                cooldown: 8.0,
                patrol_radius: 12.0,
            },
            Self {
                kind: FleetType::Bomber,
                max_hp: 160.0,
                damage: 22.0,
                speed: 7.0,
                cost: ResourceCost::new(250.0, 300.0, 50.0),
                cooldown: 12.0,
                patrol_radius: 6.0,
            },
        ]
    }
}
