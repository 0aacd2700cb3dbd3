//! Structure type data for data-driven construction.

use serde::{Deserialize, Serialize};

use crate::components::{ColonyLevel, ResourceCost, ResourceKind, StructureType};

/// Definition of a buildable planetary structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureTypeData {
    /// Structure type these values apply to.
    pub kind: StructureType,

    /// Resource this structure produces.
    pub resource: ResourceKind,

    /// Production added to the planet's rate, per tick interval.
    pub production: f64,

    /// Resources consumed on construction.
    pub cost: ResourceCost,

    /// Lowest colony level allowed to build it.
    #[serde(default)]
    pub min_level: ColonyLevel,

    /// Maximum number per planet.
    pub max_per_planet: usize,

    /// Seconds before another structure of this type can be built.
    pub cooldown: f64,
}

impl StructureTypeData {
    /// Built-in structure table.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                kind: StructureType::OilPump,
                resource: ResourceKind::Oil,
                production: 0.5,
                cost: ResourceCost::new(0.0, 80.0, 10.0),
                min_level: ColonyLevel::Colony,
                max_per_planet: 4,
                cooldown: 5.0,
            },
            Self {
                kind: StructureType::SteelMill,
                resource: ResourceKind::Steel,
                production: 0.5,
                cost: ResourceCost::new(80.0, 0.0, 10.0),
                min_level: ColonyLevel::Colony,
                max_per_planet: 4,
                cooldown: 5.0,
            },
            Self {
                kind: StructureType::WaterPump,
                resource: ResourceKind::Water,
                production: 0.4,
                cost: ResourceCost::new(30.0, 50.0, 0.0),
                min_level: ColonyLevel::Settlement,
                max_per_planet: 3,
                cooldown: 5.0,
            },
        ]
    }
}
