//! Trait lookup table for build and attack decisions.
//!
//! Decisions consult this table instead of branching on the trait, so a
//! new profile is a data change.

use serde::{Deserialize, Serialize};

use crate::components::ColonyTrait;

/// Weighted behavior of one colony trait.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitProfile {
    /// Trait described.
    #[serde(rename = "trait")]
    pub colony_trait: ColonyTrait,

    /// Relative weight of building an economic structure.
    pub economy_weight: f64,

    /// Relative weight of building a fleet. Zero disables fleets entirely.
    pub fleet_weight: f64,

    /// Probability of launching a coordinated attack per decision window.
    pub attack_chance: f64,

    /// Multiplier on the fleet type's patrol radius.
    pub patrol_radius_factor: f32,

    /// Pick the weakest of the nearest candidates instead of the nearest.
    #[serde(default)]
    pub targets_weakest: bool,
}

impl TraitProfile {
    /// Whether this profile may ever build fleets.
    #[must_use]
    pub fn builds_fleets(&self) -> bool {
        self.fleet_weight > 0.0
    }

    /// Probability that a build roll picks a fleet.
    #[must_use]
    pub fn fleet_probability(&self) -> f64 {
        let total = self.economy_weight + self.fleet_weight;
        if total <= 0.0 {
            0.0
        } else {
            self.fleet_weight / total
        }
    }

    /// Built-in trait table.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                colony_trait: ColonyTrait::Aggressive,
                economy_weight: 0.25,
                fleet_weight: 0.75,
                attack_chance: 0.8,
                patrol_radius_factor: 1.4,
                targets_weakest: true,
            },
            Self {
                colony_trait: ColonyTrait::Defensive,
                economy_weight: 0.5,
                fleet_weight: 0.5,
                attack_chance: 0.15,
                patrol_radius_factor: 0.7,
                targets_weakest: false,
            },
            Self {
                colony_trait: ColonyTrait::Economic,
                economy_weight: 0.8,
                fleet_weight: 0.2,
                attack_chance: 0.25,
                patrol_radius_factor: 1.0,
                targets_weakest: false,
            },
            Self {
                colony_trait: ColonyTrait::Pacifist,
                economy_weight: 1.0,
                fleet_weight: 0.0,
                attack_chance: 0.0,
                patrol_radius_factor: 0.8,
                targets_weakest: false,
            },
        ]
    }
}
