//! Balance testing utilities.
//!
//! Closed-form duel numbers for fleet types, plus aggregation of many
//! headless skirmish outcomes into win rates.

use exo_core::components::{ColonyId, FleetType};
use exo_core::config::{EngineConfig, FleetTypeData};

/// Fleet types in table order.
pub const FLEET_TYPES: [FleetType; 4] = [
    FleetType::Fighter,
    FleetType::Attacker,
    FleetType::Flanker,
    FleetType::Bomber,
];

/// Outcome of one simulated skirmish.
#[derive(Debug, Clone, PartialEq)]
pub struct SkirmishResult {
    /// Seed the engine ran with.
    pub seed: u64,
    /// Owner holding every colony, if the game ended.
    pub winner: Option<ColonyId>,
    /// Ticks run.
    pub ticks: u64,
    /// Fleets alive at the end.
    pub surviving_fleets: usize,
}

/// Statistics over a set of skirmishes.
#[derive(Debug, Clone, Default)]
pub struct SkirmishStats {
    /// Total skirmishes run.
    pub total: u32,
    /// Wins per owner id, sorted by owner.
    pub wins: Vec<(ColonyId, u32)>,
    /// Skirmishes that hit the tick limit.
    pub undecided: u32,
    /// Average ticks to resolution over decided skirmishes.
    pub avg_ticks: f64,
}

impl SkirmishStats {
    /// Aggregate individual results.
    #[must_use]
    pub fn from_results(results: &[SkirmishResult]) -> Self {
        let mut stats = Self {
            total: results.len() as u32,
            ..Self::default()
        };
        let mut decided_ticks = 0u64;
        for result in results {
            match result.winner {
                Some(owner) => {
                    decided_ticks += result.ticks;
                    match stats.wins.iter_mut().find(|(o, _)| *o == owner) {
                        Some((_, n)) => *n += 1,
                        None => stats.wins.push((owner, 1)),
                    }
                }
                None => stats.undecided += 1,
            }
        }
        stats.wins.sort_unstable();
        let decided = stats.total - stats.undecided;
        if decided > 0 {
            stats.avg_ticks = decided_ticks as f64 / f64::from(decided);
        }
        stats
    }

    /// Fraction of skirmishes won by `owner` (0.0 to 1.0).
    #[must_use]
    pub fn win_rate(&self, owner: ColonyId) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let wins = self
            .wins
            .iter()
            .find(|(o, _)| *o == owner)
            .map_or(0, |(_, n)| *n);
        f64::from(wins) / f64::from(self.total)
    }
}

/// Seconds for `count` ships of `attacker` to destroy `count` ships of
/// `defender`, ignoring return fire.
#[must_use]
pub fn time_to_kill(attacker: &FleetTypeData, defender: &FleetTypeData) -> f32 {
    if attacker.damage <= 0.0 {
        return f32::INFINITY;
    }
    defender.max_hp / attacker.damage
}

/// How much enemy cost one unit of own cost removes per second, relative
/// to the reverse matchup. Above 1.0 favors `attacker`.
#[must_use]
pub fn cost_efficiency_vs(attacker: &FleetTypeData, defender: &FleetTypeData) -> f32 {
    let my_ttk = time_to_kill(attacker, defender);
    let their_ttk = time_to_kill(defender, attacker);
    let my_cost = attacker.cost.total().max(1.0);
    let their_cost = defender.cost.total().max(1.0);
    (their_ttk / my_ttk) * (their_cost / my_cost) as f32
}

/// Time-to-kill for every fleet type pairing in `config`.
#[must_use]
pub fn generate_ttk_matrix(config: &EngineConfig) -> Vec<(FleetType, FleetType, f32)> {
    pairings(config, time_to_kill)
}

/// Cost efficiency for every fleet type pairing in `config`.
#[must_use]
pub fn generate_efficiency_matrix(config: &EngineConfig) -> Vec<(FleetType, FleetType, f32)> {
    pairings(config, cost_efficiency_vs)
}

fn pairings(
    config: &EngineConfig,
    f: impl Fn(&FleetTypeData, &FleetTypeData) -> f32,
) -> Vec<(FleetType, FleetType, f32)> {
    let mut results = Vec::new();
    for attacker in FLEET_TYPES {
        for defender in FLEET_TYPES {
            if let (Ok(a), Ok(d)) = (config.fleet_type(attacker), config.fleet_type(defender)) {
                results.push((attacker, defender, f(a, d)));
            }
        }
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttk_matrix_covers_all_pairs() {
        let matrix = generate_ttk_matrix(&EngineConfig::default());
        assert_eq!(matrix.len(), 16);

        // Fighter vs Fighter: 60 hp / 6 dps = 10 seconds
        let fighters = matrix
            .iter()
            .find(|(a, d, _)| *a == FleetType::Fighter && *d == FleetType::Fighter)
            .unwrap();
        assert!((fighters.2 - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_mirror_matchup_is_even() {
        let matrix = generate_efficiency_matrix(&EngineConfig::default());
        for (a, d, eff) in matrix {
            if a == d {
                assert!((eff - 1.0).abs() < 1e-4, "{a:?} mirror efficiency {eff}");
            }
        }
    }

    #[test]
    fn test_stats_aggregate_wins() {
        let result = |seed, winner| SkirmishResult {
            seed,
            winner,
            ticks: 100,
            surviving_fleets: 0,
        };
        let stats = SkirmishStats::from_results(&[
            result(1, Some(1)),
            result(2, Some(1)),
            result(3, Some(2)),
            result(4, None),
        ]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.undecided, 1);
        assert!((stats.win_rate(1) - 0.5).abs() < 1e-9);
        assert!((stats.win_rate(2) - 0.25).abs() < 1e-9);
        assert_eq!(stats.win_rate(9), 0.0);
        assert!((stats.avg_ticks - 100.0).abs() < 1e-9);
    }
}
