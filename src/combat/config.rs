//! Configuration for the combat encounter.

use serde::{Deserialize, Serialize};

use super::boss::BossConfig;
use super::unit::{UnitKind, UnitSpec};

/// Configuration of one encounter.
///
/// Controls grid geometry, round limits, placement caps, the player unit
/// roster and the boss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Side length of the square grid.
    pub grid_size: usize,
    /// Round at which a surviving boss wins.
    pub max_rounds: u32,
    /// Units the player may place in round 1.
    pub first_round_placements: u32,
    /// Units the player may place in every later round.
    pub later_round_placements: u32,
    /// Charges consumed by one line shot.
    pub line_shot_charges: u32,
    /// Candidate cells struck by one ultimate.
    pub ultimate_targets: usize,
    /// One spec per [`UnitKind`].
    pub units: Vec<UnitSpec>,
    pub boss: BossConfig,
}

impl GameConfig {
    /// Spec for `kind`, falling back to the built-in default.
    pub fn unit_spec(&self, kind: UnitKind) -> UnitSpec {
        self.units
            .iter()
            .find(|s| s.kind == kind)
            .cloned()
            .unwrap_or_else(|| UnitSpec::default_for(kind))
    }

    /// Placement cap for `round` (1-based).
    pub fn placements_for_round(&self, round: u32) -> u32 {
        if round <= 1 {
            self.first_round_placements
        } else {
            self.later_round_placements
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_size: 4,
            max_rounds: 9,
            first_round_placements: 7,
            later_round_placements: 2,
            line_shot_charges: 4,
            ultimate_targets: 6,
            units: UnitKind::all().into_iter().map(UnitSpec::default_for).collect(),
            boss: BossConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = GameConfig::default();
        assert!(cfg.grid_size > 0);
        assert!(cfg.max_rounds > 0);
        assert_eq!(cfg.units.len(), 3);
        assert!(cfg.boss.max_hp > 0);
    }

    #[test]
    fn placement_caps() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.placements_for_round(1), 7);
        assert_eq!(cfg.placements_for_round(2), 2);
        assert_eq!(cfg.placements_for_round(9), 2);
    }

    #[test]
    fn unit_spec_lookup() {
        let cfg = GameConfig {
            units: vec![],
            ..GameConfig::default()
        };
        assert_eq!(cfg.unit_spec(UnitKind::AD).max_stock, 4);
    }
}
