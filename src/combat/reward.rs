//! Fixed reward policy, expressed from the boss's point of view.
//!
//! Positive values reward the boss; player damage to the boss is negative.

use super::unit::UnitKind;

/// Computes the reward contributions of each combat event.
pub struct RewardComputer;

impl RewardComputer {
    /// Scale applied to damage in both directions.
    pub const DAMAGE_SCALE: f64 = 1.5;
    pub const BOSS_DEFEATED: f64 = -100.0;
    pub const PLAYER_WIPED: f64 = 150.0;
    pub const ROUND_LIMIT_SURVIVED: f64 = 150.0;
    /// Bonus for ending a non-terminal boss turn alive.
    pub const EXCHANGE_SURVIVED: f64 = 1.0;
    /// The agent picked a skill whose cooldown or rage gate failed.
    pub const CAST_REJECTED: f64 = -2.0;
    pub const NO_TARGET: f64 = -1.0;
    pub const EMPTY_LINE: f64 = -2.0;
    pub const ULTIMATE_WHIFF: f64 = -3.0;
    /// Ultimate bonus applies when strictly more units than this were hit.
    pub const ULTIMATE_BONUS_THRESHOLD: usize = 2;

    /// Reward for the player's attack phase.
    pub fn player_attack(total_damage: u32) -> f64 {
        -(total_damage as f64 * Self::DAMAGE_SCALE)
    }

    /// Reward for destroying a unit of `kind`.
    pub fn kill(kind: UnitKind) -> f64 {
        match kind {
            UnitKind::AD => 7.0,
            UnitKind::Knight => 4.0,
            UnitKind::Tank => 3.0,
        }
    }

    /// Reward for one hit that left its target standing.
    pub fn hit(damage: u32) -> f64 {
        damage as f64 * Self::DAMAGE_SCALE
    }

    /// Reward for casting `heal` given the hp fraction after healing.
    ///
    /// | fraction      | reward |
    /// |---------------|--------|
    /// | `< 0.3`       | `+8`   |
    /// | `< 0.6`       | `+4`   |
    /// | `> 0.9`       | `-3`   |
    /// | otherwise     | `+0.5` |
    pub fn heal(hp_fraction: f64) -> f64 {
        if hp_fraction < 0.3 {
            8.0
        } else if hp_fraction < 0.6 {
            4.0
        } else if hp_fraction > 0.9 {
            -3.0
        } else {
            0.5
        }
    }

    /// Extra reward once an ultimate has resolved.
    pub fn ultimate_bonus(units_hit: usize, cells_struck: usize) -> f64 {
        if units_hit == 0 && cells_struck > 0 {
            Self::ULTIMATE_WHIFF
        } else if units_hit > Self::ULTIMATE_BONUS_THRESHOLD {
            units_hit as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kill_table_is_fixed() {
        assert_eq!(RewardComputer::kill(UnitKind::AD), 7.0);
        assert_eq!(RewardComputer::kill(UnitKind::Knight), 4.0);
        assert_eq!(RewardComputer::kill(UnitKind::Tank), 3.0);
    }

    #[test]
    fn player_attack_is_negative() {
        assert_eq!(RewardComputer::player_attack(10), -15.0);
        assert_eq!(RewardComputer::player_attack(0), 0.0);
    }

    #[test]
    fn heal_tiers() {
        assert_eq!(RewardComputer::heal(0.1), 8.0);
        assert_eq!(RewardComputer::heal(0.3), 4.0);
        assert_eq!(RewardComputer::heal(0.6), 0.5);
        assert_eq!(RewardComputer::heal(0.9), 0.5);
        assert_eq!(RewardComputer::heal(0.95), -3.0);
    }

    #[test]
    fn ultimate_bonus_rules() {
        assert_eq!(RewardComputer::ultimate_bonus(0, 6), -3.0);
        assert_eq!(RewardComputer::ultimate_bonus(0, 0), 0.0);
        assert_eq!(RewardComputer::ultimate_bonus(2, 6), 0.0);
        assert_eq!(RewardComputer::ultimate_bonus(3, 6), 3.0);
    }
}
