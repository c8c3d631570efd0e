//! Raw encounter snapshot consumed by the state encoder.

use serde::{Deserialize, Serialize};

use super::boss::{Boss, SkillId};
use super::grid::Grid;

/// Skills whose cooldown is part of the observation, in encoding order.
pub const OBSERVED_COOLDOWNS: [SkillId; 3] =
    [SkillId::HorizontalShot, SkillId::VerticalShot, SkillId::Heal];

/// The quantities the boss observes before deciding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub boss_hp: u32,
    pub boss_max_hp: u32,
    pub boss_rage: u32,
    /// Cooldowns of [`OBSERVED_COOLDOWNS`].
    pub cooldowns: [u32; 3],
    /// Unit counts indexed by [`crate::combat::UnitKind::index`].
    pub unit_counts: [u32; 3],
    /// Current round (1-based; 0 before the first round starts).
    pub round: u32,
}

impl StateSnapshot {
    /// Captures the boss and grid as they are now.
    pub fn capture(boss: &Boss, grid: &Grid, round: u32) -> Self {
        Self {
            boss_hp: boss.hp(),
            boss_max_hp: boss.max_hp(),
            boss_rage: boss.rage(),
            cooldowns: OBSERVED_COOLDOWNS.map(|id| boss.cooldown(id)),
            unit_counts: grid.unit_counts(),
            round,
        }
    }
}
