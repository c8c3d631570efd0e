//! Boss decision agents.
//!
//! [`DecisionAgent`] is the capability the combat state machine drives:
//! choose a skill for the current state, learn from one transition, and
//! persist. The targeting of a chosen skill is shared by every agent through
//! [`crate::rl::targeting::plan_cast`].

#[cfg(feature = "rl-nn")]
pub mod dqn;
pub mod tabular;

use std::path::Path;

use rand::seq::SliceRandom;
use rand::{Rng, RngCore};

use crate::combat::{Decision, Grid, SkillId, StateSnapshot};

use super::checkpoint::{CheckpointError, LoadOutcome};
use super::targeting::plan_cast;

#[cfg(feature = "rl-nn")]
pub use dqn::ApproximateQAgent;
pub use tabular::TabularQAgent;

/// One transition from the boss's point of view.
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub state: StateSnapshot,
    /// Action taken, `None` when the boss passed.
    pub action_index: Option<usize>,
    pub reward: f64,
    pub next_state: StateSnapshot,
    pub terminal: bool,
}

/// A learning policy for the boss.
pub trait DecisionAgent {
    /// Picks a skill among `available` and plans its targets.
    ///
    /// Returns `None` without consuming randomness when nothing is available.
    fn choose_action(
        &mut self,
        state: &StateSnapshot,
        available: &[SkillId],
        grid: &Grid,
        rng: &mut dyn RngCore,
    ) -> Option<Decision>;

    /// Updates value estimates from one transition. A missing or
    /// out-of-range action index leaves the estimates unchanged.
    fn learn(&mut self, experience: &Experience, rng: &mut dyn RngCore);

    /// Persists learned parameters and the exploration rate.
    fn save(&self, path: &Path) -> Result<(), CheckpointError>;

    /// Restores a checkpoint. Misses and rejections are logged and leave the
    /// agent unchanged.
    fn load(&mut self, path: &Path) -> LoadOutcome;

    /// Current exploration rate.
    fn epsilon(&self) -> f64;

    fn set_epsilon(&mut self, epsilon: f64);

    /// Returns a human-readable name for this agent.
    fn name(&self) -> &str;
}

/// Number of actions every agent scores.
pub const NUM_ACTIONS: usize = SkillId::COUNT;

/// Epsilon-greedy choice among `available`, masked by availability.
///
/// Explores uniformly with probability `epsilon`; otherwise takes the first
/// available action with the highest value in `values` (indexed by action).
pub(crate) fn select_masked(
    values: &[f64],
    available: &[SkillId],
    epsilon: f64,
    rng: &mut dyn RngCore,
) -> Option<SkillId> {
    if available.is_empty() {
        return None;
    }
    if rng.gen::<f64>() < epsilon {
        return available.choose(rng).copied();
    }
    let mut best: Option<(SkillId, f64)> = None;
    for id in available {
        let value = values.get(id.index()).copied().unwrap_or(f64::NEG_INFINITY);
        if best.map_or(true, |(_, b)| value > b) {
            best = Some((*id, value));
        }
    }
    best.map(|(id, _)| id)
}

/// Wraps a chosen skill into a targeted [`Decision`].
pub(crate) fn decide(
    skill: SkillId,
    grid: &Grid,
    ultimate_targets: usize,
    rng: &mut dyn RngCore,
) -> Decision {
    Decision::new(plan_cast(skill, grid, ultimate_targets, rng))
}

/// Multiplicative decay floored at `min`; a rate already at or below the
/// floor is left alone.
pub(crate) fn decay_epsilon(epsilon: f64, decay: f64, min: f64) -> f64 {
    if epsilon > min {
        (epsilon * decay).max(min)
    } else {
        epsilon
    }
}

/// A uniformly random agent that never learns.
///
/// Useful as a baseline and for exercising the environment.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    ultimate_targets: usize,
}

impl RandomAgent {
    pub fn new(ultimate_targets: usize) -> Self {
        Self { ultimate_targets }
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new(6)
    }
}

impl DecisionAgent for RandomAgent {
    fn choose_action(
        &mut self,
        _state: &StateSnapshot,
        available: &[SkillId],
        grid: &Grid,
        rng: &mut dyn RngCore,
    ) -> Option<Decision> {
        let skill = select_masked(&[], available, 1.0, rng)?;
        Some(decide(skill, grid, self.ultimate_targets, rng))
    }

    fn learn(&mut self, _experience: &Experience, _rng: &mut dyn RngCore) {}

    fn save(&self, _path: &Path) -> Result<(), CheckpointError> {
        Ok(())
    }

    fn load(&mut self, _path: &Path) -> LoadOutcome {
        LoadOutcome::Missing
    }

    fn epsilon(&self) -> f64 {
        1.0
    }

    fn set_epsilon(&mut self, _epsilon: f64) {}

    fn name(&self) -> &str {
        "Random"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn greedy_respects_mask() {
        let mut rng = StdRng::seed_from_u64(0);
        let values = [0.0, 1.0, 2.0, 3.0, 100.0];
        let available = [SkillId::NormalAttack, SkillId::HorizontalShot];
        let choice = select_masked(&values, &available, 0.0, &mut rng);
        assert_eq!(choice, Some(SkillId::HorizontalShot));
    }

    #[test]
    fn greedy_ties_go_to_first() {
        let mut rng = StdRng::seed_from_u64(0);
        let values = [1.0; NUM_ACTIONS];
        let available = [SkillId::Heal, SkillId::NormalAttack];
        let choice = select_masked(&values, &available, 0.0, &mut rng);
        assert_eq!(choice, Some(SkillId::Heal));
    }

    #[test]
    fn exploration_stays_inside_mask() {
        let mut rng = StdRng::seed_from_u64(5);
        let values = [0.0, 0.0, 0.0, 0.0, 100.0];
        let available = [SkillId::VerticalShot, SkillId::Heal];
        for _ in 0..50 {
            let choice = select_masked(&values, &available, 1.0, &mut rng).unwrap();
            assert!(available.contains(&choice));
        }
    }

    #[test]
    fn nothing_available_is_none() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(select_masked(&[0.0; 5], &[], 1.0, &mut rng), None);
    }

    #[test]
    fn decay_is_floored() {
        assert_eq!(decay_epsilon(1.0, 0.5, 0.1), 0.5);
        assert_eq!(decay_epsilon(0.15, 0.5, 0.1), 0.1);
        assert_eq!(decay_epsilon(0.05, 0.5, 0.1), 0.05);
    }

    #[test]
    fn random_agent_picks_available() {
        let mut agent = RandomAgent::default();
        let mut rng = StdRng::seed_from_u64(2);
        let state = StateSnapshot {
            boss_hp: 50,
            boss_max_hp: 50,
            boss_rage: 0,
            cooldowns: [0; 3],
            unit_counts: [0; 3],
            round: 1,
        };
        let grid = Grid::new(4);
        let decision = agent
            .choose_action(&state, &[SkillId::Heal], &grid, &mut rng)
            .unwrap();
        assert_eq!(decision.action_index, SkillId::Heal.index());
        assert!(agent
            .choose_action(&state, &[], &grid, &mut rng)
            .is_none());
    }
}
