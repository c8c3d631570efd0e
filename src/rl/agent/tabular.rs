//! Tabular Q-learning agent.
//!
//! Holds a dense value table indexed by the discretized state and the
//! action, updated with one-step temporal-difference learning.

use std::path::Path;

use rand::RngCore;

use crate::combat::{Decision, Grid, SkillId, StateSnapshot};
use crate::rl::checkpoint::{
    self, check_version, CheckpointError, LoadOutcome, TabularCheckpoint, CHECKPOINT_VERSION,
};
use crate::rl::config::{EncoderConfig, TabularConfig};
use crate::rl::observation::{DiscreteState, StateEncoder};

use super::{decay_epsilon, decide, select_masked, DecisionAgent, Experience, NUM_ACTIONS};

/// Q-learning over a dense table of `dims × NUM_ACTIONS` values.
///
/// Exploration decays after every [`DecisionAgent::learn`] call, including
/// calls that carry no action.
#[derive(Debug, Clone)]
pub struct TabularQAgent {
    config: TabularConfig,
    encoder: StateEncoder,
    epsilon: f64,
    /// Row-major values; the action index varies fastest.
    values: Vec<f64>,
    ultimate_targets: usize,
}

impl TabularQAgent {
    pub fn new(config: TabularConfig, encoder: EncoderConfig) -> Self {
        let encoder = StateEncoder::new(encoder);
        let states: usize = encoder.dims().iter().product();
        Self {
            epsilon: config.epsilon,
            values: vec![0.0; states * NUM_ACTIONS],
            ultimate_targets: 6,
            config,
            encoder,
        }
    }

    /// Sets how many cells an ultimate is planned against.
    pub fn with_ultimate_targets(mut self, count: usize) -> Self {
        self.ultimate_targets = count;
        self
    }

    pub fn config(&self) -> &TabularConfig {
        &self.config
    }

    /// Table shape: state bin counts followed by the action count.
    pub fn table_dims(&self) -> Vec<usize> {
        let mut dims = self.encoder.dims().to_vec();
        dims.push(NUM_ACTIONS);
        dims
    }

    fn row_offset(&self, state: &DiscreteState) -> usize {
        let mut offset = 0;
        for (bin, dim) in state.iter().zip(self.encoder.dims()) {
            offset = offset * dim + bin;
        }
        offset * NUM_ACTIONS
    }

    fn row(&self, state: &DiscreteState) -> &[f64] {
        let start = self.row_offset(state);
        &self.values[start..start + NUM_ACTIONS]
    }

    /// Action values for `state`.
    pub fn q_values(&self, state: &StateSnapshot) -> [f64; NUM_ACTIONS] {
        let mut out = [0.0; NUM_ACTIONS];
        out.copy_from_slice(self.row(&self.encoder.discretize(state)));
        out
    }

    fn apply_checkpoint(&mut self, record: TabularCheckpoint) -> Result<(), CheckpointError> {
        check_version(record.version)?;
        let expected = self.table_dims();
        if record.dims != expected {
            return Err(CheckpointError::ShapeMismatch {
                what: "value table".to_string(),
                expected: expected.iter().map(|d| *d as i64).collect(),
                found: record.dims.iter().map(|d| *d as i64).collect(),
            });
        }
        if record.values.len() != self.values.len() {
            return Err(CheckpointError::ShapeMismatch {
                what: "value table length".to_string(),
                expected: vec![self.values.len() as i64],
                found: vec![record.values.len() as i64],
            });
        }
        self.values = record.values;
        self.epsilon = record.epsilon;
        Ok(())
    }
}

impl DecisionAgent for TabularQAgent {
    fn choose_action(
        &mut self,
        state: &StateSnapshot,
        available: &[SkillId],
        grid: &Grid,
        rng: &mut dyn RngCore,
    ) -> Option<Decision> {
        let values = self.q_values(state);
        let skill = select_masked(&values, available, self.epsilon, rng)?;
        Some(decide(skill, grid, self.ultimate_targets, rng))
    }

    fn learn(&mut self, experience: &Experience, _rng: &mut dyn RngCore) {
        if let Some(action) = experience.action_index.filter(|a| *a < NUM_ACTIONS) {
            let next = self.encoder.discretize(&experience.next_state);
            let best_next = if experience.terminal {
                0.0
            } else {
                self.row(&next)
                    .iter()
                    .copied()
                    .fold(f64::NEG_INFINITY, f64::max)
            };
            let target = experience.reward + self.config.gamma * best_next;

            let state = self.encoder.discretize(&experience.state);
            let idx = self.row_offset(&state) + action;
            self.values[idx] += self.config.learning_rate * (target - self.values[idx]);
        }

        self.epsilon = decay_epsilon(
            self.epsilon,
            self.config.epsilon_decay,
            self.config.epsilon_min,
        );
    }

    fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let record = TabularCheckpoint {
            version: CHECKPOINT_VERSION,
            dims: self.table_dims(),
            epsilon: self.epsilon,
            values: self.values.clone(),
        };
        checkpoint::write_json(path, &record)?;
        tracing::info!(path = %path.display(), epsilon = self.epsilon, "tabular agent saved");
        Ok(())
    }

    fn load(&mut self, path: &Path) -> LoadOutcome {
        checkpoint::load_with(path, "tabular", |record: TabularCheckpoint| {
            self.apply_checkpoint(record)
        })
    }

    fn epsilon(&self) -> f64 {
        self.epsilon
    }

    fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    fn name(&self) -> &str {
        "TabularQ"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snapshot(hp: u32, round: u32) -> StateSnapshot {
        StateSnapshot {
            boss_hp: hp,
            boss_max_hp: 50,
            boss_rage: 0,
            cooldowns: [0; 3],
            unit_counts: [1, 0, 2],
            round,
        }
    }

    fn agent() -> TabularQAgent {
        TabularQAgent::new(TabularConfig::default(), EncoderConfig::default())
    }

    fn experience(action: Option<usize>, reward: f64, terminal: bool) -> Experience {
        Experience {
            state: snapshot(50, 1),
            action_index: action,
            reward,
            next_state: snapshot(40, 2),
            terminal,
        }
    }

    #[test]
    fn table_covers_every_state_action() {
        let agent = agent();
        assert_eq!(agent.table_dims(), vec![5, 4, 3, 3, 4, 4, 4, 5, 9, 5]);
        assert_eq!(agent.values.len(), 5 * 4 * 3 * 3 * 4 * 4 * 4 * 5 * 9 * 5);
    }

    #[test]
    fn td_update_moves_toward_target() {
        let mut agent = agent();
        let mut rng = StdRng::seed_from_u64(0);
        agent.learn(&experience(Some(1), 10.0, true), &mut rng);
        assert!((agent.q_values(&snapshot(50, 1))[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn bootstraps_from_next_state_unless_terminal() {
        let mut agent = agent();
        let mut rng = StdRng::seed_from_u64(0);
        let next = agent.encoder.discretize(&snapshot(40, 2));
        let idx = agent.row_offset(&next) + 3;
        agent.values[idx] = 20.0;

        agent.learn(&experience(Some(0), 0.0, false), &mut rng);
        let expected = 0.1 * 0.95 * 20.0;
        assert!((agent.q_values(&snapshot(50, 1))[0] - expected).abs() < 1e-12);

        let before = agent.q_values(&snapshot(50, 1))[2];
        agent.learn(&experience(Some(2), 0.0, true), &mut rng);
        assert_eq!(agent.q_values(&snapshot(50, 1))[2], before);
    }

    #[test]
    fn missing_or_invalid_action_is_a_no_op_but_decays() {
        let mut agent = agent();
        let mut rng = StdRng::seed_from_u64(0);
        let before = agent.values.clone();
        agent.learn(&experience(None, 5.0, false), &mut rng);
        agent.learn(&experience(Some(NUM_ACTIONS), 5.0, false), &mut rng);
        assert_eq!(agent.values, before);
        assert!(agent.epsilon() < 1.0);
    }

    #[test]
    fn epsilon_never_drops_below_min() {
        let mut agent = TabularQAgent::new(
            TabularConfig {
                epsilon_decay: 0.5,
                ..TabularConfig::default()
            },
            EncoderConfig::default(),
        );
        let mut rng = StdRng::seed_from_u64(0);
        let mut last = agent.epsilon();
        for _ in 0..20 {
            agent.learn(&experience(None, 0.0, false), &mut rng);
            assert!(agent.epsilon() <= last);
            last = agent.epsilon();
        }
        assert_eq!(agent.epsilon(), agent.config().epsilon_min);
    }

    #[test]
    fn greedy_choice_uses_table() {
        let mut agent = agent();
        agent.set_epsilon(0.0);
        let mut rng = StdRng::seed_from_u64(0);
        let state = snapshot(50, 1);
        let offset = agent.row_offset(&agent.encoder.discretize(&state));
        agent.values[offset + SkillId::Heal.index()] = 1.0;
        agent.values[offset + SkillId::Ultimate.index()] = 5.0;

        let grid = Grid::new(4);
        let available = [SkillId::NormalAttack, SkillId::Heal];
        let decision = agent
            .choose_action(&state, &available, &grid, &mut rng)
            .unwrap();
        assert_eq!(decision.action_index, SkillId::Heal.index());
    }

    #[test]
    fn save_and_load_restore_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("q_table.json");
        let mut trained = agent();
        let mut rng = StdRng::seed_from_u64(0);
        trained.learn(&experience(Some(4), 3.0, true), &mut rng);
        trained.save(&path).unwrap();

        let mut fresh = agent();
        assert!(fresh.load(&path).is_loaded());
        assert_eq!(fresh.values, trained.values);
        assert_eq!(fresh.epsilon(), trained.epsilon());
    }

    #[test]
    fn load_missing_keeps_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = agent();
        agent.set_epsilon(0.3);
        let outcome = agent.load(&dir.path().join("absent.json"));
        assert!(matches!(outcome, LoadOutcome::Missing));
        assert_eq!(agent.epsilon(), 0.3);
    }

    #[test]
    fn load_rejects_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.json");
        let small = TabularQAgent::new(
            TabularConfig::default(),
            EncoderConfig {
                max_round_index: 2,
                ..EncoderConfig::default()
            },
        );
        small.save(&path).unwrap();

        let mut agent = agent();
        agent.set_epsilon(0.7);
        let outcome = agent.load(&path);
        assert!(matches!(
            outcome,
            LoadOutcome::Rejected(CheckpointError::ShapeMismatch { .. })
        ));
        assert_eq!(agent.epsilon(), 0.7);
    }
}
