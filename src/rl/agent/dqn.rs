//! Replay-based Q-network agent.
//!
//! Learns from uniformly sampled minibatches of past transitions against a
//! periodically synced target network. Only available with the `rl-nn`
//! feature.

use std::path::Path;

use rand::RngCore;
use tch::{nn, nn::OptimizerConfig, Device, Kind, Reduction, TchError, Tensor};

use crate::combat::{Decision, Grid, SkillId, StateSnapshot};
use crate::rl::buffer::ReplayBuffer;
use crate::rl::checkpoint::{
    self, check_version, CheckpointError, DqnCheckpoint, LoadOutcome, OptimizerState,
    CHECKPOINT_VERSION,
};
use crate::rl::config::{DqnConfig, EncoderConfig, STATE_DIM};
use crate::rl::network::QNetwork;
use crate::rl::observation::{ContinuousState, StateEncoder};

use super::{decay_epsilon, decide, select_masked, DecisionAgent, Experience, NUM_ACTIONS};

/// An encoded transition as stored in the replay buffer.
#[derive(Debug, Clone, PartialEq)]
struct Transition {
    state: ContinuousState,
    action: i64,
    reward: f32,
    next_state: ContinuousState,
    /// 0 for terminal transitions, 1 otherwise.
    continuing: f32,
}

/// Q-learning with a neural approximator, replay buffer and target network.
///
/// Exploration decays only on `learn` calls that ran a training step, that
/// is once the buffer holds a full batch.
pub struct ApproximateQAgent {
    config: DqnConfig,
    encoder: StateEncoder,
    policy: QNetwork,
    target: QNetwork,
    optimizer: nn::Optimizer,
    buffer: ReplayBuffer<Transition>,
    epsilon: f64,
    update_count: u64,
    ultimate_targets: usize,
}

impl ApproximateQAgent {
    pub fn new(
        config: DqnConfig,
        encoder: EncoderConfig,
        device: Device,
    ) -> Result<Self, TchError> {
        let policy = QNetwork::new(STATE_DIM, config.hidden_dim, NUM_ACTIONS, device);
        let mut target = QNetwork::new(STATE_DIM, config.hidden_dim, NUM_ACTIONS, device);
        target.var_store_mut().copy(policy.var_store())?;
        let optimizer = nn::Adam::default().build(policy.var_store(), config.learning_rate)?;

        Ok(Self {
            encoder: StateEncoder::new(encoder),
            buffer: ReplayBuffer::new(config.buffer_capacity),
            epsilon: config.epsilon,
            update_count: 0,
            ultimate_targets: 6,
            policy,
            target,
            optimizer,
            config,
        })
    }

    /// Sets how many cells an ultimate is planned against.
    pub fn with_ultimate_targets(mut self, count: usize) -> Self {
        self.ultimate_targets = count;
        self
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    /// Training steps run so far.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    fn device(&self) -> Device {
        self.policy.device()
    }

    /// Policy-network action values for `state`.
    pub fn q_values(&self, state: &StateSnapshot) -> Vec<f64> {
        let encoded = self.encoder.normalize(state);
        let input = Tensor::from_slice(&encoded)
            .unsqueeze(0)
            .to_device(self.device());
        let q = tch::no_grad(|| self.policy.forward(&input));
        Vec::<f64>::try_from(&q.squeeze_dim(0).to_kind(Kind::Double).to_device(Device::Cpu))
            .unwrap_or_default()
    }

    fn batch_tensor(&self, rows: impl Iterator<Item = ContinuousState>) -> Tensor {
        let flat: Vec<f32> = rows.flat_map(|r| r.into_iter()).collect();
        Tensor::from_slice(&flat)
            .view([-1, STATE_DIM as i64])
            .to_device(self.device())
    }

    /// Runs one minibatch update. Returns `None` while the buffer holds less
    /// than one batch.
    fn train_step(&mut self, rng: &mut dyn RngCore) -> Option<f64> {
        let batch = self.buffer.sample(self.config.batch_size, rng)?;
        let device = self.device();

        let states = self.batch_tensor(batch.iter().map(|t| t.state));
        let next_states = self.batch_tensor(batch.iter().map(|t| t.next_state));
        let actions = Tensor::from_slice(&batch.iter().map(|t| t.action).collect::<Vec<_>>())
            .to_device(device);
        let rewards = Tensor::from_slice(&batch.iter().map(|t| t.reward).collect::<Vec<_>>())
            .to_device(device);
        let continuing =
            Tensor::from_slice(&batch.iter().map(|t| t.continuing).collect::<Vec<_>>())
                .to_device(device);

        let q = self
            .policy
            .forward(&states)
            .gather(1, &actions.unsqueeze(1), false)
            .squeeze_dim(1);
        let next_max = tch::no_grad(|| self.target.forward(&next_states).max_dim(1, false).0);
        let targets = &rewards + next_max * &continuing * self.config.gamma;

        let loss = q.mse_loss(&targets.detach(), Reduction::Mean);
        self.optimizer.zero_grad();
        self.optimizer.backward_step_clip(&loss, self.config.grad_clip);

        self.update_count += 1;
        let sync_every = self.config.target_sync_every;
        if sync_every > 0 && self.update_count % sync_every == 0 {
            if let Err(err) = self.target.copy_from(&self.policy) {
                tracing::warn!(%err, "target network sync failed");
            } else {
                tracing::debug!(update = self.update_count, "target network synced");
            }
        }
        Some(f64::try_from(&loss).unwrap_or(0.0))
    }

    fn apply_checkpoint(&mut self, record: DqnCheckpoint) -> Result<(), CheckpointError> {
        check_version(record.version)?;
        self.policy.validate(&record.policy)?;
        self.target.validate(&record.target)?;

        self.policy.import(&record.policy);
        self.target.import(&record.target);
        self.optimizer.set_lr(record.optimizer.learning_rate);
        self.config.learning_rate = record.optimizer.learning_rate;
        self.epsilon = record.epsilon;
        self.update_count = record.update_count;
        Ok(())
    }
}

impl DecisionAgent for ApproximateQAgent {
    fn choose_action(
        &mut self,
        state: &StateSnapshot,
        available: &[SkillId],
        grid: &Grid,
        rng: &mut dyn RngCore,
    ) -> Option<Decision> {
        if available.is_empty() {
            return None;
        }
        let values = self.q_values(state);
        let skill = select_masked(&values, available, self.epsilon, rng)?;
        Some(decide(skill, grid, self.ultimate_targets, rng))
    }

    fn learn(&mut self, experience: &Experience, rng: &mut dyn RngCore) {
        let Some(action) = experience.action_index.filter(|a| *a < NUM_ACTIONS) else {
            return;
        };
        self.buffer.push(Transition {
            state: self.encoder.normalize(&experience.state),
            action: action as i64,
            reward: experience.reward as f32,
            next_state: self.encoder.normalize(&experience.next_state),
            continuing: if experience.terminal { 0.0 } else { 1.0 },
        });

        if self.train_step(rng).is_some() {
            self.epsilon = decay_epsilon(
                self.epsilon,
                self.config.epsilon_decay,
                self.config.epsilon_min,
            );
        }
    }

    fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let record = DqnCheckpoint {
            version: CHECKPOINT_VERSION,
            policy: self.policy.export()?,
            target: self.target.export()?,
            optimizer: OptimizerState {
                learning_rate: self.config.learning_rate,
            },
            epsilon: self.epsilon,
            update_count: self.update_count,
        };
        checkpoint::write_json(path, &record)?;
        tracing::info!(
            path = %path.display(),
            epsilon = self.epsilon,
            updates = self.update_count,
            "q-network agent saved"
        );
        Ok(())
    }

    fn load(&mut self, path: &Path) -> LoadOutcome {
        checkpoint::load_with(path, "q-network", |record: DqnCheckpoint| {
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
        "ApproximateQ"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn small_config() -> DqnConfig {
        DqnConfig {
            buffer_capacity: 8,
            batch_size: 4,
            target_sync_every: 2,
            hidden_dim: 16,
            epsilon_decay: 0.5,
            ..DqnConfig::default()
        }
    }

    fn agent() -> ApproximateQAgent {
        ApproximateQAgent::new(small_config(), EncoderConfig::default(), Device::Cpu).unwrap()
    }

    fn experience(action: Option<usize>) -> Experience {
        let state = StateSnapshot {
            boss_hp: 40,
            boss_max_hp: 50,
            boss_rage: 1,
            cooldowns: [0, 2, 0],
            unit_counts: [1, 1, 1],
            round: 2,
        };
        Experience {
            next_state: StateSnapshot {
                round: 3,
                ..state.clone()
            },
            state,
            action_index: action,
            reward: 1.0,
            terminal: false,
        }
    }

    #[test]
    fn epsilon_waits_for_a_full_batch() {
        let mut agent = agent();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..3 {
            agent.learn(&experience(Some(0)), &mut rng);
        }
        assert_eq!(agent.epsilon(), 1.0);
        assert_eq!(agent.update_count(), 0);

        agent.learn(&experience(Some(1)), &mut rng);
        assert_eq!(agent.epsilon(), 0.5);
        assert_eq!(agent.update_count(), 1);
    }

    #[test]
    fn invalid_action_is_ignored() {
        let mut agent = agent();
        let mut rng = StdRng::seed_from_u64(0);
        agent.learn(&experience(None), &mut rng);
        agent.learn(&experience(Some(NUM_ACTIONS)), &mut rng);
        assert_eq!(agent.buffer_len(), 0);
    }

    #[test]
    fn buffer_is_bounded() {
        let mut agent = agent();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..20 {
            agent.learn(&experience(Some(2)), &mut rng);
        }
        assert_eq!(agent.buffer_len(), 8);
        assert!(agent.epsilon() >= agent.config().epsilon_min);
    }

    #[test]
    fn greedy_choice_is_masked() {
        let mut agent = agent();
        agent.set_epsilon(0.0);
        let mut rng = StdRng::seed_from_u64(0);
        let grid = Grid::new(4);
        let decision = agent
            .choose_action(&experience(None).state, &[SkillId::Heal], &grid, &mut rng)
            .unwrap();
        assert_eq!(decision.action_index, SkillId::Heal.index());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dqn.json");
        let mut trained = agent();
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..6 {
            trained.learn(&experience(Some(3)), &mut rng);
        }
        trained.save(&path).unwrap();

        let mut fresh = agent();
        assert!(fresh.load(&path).is_loaded());
        assert_eq!(fresh.epsilon(), trained.epsilon());
        assert_eq!(fresh.update_count(), trained.update_count());
        let state = experience(None).state;
        assert_eq!(fresh.q_values(&state), trained.q_values(&state));
    }

    #[test]
    fn load_restores_learning_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dqn.json");
        let tuned = ApproximateQAgent::new(
            DqnConfig {
                learning_rate: 1e-3,
                ..small_config()
            },
            EncoderConfig::default(),
            Device::Cpu,
        )
        .unwrap();
        tuned.save(&path).unwrap();

        let mut agent = agent();
        assert!(agent.load(&path).is_loaded());
        assert_eq!(agent.config().learning_rate, 1e-3);

        let dir2 = tempfile::tempdir().unwrap();
        let resaved = dir2.path().join("dqn.json");
        agent.save(&resaved).unwrap();
        let record: DqnCheckpoint = checkpoint::read_json(&resaved).unwrap().unwrap();
        assert_eq!(record.optimizer, OptimizerState { learning_rate: 1e-3 });
    }

    #[test]
    fn load_rejects_other_architecture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dqn.json");
        let other = ApproximateQAgent::new(
            DqnConfig {
                hidden_dim: 32,
                ..small_config()
            },
            EncoderConfig::default(),
            Device::Cpu,
        )
        .unwrap();
        other.save(&path).unwrap();

        let mut agent = agent();
        let state = experience(None).state;
        let before = agent.q_values(&state);
        assert!(matches!(agent.load(&path), LoadOutcome::Rejected(_)));
        assert_eq!(agent.q_values(&state), before);
    }
}
