//! Episode-based training loop for the boss agents.

use rand::RngCore;

use crate::combat::CombatError;

use super::agent::DecisionAgent;
use super::config::TrainingConfig;
use super::environment::BossEnvironment;
use super::metrics::{run_episode, EpisodeStats, EpisodeSummary};
use super::placement::PlacementPolicy;

/// Result of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub episodes: Vec<EpisodeSummary>,
    /// Statistics over every episode of the run.
    pub overall: EpisodeStats,
    /// One entry per logged window: (episodes completed, window stats, epsilon).
    pub learning_curve: Vec<(usize, EpisodeStats, f64)>,
    pub final_epsilon: f64,
}

/// Trains an agent against an environment for a fixed number of episodes.
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Runs the training loop.
    ///
    /// Every `log_every` episodes the window's mean reward, boss win rate and
    /// the current epsilon are logged. Every `checkpoint_every` episodes, and
    /// once at the end, the agent is saved if a checkpoint path is set. Save
    /// failures are logged and training continues.
    pub fn run<P: PlacementPolicy>(
        &self,
        env: &mut BossEnvironment<P>,
        agent: &mut dyn DecisionAgent,
        rng: &mut dyn RngCore,
    ) -> Result<TrainingReport, CombatError> {
        let mut episodes = Vec::with_capacity(self.config.episodes);
        let mut learning_curve = Vec::new();
        tracing::info!(
            agent = agent.name(),
            episodes = self.config.episodes,
            "training started"
        );

        for e in 1..=self.config.episodes {
            let summary = run_episode(env, agent, true, rng)?;
            tracing::debug!(
                episode = e,
                reward = summary.reward,
                outcome = ?summary.outcome,
                "episode done"
            );
            episodes.push(summary);

            if self.config.log_every > 0 && e % self.config.log_every == 0 {
                let window = &episodes[episodes.len() - self.config.log_every..];
                let stats = EpisodeStats::from_episodes(window);
                tracing::info!(
                    episode = e,
                    avg_reward = stats.mean_reward,
                    boss_win_rate = stats.boss_win_rate,
                    epsilon = agent.epsilon(),
                    "training progress"
                );
                learning_curve.push((e, stats, agent.epsilon()));
            }

            if self.config.checkpoint_every > 0 && e % self.config.checkpoint_every == 0 {
                self.checkpoint(agent);
            }
        }
        self.checkpoint(agent);

        let overall = EpisodeStats::from_episodes(&episodes);
        tracing::info!(
            mean_reward = overall.mean_reward,
            boss_win_rate = overall.boss_win_rate,
            "training finished"
        );
        Ok(TrainingReport {
            overall,
            learning_curve,
            final_epsilon: agent.epsilon(),
            episodes,
        })
    }

    fn checkpoint(&self, agent: &dyn DecisionAgent) {
        let Some(path) = &self.config.checkpoint_path else {
            return;
        };
        if let Err(err) = agent.save(path) {
            tracing::warn!(path = %path.display(), %err, "failed to save agent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::GameConfig;
    use crate::rl::agent::TabularQAgent;
    use crate::rl::config::{EncoderConfig, TabularConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tabular() -> TabularQAgent {
        TabularQAgent::new(TabularConfig::default(), EncoderConfig::default())
    }

    #[test]
    fn run_collects_every_episode() {
        let trainer = Trainer::new(TrainingConfig {
            episodes: 6,
            log_every: 3,
            checkpoint_every: 0,
            checkpoint_path: None,
        });
        let mut env = BossEnvironment::new(GameConfig::default());
        let mut agent = tabular();
        let mut rng = StdRng::seed_from_u64(1);
        let report = trainer.run(&mut env, &mut agent, &mut rng).unwrap();

        assert_eq!(report.episodes.len(), 6);
        assert_eq!(report.learning_curve.len(), 2);
        assert_eq!(report.learning_curve[1].0, 6);
        assert!(report.final_epsilon < 1.0);
        assert!(report.episodes.iter().all(|e| e.outcome.is_some()));
    }

    #[test]
    fn epsilon_is_non_increasing_across_windows() {
        let trainer = Trainer::new(TrainingConfig {
            episodes: 8,
            log_every: 2,
            checkpoint_every: 0,
            checkpoint_path: None,
        });
        let mut env = BossEnvironment::new(GameConfig::default());
        let mut agent = tabular();
        let mut rng = StdRng::seed_from_u64(2);
        let report = trainer.run(&mut env, &mut agent, &mut rng).unwrap();
        let eps: Vec<f64> = report.learning_curve.iter().map(|(_, _, e)| *e).collect();
        assert!(eps.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn saves_checkpoint_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("boss.json");
        let trainer = Trainer::new(TrainingConfig {
            episodes: 2,
            log_every: 0,
            checkpoint_every: 1,
            checkpoint_path: Some(path.clone()),
        });
        let mut env = BossEnvironment::new(GameConfig::default());
        let mut agent = tabular();
        let mut rng = StdRng::seed_from_u64(3);
        trainer.run(&mut env, &mut agent, &mut rng).unwrap();

        let mut restored = tabular();
        assert!(restored.load(&path).is_loaded());
        assert_eq!(restored.epsilon(), agent.epsilon());
    }
}
