//! Configuration for state encoding, the two learners and the training loop.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::combat::{GameConfig, UnitKind, OBSERVED_COOLDOWNS};

/// Number of quantities in an encoded state.
pub const STATE_DIM: usize = 9;

/// Bounds used to discretize and normalize a [`crate::combat::StateSnapshot`].
///
/// Built once and handed to the encoder and agents at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Number of bins for the boss hp fraction.
    pub hp_bins: usize,
    pub max_rage: u32,
    /// Maximum cooldown of each observed skill (h-shot, v-shot, heal).
    pub max_cooldowns: [u32; 3],
    /// Maximum on-grid count per unit kind (Tank, Knight, AD).
    pub max_unit_counts: [u32; 3],
    /// Largest zero-based round index (`max_rounds - 1`).
    pub max_round_index: u32,
}

impl EncoderConfig {
    /// Derives encoder bounds from a game configuration.
    pub fn from_game(game: &GameConfig) -> Self {
        let max_cooldowns = OBSERVED_COOLDOWNS.map(|id| {
            game.boss
                .skills
                .iter()
                .find(|s| s.id == id)
                .map_or(0, |s| s.cooldown_max)
        });
        let max_unit_counts = UnitKind::all().map(|kind| game.unit_spec(kind).max_stock);
        Self {
            hp_bins: 5,
            max_rage: game.boss.max_rage,
            max_cooldowns,
            max_unit_counts,
            max_round_index: game.max_rounds.saturating_sub(1),
        }
    }

    /// Bin count per state dimension, in encoding order.
    pub fn dims(&self) -> [usize; STATE_DIM] {
        let [cd_h, cd_v, cd_heal] = self.max_cooldowns.map(|m| m as usize + 1);
        let [tank, knight, ad] = self.max_unit_counts.map(|m| m as usize + 1);
        [
            self.hp_bins.max(1),
            self.max_rage as usize + 1,
            cd_h,
            cd_v,
            cd_heal,
            tank,
            knight,
            ad,
            self.max_round_index as usize + 1,
        ]
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self::from_game(&GameConfig::default())
    }
}

/// Hyperparameters of the tabular Q-learning agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularConfig {
    pub learning_rate: f64,
    /// Discount factor.
    pub gamma: f64,
    /// Initial exploration rate.
    pub epsilon: f64,
    /// Multiplicative decay applied after every `learn` call.
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
}

impl Default for TabularConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            gamma: 0.95,
            epsilon: 1.0,
            epsilon_decay: 0.9995,
            epsilon_min: 0.01,
        }
    }
}

/// Hyperparameters of the replay-based Q-network agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnConfig {
    pub learning_rate: f64,
    pub gamma: f64,
    pub epsilon: f64,
    /// Multiplicative decay applied after every executed training step.
    pub epsilon_decay: f64,
    pub epsilon_min: f64,
    /// Replay buffer capacity.
    pub buffer_capacity: usize,
    pub batch_size: usize,
    /// Training steps between target-network syncs.
    pub target_sync_every: u64,
    /// Width of the single hidden layer.
    pub hidden_dim: i64,
    /// Element-wise gradient clamp.
    pub grad_clip: f64,
}

impl Default for DqnConfig {
    fn default() -> Self {
        Self {
            learning_rate: 5e-4,
            gamma: 0.95,
            epsilon: 1.0,
            epsilon_decay: 0.99999,
            epsilon_min: 0.005,
            buffer_capacity: 50_000,
            batch_size: 64,
            target_sync_every: 100,
            hidden_dim: 128,
            grad_clip: 1.0,
        }
    }
}

/// Configuration for [`crate::rl::Trainer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub episodes: usize,
    /// Episodes per logged statistics window; 0 disables logging.
    pub log_every: usize,
    /// Episodes between checkpoints; 0 disables periodic saves.
    pub checkpoint_every: usize,
    /// Where to save the agent. No checkpoints are written when `None`.
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 1_000,
            log_every: 100,
            checkpoint_every: 500,
            checkpoint_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dims() {
        let cfg = EncoderConfig::default();
        assert_eq!(cfg.dims(), [5, 4, 3, 3, 4, 4, 4, 5, 9]);
    }

    #[test]
    fn dims_follow_game_config() {
        let game = GameConfig {
            max_rounds: 3,
            ..GameConfig::default()
        };
        let cfg = EncoderConfig::from_game(&game);
        assert_eq!(cfg.max_round_index, 2);
        assert_eq!(cfg.dims()[8], 3);
    }

    #[test]
    fn default_hyperparameters() {
        let dqn = DqnConfig::default();
        assert_eq!(dqn.batch_size, 64);
        assert_eq!(dqn.buffer_capacity, 50_000);
        let tab = TabularConfig::default();
        assert!(tab.epsilon_min < tab.epsilon);
    }
}
