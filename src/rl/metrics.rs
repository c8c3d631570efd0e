//! Episode statistics and greedy evaluation.

use std::fmt;

use rand::RngCore;

use crate::combat::{CombatError, Outcome};

use super::agent::DecisionAgent;
use super::environment::BossEnvironment;
use super::placement::PlacementPolicy;

/// Summary of one finished episode.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeSummary {
    /// Cumulative boss reward, including the player phases.
    pub reward: f64,
    /// Round the episode ended in.
    pub rounds: u32,
    pub outcome: Option<Outcome>,
}

impl EpisodeSummary {
    /// The boss wins by wiping the grid or surviving the round limit.
    pub fn boss_won(&self) -> bool {
        self.outcome.is_some_and(|o| o.boss_won())
    }
}

/// Aggregated statistics over a run of episodes.
#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeStats {
    pub mean_reward: f64,
    /// Fraction of episodes the boss won, in `[0, 1]`.
    pub boss_win_rate: f64,
    pub mean_rounds: f64,
    pub n_episodes: usize,
}

impl EpisodeStats {
    /// Aggregates `episodes`; all zero when empty.
    pub fn from_episodes(episodes: &[EpisodeSummary]) -> Self {
        if episodes.is_empty() {
            return Self {
                mean_reward: 0.0,
                boss_win_rate: 0.0,
                mean_rounds: 0.0,
                n_episodes: 0,
            };
        }
        let n = episodes.len() as f64;
        Self {
            mean_reward: episodes.iter().map(|e| e.reward).sum::<f64>() / n,
            boss_win_rate: episodes.iter().filter(|e| e.boss_won()).count() as f64 / n,
            mean_rounds: episodes.iter().map(|e| e.rounds as f64).sum::<f64>() / n,
            n_episodes: episodes.len(),
        }
    }
}

impl fmt::Display for EpisodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Episode Stats ({} episodes) ===", self.n_episodes)?;
        writeln!(f, "  Mean reward:     {:.2}", self.mean_reward)?;
        writeln!(f, "  Boss win rate:   {:.1}%", self.boss_win_rate * 100.0)?;
        writeln!(f, "  Mean rounds:     {:.1}", self.mean_rounds)
    }
}

/// Plays one episode, optionally learning from every boss transition.
pub fn run_episode<P: PlacementPolicy>(
    env: &mut BossEnvironment<P>,
    agent: &mut dyn DecisionAgent,
    learn: bool,
    rng: &mut dyn RngCore,
) -> Result<EpisodeSummary, CombatError> {
    let mut obs = env.reset(rng)?;
    while !obs.done {
        let decision = agent.choose_action(&obs.snapshot, &obs.available_skills, env.grid(), rng);
        let result = env.step(decision, rng)?;
        if learn {
            agent.learn(&result.experience(), rng);
        }
        obs = result.observation;
    }
    Ok(EpisodeSummary {
        reward: env.cumulative_reward(),
        rounds: env.machine().round().round,
        outcome: env.outcome(),
    })
}

/// Runs `episodes` greedy episodes without learning.
///
/// Exploration is forced to zero for the run and restored afterwards.
pub fn evaluate<P: PlacementPolicy>(
    env: &mut BossEnvironment<P>,
    agent: &mut dyn DecisionAgent,
    episodes: usize,
    rng: &mut dyn RngCore,
) -> Result<EpisodeStats, CombatError> {
    let saved = agent.epsilon();
    agent.set_epsilon(0.0);
    let mut summaries = Vec::with_capacity(episodes);
    let mut result = Ok(());
    for _ in 0..episodes {
        match run_episode(env, agent, false, rng) {
            Ok(summary) => summaries.push(summary),
            Err(err) => {
                result = Err(err);
                break;
            }
        }
    }
    agent.set_epsilon(saved);
    result?;
    Ok(EpisodeStats::from_episodes(&summaries))
}
