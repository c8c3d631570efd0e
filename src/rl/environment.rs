//! Boss-side environment contract over the combat state machine.
//!
//! Hides the phase protocol behind `reset` / `step`: every observation is a
//! boss decision point, and the player's side (placement and attack) is
//! played by a [`PlacementPolicy`] in between.

use rand::RngCore;

use crate::combat::{
    BossTurnOutcome, CombatError, CombatStateMachine, Decision, GameConfig, Grid, Outcome,
    PlayerAttackOutcome, RoundTransition, SkillId, StateSnapshot,
};

use super::agent::Experience;
use super::placement::{PlacementPolicy, RandomPlacement};

/// What the boss sees before deciding.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub snapshot: StateSnapshot,
    /// Skills whose cooldown is zero.
    pub available_skills: Vec<SkillId>,
    /// The episode is over; no further decision is expected.
    pub done: bool,
}

/// Raw outcomes of everything that happened during one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    pub boss_turn: BossTurnOutcome,
    /// Round advance, absent when the boss turn ended the episode.
    pub transition: Option<RoundTransition>,
    /// The following player phase, absent when the episode ended first.
    pub player_attack: Option<PlayerAttackOutcome>,
    pub outcome: Option<Outcome>,
}

/// Result of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// The next decision point.
    pub observation: Observation,
    /// Boss-turn reward plus the following player-phase reward.
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

impl StepResult {
    /// The transition the boss learns from: the state it decided on, its
    /// action, the boss-turn reward and the state right after its turn.
    pub fn experience(&self) -> Experience {
        let turn = &self.info.boss_turn;
        Experience {
            state: turn.prior_state.clone(),
            action_index: turn.action_index,
            reward: turn.reward,
            next_state: turn.next_state.clone(),
            terminal: turn.terminal,
        }
    }
}

/// Single-agent environment in which the learner plays the boss.
///
/// # Lifecycle
///
/// 1. [`BossEnvironment::reset`] starts an episode and plays the player's
///    first round.
/// 2. [`BossEnvironment::step`] with the boss's decision until `done`.
#[derive(Debug, Clone)]
pub struct BossEnvironment<P = RandomPlacement> {
    machine: CombatStateMachine,
    placement: P,
    cumulative_reward: f64,
}

impl BossEnvironment<RandomPlacement> {
    /// Environment with the automated random player.
    pub fn new(config: GameConfig) -> Self {
        Self::with_placement(config, RandomPlacement)
    }
}

impl<P: PlacementPolicy> BossEnvironment<P> {
    pub fn with_placement(config: GameConfig, placement: P) -> Self {
        Self {
            machine: CombatStateMachine::new(config),
            placement,
            cumulative_reward: 0.0,
        }
    }

    pub fn machine(&self) -> &CombatStateMachine {
        &self.machine
    }

    pub fn grid(&self) -> &Grid {
        self.machine.grid()
    }

    /// Boss reward accumulated since the last reset, including the opening
    /// player phase.
    pub fn cumulative_reward(&self) -> f64 {
        self.cumulative_reward
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.machine.outcome()
    }

    fn observe(&self) -> Observation {
        Observation {
            snapshot: self.machine.snapshot(),
            available_skills: self.machine.available_skills(),
            done: self.machine.outcome().is_some(),
        }
    }

    fn run_player_phase(
        &mut self,
        rng: &mut dyn RngCore,
    ) -> Result<PlayerAttackOutcome, CombatError> {
        self.placement.place(&mut self.machine, rng);
        self.machine.end_placement_phase()
    }

    /// Starts a new episode and returns the first boss decision point.
    pub fn reset(&mut self, rng: &mut dyn RngCore) -> Result<Observation, CombatError> {
        self.machine.start_episode();
        let opening = self.run_player_phase(rng)?;
        self.cumulative_reward = opening.reward;
        Ok(self.observe())
    }

    /// Resolves the boss's `decision` and plays forward to the next decision
    /// point.
    ///
    /// # Errors
    ///
    /// [`CombatError::PhaseMismatch`] when called after the episode ended.
    pub fn step(
        &mut self,
        decision: Option<Decision>,
        rng: &mut dyn RngCore,
    ) -> Result<StepResult, CombatError> {
        let boss_turn = self.machine.apply_boss_decision(decision)?;
        let mut reward = boss_turn.reward;
        let mut transition = None;
        let mut player_attack = None;

        if !boss_turn.terminal {
            let next = self.machine.advance_round()?;
            let ended = self.machine.outcome().is_some();
            transition = Some(next);
            if !ended {
                let attack = self.run_player_phase(rng)?;
                reward += attack.reward;
                player_attack = Some(attack);
            }
        }

        self.cumulative_reward += reward;
        let observation = self.observe();
        Ok(StepResult {
            done: observation.done,
            reward,
            info: StepInfo {
                boss_turn,
                transition,
                player_attack,
                outcome: self.machine.outcome(),
            },
            observation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{Phase, SkillCast, UnitKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn knight_each_round(m: &mut CombatStateMachine, _: &mut dyn RngCore) {
        let row = m.round().round as usize - 1;
        m.place_unit(UnitKind::Knight, row % 4, 0).ok();
    }

    #[test]
    fn reset_lands_on_boss_decision() {
        let mut env = BossEnvironment::new(GameConfig::default());
        let mut rng = StdRng::seed_from_u64(4);
        let obs = env.reset(&mut rng).unwrap();
        assert!(!obs.done);
        assert_eq!(obs.snapshot.round, 1);
        assert_eq!(obs.available_skills.len(), 5);
        assert_eq!(env.machine().phase(), Phase::BossAttack);
        assert!(env.cumulative_reward() < 0.0);
    }

    #[test]
    fn step_sums_boss_and_player_rewards() {
        let mut env = BossEnvironment::with_placement(GameConfig::default(), knight_each_round);
        let mut rng = StdRng::seed_from_u64(4);
        env.reset(&mut rng).unwrap();
        assert_eq!(env.cumulative_reward(), -3.0);

        let result = env.step(None, &mut rng).unwrap();
        assert!(!result.done);
        // pass (0) then two knights attack for 4 damage (-6)
        assert_eq!(result.reward, -6.0);
        assert_eq!(result.observation.snapshot.round, 2);
        assert_eq!(result.experience().action_index, None);
        assert_eq!(env.cumulative_reward(), -9.0);
    }

    #[test]
    fn experience_uses_boss_turn() {
        let mut env = BossEnvironment::with_placement(GameConfig::default(), knight_each_round);
        let mut rng = StdRng::seed_from_u64(4);
        let obs = env.reset(&mut rng).unwrap();
        let decision = Decision::new(SkillCast::NormalAttack {
            target: Some(crate::combat::Position::new(0, 0)),
        });
        let result = env.step(Some(decision), &mut rng).unwrap();
        let exp = result.experience();
        assert_eq!(exp.state, obs.snapshot);
        assert_eq!(exp.action_index, Some(0));
        // hit on a knight (3.0) plus the survival bonus
        assert_eq!(exp.reward, 4.0);
        assert!(!exp.terminal);
    }

    #[test]
    fn episode_runs_to_completion() {
        let mut env = BossEnvironment::with_placement(
            GameConfig {
                max_rounds: 3,
                ..GameConfig::default()
            },
            |_: &mut CombatStateMachine, _: &mut dyn RngCore| {},
        );
        let mut rng = StdRng::seed_from_u64(4);
        let mut obs = env.reset(&mut rng).unwrap();
        let mut steps = 0;
        while !obs.done {
            let result = env.step(None, &mut rng).unwrap();
            obs = result.observation;
            steps += 1;
        }
        assert_eq!(steps, 3);
        assert_eq!(env.outcome(), Some(Outcome::BossSurvived));
        assert!(env.step(None, &mut rng).is_err());
    }
}
