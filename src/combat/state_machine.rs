//! Combat state machine.
//!
//! Drives one episode through its phases:
//! `Placement → PlayerAttack → BossAttack → RoundEnd → {Placement | GameOver}`,
//! applies damage on both sides and computes the boss's reward signal.

use std::collections::HashSet;
use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::boss::{Boss, SkillId};
use super::config::GameConfig;
use super::error::{CombatError, PlacementError};
use super::grid::{Grid, Strike};
use super::reward::RewardComputer;
use super::skill::{Decision, SkillCast, Sweep};
use super::snapshot::StateSnapshot;
use super::unit::{Position, UnitKind};
use crate::rl::agent::DecisionAgent;

/// Phase of the encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// No episode has been started yet.
    Initializing,
    Placement,
    PlayerAttack,
    BossAttack,
    RoundEnd,
    GameOver,
}

/// How an episode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The player brought the boss to zero hit points.
    BossDefeated,
    /// The boss destroyed every unit on the grid.
    PlayerWiped,
    /// The boss was still alive at the round limit.
    BossSurvived,
}

impl Outcome {
    /// Whether the boss (the learning side) won.
    pub fn boss_won(&self) -> bool {
        !matches!(self, Outcome::BossDefeated)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::BossDefeated => write!(f, "Game Over: Boss defeated! Player wins!"),
            Outcome::PlayerWiped => write!(f, "Game Over: All player units destroyed!"),
            Outcome::BossSurvived => {
                write!(f, "Game Over: Boss survived the round limit! Player loses.")
            }
        }
    }
}

/// Status code reported to the presentation layer after each operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStatus {
    /// The boss acts next.
    BossTurn,
    /// The boss has acted; the round can be advanced.
    RoundEnd,
    /// A new round started in the placement phase.
    NewRound,
    GameOver(Outcome),
}

/// Cells a presentation layer should animate for one skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationHint {
    pub skill: SkillId,
    /// Cells in impact order; empty for `heal`.
    pub targets: Vec<Position>,
}

/// Result of the player's attack phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAttackOutcome {
    pub status: TurnStatus,
    pub message: String,
    pub damage_dealt: u32,
    pub next_state: StateSnapshot,
    pub reward: f64,
    pub terminal: bool,
}

/// Result of the boss's turn.
#[derive(Debug, Clone, PartialEq)]
pub struct BossTurnOutcome {
    pub status: TurnStatus,
    pub message: String,
    pub animations: Vec<AnimationHint>,
    pub next_state: StateSnapshot,
    pub reward: f64,
    pub terminal: bool,
    /// State the boss decided on.
    pub prior_state: StateSnapshot,
    /// Action the learner should credit, `None` when the boss passed.
    pub action_index: Option<usize>,
}

/// Result of advancing to the next round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTransition {
    pub status: TurnStatus,
    pub message: String,
    pub next_state: StateSnapshot,
}

/// Round bookkeeping. Mutated only by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundContext {
    /// Current round, 1-based once an episode has started.
    pub round: u32,
    pub max_rounds: u32,
    pub phase: Phase,
    /// Player stock indexed by [`UnitKind::index`].
    pub stock: [u32; 3],
    pub max_stock: [u32; 3],
    pub placed_this_round: u32,
    pub destroyed_this_round: u32,
}

/// Accumulates reward and impact cells while one skill resolves.
#[derive(Debug, Default)]
struct Resolution {
    reward: f64,
    targets: Vec<Position>,
}

/// Owns the grid, the boss and the round context of one encounter.
///
/// # Lifecycle
///
/// 1. [`CombatStateMachine::start_episode`] resets everything and enters
///    round 1.
/// 2. [`CombatStateMachine::place_unit`] any number of times, then
///    [`CombatStateMachine::end_placement_phase`].
/// 3. [`CombatStateMachine::resolve_boss_attack`] (or
///    [`CombatStateMachine::apply_boss_decision`] with an explicit decision).
/// 4. [`CombatStateMachine::advance_round`] and repeat until `GameOver`.
#[derive(Debug, Clone)]
pub struct CombatStateMachine {
    config: GameConfig,
    grid: Grid,
    boss: Boss,
    round: RoundContext,
    outcome: Option<Outcome>,
    log: Vec<String>,
}

impl CombatStateMachine {
    pub fn new(config: GameConfig) -> Self {
        let max_stock = UnitKind::all().map(|kind| config.unit_spec(kind).max_stock);
        Self {
            grid: Grid::new(config.grid_size),
            boss: Boss::new(config.boss.clone()),
            round: RoundContext {
                round: 0,
                max_rounds: config.max_rounds,
                phase: Phase::Initializing,
                stock: max_stock,
                max_stock,
                placed_this_round: 0,
                destroyed_this_round: 0,
            },
            outcome: None,
            log: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn boss(&self) -> &Boss {
        &self.boss
    }

    pub fn round(&self) -> &RoundContext {
        &self.round
    }

    pub fn phase(&self) -> Phase {
        self.round.phase
    }

    /// Terminal outcome, once one has been reached.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Remaining stock for `kind`.
    pub fn stock(&self, kind: UnitKind) -> u32 {
        self.round.stock[kind.index()]
    }

    /// Units the player may still place this round.
    pub fn placements_left(&self) -> u32 {
        self.config
            .placements_for_round(self.round.round)
            .saturating_sub(self.round.placed_this_round)
    }

    /// Skills whose cooldown is zero.
    pub fn available_skills(&self) -> Vec<SkillId> {
        self.boss.ready_skills()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot::capture(&self.boss, &self.grid, self.round.round)
    }

    /// The last `tail` log lines, or the whole log when `tail` is zero.
    pub fn get_log(&self, tail: usize) -> &[String] {
        if tail > 0 && self.log.len() > tail {
            &self.log[self.log.len() - tail..]
        } else {
            &self.log
        }
    }

    /// Resets grid, boss and stock and enters round 1 in the placement phase.
    pub fn start_episode(&mut self) -> StateSnapshot {
        self.grid.clear();
        self.boss.reset();
        self.round.round = 0;
        self.round.stock = self.round.max_stock;
        self.outcome = None;
        self.log.clear();
        self.log.push("Game Started (New Episode).".to_string());
        self.setup_new_round();
        self.snapshot()
    }

    fn setup_new_round(&mut self) {
        self.round.round += 1;
        self.round.placed_this_round = 0;
        self.round.destroyed_this_round = 0;
        self.boss.decrement_cooldowns();
        if self.round.round > 1 {
            for (stock, max) in self.round.stock.iter_mut().zip(self.round.max_stock) {
                *stock = (*stock + 1).min(max);
            }
            self.log.push("Player unit stock regenerated.".to_string());
        }
        self.log.push(format!("--- Round {} ---", self.round.round));
        self.round.phase = Phase::Placement;
        tracing::debug!(round = self.round.round, "round started");
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), CombatError> {
        if self.round.phase == expected {
            Ok(())
        } else {
            Err(CombatError::PhaseMismatch {
                expected,
                actual: self.round.phase,
            })
        }
    }

    /// Places one unit from stock at `(row, col)`.
    ///
    /// # Errors
    ///
    /// [`CombatError::InvalidPlacement`] if not in the placement phase, the
    /// round's cap is reached, the stock for `kind` is empty, or the cell is
    /// outside the grid or occupied.
    pub fn place_unit(
        &mut self,
        kind: UnitKind,
        row: usize,
        col: usize,
    ) -> Result<String, CombatError> {
        if self.round.phase != Phase::Placement {
            return Err(PlacementError::WrongPhase.into());
        }
        if self.placements_left() == 0 {
            return Err(PlacementError::LimitReached.into());
        }
        if self.stock(kind) == 0 {
            return Err(PlacementError::OutOfStock(kind.to_string()).into());
        }

        let position = Position::new(row, col);
        let unit = self.config.unit_spec(kind).instantiate(position);
        self.grid.place(unit)?;

        self.round.stock[kind.index()] -= 1;
        self.round.placed_this_round += 1;
        self.log.push(format!(
            "Placed {} at {}. Stock: {}. Placed: {}.",
            kind,
            position,
            self.stock(kind),
            self.round.placed_this_round
        ));
        tracing::debug!(%kind, %position, "unit placed");
        Ok(format!("Placed {}.", kind))
    }

    /// Closes the placement phase and resolves the player's attack.
    pub fn end_placement_phase(&mut self) -> Result<PlayerAttackOutcome, CombatError> {
        self.expect_phase(Phase::Placement)?;
        self.log.push("Placement phase ended.".to_string());
        self.round.phase = Phase::PlayerAttack;
        self.resolve_player_attack()
    }

    /// Every unit on the grid hits the boss once for its attack power.
    pub fn resolve_player_attack(&mut self) -> Result<PlayerAttackOutcome, CombatError> {
        self.expect_phase(Phase::PlayerAttack)?;
        self.log.push("Player attacks:".to_string());

        if self.grid.is_empty() {
            self.log
                .push("No player units on board to attack.".to_string());
            self.round.phase = Phase::BossAttack;
            return Ok(PlayerAttackOutcome {
                status: TurnStatus::BossTurn,
                message: "No player units. Boss's turn.".to_string(),
                damage_dealt: 0,
                next_state: self.snapshot(),
                reward: 0.0,
                terminal: false,
            });
        }

        let lines: Vec<String> = self
            .grid
            .units()
            .filter(|u| u.attack_power > 0)
            .map(|u| format!("- {} {} deals {} damage.", u.kind, u.position, u.attack_power))
            .collect();
        self.log.extend(lines);

        let total_damage = self.grid.total_attack();
        let mut reward = RewardComputer::player_attack(total_damage);
        let mut boss_died = false;
        if total_damage > 0 {
            boss_died = self.boss.take_damage(total_damage);
            self.log.push(format!(
                "Boss takes {} total. HP: {}",
                total_damage,
                self.boss.hp()
            ));
        } else {
            self.log.push("Player units dealt no damage.".to_string());
        }

        if boss_died {
            reward += RewardComputer::BOSS_DEFEATED;
            self.finish(Outcome::BossDefeated);
            return Ok(PlayerAttackOutcome {
                status: TurnStatus::GameOver(Outcome::BossDefeated),
                message: "Boss Defeated!".to_string(),
                damage_dealt: total_damage,
                next_state: self.snapshot(),
                reward,
                terminal: true,
            });
        }

        self.round.phase = Phase::BossAttack;
        Ok(PlayerAttackOutcome {
            status: TurnStatus::BossTurn,
            message: "Boss's turn.".to_string(),
            damage_dealt: total_damage,
            next_state: self.snapshot(),
            reward,
            terminal: false,
        })
    }

    /// Asks `agent` for a skill and resolves it.
    pub fn resolve_boss_attack(
        &mut self,
        agent: &mut dyn DecisionAgent,
        rng: &mut dyn RngCore,
    ) -> Result<BossTurnOutcome, CombatError> {
        self.expect_phase(Phase::BossAttack)?;
        let state = self.snapshot();
        let available = self.available_skills();
        let decision = agent.choose_action(&state, &available, &self.grid, rng);
        self.apply_boss_decision(decision)
    }

    /// Resolves the boss's turn for an already chosen decision.
    ///
    /// `None` means no skill was available; the boss passes with reward 0.
    /// A decision whose cooldown or rage gate fails has no board effect and
    /// is rewarded [`RewardComputer::CAST_REJECTED`].
    pub fn apply_boss_decision(
        &mut self,
        decision: Option<Decision>,
    ) -> Result<BossTurnOutcome, CombatError> {
        self.expect_phase(Phase::BossAttack)?;
        let prior_state = self.snapshot();
        self.round.destroyed_this_round = 0;
        self.log.push("Boss's turn:".to_string());

        let Some(decision) = decision else {
            return Ok(self.finish_passive_turn(prior_state, None, 0.0, "Boss does nothing."));
        };
        let action_index = Some(decision.action_index);
        let skill_id = decision.cast.skill_id();

        let cast = self
            .boss
            .cast(skill_id)
            .map(|skill| (skill.damage, skill.unblockable));
        let (damage, unblockable) = match cast {
            Ok(stats) => stats,
            Err(err) => {
                let message = format!("Boss cannot use {}: {}", skill_id, err);
                tracing::debug!(%skill_id, %err, "cast rejected");
                return Ok(self.finish_passive_turn(
                    prior_state,
                    action_index,
                    RewardComputer::CAST_REJECTED,
                    &message,
                ));
            }
        };
        self.log.push(format!("Boss uses {}.", skill_id));

        let mut res = Resolution::default();
        match &decision.cast {
            SkillCast::NormalAttack { target } => {
                self.resolve_single_target(*target, damage, &mut res)
            }
            SkillCast::HorizontalShot { row, sweep } => {
                let sweep = if sweep.is_horizontal() {
                    *sweep
                } else {
                    Sweep::LeftToRight
                };
                self.resolve_line_shot(*row, sweep, damage, unblockable, &mut res)
            }
            SkillCast::VerticalShot { col, sweep } => {
                let sweep = if sweep.is_horizontal() {
                    Sweep::TopToBottom
                } else {
                    *sweep
                };
                self.resolve_line_shot(*col, sweep, damage, unblockable, &mut res)
            }
            SkillCast::Ultimate { targets } => self.resolve_ultimate(targets, damage, &mut res),
            SkillCast::Heal => {
                // tiered on the hp the heal left behind
                res.reward += RewardComputer::heal(self.boss.hp_fraction());
                self.log
                    .push(format!("- Boss heals. HP: {}", self.boss.hp()));
            }
        }

        let mut animations = Vec::new();
        if skill_id == SkillId::Heal || !res.targets.is_empty() {
            animations.push(AnimationHint {
                skill: skill_id,
                targets: res.targets,
            });
        }
        tracing::debug!(%skill_id, reward = res.reward, "boss skill resolved");

        let mut reward = res.reward;
        let (status, message, terminal) =
            if self.grid.is_empty() && self.round.destroyed_this_round > 0 {
                reward += RewardComputer::PLAYER_WIPED;
                self.log
                    .push("All player units destroyed by Boss this round!".to_string());
                self.finish(Outcome::PlayerWiped);
                (
                    TurnStatus::GameOver(Outcome::PlayerWiped),
                    "All player units destroyed!".to_string(),
                    true,
                )
            } else if !self.boss.is_alive() {
                reward += RewardComputer::BOSS_DEFEATED;
                self.finish(Outcome::BossDefeated);
                (
                    TurnStatus::GameOver(Outcome::BossDefeated),
                    Outcome::BossDefeated.to_string(),
                    true,
                )
            } else if self.round.round >= self.round.max_rounds {
                reward += RewardComputer::ROUND_LIMIT_SURVIVED;
                self.finish(Outcome::BossSurvived);
                (
                    TurnStatus::GameOver(Outcome::BossSurvived),
                    Outcome::BossSurvived.to_string(),
                    true,
                )
            } else {
                reward += RewardComputer::EXCHANGE_SURVIVED;
                self.round.phase = Phase::RoundEnd;
                (TurnStatus::RoundEnd, "Boss turn finished.".to_string(), false)
            };

        Ok(BossTurnOutcome {
            status,
            message,
            animations,
            next_state: self.snapshot(),
            reward,
            terminal,
            prior_state,
            action_index,
        })
    }

    /// A boss turn with no board effect. Reaching the round limit here
    /// replaces the base reward with the survival reward.
    fn finish_passive_turn(
        &mut self,
        prior_state: StateSnapshot,
        action_index: Option<usize>,
        base_reward: f64,
        message: &str,
    ) -> BossTurnOutcome {
        self.log.push(message.to_string());
        let mut reward = base_reward;
        let status = match self.check_terminal() {
            Some(outcome) => {
                if outcome == Outcome::BossSurvived {
                    reward = RewardComputer::ROUND_LIMIT_SURVIVED;
                }
                self.finish(outcome);
                TurnStatus::GameOver(outcome)
            }
            None => {
                self.round.phase = Phase::RoundEnd;
                TurnStatus::RoundEnd
            }
        };
        BossTurnOutcome {
            status,
            message: message.to_string(),
            animations: Vec::new(),
            next_state: self.snapshot(),
            reward,
            terminal: matches!(status, TurnStatus::GameOver(_)),
            prior_state,
            action_index,
        }
    }

    /// Strikes `pos` once, crediting the kill or hit reward.
    fn strike(&mut self, pos: Position, damage: u32, res: &mut Resolution) -> Strike {
        let strike = self.grid.strike(pos, damage);
        match strike {
            Strike::Destroyed { kind } => {
                res.reward += RewardComputer::kill(kind);
                self.round.destroyed_this_round += 1;
                self.log.push(format!("  - {} at {} destroyed!", kind, pos));
            }
            Strike::Survived { kind, hp } => {
                res.reward += RewardComputer::hit(damage);
                self.log.push(format!(
                    "  - {} at {} takes {} damage. HP: {}",
                    kind, pos, damage, hp
                ));
            }
            Strike::Empty => {
                self.log.push(format!("  - Hits empty {}.", pos));
            }
        }
        strike
    }

    fn resolve_single_target(
        &mut self,
        target: Option<Position>,
        damage: u32,
        res: &mut Resolution,
    ) {
        match target.filter(|p| self.grid.is_occupied(*p)) {
            Some(pos) => {
                self.strike(pos, damage, res);
                res.targets.push(pos);
            }
            None => {
                self.log.push("- No valid target.".to_string());
                res.reward += RewardComputer::NO_TARGET;
            }
        }
    }

    /// Sends the configured number of charges down a row or column.
    ///
    /// Non-blocking units take one charge each. A blocking unit absorbs
    /// charges one at a time; if it is still standing when it stops
    /// absorbing, the remaining charges are lost.
    fn resolve_line_shot(
        &mut self,
        index: usize,
        sweep: Sweep,
        damage: u32,
        unblockable: bool,
        res: &mut Resolution,
    ) {
        let mut charges = self.config.line_shot_charges;
        self.log.push(format!(
            "- Line shot ({} charges) on line {} {:?}:",
            charges, index, sweep
        ));

        let mut hit_any = false;
        for pos in self.grid.line(index, sweep) {
            if charges == 0 {
                break;
            }
            let Some(kind) = self.grid.get(pos).map(|u| u.kind) else {
                continue;
            };
            hit_any = true;
            res.targets.push(pos);

            if kind.blocks_line_shots() && !unblockable {
                while charges > 0 {
                    charges -= 1;
                    if let Strike::Destroyed { .. } = self.strike(pos, damage, res) {
                        break;
                    }
                }
                if self.grid.is_occupied(pos) {
                    self.log
                        .push("    - Blocker survives. Shot exhausted.".to_string());
                    charges = 0;
                }
            } else {
                self.strike(pos, damage, res);
                charges -= 1;
            }
        }

        if !hit_any {
            res.reward += RewardComputer::EMPTY_LINE;
        }
    }

    /// Strikes each distinct in-bounds cell of `targets` once.
    fn resolve_ultimate(&mut self, targets: &[Position], damage: u32, res: &mut Resolution) {
        let mut seen = HashSet::new();
        let cells: Vec<Position> = targets
            .iter()
            .copied()
            .filter(|p| self.grid.in_bounds(*p) && seen.insert(*p))
            .collect();
        self.log
            .push(format!("- Ultimate strikes {} locations:", cells.len()));

        let mut units_hit = 0;
        for pos in &cells {
            if self.strike(*pos, damage, res) != Strike::Empty {
                units_hit += 1;
            }
        }
        res.reward += RewardComputer::ultimate_bonus(units_hit, cells.len());
        res.targets = cells;
    }

    /// Terminal condition implied by the current boss and round, if any.
    fn check_terminal(&self) -> Option<Outcome> {
        if !self.boss.is_alive() {
            Some(Outcome::BossDefeated)
        } else if self.round.round >= self.round.max_rounds {
            Some(Outcome::BossSurvived)
        } else {
            None
        }
    }

    fn finish(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
        self.round.phase = Phase::GameOver;
        self.log.push(outcome.to_string());
        tracing::info!(?outcome, round = self.round.round, "episode finished");
    }

    /// Moves from `RoundEnd` to the next round's placement phase.
    ///
    /// Once an episode is over this keeps reporting the same outcome
    /// without touching any counter.
    pub fn advance_round(&mut self) -> Result<RoundTransition, CombatError> {
        if let Some(outcome) = self.outcome {
            return Ok(self.game_over_transition(outcome));
        }
        self.expect_phase(Phase::RoundEnd)?;
        if let Some(outcome) = self.check_terminal() {
            self.finish(outcome);
            return Ok(self.game_over_transition(outcome));
        }

        self.setup_new_round();
        Ok(RoundTransition {
            status: TurnStatus::NewRound,
            message: format!("Starting Round {}. Place units.", self.round.round),
            next_state: self.snapshot(),
        })
    }

    fn game_over_transition(&self, outcome: Outcome) -> RoundTransition {
        RoundTransition {
            status: TurnStatus::GameOver(outcome),
            message: outcome.to_string(),
            next_state: self.snapshot(),
        }
    }
}
