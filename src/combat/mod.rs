//! Grid combat domain.
//!
//! Units, the grid, the boss and its skills, the reward table and the
//! [`CombatStateMachine`] that ties them together into rounds.

pub mod boss;
pub mod config;
pub mod error;
pub mod grid;
pub mod reward;
pub mod skill;
pub mod snapshot;
pub mod state_machine;
pub mod unit;

pub use boss::{Boss, BossConfig, BossSkill, SkillId};
pub use config::GameConfig;
pub use error::{CombatError, PlacementError, SkillError};
pub use grid::{Grid, Strike};
pub use reward::RewardComputer;
pub use skill::{Decision, SkillCast, Sweep};
pub use snapshot::{StateSnapshot, OBSERVED_COOLDOWNS};
pub use state_machine::{
    AnimationHint, BossTurnOutcome, CombatStateMachine, Outcome, Phase, PlayerAttackOutcome,
    RoundContext, RoundTransition, TurnStatus,
};
pub use unit::{Position, Unit, UnitKind, UnitSpec};
