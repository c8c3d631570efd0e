//! Boss skill casts with their targeting payloads.

use serde::{Deserialize, Serialize};

use super::boss::SkillId;
use super::unit::Position;

/// Direction a line shot travels along its row or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sweep {
    LeftToRight,
    RightToLeft,
    TopToBottom,
    BottomToTop,
}

impl Sweep {
    /// The two directions valid for a row.
    pub const HORIZONTAL: [Sweep; 2] = [Sweep::LeftToRight, Sweep::RightToLeft];
    /// The two directions valid for a column.
    pub const VERTICAL: [Sweep; 2] = [Sweep::TopToBottom, Sweep::BottomToTop];

    pub fn is_horizontal(&self) -> bool {
        matches!(self, Sweep::LeftToRight | Sweep::RightToLeft)
    }
}

/// A fully parameterised boss skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkillCast {
    /// One hit on one cell; `None` when no unit was available to target.
    NormalAttack { target: Option<Position> },
    HorizontalShot { row: usize, sweep: Sweep },
    VerticalShot { col: usize, sweep: Sweep },
    /// Strikes each listed cell once.
    Ultimate { targets: Vec<Position> },
    Heal,
}

impl SkillCast {
    pub fn skill_id(&self) -> SkillId {
        match self {
            SkillCast::NormalAttack { .. } => SkillId::NormalAttack,
            SkillCast::HorizontalShot { .. } => SkillId::HorizontalShot,
            SkillCast::VerticalShot { .. } => SkillId::VerticalShot,
            SkillCast::Ultimate { .. } => SkillId::Ultimate,
            SkillCast::Heal => SkillId::Heal,
        }
    }
}

/// A boss decision: the parameterised cast plus the action index the
/// learner credits it to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub cast: SkillCast,
    pub action_index: usize,
}

impl Decision {
    pub fn new(cast: SkillCast) -> Self {
        let action_index = cast.skill_id().index();
        Self { cast, action_index }
    }
}
