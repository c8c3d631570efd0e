use thiserror::Error;

use super::boss::SkillId;
use super::state_machine::Phase;

/// Errors reported by the combat state machine.
///
/// These are never fatal: the episode state is left untouched and the caller
/// may retry with a different request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CombatError {
    #[error("{0}")]
    InvalidPlacement(PlacementError),

    #[error("Expected phase {expected:?}, but the encounter is in {actual:?}")]
    PhaseMismatch { expected: Phase, actual: Phase },
}

/// Reasons a placement request is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("Not in placement phase.")]
    WrongPhase,

    #[error("Placement limit reached.")]
    LimitReached,

    #[error("No {0}s left.")]
    OutOfStock(String),

    #[error("Cell ({row},{col}) is outside the grid.")]
    OutOfBounds { row: usize, col: usize },

    #[error("Cell is occupied.")]
    Occupied,
}

impl From<PlacementError> for CombatError {
    fn from(err: PlacementError) -> Self {
        CombatError::InvalidPlacement(err)
    }
}

/// Reasons a boss skill cannot be cast.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SkillError {
    #[error("{skill} is on cooldown ({remaining} rounds left)")]
    OnCooldown { skill: SkillId, remaining: u32 },

    #[error("Not enough rage ({have}/{need})")]
    InsufficientRage { have: u32, need: u32 },

    #[error("Boss has no skill {0}")]
    Unknown(SkillId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placement_messages() {
        let e: CombatError = PlacementError::Occupied.into();
        assert_eq!(e.to_string(), "Cell is occupied.");
        let e: CombatError = PlacementError::OutOfStock("Tank".into()).into();
        assert_eq!(e.to_string(), "No Tanks left.");
    }

    #[test]
    fn skill_error_display() {
        let e = SkillError::OnCooldown {
            skill: SkillId::Heal,
            remaining: 2,
        };
        assert_eq!(e.to_string(), "heal is on cooldown (2 rounds left)");
    }
}
