//! Player unit types, static specs and per-instance state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Behaviour class of a player unit.
///
/// Priority for single-target strikes is `AD > Knight > Tank`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    Tank,
    Knight,
    AD,
}

impl UnitKind {
    /// Returns all unit kinds in encoding order.
    pub fn all() -> [UnitKind; 3] {
        [UnitKind::Tank, UnitKind::Knight, UnitKind::AD]
    }

    /// Returns the index of this kind (0=Tank, 1=Knight, 2=AD).
    pub fn index(&self) -> usize {
        match self {
            UnitKind::Tank => 0,
            UnitKind::Knight => 1,
            UnitKind::AD => 2,
        }
    }

    /// Whether this kind absorbs line-shot charges until destroyed.
    pub fn blocks_line_shots(&self) -> bool {
        matches!(self, UnitKind::Tank)
    }

    /// Whether line-shot targeting counts this kind as a valuable occupant.
    pub fn is_line_target(&self) -> bool {
        matches!(self, UnitKind::AD | UnitKind::Knight)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Tank => write!(f, "Tank"),
            UnitKind::Knight => write!(f, "Knight"),
            UnitKind::AD => write!(f, "AD"),
        }
    }
}

/// Immutable per-type specification, defined once at configuration time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub kind: UnitKind,
    /// Display abbreviation used by presentation layers.
    pub abbreviation: String,
    /// Maximum stock the player can accumulate for this type.
    pub max_stock: u32,
    pub max_hp: u32,
    pub attack_power: u32,
}

impl UnitSpec {
    /// Default spec for a unit kind.
    pub fn default_for(kind: UnitKind) -> Self {
        let (abbreviation, max_stock, max_hp, attack_power) = match kind {
            UnitKind::Tank => ("T", 3, 6, 1),
            UnitKind::Knight => ("K", 3, 4, 2),
            UnitKind::AD => ("A", 4, 2, 3),
        };
        Self {
            kind,
            abbreviation: abbreviation.to_string(),
            max_stock,
            max_hp,
            attack_power,
        }
    }

    /// Creates a fresh unit of this spec at `position`.
    pub fn instantiate(&self, position: Position) -> Unit {
        Unit {
            kind: self.kind,
            hp: self.max_hp,
            max_hp: self.max_hp,
            attack_power: self.attack_power,
            position,
        }
    }
}

/// A cell coordinate on the square grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// A unit placed on the grid.
///
/// Invariant: `hp <= max_hp`. A unit whose hp reaches zero is removed from
/// its cell by the grid and dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub kind: UnitKind,
    hp: u32,
    max_hp: u32,
    pub attack_power: u32,
    pub position: Position,
}

impl Unit {
    pub fn hp(&self) -> u32 {
        self.hp
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    /// Applies one hit. Returns `true` if the unit is destroyed by it.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        self.hp = self.hp.saturating_sub(amount);
        self.is_destroyed()
    }

    pub fn is_destroyed(&self) -> bool {
        self.hp == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instantiate_starts_at_full_hp() {
        let spec = UnitSpec::default_for(UnitKind::Knight);
        let unit = spec.instantiate(Position::new(1, 2));
        assert_eq!(unit.hp(), unit.max_hp());
        assert_eq!(unit.position, Position::new(1, 2));
        assert_eq!(unit.attack_power, 2);
    }

    #[test]
    fn damage_saturates_at_zero() {
        let mut unit = UnitSpec::default_for(UnitKind::AD).instantiate(Position::new(0, 0));
        assert!(unit.take_damage(10));
        assert_eq!(unit.hp(), 0);
    }

    #[test]
    fn tank_survives_partial_damage() {
        let mut unit = UnitSpec::default_for(UnitKind::Tank).instantiate(Position::new(0, 0));
        assert!(!unit.take_damage(2));
        assert_eq!(unit.hp(), 4);
        assert!(!unit.is_destroyed());
    }

    #[test]
    fn only_tank_blocks() {
        assert!(UnitKind::Tank.blocks_line_shots());
        assert!(!UnitKind::Knight.blocks_line_shots());
        assert!(!UnitKind::AD.blocks_line_shots());
    }
}
