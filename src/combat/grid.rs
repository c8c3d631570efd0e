//! The square battle grid.

use super::error::PlacementError;
use super::skill::Sweep;
use super::unit::{Position, Unit, UnitKind};

/// Result of striking a single cell once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strike {
    /// Nothing occupied the cell.
    Empty,
    /// The unit took the hit and is still standing.
    Survived { kind: UnitKind, hp: u32 },
    /// The hit destroyed the unit; the cell is now empty.
    Destroyed { kind: UnitKind },
}

/// Fixed-size square matrix of optional units.
///
/// A cell holds at most one unit. Destroyed units are removed the moment
/// their hit points reach zero.
#[derive(Debug, Clone)]
pub struct Grid {
    size: usize,
    cells: Vec<Option<Unit>>,
}

impl Grid {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            cells: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row < self.size && pos.col < self.size
    }

    fn offset(&self, pos: Position) -> Option<usize> {
        self.in_bounds(pos).then(|| pos.row * self.size + pos.col)
    }

    pub fn get(&self, pos: Position) -> Option<&Unit> {
        self.offset(pos).and_then(|i| self.cells[i].as_ref())
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.get(pos).is_some()
    }

    /// Puts `unit` into the cell named by its position.
    pub fn place(&mut self, unit: Unit) -> Result<(), PlacementError> {
        let pos = unit.position;
        let idx = self.offset(pos).ok_or(PlacementError::OutOfBounds {
            row: pos.row,
            col: pos.col,
        })?;
        if self.cells[idx].is_some() {
            return Err(PlacementError::Occupied);
        }
        self.cells[idx] = Some(unit);
        Ok(())
    }

    /// Hits the unit at `pos` once for `damage`, removing it if destroyed.
    pub fn strike(&mut self, pos: Position, damage: u32) -> Strike {
        let Some(idx) = self.offset(pos) else {
            return Strike::Empty;
        };
        let Some(unit) = self.cells[idx].as_mut() else {
            return Strike::Empty;
        };
        let kind = unit.kind;
        if unit.take_damage(damage) {
            self.cells[idx] = None;
            Strike::Destroyed { kind }
        } else {
            Strike::Survived {
                kind,
                hp: unit.hp(),
            }
        }
    }

    /// Empties every cell.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    /// Occupied units in row-major order.
    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.cells.iter().flatten()
    }

    /// Positions of units of `kind` in row-major order.
    pub fn positions_of(&self, kind: UnitKind) -> Vec<Position> {
        self.units()
            .filter(|u| u.kind == kind)
            .map(|u| u.position)
            .collect()
    }

    pub fn occupied_positions(&self) -> Vec<Position> {
        self.units().map(|u| u.position).collect()
    }

    pub fn empty_positions(&self) -> Vec<Position> {
        self.all_positions()
            .filter(|p| !self.is_occupied(*p))
            .collect()
    }

    fn all_positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.size).flat_map(move |r| (0..self.size).map(move |c| Position::new(r, c)))
    }

    pub fn is_empty(&self) -> bool {
        self.units().next().is_none()
    }

    /// Unit counts indexed by [`UnitKind::index`].
    pub fn unit_counts(&self) -> [u32; 3] {
        let mut counts = [0u32; 3];
        for unit in self.units() {
            counts[unit.kind.index()] += 1;
        }
        counts
    }

    pub fn total_attack(&self) -> u32 {
        self.units().map(|u| u.attack_power).sum()
    }

    /// Cells along a row (horizontal sweeps) or column (vertical sweeps),
    /// in travel order. Empty if `index` is outside the grid.
    pub fn line(&self, index: usize, sweep: Sweep) -> Vec<Position> {
        if index >= self.size {
            return Vec::new();
        }
        let n = self.size;
        match sweep {
            Sweep::LeftToRight => (0..n).map(|c| Position::new(index, c)).collect(),
            Sweep::RightToLeft => (0..n).rev().map(|c| Position::new(index, c)).collect(),
            Sweep::TopToBottom => (0..n).map(|r| Position::new(r, index)).collect(),
            Sweep::BottomToTop => (0..n).rev().map(|r| Position::new(r, index)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::unit::UnitSpec;

    fn unit(kind: UnitKind, row: usize, col: usize) -> Unit {
        UnitSpec::default_for(kind).instantiate(Position::new(row, col))
    }

    #[test]
    fn place_rejects_occupied_and_out_of_bounds() {
        let mut grid = Grid::new(4);
        grid.place(unit(UnitKind::Tank, 0, 0)).unwrap();
        assert_eq!(
            grid.place(unit(UnitKind::AD, 0, 0)),
            Err(PlacementError::Occupied)
        );
        assert_eq!(
            grid.place(unit(UnitKind::AD, 4, 0)),
            Err(PlacementError::OutOfBounds { row: 4, col: 0 })
        );
    }

    #[test]
    fn strike_removes_destroyed_unit() {
        let mut grid = Grid::new(4);
        grid.place(unit(UnitKind::AD, 1, 1)).unwrap();
        assert_eq!(
            grid.strike(Position::new(1, 1), 5),
            Strike::Destroyed { kind: UnitKind::AD }
        );
        assert!(grid.is_empty());
        assert_eq!(grid.strike(Position::new(1, 1), 5), Strike::Empty);
    }

    #[test]
    fn strike_reports_remaining_hp() {
        let mut grid = Grid::new(4);
        grid.place(unit(UnitKind::Tank, 2, 3)).unwrap();
        assert_eq!(
            grid.strike(Position::new(2, 3), 2),
            Strike::Survived {
                kind: UnitKind::Tank,
                hp: 4
            }
        );
    }

    #[test]
    fn counts_and_attack() {
        let mut grid = Grid::new(4);
        grid.place(unit(UnitKind::Tank, 0, 0)).unwrap();
        grid.place(unit(UnitKind::AD, 0, 1)).unwrap();
        grid.place(unit(UnitKind::AD, 3, 3)).unwrap();
        assert_eq!(grid.unit_counts(), [1, 0, 2]);
        assert_eq!(grid.total_attack(), 1 + 3 + 3);
        assert_eq!(grid.empty_positions().len(), 13);
    }

    #[test]
    fn line_order_follows_sweep() {
        let grid = Grid::new(3);
        assert_eq!(
            grid.line(1, Sweep::RightToLeft),
            vec![Position::new(1, 2), Position::new(1, 1), Position::new(1, 0)]
        );
        assert_eq!(
            grid.line(0, Sweep::BottomToTop),
            vec![Position::new(2, 0), Position::new(1, 0), Position::new(0, 0)]
        );
        assert!(grid.line(3, Sweep::TopToBottom).is_empty());
    }
}
