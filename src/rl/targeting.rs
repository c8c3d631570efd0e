//! Targeting heuristic shared by every boss agent.
//!
//! Agents only pick *which* skill to use; this module fills in where it
//! lands. All randomness comes from the caller's generator.

use rand::seq::SliceRandom;
use rand::RngCore;

use crate::combat::{Grid, Position, SkillCast, SkillId, Sweep, UnitKind};

/// Priority for single-target strikes.
const STRIKE_PRIORITY: [UnitKind; 3] = [UnitKind::AD, UnitKind::Knight, UnitKind::Tank];

/// Builds the parameterised cast for `skill` against the current grid.
///
/// * `normal_attack` targets a random unit of the highest-priority kind
///   present (`AD > Knight > Tank`), or nothing on an empty grid.
/// * Line shots pick the first row/column with the most AD and Knight
///   occupants and a random sweep along that axis.
/// * `ultimate` takes every occupied cell in random order, pads with random
///   empty cells up to `ultimate_targets`, then truncates to that count.
pub fn plan_cast(
    skill: SkillId,
    grid: &Grid,
    ultimate_targets: usize,
    rng: &mut dyn RngCore,
) -> SkillCast {
    match skill {
        SkillId::NormalAttack => SkillCast::NormalAttack {
            target: strike_target(grid, rng),
        },
        SkillId::HorizontalShot => SkillCast::HorizontalShot {
            row: best_line(grid, |i, j| Position::new(i, j)),
            sweep: random_sweep(Sweep::HORIZONTAL, rng),
        },
        SkillId::VerticalShot => SkillCast::VerticalShot {
            col: best_line(grid, |i, j| Position::new(j, i)),
            sweep: random_sweep(Sweep::VERTICAL, rng),
        },
        SkillId::Ultimate => SkillCast::Ultimate {
            targets: ultimate_cells(grid, ultimate_targets, rng),
        },
        SkillId::Heal => SkillCast::Heal,
    }
}

fn strike_target(grid: &Grid, rng: &mut dyn RngCore) -> Option<Position> {
    STRIKE_PRIORITY
        .iter()
        .map(|kind| grid.positions_of(*kind))
        .find(|positions| !positions.is_empty())
        .and_then(|positions| positions.choose(rng).copied())
}

/// Index of the first line with the most line-target occupants.
///
/// `cell(line, offset)` maps a line index and an offset along it to a cell.
fn best_line(grid: &Grid, cell: impl Fn(usize, usize) -> Position) -> usize {
    let mut best = 0;
    let mut best_count = None;
    for line in 0..grid.size() {
        let count = (0..grid.size())
            .filter_map(|offset| grid.get(cell(line, offset)))
            .filter(|unit| unit.kind.is_line_target())
            .count();
        if best_count.map_or(true, |b| count > b) {
            best = line;
            best_count = Some(count);
        }
    }
    best
}

fn random_sweep(pair: [Sweep; 2], rng: &mut dyn RngCore) -> Sweep {
    *pair.choose(rng).unwrap_or(&pair[0])
}

fn ultimate_cells(grid: &Grid, count: usize, rng: &mut dyn RngCore) -> Vec<Position> {
    let mut cells = grid.occupied_positions();
    cells.shuffle(rng);
    if cells.len() < count {
        let mut empty = grid.empty_positions();
        empty.shuffle(rng);
        let missing = count - cells.len();
        cells.extend(empty.into_iter().take(missing));
    }
    cells.truncate(count);
    cells
}
