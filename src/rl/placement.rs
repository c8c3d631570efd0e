//! Player-side placement policies used when training the boss.

use rand::seq::SliceRandom;
use rand::RngCore;

use crate::combat::{CombatStateMachine, UnitKind};

/// Places the player's units during the placement phase.
pub trait PlacementPolicy {
    /// Places any number of units. The machine is in the placement phase on
    /// entry; rejected placements are simply not retried.
    fn place(&mut self, machine: &mut CombatStateMachine, rng: &mut dyn RngCore);
}

/// Automated player: random stocked kind on a random empty cell, repeated
/// until the round's cap, the stock or the free cells run out.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPlacement;

impl PlacementPolicy for RandomPlacement {
    fn place(&mut self, machine: &mut CombatStateMachine, rng: &mut dyn RngCore) {
        while machine.placements_left() > 0 {
            let stocked: Vec<UnitKind> = UnitKind::all()
                .into_iter()
                .filter(|kind| machine.stock(*kind) > 0)
                .collect();
            let empty = machine.grid().empty_positions();
            let (Some(kind), Some(pos)) = (stocked.choose(rng).copied(), empty.choose(rng).copied())
            else {
                break;
            };
            if let Err(err) = machine.place_unit(kind, pos.row, pos.col) {
                tracing::debug!(%err, "automated placement stopped");
                break;
            }
        }
    }
}

impl<F> PlacementPolicy for F
where
    F: FnMut(&mut CombatStateMachine, &mut dyn RngCore),
{
    fn place(&mut self, machine: &mut CombatStateMachine, rng: &mut dyn RngCore) {
        self(machine, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::GameConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_placement_fills_the_cap() {
        let mut machine = CombatStateMachine::new(GameConfig::default());
        machine.start_episode();
        let mut rng = StdRng::seed_from_u64(11);
        RandomPlacement.place(&mut machine, &mut rng);
        assert_eq!(machine.placements_left(), 0);
        assert_eq!(machine.grid().occupied_positions().len(), 7);
    }

    #[test]
    fn random_placement_stops_when_stock_runs_out() {
        let mut config = GameConfig::default();
        for spec in &mut config.units {
            spec.max_stock = 1;
        }
        let mut machine = CombatStateMachine::new(config);
        machine.start_episode();
        let mut rng = StdRng::seed_from_u64(11);
        RandomPlacement.place(&mut machine, &mut rng);
        assert_eq!(machine.grid().occupied_positions().len(), 3);
    }

    #[test]
    fn closures_are_policies() {
        let mut machine = CombatStateMachine::new(GameConfig::default());
        machine.start_episode();
        let mut rng = StdRng::seed_from_u64(0);
        let mut policy = |m: &mut CombatStateMachine, _: &mut dyn RngCore| {
            m.place_unit(UnitKind::Knight, 1, 2).unwrap();
        };
        policy.place(&mut machine, &mut rng);
        assert_eq!(machine.grid().unit_counts(), [0, 1, 0]);
    }
}
