//! gridboss - a turn-based grid encounter whose boss learns by reinforcement.
//!
//! The [`combat`] module simulates the encounter: unit placement, the
//! player's attack, the boss's skills and the reward each event earns. The
//! [`rl`] module turns it into a learning problem: state encoding, a shared
//! targeting heuristic, tabular and (feature `rl-nn`) neural Q-learning
//! agents, and an episode-based training loop.

pub mod combat;
pub mod rl;

pub use combat::{CombatError, CombatStateMachine, GameConfig, Outcome};
pub use rl::{BossEnvironment, DecisionAgent, TabularQAgent, Trainer};
