//! Learning side of the encounter: state encoding, targeting, the boss
//! agents and the training loop.
//!
//! The Q-network agent and its network require the `rl-nn` feature (which
//! brings in `tch`). Everything else is always available.

pub mod agent;
pub mod buffer;
pub mod checkpoint;
pub mod config;
pub mod environment;
pub mod metrics;
pub mod observation;
pub mod placement;
pub mod targeting;
pub mod training;

#[cfg(feature = "rl-nn")]
pub mod network;

pub use agent::{DecisionAgent, Experience, RandomAgent, TabularQAgent, NUM_ACTIONS};
pub use buffer::ReplayBuffer;
pub use checkpoint::{CheckpointError, LoadOutcome};
pub use config::{DqnConfig, EncoderConfig, TabularConfig, TrainingConfig, STATE_DIM};
pub use environment::{BossEnvironment, Observation, StepInfo, StepResult};
pub use metrics::{evaluate, run_episode, EpisodeStats, EpisodeSummary};
pub use observation::{ContinuousState, DiscreteState, StateEncoder};
pub use placement::{PlacementPolicy, RandomPlacement};
pub use targeting::plan_cast;
pub use training::{Trainer, TrainingReport};

#[cfg(feature = "rl-nn")]
pub use agent::ApproximateQAgent;
#[cfg(feature = "rl-nn")]
pub use network::QNetwork;
