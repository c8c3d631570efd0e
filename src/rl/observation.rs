//! State encoding for the boss agents.
//!
//! Turns a [`StateSnapshot`] into either a tuple of bin indices (tabular
//! agent) or a vector normalized to `[0, 1]` (Q-network agent). Both forms
//! are total: out-of-range inputs are clamped, zero denominators encode as 0.

use crate::combat::StateSnapshot;

use super::config::{EncoderConfig, STATE_DIM};

/// Discrete encoding: one bin index per state dimension.
pub type DiscreteState = [usize; STATE_DIM];

/// Continuous encoding: one value in `[0, 1]` per state dimension.
pub type ContinuousState = [f32; STATE_DIM];

/// Encodes snapshots against a fixed [`EncoderConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct StateEncoder {
    config: EncoderConfig,
    dims: [usize; STATE_DIM],
}

impl StateEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        let dims = config.dims();
        Self { config, dims }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Bin count per dimension.
    pub fn dims(&self) -> [usize; STATE_DIM] {
        self.dims
    }

    /// Raw quantities in encoding order, before clamping.
    ///
    /// The hp entry is the hp fraction; the round entry is the zero-based
    /// round index.
    fn raw(&self, snapshot: &StateSnapshot) -> [f64; STATE_DIM] {
        let hp_fraction = if snapshot.boss_max_hp == 0 {
            0.0
        } else {
            snapshot.boss_hp as f64 / snapshot.boss_max_hp as f64
        };
        let [cd_h, cd_v, cd_heal] = snapshot.cooldowns.map(f64::from);
        let [tank, knight, ad] = snapshot.unit_counts.map(f64::from);
        [
            hp_fraction,
            snapshot.boss_rage as f64,
            cd_h,
            cd_v,
            cd_heal,
            tank,
            knight,
            ad,
            snapshot.round.saturating_sub(1) as f64,
        ]
    }

    /// Maps a snapshot to bin indices, each clamped to `dims()[i] - 1`.
    pub fn discretize(&self, snapshot: &StateSnapshot) -> DiscreteState {
        let raw = self.raw(snapshot);
        let mut out = [0usize; STATE_DIM];
        for (i, (value, dim)) in raw.iter().zip(self.dims).enumerate() {
            let bin = if i == 0 {
                (value * dim as f64).floor()
            } else {
                *value
            };
            out[i] = (bin.max(0.0) as usize).min(dim.saturating_sub(1));
        }
        out
    }

    /// Maps a snapshot to a vector normalized by each dimension's maximum.
    pub fn normalize(&self, snapshot: &StateSnapshot) -> ContinuousState {
        let raw = self.raw(snapshot);
        let mut out = [0f32; STATE_DIM];
        for (i, (value, dim)) in raw.iter().zip(self.dims).enumerate() {
            // hp is already a fraction; everything else divides by its max.
            let denom = if i == 0 { 1.0 } else { dim as f64 - 1.0 };
            out[i] = if denom <= 0.0 {
                0.0
            } else {
                (value / denom).clamp(0.0, 1.0) as f32
            };
        }
        out
    }
}
