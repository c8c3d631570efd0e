//! Versioned JSON checkpoints for the boss agents.
//!
//! Every record carries a schema version. Loading checks version and shapes
//! before any live parameter is touched, so a rejected file leaves the agent
//! exactly as it was.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current schema version of every checkpoint record.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Errors raised while saving or loading a checkpoint.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("malformed checkpoint: {0}")]
    Format(#[from] serde_json::Error),

    #[error("unsupported checkpoint version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("shape mismatch for {what}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        what: String,
        expected: Vec<i64>,
        found: Vec<i64>,
    },

    #[error("checkpoint is missing parameter '{0}'")]
    MissingParameter(String),

    #[cfg(feature = "rl-nn")]
    #[error("tensor operation failed: {0}")]
    Tensor(#[from] tch::TchError),
}

/// Result of a `load` call. Loading never fails outright.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded,
    /// No file at the given path; the agent keeps its parameters.
    Missing,
    /// The file exists but could not be applied; the agent keeps its
    /// parameters.
    Rejected(CheckpointError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded)
    }
}

/// Rejects a record whose version differs from [`CHECKPOINT_VERSION`].
pub fn check_version(found: u32) -> Result<(), CheckpointError> {
    if found == CHECKPOINT_VERSION {
        Ok(())
    } else {
        Err(CheckpointError::UnsupportedVersion {
            found,
            expected: CHECKPOINT_VERSION,
        })
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serializes `value` to `path`, writing a temporary sibling first and
/// renaming it into place.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), CheckpointError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = temp_sibling(path);
    let bytes = serde_json::to_vec(value)?;
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Reads a record from `path`. Returns `Ok(None)` when the file is absent.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CheckpointError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Reads a record and hands it to `apply`, logging misses and rejections.
pub fn load_with<T, F>(path: &Path, agent: &str, apply: F) -> LoadOutcome
where
    T: DeserializeOwned,
    F: FnOnce(T) -> Result<(), CheckpointError>,
{
    let result = read_json::<T>(path).and_then(|record| record.map(apply).transpose());
    match result {
        Ok(Some(())) => {
            tracing::info!(agent, path = %path.display(), "checkpoint loaded");
            LoadOutcome::Loaded
        }
        Ok(None) => {
            tracing::warn!(
                agent,
                path = %path.display(),
                "no checkpoint found, keeping current parameters"
            );
            LoadOutcome::Missing
        }
        Err(err) => {
            tracing::warn!(
                agent,
                path = %path.display(),
                %err,
                "checkpoint rejected, keeping current parameters"
            );
            LoadOutcome::Rejected(err)
        }
    }
}

/// Dense value table of the tabular agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularCheckpoint {
    pub version: u32,
    /// State bin counts followed by the action count.
    pub dims: Vec<usize>,
    pub epsilon: f64,
    /// Row-major values; length is the product of `dims`.
    pub values: Vec<f64>,
}

/// One named parameter tensor, flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedTensor {
    pub name: String,
    pub shape: Vec<i64>,
    pub data: Vec<f32>,
}

/// Optimizer settings that survive a restart. The step counter lives in
/// [`DqnCheckpoint::update_count`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerState {
    pub learning_rate: f64,
}

/// Parameters and counters of the Q-network agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqnCheckpoint {
    pub version: u32,
    pub policy: Vec<NamedTensor>,
    pub target: Vec<NamedTensor>,
    pub optimizer: OptimizerState,
    pub epsilon: f64,
    pub update_count: u64,
}
