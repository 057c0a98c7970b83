//! Checkpoint naming and the metadata stored next to every checkpoint.
//!
//! A checkpoint `<root>/<experiment>/<index>` is written as two files: `<index>.mpk`
//! holds the scorer weights and `<index>.json` holds the `CheckpointMetadata`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::templates::base_predictor::PredictorError;

pub(crate) const WEIGHTS_EXTENSION: &str = "mpk";
pub(crate) const METADATA_EXTENSION: &str = "json";

/// Decides where checkpoint `index` of an experiment lives and finds the latest one.
///
/// Returned paths carry no extension; the model appends the weights and metadata
/// extensions itself.
pub trait CheckpointNaming {
    fn checkpoint_path(&self, experiment_name: &str, index: u64) -> PathBuf;

    /// Highest-indexed checkpoint with weights on disk, if any.
    fn latest_checkpoint(&self, experiment_name: &str) -> Result<Option<(u64, PathBuf)>, PredictorError>;
}

/// `<root>/<experiment>/<index as 8 zero-padded digits>`.
#[derive(Debug, Clone)]
pub struct ZeroPaddedCheckpoints {
    root: PathBuf,
}

impl ZeroPaddedCheckpoints {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn experiment_dir(&self, experiment_name: &str) -> PathBuf {
        self.root.join(experiment_name)
    }
}

impl CheckpointNaming for ZeroPaddedCheckpoints {
    fn checkpoint_path(&self, experiment_name: &str, index: u64) -> PathBuf {
        self.experiment_dir(experiment_name).join(format!("{:08}", index))
    }

    fn latest_checkpoint(&self, experiment_name: &str) -> Result<Option<(u64, PathBuf)>, PredictorError> {
        let dir = self.experiment_dir(experiment_name);
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut latest: Option<u64> = None;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(WEIGHTS_EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.len() != 8 {
                continue;
            }
            if let Ok(index) = stem.parse::<u64>() {
                latest = Some(latest.map_or(index, |current| current.max(index)));
            }
        }

        Ok(latest.map(|index| (index, self.checkpoint_path(experiment_name, index))))
    }
}

/// Everything about a checkpoint that is not a weight tensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub experiment_name: String,
    pub checkpoint_index: u64,
    pub global_step: u64,
    pub obs_dim: usize,
    pub act_dim: usize,
}

impl CheckpointMetadata {
    pub fn save(&self, checkpoint: &Path) -> Result<(), PredictorError> {
        let path = checkpoint.with_extension(METADATA_EXTENSION);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(checkpoint: &Path) -> Result<Self, PredictorError> {
        let path = checkpoint.with_extension(METADATA_EXTENSION);
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
