//! This module defines the trait that every reward predictor plugged into the agent loop
//! must implement, together with the error type shared by the predictors.
//!
//! The agent asks a predictor for per-step rewards of a path and hands every completed
//! path back to it, so a predictor can learn online from the experience it scores.

use rlhp_types::prelude::{Path, SegmentId, SpaceError};
use thiserror::Error;

use crate::templates::collaborators::CollaboratorError;

#[derive(Clone, Debug, Error)]
pub enum PredictorError {
    #[error("Shape mismatch between configured spaces and data: {0}")]
    Space(#[from] SpaceError),
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error("Collector has no segment with id {0}")]
    MissingSegment(SegmentId),
    #[error("No checkpoint found under {0}")]
    CheckpointNotFound(String),
    #[error("Checkpoint does not match the model: {0}")]
    CheckpointMismatch(String),
    #[error("Record failed: {0}")]
    Recorder(String),
    #[error("Tensor conversion failed: {0}")]
    Tensor(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl From<std::io::Error> for PredictorError {
    fn from(e: std::io::Error) -> Self {
        PredictorError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for PredictorError {
    fn from(e: serde_json::Error) -> Self {
        PredictorError::Json(e.to_string())
    }
}

/// The `RewardPredictorTrait` defines the interface between an agent and the reward
/// signal it optimizes.
///
/// # Required Methods
///
/// * `predict_reward(&self, path)`:
///   Score every step of a path. Implementations must not change any learned state.
///
/// * `path_callback(&mut self, path)`:
///   Receive a completed path. Learning predictors use this to collect segments, request
///   comparisons, train and checkpoint; others ignore it.
pub trait RewardPredictorTrait {
    /// Returns one reward per step of `path`.
    fn predict_reward(&self, path: &Path) -> Result<Vec<f32>, PredictorError>;

    /// Called once per completed path.
    fn path_callback(&mut self, path: &Path) -> Result<(), PredictorError>;
}
