//! The pairwise reward model: a scorer, its optimizer and the global step, owned together.
//!
//! Training runs on the autodiff backend. Inference goes through `AutodiffModule::valid`,
//! which drops gradient tracking and disables dropout.

use std::fs;
use std::path::Path as FsPath;

use burn::module::{AutodiffModule, Module};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::ElementConversion;
use log::debug;

use rlhp_types::prelude::{ActionSpace, ObservationSpace, Path, Preference, Segment};

use super::checkpoint::CheckpointMetadata;
use super::kernel::{
    label_tensor, predict_per_timestep, preference_loss, segment_logits, SegmentBatch, SegmentScorer,
};
use crate::templates::base_predictor::PredictorError;

fn recorder() -> NamedMpkFileRecorder<FullPrecisionSettings> {
    NamedMpkFileRecorder::<FullPrecisionSettings>::new()
}

pub struct PairwiseRewardModel<B, S>
where
    B: AutodiffBackend,
    S: SegmentScorer<B> + AutodiffModule<B>,
{
    scorer: S,
    optimizer: OptimizerAdaptor<Adam, S, B>,
    observation_space: ObservationSpace,
    action_space: ActionSpace,
    learning_rate: f64,
    global_step: u64,
    device: B::Device,
}

impl<B, S> PairwiseRewardModel<B, S>
where
    B: AutodiffBackend,
    S: SegmentScorer<B> + AutodiffModule<B>,
    S::InnerModule: SegmentScorer<B::InnerBackend>,
{
    pub fn new(
        scorer: S,
        observation_space: ObservationSpace,
        action_space: ActionSpace,
        learning_rate: f64,
        device: B::Device,
    ) -> Result<Self, PredictorError> {
        if observation_space.flat_dim() == 0 {
            return Err(PredictorError::Configuration(
                "observation space has no elements".to_string(),
            ));
        }
        if action_space.encoded_dim() == 0 {
            return Err(PredictorError::Configuration(
                "action space has no elements".to_string(),
            ));
        }
        let expected_width = observation_space.flat_dim() + action_space.encoded_dim();
        if scorer.input_width() != expected_width {
            return Err(PredictorError::Configuration(format!(
                "scorer takes rows of width {}, spaces encode to {} (obs {} + act {})",
                scorer.input_width(),
                expected_width,
                observation_space.flat_dim(),
                action_space.encoded_dim()
            )));
        }

        Ok(Self {
            scorer,
            optimizer: AdamConfig::new().init(),
            observation_space,
            action_space,
            learning_rate,
            global_step: 0,
            device,
        })
    }

    pub fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    pub fn global_step(&self) -> u64 {
        self.global_step
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    pub fn batch_segments(&self, segments: &[&Segment]) -> Result<SegmentBatch, PredictorError> {
        Ok(SegmentBatch::from_segments(
            segments,
            &self.observation_space,
            &self.action_space,
        )?)
    }

    pub fn batch_paths(&self, paths: &[Path]) -> Result<SegmentBatch, PredictorError> {
        Ok(SegmentBatch::from_paths(
            paths,
            &self.observation_space,
            &self.action_space,
        )?)
    }

    /// Runs one Adam step on the mean preference loss and returns that loss.
    ///
    /// An empty minibatch performs no step and returns `None`.
    pub fn train_step(
        &mut self,
        left: &SegmentBatch,
        right: &SegmentBatch,
        labels: &[Preference],
    ) -> Result<Option<f32>, PredictorError> {
        if labels.is_empty() {
            debug!("Empty preference minibatch; skipping optimizer step");
            return Ok(None);
        }
        if left.batch_size() != labels.len() || right.batch_size() != labels.len() {
            return Err(PredictorError::Configuration(format!(
                "minibatch sizes disagree: {} left, {} right, {} labels",
                left.batch_size(),
                right.batch_size(),
                labels.len()
            )));
        }
        if left.is_empty() || right.is_empty() {
            return Err(PredictorError::Configuration(
                "cannot train on zero-length segments".to_string(),
            ));
        }

        let left_values = predict_per_timestep(&self.scorer, left, &self.device);
        let right_values = predict_per_timestep(&self.scorer, right, &self.device);
        let logits = segment_logits(left_values, right_values);
        let loss = preference_loss(logits, label_tensor::<B>(labels, &self.device));
        let loss_value = loss.clone().into_scalar().elem::<f32>();

        let grads = GradientsParams::from_grads(loss.backward(), &self.scorer);
        self.scorer = self
            .optimizer
            .step(self.learning_rate, self.scorer.clone(), grads);
        self.global_step += 1;

        Ok(Some(loss_value))
    }

    /// Per-timestep scores for every sequence in `batch`, in inference mode.
    pub fn predict(&self, batch: &SegmentBatch) -> Result<Vec<Vec<f32>>, PredictorError> {
        if batch.is_empty() {
            return Ok(vec![Vec::new(); batch.batch_size()]);
        }

        let scorer = self.scorer.valid();
        let values = predict_per_timestep(&scorer, batch, &self.device);
        let flat = values
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| PredictorError::Tensor(format!("{:?}", e)))?;

        Ok(flat
            .chunks(batch.segment_length())
            .map(|row| row.to_vec())
            .collect())
    }

    pub fn predict_path(&self, path: &Path) -> Result<Vec<f32>, PredictorError> {
        let batch = self.batch_paths(std::slice::from_ref(path))?;
        Ok(self.predict(&batch)?.pop().unwrap_or_default())
    }

    /// Writes weights to `<checkpoint>.mpk` and metadata to `<checkpoint>.json`.
    pub fn save(
        &self,
        checkpoint: &FsPath,
        experiment_name: &str,
        checkpoint_index: u64,
    ) -> Result<(), PredictorError> {
        if let Some(parent) = checkpoint.parent() {
            fs::create_dir_all(parent)?;
        }
        self.scorer
            .clone()
            .save_file(checkpoint.to_path_buf(), &recorder())
            .map_err(|e| PredictorError::Recorder(format!("{:?}", e)))?;

        CheckpointMetadata {
            experiment_name: experiment_name.to_string(),
            checkpoint_index,
            global_step: self.global_step,
            obs_dim: self.observation_space.flat_dim(),
            act_dim: self.action_space.encoded_dim(),
        }
        .save(checkpoint)
    }

    /// Restores weights and global step from a checkpoint written by `save`.
    pub fn load(&mut self, checkpoint: &FsPath) -> Result<CheckpointMetadata, PredictorError> {
        let metadata = CheckpointMetadata::load(checkpoint)?;
        let (obs_dim, act_dim) = (
            self.observation_space.flat_dim(),
            self.action_space.encoded_dim(),
        );
        if metadata.obs_dim != obs_dim || metadata.act_dim != act_dim {
            return Err(PredictorError::CheckpointMismatch(format!(
                "checkpoint was written for obs_dim={} act_dim={}, model has obs_dim={} act_dim={}",
                metadata.obs_dim, metadata.act_dim, obs_dim, act_dim
            )));
        }

        self.scorer = self
            .scorer
            .clone()
            .load_file(checkpoint.to_path_buf(), &recorder(), &self.device)
            .map_err(|e| PredictorError::Recorder(format!("{:?}", e)))?;
        self.global_step = metadata.global_step;

        Ok(metadata)
    }
}
