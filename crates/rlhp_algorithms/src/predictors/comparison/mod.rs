pub mod cadence;
pub mod checkpoint;
pub mod conv;
pub mod kernel;
pub mod model;

pub use cadence::*;
pub use checkpoint::*;
pub use conv::*;
pub use kernel::*;
pub use model::*;

use burn::module::AutodiffModule;
use burn::tensor::backend::AutodiffBackend;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use rlhp_types::prelude::{Comparison, EnvironmentSpec, Path, Preference, Segment};

use crate::configuration::ComparisonPredictorParams;
use crate::predictors::corrcoef;
use crate::sampling::{RandomSegmentSampler, SegmentSampler};
use crate::templates::base_predictor::{PredictorError, RewardPredictorTrait};
use crate::templates::collaborators::{ComparisonCollector, LabelSchedule, SummaryLogger};

/// Reward predictor trained online from pairwise segment comparisons.
///
/// Every completed path feeds the comparison collector; the model is retrained every
/// `train_every_timesteps` environment steps and checkpointed every
/// `checkpoint_every_timesteps` steps.
pub struct ComparisonRewardPredictor<B, S, C, L, G>
where
    B: AutodiffBackend,
    S: SegmentScorer<B> + AutodiffModule<B>,
{
    experiment_name: String,
    params: ComparisonPredictorParams,
    model: PairwiseRewardModel<B, S>,
    collector: C,
    label_schedule: L,
    summary_logger: G,
    segment_sampler: Box<dyn SegmentSampler>,
    checkpoint_naming: Box<dyn CheckpointNaming>,
    rng: StdRng,
    frames_per_segment: usize,
    training_cadence: CadenceCounter,
    checkpoint_cadence: CadenceCounter,
    elapsed_training_iters: u64,
    num_checkpoints: u64,
    total_timesteps: u64,
}

impl<B, C, L, G> ComparisonRewardPredictor<B, FullyConnectedScorer<B>, C, L, G>
where
    B: AutodiffBackend,
    C: ComparisonCollector,
    L: LabelSchedule,
    G: SummaryLogger,
{
    /// Builds a predictor around a freshly initialised fully connected scorer.
    pub fn new(
        experiment_name: impl Into<String>,
        env: &EnvironmentSpec,
        params: ComparisonPredictorParams,
        collector: C,
        label_schedule: L,
        summary_logger: G,
        device: B::Device,
    ) -> Result<Self, PredictorError> {
        let observation_space = env
            .observation_space
            .clone()
            .with_stacked_frames(params.stacked_frames);
        let scorer = FullyConnectedScorer::new(
            observation_space.flat_dim(),
            env.action_space.encoded_dim(),
            &params.hidden_sizes,
            params.dropout,
            &device,
        );
        Self::with_scorer(
            scorer,
            experiment_name,
            env,
            params,
            collector,
            label_schedule,
            summary_logger,
            device,
        )
    }
}

impl<B, S, C, L, G> ComparisonRewardPredictor<B, S, C, L, G>
where
    B: AutodiffBackend,
    S: SegmentScorer<B> + AutodiffModule<B>,
    S::InnerModule: SegmentScorer<B::InnerBackend>,
    C: ComparisonCollector,
    L: LabelSchedule,
    G: SummaryLogger,
{
    /// Builds a predictor around any scorer whose input widths match `env`.
    #[allow(clippy::too_many_arguments)]
    pub fn with_scorer(
        scorer: S,
        experiment_name: impl Into<String>,
        env: &EnvironmentSpec,
        params: ComparisonPredictorParams,
        collector: C,
        label_schedule: L,
        summary_logger: G,
        device: B::Device,
    ) -> Result<Self, PredictorError> {
        params.validate()?;
        if !(env.fps.is_finite() && env.fps > 0.0) {
            return Err(PredictorError::Configuration(format!(
                "environment fps must be positive, got {}",
                env.fps
            )));
        }

        let observation_space = env
            .observation_space
            .clone()
            .with_stacked_frames(params.stacked_frames);
        let model = PairwiseRewardModel::new(
            scorer,
            observation_space,
            env.action_space.clone(),
            params.learning_rate,
            device,
        )?;

        let frames_per_segment = (params.clip_length_seconds * env.fps) as usize;
        let experiment_name = experiment_name.into();
        info!(
            "Comparison reward predictor '{}' ready: {} frames per segment, training every {} steps",
            experiment_name, frames_per_segment, params.train_every_timesteps
        );

        Ok(Self {
            checkpoint_naming: Box::new(ZeroPaddedCheckpoints::new(&params.checkpoint_root)),
            segment_sampler: Box::new(RandomSegmentSampler),
            rng: StdRng::seed_from_u64(params.seed),
            training_cadence: CadenceCounter::new(params.train_every_timesteps),
            checkpoint_cadence: CadenceCounter::new(params.checkpoint_every_timesteps),
            experiment_name,
            params,
            model,
            collector,
            label_schedule,
            summary_logger,
            frames_per_segment,
            elapsed_training_iters: 0,
            num_checkpoints: 0,
            total_timesteps: 0,
        })
    }

    pub fn with_segment_sampler(mut self, sampler: Box<dyn SegmentSampler>) -> Self {
        self.segment_sampler = sampler;
        self
    }

    pub fn with_checkpoint_naming(mut self, naming: Box<dyn CheckpointNaming>) -> Self {
        self.checkpoint_naming = naming;
        self
    }

    pub fn experiment_name(&self) -> &str {
        &self.experiment_name
    }

    pub fn model(&self) -> &PairwiseRewardModel<B, S> {
        &self.model
    }

    pub fn collector(&self) -> &C {
        &self.collector
    }

    pub fn collector_mut(&mut self) -> &mut C {
        &mut self.collector
    }

    pub fn label_schedule(&self) -> &L {
        &self.label_schedule
    }

    pub fn summary_logger(&self) -> &G {
        &self.summary_logger
    }

    /// The agent logs its episodes through here when the predictor owns the logger.
    pub fn summary_logger_mut(&mut self) -> &mut G {
        &mut self.summary_logger
    }

    pub fn frames_per_segment(&self) -> usize {
        self.frames_per_segment
    }

    pub fn elapsed_training_iters(&self) -> u64 {
        self.elapsed_training_iters
    }

    pub fn num_checkpoints(&self) -> u64 {
        self.num_checkpoints
    }

    pub fn steps_since_last_training(&self) -> u64 {
        self.training_cadence.elapsed()
    }

    pub fn steps_since_last_checkpoint(&self) -> u64 {
        self.checkpoint_cadence.elapsed()
    }

    /// Draws a minibatch of labeled decisive comparisons and takes one optimizer step.
    ///
    /// Returns the minibatch loss, or `None` when there is nothing labeled to train on.
    pub fn train_predictor(&mut self) -> Result<Option<f32>, PredictorError> {
        self.collector.label_unlabeled_comparisons()?;

        let pool: Vec<(Comparison, Preference)> = self
            .collector
            .labeled_decisive_comparisons()
            .into_iter()
            .filter_map(|comparison| comparison.label.map(|label| (comparison, label)))
            .collect();
        let minibatch_size = self.params.minibatch_size.min(pool.len());
        if minibatch_size == 0 {
            debug!("No labeled decisive comparisons yet; skipping predictor training");
            return Ok(None);
        }

        let picked = rand::seq::index::sample(&mut self.rng, pool.len(), minibatch_size).into_vec();
        let mut left_segments: Vec<&Segment> = Vec::with_capacity(minibatch_size);
        let mut right_segments: Vec<&Segment> = Vec::with_capacity(minibatch_size);
        let mut labels = Vec::with_capacity(minibatch_size);
        for idx in picked {
            let (comparison, label) = &pool[idx];
            left_segments.push(
                self.collector
                    .get_segment(comparison.left)
                    .ok_or(PredictorError::MissingSegment(comparison.left))?,
            );
            right_segments.push(
                self.collector
                    .get_segment(comparison.right)
                    .ok_or(PredictorError::MissingSegment(comparison.right))?,
            );
            labels.push(*label);
        }

        let left = self.model.batch_segments(&left_segments)?;
        let right = self.model.batch_segments(&right_segments)?;
        let Some(loss) = self.model.train_step(&left, &right, &labels)? else {
            return Ok(None);
        };

        self.elapsed_training_iters += 1;
        self.write_training_summaries(loss)?;
        Ok(Some(loss))
    }

    fn write_training_summaries(&mut self, loss: f32) -> Result<(), PredictorError> {
        self.summary_logger.log_simple("predictor/loss", f64::from(loss))?;

        let recent_paths = self.summary_logger.recent_paths_with_padding();
        let validation_due =
            self.summary_logger.summary_step() % self.params.validation_every_summary_steps == 0;
        if recent_paths.len() > 1 && validation_due {
            match self.reward_correlation(&recent_paths)? {
                Some(correlation) => {
                    self.summary_logger
                        .log_simple("predictor/correlations", correlation)?;
                }
                None => debug!("Recent episodes have constant reward; correlation undefined"),
            }
        }

        let labeled = self.collector.labeled_decisive_comparisons().len();
        self.summary_logger.log_simple(
            "predictor/num_training_iters",
            self.elapsed_training_iters as f64,
        )?;
        self.summary_logger.log_simple(
            "labels/desired_labels",
            self.label_schedule.n_desired_labels() as f64,
        )?;
        self.summary_logger
            .log_simple("labels/total_comparisons", self.collector.len() as f64)?;
        self.summary_logger
            .log_simple("labels/labeled_comparisons", labeled as f64)?;
        Ok(())
    }

    /// Pearson correlation between true and predicted episode returns.
    pub fn reward_correlation(&self, paths: &[Path]) -> Result<Option<f64>, PredictorError> {
        let batch = self.model.batch_paths(paths)?;
        let predicted: Vec<f64> = self
            .model
            .predict(&batch)?
            .iter()
            .map(|steps| steps.iter().map(|&v| f64::from(v)).sum())
            .collect();
        let actual: Vec<f64> = paths
            .iter()
            .map(|path| f64::from(path.total_original_reward()))
            .collect();
        Ok(corrcoef(&actual, &predicted))
    }

    pub fn save_checkpoint(&mut self) -> Result<(), PredictorError> {
        let index = self.num_checkpoints + 1;
        let checkpoint = self
            .checkpoint_naming
            .checkpoint_path(&self.experiment_name, index);
        self.model.save(&checkpoint, &self.experiment_name, index)?;
        self.num_checkpoints = index;
        info!("Saved reward model checkpoint to {}", checkpoint.display());
        Ok(())
    }

    /// Restores the latest checkpoint of this experiment; later saves continue its index.
    pub fn load_model_from_checkpoint(&mut self) -> Result<u64, PredictorError> {
        let (index, checkpoint) = self
            .checkpoint_naming
            .latest_checkpoint(&self.experiment_name)?
            .ok_or_else(|| {
                PredictorError::CheckpointNotFound(format!("experiment '{}'", self.experiment_name))
            })?;
        let metadata = self.model.load(&checkpoint)?;
        self.num_checkpoints = index;
        info!(
            "Restored reward model from {} at global step {}",
            checkpoint.display(),
            metadata.global_step
        );
        Ok(index)
    }
}

impl<B, S, C, L, G> RewardPredictorTrait for ComparisonRewardPredictor<B, S, C, L, G>
where
    B: AutodiffBackend,
    S: SegmentScorer<B> + AutodiffModule<B>,
    S::InnerModule: SegmentScorer<B::InnerBackend>,
    C: ComparisonCollector,
    L: LabelSchedule,
    G: SummaryLogger,
{
    fn predict_reward(&self, path: &Path) -> Result<Vec<f32>, PredictorError> {
        self.model.predict_path(path)
    }

    fn path_callback(&mut self, path: &Path) -> Result<(), PredictorError> {
        let path_length = path.len() as u64;
        self.training_cadence.advance(path_length);
        self.checkpoint_cadence.advance(path_length);
        self.total_timesteps = self.total_timesteps.saturating_add(path_length);
        self.label_schedule.observe_timesteps(self.total_timesteps);

        // New segments first, so a fresh one can be paired below.
        if let Some(segment) =
            self.segment_sampler
                .sample(path, self.frames_per_segment, &mut self.rng)
        {
            if self.collector.segment_count() < self.params.max_segments {
                segment.validate(self.model.observation_space(), self.model.action_space())?;
                self.collector.add_segment(segment)?;
            }
        }

        if self.collector.len() < self.label_schedule.n_desired_labels() {
            self.collector.invent_comparison()?;
        }

        // Counters reset even when the pass below fails.
        if self.training_cadence.is_due() {
            self.training_cadence.reset();
            self.train_predictor()?;
        }

        if self.checkpoint_cadence.is_due() {
            self.checkpoint_cadence.reset();
            self.save_checkpoint()?;
        }

        Ok(())
    }
}
